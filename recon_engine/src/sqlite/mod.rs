//! SQLite backend for the reconciliation engine.

mod store_impl;

pub mod db;
pub use store_impl::SqliteTransactionStore;
