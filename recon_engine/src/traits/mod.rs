//! Storage backend contracts for the reconciliation engine.
//!
//! The engine never talks to a database directly; it talks to a [`TransactionStore`]. The trait
//! deliberately exposes a compare-and-swap commit rather than a plain update: the stored status is
//! the optimistic-concurrency token, so racing writers are detected at the store even when they
//! bypass the engine's in-process critical section (e.g. a second gateway instance).

mod data_objects;
mod transaction_store;

pub use data_objects::{CommitOutcome, StatusUpdate};
pub use transaction_store::{StoreError, TransactionStore};
