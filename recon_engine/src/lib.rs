//! HPG Reconciliation Engine
//!
//! The reconciliation engine is the part of the payment gateway that turns confirmation signals
//! from the payment processor into an authoritative, monotonic transaction state. Confirmations
//! arrive from several independent sources (user-triggered verification polls, processor webhooks
//! that are retried until acknowledged, the expiry sweep), in any order and any number of times.
//! The engine resolves them against the stored state under a per-transaction critical section and
//! guarantees that the settlement effect fires exactly once per transaction.
//!
//! The library is divided into two main sections:
//! 1. Storage ([`traits::TransactionStore`]). SQLite is the supported backend. You should never
//!    need to access the database directly; all mutation goes through the engine's commit path.
//!    The exception is the data types used in the database, defined in [`db_types`], which are
//!    public.
//! 2. The engine public API ([`rpe_api`]): [`ReconciliationApi`] for applying confirmations and
//!    running the expiry sweep, and [`RefundApi`] for the refund flow.
//!
//! The engine also provides a settlement event hook ([`events`]) so that downstream effects
//! (unlocking a feature, crediting a listing) can subscribe without the engine knowing anything
//! about them. The event is published at most once per transaction, gated by the `effects_fired`
//! flag that is written atomically with the success transition.

pub mod db_types;
pub mod events;
pub mod rpe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteTransactionStore;
pub use rpe_api::{
    ReconciliationApi,
    ReconciliationError,
    RefundApi,
    RefundError,
    ResolutionOutcome,
    Settlement,
};
pub use traits::{CommitOutcome, StatusUpdate, StoreError, TransactionStore};
