//! # Reconciliation engine public API
//!
//! The `rpe_api` module exposes the programmatic API for the reconciliation engine.
//! The API is modular, so that clients can pick and choose the functionality they want:
//!
//! * [`reconciliation_api`] is the primary API. It creates transactions and reconciles gateway
//!   confirmations against the stored record, whichever channel they arrive on (verification poll,
//!   webhook, or expiry sweep), and dispatches the settlement effect exactly once.
//! * [`refund_api`] handles the two-phase refund flow (legality check, gateway call by the caller,
//!   then the local commit).
//!
//! The pattern for using the APIs is the same as elsewhere in the workspace: an API instance is
//! created by supplying a storage backend that implements [`TransactionStore`].
//!
//! ```rust,ignore
//! use recon_engine::{ReconciliationApi, SqliteTransactionStore};
//! let store = SqliteTransactionStore::new_with_url("sqlite://data/hpg.db", 25).await?;
//! let api = ReconciliationApi::new(store, producers);
//! let settlement = api.apply_confirmation(&tx_ref, confirmation, ConfirmationSource::Webhook).await?;
//! ```
//!
//! [`TransactionStore`]: crate::traits::TransactionStore

pub mod errors;
pub mod locks;
pub mod reconciliation_api;
pub mod refund_api;

pub use errors::{ReconciliationError, RefundError};
pub use locks::KeyedLock;
pub use reconciliation_api::{ReconciliationApi, ResolutionOutcome, Settlement};
pub use refund_api::RefundApi;
