use chrono::Duration;
use thiserror::Error;

use crate::{
    db_types::{NewTransaction, PaymentStatus, PaymentType, Transaction, TxRef},
    traits::{CommitOutcome, StatusUpdate},
};

/// Durable keyed storage for transaction records.
///
/// Backends must provide atomic read-modify-write per `tx_ref` (via [`compare_and_swap_status`])
/// and uniqueness enforcement on the caller-supplied idempotency key. Records are never deleted;
/// they are the audit trail and the replay-detection mechanism.
///
/// [`compare_and_swap_status`]: TransactionStore::compare_and_swap_status
#[allow(async_fn_in_trait)]
pub trait TransactionStore: Clone {
    /// The URL of the database.
    fn url(&self) -> &str;

    /// Create a new `Pending` transaction.
    ///
    /// The `tx_ref` is unique forever, even after terminal states;
    /// a reused key fails with [`StoreError::DuplicateRequest`].
    async fn create(&self, transaction: NewTransaction) -> Result<Transaction, StoreError>;

    async fn fetch_by_ref(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, StoreError>;

    async fn fetch_by_id(&self, id: i64) -> Result<Option<Transaction>, StoreError>;

    /// Commit a status transition in a single atomic write, but only if the stored status still
    /// equals `expected`. Otherwise fails with [`StoreError::PersistenceConflict`], in which case
    /// the engine re-reads and re-resolves.
    ///
    /// The outcome reports whether this write flipped the `effects_fired` flag, which is the
    /// at-most-once gate for effect dispatch.
    async fn compare_and_swap_status(
        &self,
        tx_ref: &TxRef,
        expected: PaymentStatus,
        update: StatusUpdate,
    ) -> Result<CommitOutcome, StoreError>;

    /// Record a confirmation payload (and bump `updated_at`) without changing the status. Used
    /// for idempotent replays and discarded reports, which must still leave an audit trace.
    async fn record_confirmation(&self, tx_ref: &TxRef, payload: Option<&str>) -> Result<(), StoreError>;

    async fn fetch_by_status(&self, status: PaymentStatus) -> Result<Vec<Transaction>, StoreError>;

    async fn fetch_by_payment_type(&self, payment_type: PaymentType) -> Result<Vec<Transaction>, StoreError>;

    /// Fetch `Pending` transactions that have not been updated for longer than `older_than`.
    /// Input for the expiry sweep.
    async fn fetch_stale_pending(&self, older_than: Duration) -> Result<Vec<Transaction>, StoreError>;

    /// Record a webhook that referenced a transaction this system never created. The webhook is
    /// acknowledged regardless; the anomaly table is for security / consistency review.
    async fn record_webhook_anomaly(&self, tx_ref: &TxRef, payload: Option<&str>) -> Result<(), StoreError>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Internal database error: {0}")]
    DatabaseError(String),
    #[error("A transaction already exists for reference [{0}]")]
    DuplicateRequest(TxRef),
    #[error("No transaction exists for reference [{0}]")]
    TransactionNotFound(TxRef),
    #[error("Transaction [{tx_ref}] was expected to be {expected}, but is {actual}")]
    PersistenceConflict { tx_ref: TxRef, expected: PaymentStatus, actual: PaymentStatus },
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::DatabaseError(e.to_string())
    }
}
