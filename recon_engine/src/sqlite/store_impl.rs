//! `SqliteTransactionStore` is the concrete [`TransactionStore`] backend shipped with the engine.
use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;
use sqlx::SqlitePool;

use super::db::{new_pool, transactions};
use crate::{
    db_types::{NewTransaction, PaymentStatus, PaymentType, Transaction, TxRef},
    traits::{CommitOutcome, StatusUpdate, StoreError, TransactionStore},
};

#[derive(Clone)]
pub struct SqliteTransactionStore {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteTransactionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteTransactionStore ({:?})", self.pool)
    }
}

impl SqliteTransactionStore {
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = new_pool(url, max_connections).await?;
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl TransactionStore for SqliteTransactionStore {
    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn create(&self, transaction: NewTransaction) -> Result<Transaction, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let tx = transactions::insert(transaction, &mut conn).await?;
        debug!("🗃️ Created pending transaction [{}] for {} {}", tx.tx_ref, tx.amount, tx.currency);
        Ok(tx)
    }

    async fn fetch_by_ref(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_by_ref(tx_ref, &mut conn).await?)
    }

    async fn fetch_by_id(&self, id: i64) -> Result<Option<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_by_id(id, &mut conn).await?)
    }

    /// The read, the expected-status check, and the single UPDATE all run inside one database
    /// transaction, so `effects_flipped` is derived from the pre-state this write actually
    /// replaced, never from a stale snapshot.
    async fn compare_and_swap_status(
        &self,
        tx_ref: &TxRef,
        expected: PaymentStatus,
        update: StatusUpdate,
    ) -> Result<CommitOutcome, StoreError> {
        let mut db_tx = self.pool.begin().await?;
        let current = transactions::fetch_by_ref(tx_ref, &mut db_tx)
            .await?
            .ok_or_else(|| StoreError::TransactionNotFound(tx_ref.clone()))?;
        if current.status != expected {
            debug!(
                "🗃️ Commit for [{tx_ref}] expected {expected} but found {}. Returning conflict.",
                current.status
            );
            return Err(StoreError::PersistenceConflict { tx_ref: tx_ref.clone(), expected, actual: current.status });
        }
        let effects_flipped = update.fire_effects && !current.effects_fired;
        let updated = transactions::apply_update(tx_ref, &update, Utc::now(), &mut db_tx).await?;
        db_tx.commit().await?;
        debug!("🗃️ Transaction [{tx_ref}] is now {}. Effects flipped: {effects_flipped}", updated.status);
        Ok(CommitOutcome { transaction: updated, effects_flipped })
    }

    async fn record_confirmation(&self, tx_ref: &TxRef, payload: Option<&str>) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::record_confirmation(tx_ref, payload, &mut conn).await?;
        trace!("🗃️ Recorded confirmation payload for [{tx_ref}]");
        Ok(())
    }

    async fn fetch_by_status(&self, status: PaymentStatus) -> Result<Vec<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_by_status(status, &mut conn).await?)
    }

    async fn fetch_by_payment_type(&self, payment_type: PaymentType) -> Result<Vec<Transaction>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        Ok(transactions::fetch_by_payment_type(payment_type, &mut conn).await?)
    }

    async fn fetch_stale_pending(&self, older_than: Duration) -> Result<Vec<Transaction>, StoreError> {
        let cutoff = Utc::now() - older_than;
        let mut conn = self.pool.acquire().await?;
        let stale = transactions::fetch_stale_pending(cutoff, &mut conn).await?;
        trace!("🗃️ {} pending transactions older than {older_than}", stale.len());
        Ok(stale)
    }

    async fn record_webhook_anomaly(&self, tx_ref: &TxRef, payload: Option<&str>) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        transactions::insert_anomaly(tx_ref, payload, &mut conn).await?;
        warn!("🗃️ Webhook anomaly recorded for unknown reference [{tx_ref}]");
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}
