use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{PaymentStatus, Transaction},
    rpe_api::{errors::RefundError, locks::KeyedLock},
    traits::{StatusUpdate, StoreError, TransactionStore},
};

/// `RefundApi` handles the local half of the refund flow.
///
/// A refund is two-phase: the caller first checks legality with [`fetch_refundable`], then makes
/// the refund call to the gateway *outside* any lock, and finally records the outcome with
/// [`commit_refund`]. Holding a lock across an outbound network call would stall every other
/// confirmation for that transaction.
///
/// The lock registry is shared with [`ReconciliationApi`] so refund commits and confirmation
/// writes for the same transaction serialize against each other.
///
/// [`fetch_refundable`]: RefundApi::fetch_refundable
/// [`commit_refund`]: RefundApi::commit_refund
/// [`ReconciliationApi`]: crate::rpe_api::ReconciliationApi
pub struct RefundApi<B> {
    store: B,
    locks: KeyedLock,
}

impl<B> Debug for RefundApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RefundApi")
    }
}

impl<B: Clone> Clone for RefundApi<B> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), locks: self.locks.clone() }
    }
}

impl<B> RefundApi<B> {
    pub fn new(store: B, locks: KeyedLock) -> Self {
        Self { store, locks }
    }
}

impl<B> RefundApi<B>
where B: TransactionStore
{
    /// Fetch the transaction and check that a refund is legal for it.
    ///
    /// Only settled `Success` transactions can be refunded. `Refunded` is also accepted here so
    /// that a retried refund request reaches [`Self::commit_refund`], which treats it as an
    /// idempotent no-op rather than an error.
    pub async fn fetch_refundable(&self, id: i64) -> Result<Transaction, RefundError> {
        let tx = self.store.fetch_by_id(id).await?.ok_or(RefundError::TransactionNotFound(id))?;
        match tx.status {
            PaymentStatus::Success | PaymentStatus::Refunded => Ok(tx),
            status => Err(RefundError::NotRefundable { id, status }),
        }
    }

    /// Record a refund the gateway has accepted, moving the transaction `Success` -> `Refunded`.
    ///
    /// Refunding an already-`Refunded` transaction is a no-op that returns the stored record.
    /// The settlement `effects_fired` flag is left untouched; a refund reverses money, not the
    /// effect dispatch history.
    pub async fn commit_refund(&self, id: i64, reason: Option<&str>) -> Result<Transaction, RefundError> {
        let tx = self.store.fetch_by_id(id).await?.ok_or(RefundError::TransactionNotFound(id))?;
        let _guard = self.locks.acquire(tx.tx_ref.as_str()).await;
        // re-read inside the critical section
        let tx = self.store.fetch_by_id(id).await?.ok_or(RefundError::TransactionNotFound(id))?;
        match tx.status {
            PaymentStatus::Refunded => {
                debug!("💸️ [{}] is already refunded. Acknowledging the replayed refund.", tx.tx_ref);
                Ok(tx)
            },
            PaymentStatus::Success => {
                let update = StatusUpdate::to_status(PaymentStatus::Refunded);
                match self.store.compare_and_swap_status(&tx.tx_ref, PaymentStatus::Success, update).await {
                    Ok(commit) => {
                        info!(
                            "💸️ [{}] refunded ({}). Reason: {}",
                            commit.transaction.tx_ref,
                            commit.transaction.amount,
                            reason.unwrap_or("not given")
                        );
                        Ok(commit.transaction)
                    },
                    Err(StoreError::PersistenceConflict { actual: PaymentStatus::Refunded, .. }) => {
                        debug!("💸️ [{}] was refunded by a concurrent request. Acknowledging.", tx.tx_ref);
                        let tx = self.store.fetch_by_id(id).await?.ok_or(RefundError::TransactionNotFound(id))?;
                        Ok(tx)
                    },
                    Err(StoreError::PersistenceConflict { actual, .. }) => {
                        Err(RefundError::NotRefundable { id, status: actual })
                    },
                    Err(e) => Err(e.into()),
                }
            },
            status => Err(RefundError::NotRefundable { id, status }),
        }
    }
}
