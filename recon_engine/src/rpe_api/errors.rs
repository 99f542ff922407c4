use thiserror::Error;

use crate::{
    db_types::{PaymentStatus, TxRef},
    traits::StoreError,
};

#[derive(Debug, Clone, Error)]
pub enum ReconciliationError {
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),
    #[error("No transaction with reference [{0}] is known to this server")]
    UnknownTransaction(TxRef),
}

#[derive(Debug, Clone, Error)]
pub enum RefundError {
    #[error("Storage error: {0}")]
    StoreError(#[from] StoreError),
    #[error("No transaction with id #{0} is known to this server")]
    TransactionNotFound(i64),
    #[error("Transaction #{id} is {status} and cannot be refunded")]
    NotRefundable { id: i64, status: PaymentStatus },
}
