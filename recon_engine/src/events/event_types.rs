use crate::db_types::Transaction;

/// Published when a transaction settles as `Success` and this commit flipped the `effects_fired`
/// flag. Subscribers perform the user-visible settlement effects (unlock the feature, credit the
/// listing, notify); the engine guarantees the event is published at most once per transaction.
#[derive(Debug, Clone)]
pub struct TransactionSettledEvent {
    pub transaction: Transaction,
}

impl TransactionSettledEvent {
    pub fn new(transaction: Transaction) -> Self {
        Self { transaction }
    }
}
