use crate::db_types::{PaymentStatus, Transaction};

/// The single atomic write that commits a status transition.
///
/// Everything the transition touches travels together so that the store can apply it in one
/// write: partial application would break the `effects_fired` exactly-once guarantee.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub new_status: PaymentStatus,
    /// Written only if the stored `gateway_ref` is still null (first writer wins).
    pub gateway_ref: Option<String>,
    /// When true, `settled_at` is set to now unless it was already set.
    pub settle: bool,
    /// When true, `effects_fired` flips to true unless it already was.
    pub fire_effects: bool,
    /// Raw confirmation payload to persist for audit; `None` leaves the stored payload untouched.
    pub payload: Option<String>,
}

impl StatusUpdate {
    pub fn to_status(new_status: PaymentStatus) -> Self {
        Self { new_status, gateway_ref: None, settle: false, fire_effects: false, payload: None }
    }
}

/// Result of a successful compare-and-swap commit.
#[derive(Debug, Clone)]
pub struct CommitOutcome {
    pub transaction: Transaction,
    /// True iff *this* write flipped `effects_fired` from false to true. The caller dispatches
    /// the settlement effect exactly when this is true.
    pub effects_flipped: bool,
}
