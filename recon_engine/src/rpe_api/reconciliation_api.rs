use std::fmt::Debug;

use log::*;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Confirmation, ConfirmationSource, NewTransaction, PaymentStatus, ReportedStatus, Transaction, TxRef},
    events::{EventProducers, TransactionSettledEvent},
    rpe_api::{errors::ReconciliationError, locks::KeyedLock},
    traits::{StatusUpdate, StoreError, TransactionStore},
};

/// How a confirmation was reconciled against the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOutcome {
    /// The reported status was written as a normal transition out of `Pending`.
    Applied,
    /// A late `success` overrode a provisional `Failed` or `Cancelled` status.
    Upgraded,
    /// The report matched the stored status. Acknowledged without any state change.
    Replayed,
    /// The report lost against the stored status (or was unrecognized) and was not applied.
    Discarded,
}

/// The result of reconciling one confirmation.
#[derive(Debug, Clone)]
pub struct Settlement {
    pub transaction: Transaction,
    pub outcome: ResolutionOutcome,
    /// True iff this confirmation flipped `effects_fired` and the settlement event was published.
    pub effects_dispatched: bool,
}

enum Resolution {
    Transition(PaymentStatus),
    Replay,
    Discard,
}

/// The precedence rule, as a pure function of the stored status and the reported one.
///
/// * `Refunded` and `Success` are sticky. Nothing overrides them, except that a `success` report
///   against a stored `Success` is an idempotent replay rather than a conflict.
/// * `success` upgrades any non-sticky status, including the provisional `Failed`/`Cancelled`
///   written by an expiry sweep. Payment gateways deliver late success confirmations after
///   timeouts, and the money moved, so the record must follow it.
/// * `Failed` and `Cancelled` replay onto themselves but never overwrite each other; the first
///   terminal report wins between those two.
/// * Unrecognized vocabulary never mutates state.
fn resolve(current: PaymentStatus, reported: &ReportedStatus) -> Resolution {
    use PaymentStatus as S;
    match (current, reported) {
        (S::Refunded, _) => Resolution::Discard,
        (S::Success, ReportedStatus::Success) => Resolution::Replay,
        (S::Success, _) => Resolution::Discard,
        (_, ReportedStatus::Unrecognized(_)) => Resolution::Discard,
        (_, ReportedStatus::Success) => Resolution::Transition(S::Success),
        (S::Failed, ReportedStatus::Failed) | (S::Cancelled, ReportedStatus::Cancelled) => Resolution::Replay,
        (S::Failed, ReportedStatus::Cancelled) | (S::Cancelled, ReportedStatus::Failed) => Resolution::Discard,
        (S::Pending, ReportedStatus::Failed) => Resolution::Transition(S::Failed),
        (S::Pending, ReportedStatus::Cancelled) => Resolution::Transition(S::Cancelled),
    }
}

/// `ReconciliationApi` is the primary API for creating transactions and reconciling gateway
/// confirmations, whichever channel they arrive on (verification poll, webhook, or the expiry
/// sweep).
///
/// All writes against a given `tx_ref` are serialized through a [`KeyedLock`], and committed
/// through the store's compare-and-swap, so concurrent confirmations converge on the same final
/// state and the settlement effect is dispatched exactly once.
pub struct ReconciliationApi<B> {
    store: B,
    producers: EventProducers,
    locks: KeyedLock,
}

impl<B> Debug for ReconciliationApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReconciliationApi")
    }
}

impl<B: Clone> Clone for ReconciliationApi<B> {
    fn clone(&self) -> Self {
        Self { store: self.store.clone(), producers: self.producers.clone(), locks: self.locks.clone() }
    }
}

impl<B> ReconciliationApi<B> {
    pub fn new(store: B, producers: EventProducers) -> Self {
        Self { store, producers, locks: KeyedLock::new() }
    }

    /// The lock registry, so that other APIs (refunds) can share the same critical sections.
    pub fn locks(&self) -> KeyedLock {
        self.locks.clone()
    }
}

impl<B> ReconciliationApi<B>
where B: TransactionStore
{
    /// Create a new `Pending` transaction for the given idempotency key.
    ///
    /// The key is unique forever. A second initialization with the same `tx_ref` fails with
    /// [`StoreError::DuplicateRequest`] even if the first attempt has long since reached a
    /// terminal state.
    pub async fn create_transaction(&self, transaction: NewTransaction) -> Result<Transaction, ReconciliationError> {
        let tx = self.store.create(transaction).await?;
        debug!("🔄️ New {} transaction [{}] created for {}", tx.payment_type, tx.tx_ref, tx.amount);
        Ok(tx)
    }

    pub async fn fetch_transaction(&self, tx_ref: &TxRef) -> Result<Option<Transaction>, ReconciliationError> {
        Ok(self.store.fetch_by_ref(tx_ref).await?)
    }

    pub async fn fetch_transaction_by_id(&self, id: i64) -> Result<Option<Transaction>, ReconciliationError> {
        Ok(self.store.fetch_by_id(id).await?)
    }

    /// Record a webhook that referenced a `tx_ref` this system never created. The caller still
    /// acknowledges the webhook; the anomaly record is for review.
    pub async fn record_webhook_anomaly(
        &self,
        tx_ref: &TxRef,
        payload: Option<&str>,
    ) -> Result<(), ReconciliationError> {
        warn!("🔄️ Webhook referenced unknown transaction [{tx_ref}]. Recording anomaly.");
        Ok(self.store.record_webhook_anomaly(tx_ref, payload).await?)
    }

    /// Reconcile a gateway confirmation against the stored transaction record.
    ///
    /// The reported status is resolved against the stored one under the precedence rule and the
    /// winning state is committed atomically. Replays are acknowledged without a write beyond the
    /// audit trace; losing reports are discarded (and logged). If the transition settles the
    /// transaction as `Success` and this is the confirmation that flipped the `effects_fired`
    /// flag, the settled event is published to the hook subscribers. Every other path, including
    /// replays of a `Success` already on record, leaves the flag alone so the effect can never
    /// fire twice.
    pub async fn apply_confirmation(
        &self,
        tx_ref: &TxRef,
        confirmation: Confirmation,
        source: ConfirmationSource,
    ) -> Result<Settlement, ReconciliationError> {
        trace!("🔄️ [{tx_ref}] {source} confirmation reports '{}'", confirmation.reported);
        let _guard = self.locks.acquire(tx_ref.as_str()).await;
        let mut current = self
            .store
            .fetch_by_ref(tx_ref)
            .await?
            .ok_or_else(|| ReconciliationError::UnknownTransaction(tx_ref.clone()))?;
        loop {
            match resolve(current.status, &confirmation.reported) {
                Resolution::Replay => {
                    debug!("🔄️ [{tx_ref}] {source} confirmation replays the stored {} status", current.status);
                    self.store.record_confirmation(tx_ref, confirmation.raw_payload.as_deref()).await?;
                    return Ok(Settlement {
                        transaction: current,
                        outcome: ResolutionOutcome::Replayed,
                        effects_dispatched: false,
                    });
                },
                Resolution::Discard => {
                    warn!(
                        "🔄️ [{tx_ref}] {source} confirmation reporting '{}' conflicts with the stored {} status. \
                         Discarding it.",
                        confirmation.reported, current.status
                    );
                    self.store.record_confirmation(tx_ref, confirmation.raw_payload.as_deref()).await?;
                    return Ok(Settlement {
                        transaction: current,
                        outcome: ResolutionOutcome::Discarded,
                        effects_dispatched: false,
                    });
                },
                Resolution::Transition(new_status) => {
                    let outcome = if new_status == PaymentStatus::Success && current.status != PaymentStatus::Pending {
                        ResolutionOutcome::Upgraded
                    } else {
                        ResolutionOutcome::Applied
                    };
                    let update = StatusUpdate {
                        new_status,
                        gateway_ref: confirmation.gateway_ref.clone(),
                        settle: true,
                        fire_effects: new_status == PaymentStatus::Success,
                        payload: confirmation.raw_payload.clone(),
                    };
                    match self.store.compare_and_swap_status(tx_ref, current.status, update).await {
                        Ok(commit) => {
                            if commit.effects_flipped {
                                self.call_settled_hook(&commit.transaction).await;
                            }
                            info!("🔄️ [{tx_ref}] {} -> {new_status} via {source}", current.status);
                            return Ok(Settlement {
                                transaction: commit.transaction,
                                outcome,
                                effects_dispatched: commit.effects_flipped,
                            });
                        },
                        Err(StoreError::PersistenceConflict { actual, .. }) => {
                            debug!("🔄️ [{tx_ref}] status moved to {actual} underneath us. Re-resolving.");
                            current = self
                                .store
                                .fetch_by_ref(tx_ref)
                                .await?
                                .ok_or_else(|| ReconciliationError::UnknownTransaction(tx_ref.clone()))?;
                        },
                        Err(e) => return Err(e.into()),
                    }
                },
            }
        }
    }

    /// Expire `Pending` transactions that have seen no update for longer than `older_than`.
    ///
    /// Expiry is an ordinary `failed` confirmation from the `sweep` source, so it is subject to
    /// the same precedence rule as every other channel: the written `Failed` is provisional, and
    /// a later `success` from the gateway still upgrades it.
    pub async fn expire_stale_pending(
        &self,
        older_than: chrono::Duration,
    ) -> Result<Vec<Settlement>, ReconciliationError> {
        let stale = self.store.fetch_stale_pending(older_than).await?;
        if stale.is_empty() {
            trace!("🕰️ No stale pending transactions to expire");
            return Ok(Vec::new());
        }
        info!("🕰️ Expiring {} stale pending transaction(s)", stale.len());
        let mut settlements = Vec::with_capacity(stale.len());
        for tx in stale {
            let confirmation = Confirmation::new(ReportedStatus::Failed);
            match self.apply_confirmation(&tx.tx_ref, confirmation, ConfirmationSource::Sweep).await {
                Ok(settlement) => settlements.push(settlement),
                Err(e) => error!("🕰️ Could not expire transaction [{}]: {e}", tx.tx_ref),
            }
        }
        Ok(settlements)
    }

    async fn call_settled_hook(&self, transaction: &Transaction) {
        for emitter in &self.producers.settled_producer {
            debug!("🔄️ Notifying settled hook subscribers for [{}]", transaction.tx_ref);
            let event = TransactionSettledEvent { transaction: transaction.clone() };
            emitter.publish_event(event).await;
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn transition(current: PaymentStatus, reported: ReportedStatus) -> Option<PaymentStatus> {
        match resolve(current, &reported) {
            Resolution::Transition(s) => Some(s),
            _ => None,
        }
    }

    fn is_replay(current: PaymentStatus, reported: ReportedStatus) -> bool {
        matches!(resolve(current, &reported), Resolution::Replay)
    }

    fn is_discard(current: PaymentStatus, reported: ReportedStatus) -> bool {
        matches!(resolve(current, &reported), Resolution::Discard)
    }

    #[test]
    fn pending_accepts_any_recognized_report() {
        assert_eq!(transition(PaymentStatus::Pending, ReportedStatus::Success), Some(PaymentStatus::Success));
        assert_eq!(transition(PaymentStatus::Pending, ReportedStatus::Failed), Some(PaymentStatus::Failed));
        assert_eq!(transition(PaymentStatus::Pending, ReportedStatus::Cancelled), Some(PaymentStatus::Cancelled));
    }

    #[test]
    fn success_is_sticky() {
        assert!(is_replay(PaymentStatus::Success, ReportedStatus::Success));
        assert!(is_discard(PaymentStatus::Success, ReportedStatus::Failed));
        assert!(is_discard(PaymentStatus::Success, ReportedStatus::Cancelled));
    }

    #[test]
    fn late_success_upgrades_provisional_failures() {
        assert_eq!(transition(PaymentStatus::Failed, ReportedStatus::Success), Some(PaymentStatus::Success));
        assert_eq!(transition(PaymentStatus::Cancelled, ReportedStatus::Success), Some(PaymentStatus::Success));
    }

    #[test]
    fn terminal_non_success_replays_itself_only() {
        assert!(is_replay(PaymentStatus::Failed, ReportedStatus::Failed));
        assert!(is_replay(PaymentStatus::Cancelled, ReportedStatus::Cancelled));
        assert!(is_discard(PaymentStatus::Failed, ReportedStatus::Cancelled));
        assert!(is_discard(PaymentStatus::Cancelled, ReportedStatus::Failed));
    }

    #[test]
    fn refunded_overrides_everything() {
        for reported in
            [ReportedStatus::Success, ReportedStatus::Failed, ReportedStatus::Cancelled, ReportedStatus::parse("huh")]
        {
            assert!(is_discard(PaymentStatus::Refunded, reported));
        }
    }

    #[test]
    fn unrecognized_vocabulary_never_mutates() {
        for current in [PaymentStatus::Pending, PaymentStatus::Failed, PaymentStatus::Cancelled] {
            assert!(is_discard(current, ReportedStatus::Unrecognized("reversed".to_string())));
        }
    }
}
