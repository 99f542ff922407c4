//! The channel plumbing behind the settlement hook.
//!
//! The engine commits a status transition synchronously and hands the settlement effect off
//! through an mpsc channel, so that webhook acks and poll responses never wait on whatever the
//! subscriber does with the event. Handlers are stateless: they receive the event and nothing
//! else, and they may be async.
use std::{
    future::Future,
    pin::Pin,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc,
    },
};

use log::*;
use tokio::sync::mpsc;

pub type Handler<E> = Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

pub struct EventHandler<E: Send + Sync + 'static> {
    inbox: mpsc::Receiver<E>,
    sender: mpsc::Sender<E>,
    hook: Handler<E>,
}

impl<E: Send + Sync + 'static> EventHandler<E> {
    pub fn new(buffer_size: usize, hook: Handler<E>) -> Self {
        let (sender, inbox) = mpsc::channel(buffer_size);
        Self { inbox, sender, hook }
    }

    pub fn subscribe(&self) -> EventProducer<E> {
        EventProducer::new(self.sender.clone())
    }

    /// Consume events until every producer has been dropped, then drain the in-flight hook
    /// invocations and return.
    pub async fn start_handler(mut self) {
        debug!("📬️ Settlement event handler listening");
        // The handler holds one sender of its own; drop it so the channel closes when the last
        // subscriber goes away.
        drop(self.sender);
        let in_flight = Arc::new(AtomicI64::new(0));
        while let Some(event) = self.inbox.recv().await {
            trace!("📬️ Dispatching event to hook");
            let hook = Arc::clone(&self.hook);
            let gauge = Arc::clone(&in_flight);
            gauge.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                (hook)(event).await;
                gauge.fetch_sub(1, Ordering::SeqCst);
                trace!("📬️ Event handled");
            });
        }
        // Channel closed. Effects must not be lost, so wait for the spawned invocations.
        while in_flight.load(Ordering::SeqCst) > 0 {
            debug!("📬️ Waiting for {} hook invocation(s) to complete", in_flight.load(Ordering::SeqCst));
            tokio::time::sleep(tokio::time::Duration::from_millis(50)).await;
        }
        debug!("📬️ Settlement event handler has shut down");
    }
}

#[derive(Clone)]
pub struct EventProducer<E: Send + Sync> {
    sender: mpsc::Sender<E>,
}

impl<E: Send + Sync> EventProducer<E> {
    pub fn new(sender: mpsc::Sender<E>) -> Self {
        Self { sender }
    }

    pub async fn publish_event(&self, event: E) {
        if let Err(e) = self.sender.send(event).await {
            error!("📬️ Failed to send event: {e}");
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::Mutex;

    use chrono::Utc;
    use hpg_common::{Currency, Money};

    use super::*;
    use crate::{
        db_types::{PaymentStatus, PaymentType, Transaction, TxRef},
        events::TransactionSettledEvent,
    };

    fn settled(id: i64, tx_ref: &str) -> TransactionSettledEvent {
        let now = Utc::now();
        TransactionSettledEvent::new(Transaction {
            id,
            tx_ref: TxRef::from(tx_ref.to_string()),
            gateway_ref: Some(format!("CHA-{id}")),
            amount: Money::from_major(250),
            currency: Currency::Etb,
            payment_type: PaymentType::ListingFee,
            related_entity_id: "listing-1".to_string(),
            status: PaymentStatus::Success,
            effects_fired: true,
            raw_gateway_payload: None,
            created_at: now,
            updated_at: now,
            settled_at: Some(now),
        })
    }

    #[tokio::test]
    async fn every_published_settlement_reaches_the_hook() {
        let _ = env_logger::try_init();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let hook = Arc::new(move |ev: TransactionSettledEvent| {
            let sink = Arc::clone(&sink);
            Box::pin(async move {
                // a slow subscriber must not lose events on shutdown
                tokio::time::sleep(tokio::time::Duration::from_millis(25)).await;
                sink.lock().unwrap().push(ev.transaction.tx_ref.to_string());
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
        let handler = EventHandler::new(2, hook);
        // the webhook path and the sweep each hold their own subscription
        let webhook_side = handler.subscribe();
        let sweep_side = handler.subscribe();
        tokio::spawn(async move {
            for i in 1..=3 {
                webhook_side.publish_event(settled(i, &format!("tx-wh-{i}"))).await;
            }
        });
        tokio::spawn(async move {
            for i in 4..=6 {
                sweep_side.publish_event(settled(i, &format!("tx-sw-{i}"))).await;
            }
        });

        handler.start_handler().await;
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 6);
        for tx_ref in ["tx-wh-1", "tx-wh-2", "tx-wh-3", "tx-sw-4", "tx-sw-5", "tx-sw-6"] {
            assert!(seen.iter().any(|s| s == tx_ref), "missing settlement for {tx_ref}");
        }
    }
}
