use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{EventHandler, EventProducer, Handler, TransactionSettledEvent};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub settled_producer: Vec<EventProducer<TransactionSettledEvent>>,
}

pub struct EventHandlers {
    pub on_settled: Option<EventHandler<TransactionSettledEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_settled = hooks.on_settled.map(|f| EventHandler::new(buffer_size, f));
        Self { on_settled }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_settled {
            result.settled_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_settled {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_settled: Option<Handler<TransactionSettledEvent>>,
}

impl EventHooks {
    pub fn on_settled<F>(&mut self, f: F) -> &mut Self
    // Arc<dyn Fn(E) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>
    where F: (Fn(TransactionSettledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_settled = Some(Arc::new(f));
        self
    }
}
