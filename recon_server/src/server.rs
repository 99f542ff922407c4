use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{dev::Server, http::KeepAlive, middleware::Logger, web, App, HttpServer};
use chapa_tools::ChapaApi;
use log::*;
use recon_engine::{
    events::{EventHandlers, EventHooks},
    ReconciliationApi,
    RefundApi,
    SqliteTransactionStore,
};

use crate::{
    config::ServerConfig,
    errors::ServerError,
    middleware::HmacMiddlewareFactory,
    routes::{chapa_webhook, health, initialize_payment, refund_payment, verify_payment},
    sweep_worker::start_sweep_worker,
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let store = SqliteTransactionStore::new_with_url(&config.database_url, 25)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = create_settlement_event_handlers();
    let api = ReconciliationApi::new(store.clone(), handlers.producers());
    handlers.start_handlers().await;
    let _sweep = start_sweep_worker(api.clone(), config.pending_expiry, config.sweep_interval_secs);
    let srv = create_server_instance(config, store, api)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

pub fn create_server_instance(
    config: ServerConfig,
    store: SqliteTransactionStore,
    api: ReconciliationApi<SqliteTransactionStore>,
) -> Result<Server, ServerError> {
    let chapa = ChapaApi::new(config.chapa.clone()).map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let refunds = RefundApi::new(store, api.locks());
    let srv = HttpServer::new(move || {
        let hmac_check = HmacMiddlewareFactory::new(
            "X-Chapa-Signature",
            config.webhook_hmac_secret.clone(),
            config.webhook_hmac_checks,
        );
        let webhook_scope = web::scope("/webhook").wrap(hmac_check).route(
            "/chapa",
            web::post().to(chapa_webhook::<SqliteTransactionStore>),
        );
        App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("hpg::access_log"))
            .app_data(web::Data::new(api.clone()))
            .app_data(web::Data::new(refunds.clone()))
            .app_data(web::Data::new(chapa.clone()))
            .service(health)
            .service(
                web::scope("/payments")
                    .route("/initialize", web::post().to(initialize_payment::<SqliteTransactionStore>))
                    .route("/verify/{tx_ref}", web::get().to(verify_payment::<SqliteTransactionStore>))
                    .route("/{id}/refund", web::post().to(refund_payment::<SqliteTransactionStore>)),
            )
            .service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((config.host.as_str(), config.port))?
    .run();
    Ok(srv)
}

/// Wires up the settlement effect subscribers.
///
/// Dispatch itself is the engine's responsibility (and is exactly-once); what happens on dispatch
/// is configured here. For now the effect is an audit log line; entity-specific effects
/// (activating a subscription, publishing a listing) subscribe in the same way.
fn create_settlement_event_handlers() -> EventHandlers {
    let mut hooks = EventHooks::default();
    hooks.on_settled(|ev| {
        let tx = ev.transaction;
        info!(
            "📬️ Settlement effect for [{}]: {} {} {} for entity {}",
            tx.tx_ref, tx.payment_type, tx.amount, tx.currency, tx.related_entity_id
        );
        Box::pin(async {}) as Pin<Box<dyn Future<Output = ()> + Send>>
    });
    EventHandlers::new(EVENT_BUFFER_SIZE, hooks)
}
