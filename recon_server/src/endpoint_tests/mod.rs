//! Endpoint tests against an in-process server with a throwaway sqlite database.
//!
//! None of these tests reach the network: the Chapa base URL points at a closed local port, and
//! every request either never gets as far as the processor call, or asserts how the server
//! behaves when the processor is unreachable.

use std::time::Duration;

use actix_web::{http::StatusCode, test, test::TestRequest, web, App};
use chapa_tools::{ChapaApi, ChapaConfig};
use hpg_common::Secret;
use recon_engine::{
    db_types::{Confirmation, ConfirmationSource, PaymentStatus, ReportedStatus, TxRef},
    events::EventProducers,
    ReconciliationApi,
    RefundApi,
    SqliteTransactionStore,
    TransactionStore,
};
use sqlx::{migrate, migrate::MigrateDatabase, Sqlite};

use crate::{
    data_objects::JsonResponse,
    helpers::calculate_hmac,
    middleware::HmacMiddlewareFactory,
    routes::{chapa_webhook, health, initialize_payment, refund_payment, verify_payment},
};

const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

async fn setup_store() -> SqliteTransactionStore {
    let _ = env_logger::try_init();
    let path = std::env::temp_dir().join(format!("hpg_endpoint_test_{}.db", rand::random::<u64>()));
    let url = format!("sqlite://{}", path.display());
    let _ = Sqlite::drop_database(&url).await;
    Sqlite::create_database(&url).await.expect("Error creating database");
    let store = SqliteTransactionStore::new_with_url(&url, 5).await.expect("Error connecting to database");
    migrate!("../recon_engine/src/sqlite/migrations").run(store.pool()).await.expect("Error running DB migrations");
    store
}

async fn tear_down(mut store: SqliteTransactionStore) {
    let url = store.url().to_string();
    let _ = store.close().await;
    let _ = Sqlite::drop_database(&url).await;
}

/// A Chapa client pointed at a closed port, for request paths that must not reach the processor
/// (or that assert the unreachable-processor behavior).
fn offline_chapa() -> ChapaApi {
    let config = ChapaConfig {
        api_url: "http://127.0.0.1:1".to_string(),
        secret_key: Secret::new("CHASECK_TEST-endpoint".to_string()),
        timeout: Duration::from_secs(2),
    };
    ChapaApi::new(config).expect("Error creating Chapa client")
}

macro_rules! test_app {
    ($store:expr) => {{
        let api = ReconciliationApi::new($store.clone(), EventProducers::default());
        let refunds = RefundApi::new($store.clone(), api.locks());
        let hmac_check =
            HmacMiddlewareFactory::new("X-Chapa-Signature", Secret::new(WEBHOOK_SECRET.to_string()), true);
        test::init_service(
            App::new()
                .app_data(web::Data::new(api))
                .app_data(web::Data::new(refunds))
                .app_data(web::Data::new(offline_chapa()))
                .service(health)
                .service(
                    web::scope("/payments")
                        .route("/initialize", web::post().to(initialize_payment::<SqliteTransactionStore>))
                        .route("/verify/{tx_ref}", web::get().to(verify_payment::<SqliteTransactionStore>))
                        .route("/{id}/refund", web::post().to(refund_payment::<SqliteTransactionStore>)),
                )
                .service(
                    web::scope("/webhook")
                        .wrap(hmac_check)
                        .route("/chapa", web::post().to(chapa_webhook::<SqliteTransactionStore>)),
                ),
        )
        .await
    }};
}

fn initialize_body(tx_ref: &str, amount: i64) -> serde_json::Value {
    serde_json::json!({
        "tx_ref": tx_ref,
        "amount": amount,
        "currency": "ETB",
        "payment_type": "subscription",
        "related_entity_id": "user-1"
    })
}

async fn create_pending(store: &SqliteTransactionStore, tx_ref: &str) -> recon_engine::db_types::Transaction {
    let api = ReconciliationApi::new(store.clone(), EventProducers::default());
    let new_tx = recon_engine::db_types::NewTransaction::new(
        TxRef::from(tx_ref.to_string()),
        hpg_common::Money::from_major(500),
        hpg_common::Currency::Etb,
        recon_engine::db_types::PaymentType::Subscription,
    )
    .for_entity("user-1");
    api.create_transaction(new_tx).await.expect("Error creating transaction")
}

#[actix_web::test]
async fn health_check() {
    let store = setup_store().await;
    let app = test_app!(store);
    let req = TestRequest::get().uri("/health").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    tear_down(store).await;
}

#[actix_web::test]
async fn initialize_rejects_non_positive_amount() {
    let store = setup_store().await;
    let app = test_app!(store);
    let req = TestRequest::post().uri("/payments/initialize").set_json(initialize_body("tx-e1", 0)).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    tear_down(store).await;
}

#[actix_web::test]
async fn initialize_with_unreachable_processor_fails_the_transaction() {
    let store = setup_store().await;
    let app = test_app!(store);
    let req = TestRequest::post().uri("/payments/initialize").set_json(initialize_body("tx-e2", 50_000)).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let stored = store.fetch_by_ref(&TxRef::from("tx-e2".to_string())).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Failed);

    // the reference is burned; a retry must mint a fresh one
    let req = TestRequest::post().uri("/payments/initialize").set_json(initialize_body("tx-e2", 50_000)).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::CONFLICT);
    tear_down(store).await;
}

#[actix_web::test]
async fn webhook_without_signature_is_rejected() {
    let store = setup_store().await;
    let app = test_app!(store);
    let body = r#"{"tx_ref":"tx-e3","status":"success"}"#;
    let req = TestRequest::post().uri("/webhook/chapa").set_payload(body).to_request();
    // middleware rejections surface as service errors rather than responses
    match test::try_call_service(&app, req).await {
        Ok(res) => assert_eq!(res.status(), StatusCode::UNAUTHORIZED),
        Err(e) => assert_eq!(e.error_response().status(), StatusCode::UNAUTHORIZED),
    }
    tear_down(store).await;
}

#[actix_web::test]
async fn webhook_with_bad_signature_is_rejected() {
    let store = setup_store().await;
    let app = test_app!(store);
    let body = r#"{"tx_ref":"tx-e4","status":"success"}"#;
    let req = TestRequest::post()
        .uri("/webhook/chapa")
        .insert_header(("X-Chapa-Signature", calculate_hmac("wrong-secret", body.as_bytes())))
        .set_payload(body)
        .to_request();
    match test::try_call_service(&app, req).await {
        Ok(res) => assert_eq!(res.status(), StatusCode::UNAUTHORIZED),
        Err(e) => assert_eq!(e.error_response().status(), StatusCode::UNAUTHORIZED),
    }
    tear_down(store).await;
}

#[actix_web::test]
async fn signed_webhook_settles_the_transaction() {
    let store = setup_store().await;
    let tx = create_pending(&store, "tx-e5").await;
    let app = test_app!(store);
    let body = r#"{"tx_ref":"tx-e5","status":"success","reference":"CHA-e5"}"#;
    let req = TestRequest::post()
        .uri("/webhook/chapa")
        .insert_header(("X-Chapa-Signature", calculate_hmac(WEBHOOK_SECRET, body.as_bytes())))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let stored = store.fetch_by_ref(&tx.tx_ref).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Success);
    assert!(stored.effects_fired);
    assert_eq!(stored.gateway_ref.as_deref(), Some("CHA-e5"));
    tear_down(store).await;
}

#[actix_web::test]
async fn webhook_for_unknown_reference_is_acknowledged() {
    let store = setup_store().await;
    let app = test_app!(store);
    let body = r#"{"tx_ref":"tx-no-such","status":"success"}"#;
    let req = TestRequest::post()
        .uri("/webhook/chapa")
        .insert_header(("X-Chapa-Signature", calculate_hmac(WEBHOOK_SECRET, body.as_bytes())))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let response: JsonResponse = test::read_body_json(res).await;
    assert!(response.success);
    tear_down(store).await;
}

#[actix_web::test]
async fn webhook_with_non_utf8_body_is_acknowledged_without_state_change() {
    let store = setup_store().await;
    let tx = create_pending(&store, "tx-e9").await;
    let app = test_app!(store);
    // a correctly signed body that is not valid UTF-8 must not be stored mangled
    let body: Vec<u8> = vec![0x7b, 0xff, 0xfe, 0x7d];
    let req = TestRequest::post()
        .uri("/webhook/chapa")
        .insert_header(("X-Chapa-Signature", calculate_hmac(WEBHOOK_SECRET, &body)))
        .set_payload(body)
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let response: JsonResponse = test::read_body_json(res).await;
    assert!(!response.success);
    let stored = store.fetch_by_ref(&tx.tx_ref).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Pending);
    assert!(stored.raw_gateway_payload.is_none());
    tear_down(store).await;
}

#[actix_web::test]
async fn verify_serves_sticky_statuses_from_storage() {
    let store = setup_store().await;
    let tx = create_pending(&store, "tx-e6").await;
    let api = ReconciliationApi::new(store.clone(), EventProducers::default());
    api.apply_confirmation(&tx.tx_ref, Confirmation::new(ReportedStatus::Success), ConfirmationSource::Webhook)
        .await
        .unwrap();
    let app = test_app!(store);
    // the processor is unreachable, so a 200 proves no poll was attempted
    let req = TestRequest::get().uri("/payments/verify/tx-e6").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body: recon_engine::db_types::Transaction = test::read_body_json(res).await;
    assert_eq!(body.status, PaymentStatus::Success);
    tear_down(store).await;
}

#[actix_web::test]
async fn verify_unknown_reference_is_not_found() {
    let store = setup_store().await;
    let app = test_app!(store);
    let req = TestRequest::get().uri("/payments/verify/tx-missing").to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    tear_down(store).await;
}

#[actix_web::test]
async fn refund_of_pending_transaction_is_rejected() {
    let store = setup_store().await;
    let tx = create_pending(&store, "tx-e7").await;
    let app = test_app!(store);
    let req = TestRequest::post()
        .uri(&format!("/payments/{}/refund", tx.id))
        .set_json(serde_json::json!({"reason": "testing"}))
        .to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    tear_down(store).await;
}

#[actix_web::test]
async fn refund_with_unreachable_processor_leaves_the_record_settled() {
    let store = setup_store().await;
    let tx = create_pending(&store, "tx-e8").await;
    let api = ReconciliationApi::new(store.clone(), EventProducers::default());
    api.apply_confirmation(&tx.tx_ref, Confirmation::new(ReportedStatus::Success), ConfirmationSource::Webhook)
        .await
        .unwrap();
    let app = test_app!(store);
    let req = TestRequest::post().uri(&format!("/payments/{}/refund", tx.id)).set_json(serde_json::json!({})).to_request();
    let res = test::call_service(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_GATEWAY);
    let stored = store.fetch_by_ref(&tx.tx_ref).await.unwrap().unwrap();
    assert_eq!(stored.status, PaymentStatus::Success);
    tear_down(store).await;
}
