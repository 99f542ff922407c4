//! Request handler definitions
//!
//! Define each route and its handler here.
//! Handlers that are more than a line or two MUST go into a separate module. Keep this module neat and tidy 🙏
//!
//! Handlers are generic over the storage backend, and are registered against the concrete backend
//! in [`crate::server::create_server_instance`].

use actix_web::{get, web, HttpResponse, Responder};
use chapa_tools::{helpers::format_chapa_amount, ChapaApi, InitializeRequest};
use log::*;
use recon_engine::{
    db_types::{Confirmation, ConfirmationSource, NewTransaction, PaymentStatus, ReportedStatus, TxRef},
    ReconciliationApi,
    ReconciliationError,
    RefundApi,
    TransactionStore,
};

use crate::{
    data_objects::{InitializeParams, InitializeResponse, JsonResponse, RefundParams, WebhookEvent},
    errors::ServerError,
    integrations::chapa::{confirmation_from_poll, confirmation_from_webhook},
};

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

// --------------------------------------------   Initialize  --------------------------------------------------

/// Route handler for `POST /payments/initialize`.
///
/// Creates a `Pending` transaction under the caller-supplied `tx_ref` and opens a hosted checkout
/// session with the processor. The transaction record is created *before* the processor call, so
/// that a confirmation arriving for it always has a record to reconcile against. If the processor
/// rejects the session, the record is marked failed and the caller gets a 502.
pub async fn initialize_payment<B: TransactionStore>(
    body: web::Json<InitializeParams>,
    api: web::Data<ReconciliationApi<B>>,
    chapa: web::Data<ChapaApi>,
) -> Result<HttpResponse, ServerError> {
    let params = body.into_inner();
    trace!("💻️ Received initialize request for [{}]", params.tx_ref);
    if !params.amount.is_positive() {
        return Err(ServerError::InvalidRequestBody(format!(
            "Amount must be a positive number of minor units. Got {}.",
            params.amount
        )));
    }
    let new_tx =
        NewTransaction::new(TxRef::from(params.tx_ref.clone()), params.amount, params.currency, params.payment_type)
            .for_entity(params.related_entity_id.clone());
    let tx = api.create_transaction(new_tx).await?;
    let request = InitializeRequest {
        tx_ref: params.tx_ref.clone(),
        amount: format_chapa_amount(params.amount),
        currency: params.currency.code().to_string(),
        return_url: params.return_url,
        callback_url: params.callback_url,
    };
    match chapa.initialize(&request).await {
        Ok(session) => {
            info!("💻️ Checkout session opened for [{}]", tx.tx_ref);
            Ok(HttpResponse::Ok().json(InitializeResponse { transaction: tx, checkout_url: session.checkout_url }))
        },
        Err(e) => {
            warn!("💻️ Could not open a checkout session for [{}]. {e}", tx.tx_ref);
            let conf = Confirmation::new(ReportedStatus::Failed);
            if let Err(e) = api.apply_confirmation(&tx.tx_ref, conf, ConfirmationSource::Initialize).await {
                error!("💻️ Could not mark [{}] as failed after a checkout error. {e}", tx.tx_ref);
            }
            Err(e.into())
        },
    }
}

// ----------------------------------------------   Verify  ----------------------------------------------------

/// Route handler for `GET /payments/verify/{tx_ref}`.
///
/// Polls the processor for the current status of the transaction and reconciles the answer
/// against the stored record. `Success` and `Refunded` records are returned straight from
/// storage; they are sticky, so there is nothing a poll could change.
pub async fn verify_payment<B: TransactionStore>(
    path: web::Path<String>,
    api: web::Data<ReconciliationApi<B>>,
    chapa: web::Data<ChapaApi>,
) -> Result<HttpResponse, ServerError> {
    let tx_ref = TxRef::from(path.into_inner());
    trace!("💻️ Received verify request for [{tx_ref}]");
    let stored = api
        .fetch_transaction(&tx_ref)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("tx_ref [{tx_ref}]")))?;
    if matches!(stored.status, PaymentStatus::Success | PaymentStatus::Refunded) {
        debug!("💻️ [{tx_ref}] is {}. Skipping the processor poll.", stored.status);
        return Ok(HttpResponse::Ok().json(stored));
    }
    let response = chapa.verify(tx_ref.as_str()).await?;
    let conf = confirmation_from_poll(&response);
    let settlement = api.apply_confirmation(&tx_ref, conf, ConfirmationSource::Poll).await?;
    Ok(HttpResponse::Ok().json(settlement.transaction))
}

// ----------------------------------------------   Webhook  ---------------------------------------------------

/// Route handler for `POST /webhook/chapa`.
///
/// The HMAC middleware has already verified the signature by the time this handler runs.
/// Webhook responses must be 200 for every outcome the processor cannot fix by retrying,
/// otherwise Chapa keeps redelivering. Storage errors return a 500 so that the redelivery
/// eventually lands.
pub async fn chapa_webhook<B: TransactionStore>(
    body: web::Bytes,
    api: web::Data<ReconciliationApi<B>>,
) -> HttpResponse {
    trace!("📨️ Received webhook event");
    // The payload is stored verbatim for audit, so a body that is not valid UTF-8 is rejected
    // outright rather than stored with replacement characters.
    let raw_body = match std::str::from_utf8(&body) {
        Ok(s) => s.to_string(),
        Err(e) => {
            warn!("📨️ Webhook body is not valid UTF-8. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Webhook body must be UTF-8."));
        },
    };
    let event: WebhookEvent = match serde_json::from_str(&raw_body) {
        Ok(ev) => ev,
        Err(e) => {
            warn!("📨️ Could not parse webhook body. {e}");
            return HttpResponse::Ok().json(JsonResponse::failure("Could not parse webhook body."));
        },
    };
    let tx_ref = TxRef::from(event.tx_ref.clone());
    let conf = confirmation_from_webhook(&event, &raw_body);
    match api.apply_confirmation(&tx_ref, conf, ConfirmationSource::Webhook).await {
        Ok(settlement) => {
            debug!("📨️ Webhook for [{tx_ref}] reconciled: {:?}", settlement.outcome);
            HttpResponse::Ok().json(JsonResponse::success("Event processed."))
        },
        Err(ReconciliationError::UnknownTransaction(tx_ref)) => {
            if let Err(e) = api.record_webhook_anomaly(&tx_ref, Some(&raw_body)).await {
                error!("📨️ Could not record webhook anomaly for [{tx_ref}]. {e}");
                return HttpResponse::InternalServerError()
                    .json(JsonResponse::failure("Error recording webhook anomaly."));
            }
            // Acknowledge, or the processor will redeliver an event we can never use
            HttpResponse::Ok().json(JsonResponse::success("Unknown transaction reference. Recorded."))
        },
        Err(e) => {
            error!("📨️ Error processing webhook for [{tx_ref}]. {e}");
            HttpResponse::InternalServerError().json(JsonResponse::failure("Error processing event."))
        },
    }
}

// ----------------------------------------------   Refund  ----------------------------------------------------

/// Route handler for `POST /payments/{id}/refund`.
///
/// Refunds run in two phases: a legality check (only settled `Success` transactions are
/// refundable), then the processor call, then the local commit. The processor call happens
/// outside any lock. Refunding an already-refunded transaction is acknowledged without calling
/// the processor again.
pub async fn refund_payment<B: TransactionStore>(
    path: web::Path<i64>,
    body: web::Json<RefundParams>,
    refunds: web::Data<RefundApi<B>>,
    chapa: web::Data<ChapaApi>,
) -> Result<HttpResponse, ServerError> {
    let id = path.into_inner();
    let reason = body.into_inner().reason;
    trace!("💻️ Received refund request for transaction #{id}");
    let tx = refunds.fetch_refundable(id).await?;
    if tx.status == PaymentStatus::Refunded {
        debug!("💻️ Transaction #{id} is already refunded. Acknowledging.");
        return Ok(HttpResponse::Ok().json(tx));
    }
    chapa
        .refund(tx.tx_ref.as_str(), reason.as_deref().unwrap_or("Refund requested"))
        .await
        .map_err(|e| ServerError::RefundFailed(e.to_string()))?;
    let tx = refunds.commit_refund(id, reason.as_deref()).await?;
    info!("💻️ Transaction #{id} [{}] refunded.", tx.tx_ref);
    Ok(HttpResponse::Ok().json(tx))
}
