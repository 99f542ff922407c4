use std::fmt::Display;

use hpg_common::{Currency, Money};
use recon_engine::db_types::{PaymentType, Transaction};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

/// Body of a `POST /payments/initialize` request.
///
/// The caller supplies the `tx_ref`. It is the idempotency key for the whole lifecycle of the
/// payment, so it has to be minted by the system that knows whether it is retrying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeParams {
    pub tx_ref: String,
    /// Amount in minor units (santim / cents).
    pub amount: Money,
    pub currency: Currency,
    pub payment_type: PaymentType,
    pub related_entity_id: String,
    #[serde(default)]
    pub return_url: Option<String>,
    #[serde(default)]
    pub callback_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeResponse {
    pub transaction: Transaction,
    pub checkout_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundParams {
    #[serde(default)]
    pub reason: Option<String>,
}

/// The webhook event body Chapa posts to us. Only the fields the reconciliation needs are typed;
/// the raw body is persisted separately for audit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub tx_ref: String,
    pub status: String,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub event: Option<String>,
}
