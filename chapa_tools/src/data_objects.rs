use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Body of a `POST /transaction/initialize` call.
///
/// Chapa expects the amount as a decimal string in major units; use
/// [`crate::helpers::format_chapa_amount`] to build it from a [`hpg_common::Money`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitializeRequest {
    pub tx_ref: String,
    pub amount: String,
    pub currency: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
}

/// The hosted checkout session returned by a successful initialize call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    pub checkout_url: String,
}

/// Result of a `GET /transaction/verify/{tx_ref}` call.
///
/// Only the status string and the processor's own reference are extracted; the full response body
/// is carried along verbatim so that callers can persist it for audit.
#[derive(Debug, Clone)]
pub struct ChapaConfirmation {
    pub status: String,
    pub reference: Option<String>,
    pub raw: Value,
}

impl ChapaConfirmation {
    /// Pull the fields of interest out of a (loosely shaped) Chapa response envelope.
    /// The per-transaction status lives at `data.status`; the envelope-level `status` field only
    /// reports whether the API call itself succeeded, so it is used as a fallback.
    pub fn from_response(raw: Value) -> Self {
        let status = raw["data"]["status"]
            .as_str()
            .or_else(|| raw["status"].as_str())
            .unwrap_or("unknown")
            .to_string();
        let reference = raw["data"]["reference"].as_str().map(String::from);
        Self { status, reference, raw }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn confirmation_extracts_inner_status() {
        let body = serde_json::json!({
            "status": "success",
            "message": "Payment details",
            "data": { "status": "failed", "reference": "APxxxxxxxxxx", "amount": "500.00" }
        });
        let conf = ChapaConfirmation::from_response(body);
        assert_eq!(conf.status, "failed");
        assert_eq!(conf.reference.as_deref(), Some("APxxxxxxxxxx"));
        assert_eq!(conf.raw["data"]["amount"], "500.00");
    }

    #[test]
    fn confirmation_falls_back_to_envelope_status() {
        let conf = ChapaConfirmation::from_response(serde_json::json!({ "status": "success" }));
        assert_eq!(conf.status, "success");
        assert!(conf.reference.is_none());
    }
}
