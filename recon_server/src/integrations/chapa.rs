//! Glue between the Chapa wire types and the engine's confirmation type.

use chapa_tools::ChapaConfirmation;
use recon_engine::db_types::{Confirmation, ReportedStatus};

use crate::data_objects::WebhookEvent;

/// Build an engine confirmation from a verification poll response.
pub fn confirmation_from_poll(response: &ChapaConfirmation) -> Confirmation {
    let mut conf = Confirmation::new(ReportedStatus::parse(&response.status));
    if let Some(reference) = &response.reference {
        conf = conf.with_gateway_ref(reference.clone());
    }
    conf.with_payload(response.raw.to_string())
}

/// Build an engine confirmation from a webhook event. The raw body is attached verbatim so the
/// stored audit record matches exactly what the processor sent.
pub fn confirmation_from_webhook(event: &WebhookEvent, raw_body: &str) -> Confirmation {
    let mut conf = Confirmation::new(ReportedStatus::parse(&event.status));
    if let Some(reference) = &event.reference {
        conf = conf.with_gateway_ref(reference.clone());
    }
    conf.with_payload(raw_body.to_string())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn poll_conversion_carries_reference_and_payload() {
        let raw = serde_json::json!({"status": "success", "data": {"status": "success", "reference": "CHA-1"}});
        let response = ChapaConfirmation::from_response(raw);
        let conf = confirmation_from_poll(&response);
        assert_eq!(conf.reported, ReportedStatus::Success);
        assert_eq!(conf.gateway_ref.as_deref(), Some("CHA-1"));
        assert!(conf.raw_payload.is_some());
    }

    #[test]
    fn webhook_conversion_preserves_unrecognized_status() {
        let body = r#"{"tx_ref":"tx-1","status":"reversed"}"#;
        let event: crate::data_objects::WebhookEvent = serde_json::from_str(body).unwrap();
        let conf = confirmation_from_webhook(&event, body);
        assert_eq!(conf.reported, ReportedStatus::Unrecognized("reversed".to_string()));
        assert_eq!(conf.raw_payload.as_deref(), Some(body));
    }
}
