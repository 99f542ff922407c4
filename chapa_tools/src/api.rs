use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::{data_objects::ChapaConfirmation, ChapaApiError, ChapaConfig, CheckoutSession, InitializeRequest};

#[derive(Clone)]
pub struct ChapaApi {
    config: ChapaConfig,
    client: Arc<Client>,
}

impl ChapaApi {
    pub fn new(config: ChapaConfig) -> Result<Self, ChapaApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let bearer = format!("Bearer {}", config.secret_key.reveal());
        let val = HeaderValue::from_str(&bearer).map_err(|e| ChapaApiError::Initialization(e.to_string()))?;
        headers.insert(AUTHORIZATION, val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()
            .map_err(|e| ChapaApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, ChapaApiError> {
        let url = self.url(path);
        trace!("💳️ Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ChapaApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳️ REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ChapaApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ChapaApiError::ResponseError(e.to_string()))?;
            Err(ChapaApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.api_url)
    }

    /// Create a hosted checkout session for a new payment attempt.
    pub async fn initialize(&self, request: &InitializeRequest) -> Result<CheckoutSession, ChapaApiError> {
        #[derive(Deserialize)]
        struct InitData {
            checkout_url: String,
        }
        #[derive(Deserialize)]
        struct InitResponse {
            data: Option<InitData>,
        }
        debug!("💳️ Initializing checkout for [{}]", request.tx_ref);
        let result = self.rest_query::<InitResponse, _>(Method::POST, "/transaction/initialize", Some(request)).await?;
        let data =
            result.data.ok_or_else(|| ChapaApiError::ResponseError("initialize response had no data".to_string()))?;
        info!("💳️ Checkout session created for [{}]", request.tx_ref);
        Ok(CheckoutSession { checkout_url: data.checkout_url })
    }

    /// Query the processor for the current status of a payment attempt.
    pub async fn verify(&self, tx_ref: &str) -> Result<ChapaConfirmation, ChapaApiError> {
        let path = format!("/transaction/verify/{tx_ref}");
        debug!("💳️ Verifying transaction [{tx_ref}]");
        let body = self.rest_query::<Value, ()>(Method::GET, &path, None).await?;
        let confirmation = ChapaConfirmation::from_response(body);
        debug!("💳️ Processor reports [{tx_ref}] as '{}'", confirmation.status);
        Ok(confirmation)
    }

    /// Request a refund for a settled transaction.
    pub async fn refund(&self, tx_ref: &str, reason: &str) -> Result<(), ChapaApiError> {
        let path = format!("/refund/{tx_ref}");
        debug!("💳️ Requesting refund for [{tx_ref}]");
        let body = serde_json::json!({ "reason": reason });
        let _ = self.rest_query::<Value, Value>(Method::POST, &path, Some(body)).await?;
        info!("💳️ Refund accepted by processor for [{tx_ref}]");
        Ok(())
    }
}
