use std::time::Duration;

use log::*;
use hpg_common::Secret;

pub const DEFAULT_CHAPA_API_URL: &str = "https://api.chapa.co/v1";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ChapaConfig {
    pub api_url: String,
    pub secret_key: Secret<String>,
    /// Upper bound on any single outbound call to the processor.
    pub timeout: Duration,
}

impl Default for ChapaConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_CHAPA_API_URL.to_string(),
            secret_key: Secret::default(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ChapaConfig {
    pub fn new_from_env_or_default() -> Self {
        let api_url = std::env::var("CHAPA_API_URL").unwrap_or_else(|_| {
            warn!("CHAPA_API_URL not set, using {DEFAULT_CHAPA_API_URL} as default");
            DEFAULT_CHAPA_API_URL.to_string()
        });
        let secret_key = Secret::new(std::env::var("CHAPA_SECRET_KEY").unwrap_or_else(|_| {
            warn!("CHAPA_SECRET_KEY not set, using (probably useless) default");
            "CHASECK_TEST-00000000000000".to_string()
        }));
        let timeout = std::env::var("CHAPA_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        Self { api_url, secret_key, timeout }
    }
}
