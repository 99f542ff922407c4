use std::env;

use chapa_tools::ChapaConfig;
use chrono::Duration;
use hpg_common::{parse_boolean_flag, Secret};
use log::*;

const DEFAULT_HPG_HOST: &str = "127.0.0.1";
const DEFAULT_HPG_PORT: u16 = 8580;
const DEFAULT_PENDING_EXPIRY: Duration = Duration::hours(2);
const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Shared secret for the `X-Chapa-Signature` header on incoming webhooks.
    pub webhook_hmac_secret: Secret<String>,
    /// If false, webhook signature checks are skipped entirely. Never disable this in production.
    pub webhook_hmac_checks: bool,
    /// The time a transaction may sit in `Pending` with no update before the sweep marks it as
    /// (provisionally) failed.
    pub pending_expiry: Duration,
    /// How often the expiry sweep runs.
    pub sweep_interval_secs: u64,
    /// Chapa processor configuration.
    pub chapa: ChapaConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HPG_HOST.to_string(),
            port: DEFAULT_HPG_PORT,
            database_url: String::default(),
            webhook_hmac_secret: Secret::default(),
            webhook_hmac_checks: true,
            pending_expiry: DEFAULT_PENDING_EXPIRY,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            chapa: ChapaConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("HPG_HOST").ok().unwrap_or_else(|| DEFAULT_HPG_HOST.into());
        let port = env::var("HPG_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for HPG_PORT. {e} Using the default, {DEFAULT_HPG_PORT}, instead."
                    );
                    DEFAULT_HPG_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_HPG_PORT);
        let database_url = env::var("HPG_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ HPG_DATABASE_URL is not set. Please set it to the URL for the HPG database.");
            String::default()
        });
        let webhook_hmac_secret = Secret::new(env::var("HPG_WEBHOOK_HMAC_SECRET").unwrap_or_else(|_| {
            error!(
                "🪛️ HPG_WEBHOOK_HMAC_SECRET is not set. Webhook signatures cannot be verified without it, so every \
                 webhook will be rejected."
            );
            String::default()
        }));
        let webhook_hmac_checks = parse_boolean_flag(env::var("HPG_WEBHOOK_HMAC_CHECKS").ok(), true);
        if !webhook_hmac_checks {
            warn!("🪛️ Webhook HMAC checks are DISABLED. Anyone can forge confirmation events. Testing only!");
        }
        let pending_expiry = configure_pending_expiry();
        let sweep_interval_secs = env::var("HPG_SWEEP_INTERVAL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);
        let chapa = ChapaConfig::new_from_env_or_default();
        Self {
            host,
            port,
            database_url,
            webhook_hmac_secret,
            webhook_hmac_checks,
            pending_expiry,
            sweep_interval_secs,
            chapa,
        }
    }
}

fn configure_pending_expiry() -> Duration {
    env::var("HPG_PENDING_EXPIRY_HOURS")
        .map_err(|_| {
            info!(
                "🪛️ HPG_PENDING_EXPIRY_HOURS is not set. Using the default value of {} hrs.",
                DEFAULT_PENDING_EXPIRY.num_hours()
            )
        })
        .and_then(|s| {
            s.parse::<i64>()
                .map(Duration::hours)
                .map_err(|e| warn!("🪛️ Invalid configuration value for HPG_PENDING_EXPIRY_HOURS. {e}"))
        })
        .ok()
        .unwrap_or(DEFAULT_PENDING_EXPIRY)
}
