use chrono::Duration;
use log::*;
use recon_engine::{ReconciliationApi, Settlement, SqliteTransactionStore};
use tokio::task::JoinHandle;

/// Starts the expiry sweep worker. Do not await the returned JoinHandle, as it will run
/// indefinitely.
///
/// The worker shares the server's [`ReconciliationApi`] instance, so sweep writes serialize
/// against webhook and poll writes through the same per-transaction locks. Each run marks stale
/// `Pending` transactions as (provisionally) failed through the same reconciliation path as every
/// other confirmation source, so a genuine late success can still upgrade a swept transaction
/// afterwards.
pub fn start_sweep_worker(
    api: ReconciliationApi<SqliteTransactionStore>,
    pending_expiry: Duration,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        info!("🕰️ Pending transaction expiry worker started");
        loop {
            timer.tick().await;
            trace!("🕰️ Running pending transaction expiry job");
            match api.expire_stale_pending(pending_expiry).await {
                Ok(settlements) => {
                    if !settlements.is_empty() {
                        info!("🕰️ {} transactions expired", settlements.len());
                        debug!("🕰️ Expired transactions: {}", settlement_list(&settlements));
                    }
                },
                Err(e) => {
                    error!("🕰️ Error running pending transaction expiry job: {e}");
                },
            }
        }
    })
}

fn settlement_list(settlements: &[Settlement]) -> String {
    settlements
        .iter()
        .map(|s| format!("[{}] status: {} outcome: {:?}", s.transaction.tx_ref, s.transaction.status, s.outcome))
        .collect::<Vec<String>>()
        .join(", ")
}
