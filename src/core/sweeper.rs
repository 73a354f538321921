//! Background reclamation of expired idempotency records
//!
//! Lookups already treat expired records as absent; the sweeper only bounds
//! memory held by keys nobody asks about again.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::traits::LedgerStore;

/// Spawn a task sweeping `store` every `interval` until `shutdown` fires
pub fn spawn_idempotency_sweeper<S: LedgerStore>(
    store: Arc<S>,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Idempotency sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match store.sweep_expired(Utc::now()).await {
                        Ok(0) => {}
                        Ok(removed) => debug!(removed, "Reclaimed expired idempotency records"),
                        Err(err) => warn!(error = %err, "Idempotency sweep failed"),
                    }
                }
            }
        }
    })
}
