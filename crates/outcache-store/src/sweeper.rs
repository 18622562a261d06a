//! Periodic purge of expired entries.

use crate::OutputStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Spawns a task calling [`OutputStore::purge_expired`] every `period`
/// until `shutdown` is cancelled.
pub fn spawn_sweeper(
    store: Arc<dyn OutputStore>,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        info!(
            backend = store.backend(),
            period_secs = period.as_secs(),
            "Output cache sweeper started"
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(backend = store.backend(), "Output cache sweeper shutting down");
                    break;
                }

                _ = ticker.tick() => {
                    match store.purge_expired().await {
                        Ok(0) => {}
                        Ok(purged) => debug!(purged, "Purged expired cache entries"),
                        Err(e) => warn!(error = %e, "Failed to purge expired cache entries"),
                    }
                }
            }
        }
    })
}
