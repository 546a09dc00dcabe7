//! Periodic reindex sweep.
//!
//! In-line indexing after a write gives up after a few attempts. This job
//! picks up whatever was left behind: live records whose search document is
//! missing or older than the record, and deleted records whose document
//! still exists.

use std::sync::Arc;

use mysite_db::store::RecordStore;
use tokio_util::sync::CancellationToken;

use crate::config::ServerConfig;

/// Records handled per tick.
const SWEEP_BATCH_SIZE: i64 = 100;

/// Run the reindex loop until `cancel` is triggered.
pub async fn run(store: RecordStore, config: Arc<ServerConfig>, cancel: CancellationToken) {
    let period = config.site.store.reindex_interval;
    tracing::info!(interval_secs = period.as_secs(), "Reindex sweep started");

    let mut interval = tokio::time::interval(period);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reindex sweep stopping");
                break;
            }
            _ = interval.tick() => {
                match store.reindex_stale(&config.site, SWEEP_BATCH_SIZE).await {
                    Ok(0) => tracing::debug!("Reindex sweep: nothing stale"),
                    Ok(fixed) => tracing::info!(fixed, "Reindex sweep: documents refreshed"),
                    Err(e) => tracing::error!(error = %e, "Reindex sweep failed"),
                }
            }
        }
    }
}
