use std::time::Duration;

use tracing::{info, warn};

use crate::state::AppState;

/// Periodic background work: the full Strapi sync and one category
/// normalization batch per tick.
pub struct SyncScheduler {
    state: AppState,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(state: AppState, interval: Duration) -> Self {
        Self { state, interval }
    }

    pub async fn start(self) {
        info!("Starting auto-sync scheduler (interval: {:?})", self.interval);

        loop {
            tokio::time::sleep(self.interval).await;
            self.run_tick().await;
        }
    }

    /// Failures are logged and the loop keeps going.
    pub async fn run_tick(&self) {
        match self.state.strapi_sync().sync_all().await {
            Ok(stats) if stats.locked => info!("Auto-sync skipped, another Strapi sync is running"),
            Ok(stats) => info!(
                "Auto-sync completed - created: {}, updated: {}, skipped: {}",
                stats.created, stats.updated, stats.skipped
            ),
            Err(e) => warn!("Auto-sync failed: {:?}", e),
        }

        if let Some(normalizer) = self.state.category_normalizer() {
            if let Err(e) = normalizer.run_batch().await {
                warn!("Category normalization batch failed: {:?}", e);
            }
        }
    }
}
