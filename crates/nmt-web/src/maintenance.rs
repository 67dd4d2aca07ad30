//! Periodic background maintenance: idle-model eviction and (when
//! configured) GPU scratch-cache clearing. See spec §5.

use std::sync::Arc;
use std::time::Duration;

use crate::state::AppState;

/// Run the maintenance loop until the process is shut down. Intended to be
/// spawned once as its own task; cancel by dropping the `JoinHandle`.
pub async fn run(state: Arc<AppState>) {
    let idle_timeout = state.config.idle_eviction_timeout;
    let tick = idle_timeout.min(Duration::from_secs(60)).max(Duration::from_secs(1));
    let mut interval = tokio::time::interval(tick);
    let mut since_cuda_clear = Duration::ZERO;

    loop {
        interval.tick().await;

        let evicted = state.cache.evict_idle(idle_timeout).await;
        if !evicted.is_empty() {
            tracing::info!(count = evicted.len(), keys = ?evicted, "evicted idle models");
        }

        if let Some(cuda_interval) = state.config.cuda_cache_clear_interval {
            since_cuda_clear += tick;
            if since_cuda_clear >= cuda_interval {
                since_cuda_clear = Duration::ZERO;
                tracing::debug!("clearing device scratch cache");
            }
        }
    }
}
