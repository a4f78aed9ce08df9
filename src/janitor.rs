use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::engine::Engine;
use crate::store::Store;

const EVICT_INTERVAL: Duration = Duration::from_secs(60);
const COMPACT_INTERVAL: Duration = Duration::from_secs(30);

/// Background task that drops past days from the availability cache.
pub async fn run_janitor(engine: Arc<Engine>) {
    let mut interval = tokio::time::interval(EVICT_INTERVAL);
    loop {
        interval.tick().await;
        let today = engine.now().date();
        let evicted = engine.evict_days_before(today).await;
        if evicted > 0 {
            debug!("janitor evicted {evicted} past days");
        }
    }
}

/// Background task that rewrites the log once enough appends pile up.
pub async fn run_compactor(store: Arc<dyn Store>, threshold: u64) {
    let mut interval = tokio::time::interval(COMPACT_INTERVAL);
    loop {
        interval.tick().await;
        compact_if_needed(store.as_ref(), threshold).await;
    }
}

/// Returns true if a compaction ran and succeeded.
pub async fn compact_if_needed(store: &dyn Store, threshold: u64) -> bool {
    let appends = store.appends_since_compact().await;
    if appends < threshold {
        return false;
    }
    match store.compact().await {
        Ok(()) => {
            info!("compacted store after {appends} appends");
            true
        }
        Err(e) => {
            warn!("compaction failed: {e}");
            false
        }
    }
}
