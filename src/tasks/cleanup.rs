//! TTL Cleanup Task
//!
//! Background task that periodically removes expired cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::TtlCache;

/// Used when a zero interval is requested
pub const FALLBACK_INTERVAL: Duration = Duration::from_secs(1);

/// Spawns a background task that periodically sweeps expired cache entries.
///
/// The sweep takes the cache's write lock, so it never interleaves with a
/// `get` or `set`. Abort the returned handle during shutdown.
///
/// # Example
/// ```ignore
/// let handle = spawn_cleanup_task(cache.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// handle.abort();
/// ```
pub fn spawn_cleanup_task(cache: TtlCache, interval: Duration) -> JoinHandle<()> {
    let interval = if interval.is_zero() {
        warn!("zero cleanup interval, falling back to {:?}", FALLBACK_INTERVAL);
        FALLBACK_INTERVAL
    } else {
        interval
    };

    tokio::spawn(async move {
        info!(interval_secs = interval.as_secs_f64(), "starting TTL cleanup task");

        let mut ticker = tokio::time::interval(interval);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let removed = cache.cleanup_expired().await;
            if removed > 0 {
                info!(removed, "TTL cleanup removed expired entries");
            } else {
                debug!("TTL cleanup found no expired entries");
            }
        }
    })
}
