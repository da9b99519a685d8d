//! Background maintenance for the token store.
//!
//! Expired refresh records disappear lazily on access, but records for
//! users who never come back, and blacklist entries past their token's
//! expiry, need a periodic sweep so the maps do not grow without bound.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::store::TokenStore;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

/// Purge expired entries from the token store.
pub fn run_cleanup(store: &TokenStore) {
    let (refresh, blacklist) = store.purge_expired();
    if refresh > 0 || blacklist > 0 {
        info!(refresh, blacklist, "Purged expired token records");
    }
}

/// Spawn an hourly cleanup task.
pub fn spawn_cleanup_scheduler(store: Arc<TokenStore>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        // The first tick fires immediately; startup already ran a sweep.
        interval.tick().await;
        loop {
            interval.tick().await;
            run_cleanup(&store);
        }
    })
}
