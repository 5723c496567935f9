use std::time::Duration;

use super::PgStore;

/// Periodically drop client state that no profile has touched within the retention period.
pub fn spawn_eviction(store: PgStore, retention_days: i64) {
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(3600));
        loop {
            interval.tick().await;
            match store.evict_older_than(retention_days).await {
                Ok(0) => {}
                Ok(n) => log::info!("Evicted {n} stale client state row(s)"),
                Err(e) => log::error!("Client state eviction failed: {e}"),
            }
        }
    });
}
