//! TTL-bounded snapshot of the full outlet list.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use super::model::Outlet;
use super::store::OutletStore;
use crate::core::errors::ApiError;

struct Snapshot {
    outlets: Arc<Vec<Outlet>>,
    refreshed_at: Instant,
}

/// Caches `select_all` for at most `ttl`; a stale read refreshes from the store.
///
/// The lock is held across the refresh so concurrent readers of a stale
/// snapshot trigger a single store query.
pub struct OutletCache {
    store: Arc<dyn OutletStore>,
    ttl: Duration,
    snapshot: Mutex<Option<Snapshot>>,
}

impl OutletCache {
    pub fn new(store: Arc<dyn OutletStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            snapshot: Mutex::new(None),
        }
    }

    pub async fn outlets(&self) -> Result<Arc<Vec<Outlet>>, ApiError> {
        let mut guard = self.snapshot.lock().await;

        if let Some(snapshot) = guard.as_ref() {
            if snapshot.refreshed_at.elapsed() < self.ttl {
                return Ok(snapshot.outlets.clone());
            }
        }

        let outlets = Arc::new(self.store.select_all().await?);
        tracing::info!("Fetched {} outlets from the store", outlets.len());
        *guard = Some(Snapshot {
            outlets: outlets.clone(),
            refreshed_at: Instant::now(),
        });
        Ok(outlets)
    }
}
