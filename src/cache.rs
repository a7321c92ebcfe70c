// Read-through TTL cache for single-entity lookups. Process-local; TTL
// bounds staleness rather than any cross-process consistency.

use moka::future::Cache;
use std::time::Duration;

#[derive(Clone)]
pub struct TtlCache<T: Clone + Send + Sync + 'static> {
    inner: Cache<i64, T>,
}

impl<T: Clone + Send + Sync + 'static> TtlCache<T> {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
        }
    }

    pub async fn get(&self, id: i64) -> Option<T> {
        self.inner.get(&id).await
    }

    /// Insert or overwrite; an overwrite restarts the TTL.
    pub async fn insert(&self, id: i64, value: T) {
        self.inner.insert(id, value).await;
    }

    pub async fn invalidate(&self, id: i64) {
        self.inner.invalidate(&id).await;
    }
}
