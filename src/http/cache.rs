//! Response cache for idempotent reads.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::http::response::Payload;
use crate::observability::metrics;
use crate::platform::Clock;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Payload,
    pub expires_at_ms: u64,
}

/// A thread-safe endpoint → payload cache. Entries expire lazily on lookup.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<DashMap<String, CacheEntry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
            clock,
            ttl,
        }
    }

    /// Live payload for `key`, if any. An expired entry is removed.
    pub fn get(&self, key: &str) -> Option<Payload> {
        let now = self.clock.now_ms();
        let hit = self
            .inner
            .get(key)
            .and_then(|entry| (now < entry.expires_at_ms).then(|| entry.data.clone()));
        if hit.is_none() {
            self.inner.remove_if(key, |_, entry| now >= entry.expires_at_ms);
        }

        metrics::record_cache(hit.is_some());
        hit
    }

    pub fn insert(&self, key: &str, data: Payload) {
        let expires_at_ms = self.clock.now_ms().saturating_add(self.ttl.as_millis() as u64);
        self.inner.insert(key.to_string(), CacheEntry { data, expires_at_ms });
        tracing::debug!(endpoint = %key, ttl_secs = self.ttl.as_secs(), "Cached response");
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.inner.remove(key).is_some()
    }

    pub fn clear(&self) {
        self.inner.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
