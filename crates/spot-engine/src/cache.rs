//! Concurrent TTL cache for provider data
//!
//! Expiry is advisory: an expired entry stays readable (flagged stale) until
//! it is evicted or overwritten. Callers decide whether stale data is good
//! enough, e.g. as a fallback when a refresh fails.

use crate::models::{InstanceSpecs, SpotData};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::debug;

/// Default time-to-live for cached provider data
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
}

/// Result of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub struct CacheHit<V> {
    pub value: V,
    pub stale: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub stale_hits: u64,
}

/// Key-value store with per-entry TTL, safe for concurrent use
pub struct TtlCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    stale_hits: AtomicU64,
}

impl<V: Clone> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stale_hits: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Look up a key, serving expired entries with `stale = true`
    pub fn get(&self, key: &str) -> Option<CacheHit<V>> {
        match self.entries.get(key) {
            Some(entry) => {
                let stale = Instant::now() >= entry.expires_at;
                if stale {
                    self.stale_hits.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                }
                Some(CacheHit {
                    value: entry.value.clone(),
                    stale,
                })
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.insert_with_ttl(key, value, self.ttl);
    }

    pub fn insert_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let key = key.into();
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Cache insert");
        self.entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn invalidate(&self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Drop every key starting with `prefix`, returning how many were removed
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        before.saturating_sub(self.entries.len())
    }

    /// Remove expired entries, returning how many were removed
    pub fn evict_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let evicted = before.saturating_sub(self.entries.len());
        if evicted > 0 {
            debug!(evicted, "Evicted expired cache entries");
        }
        evicted
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stale_hits: self.stale_hits.load(Ordering::Relaxed),
        }
    }
}

/// The caches shared by analysis calls
pub struct EngineCache {
    pub spot: TtlCache<Vec<SpotData>>,
    pub specs: TtlCache<Vec<InstanceSpecs>>,
}

impl Default for EngineCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl EngineCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            spot: TtlCache::new(ttl),
            specs: TtlCache::new(ttl),
        }
    }

    pub fn evict_expired(&self) -> usize {
        self.spot.evict_expired() + self.specs.evict_expired()
    }

    /// Forget everything cached for one key prefix (e.g. a cloud vendor)
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.spot.invalidate_prefix(prefix) + self.specs.invalidate_prefix(prefix)
    }

    pub fn clear(&self) {
        self.spot.clear();
        self.specs.clear();
    }
}
