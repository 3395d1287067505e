//! Process-local response cache (tier 1 of the invalidation cascade).
//!
//! A `DashMap` keyed by logical cache key holding rendered JSON bodies with
//! per-entry TTL and an entry cap. Per-instance only: replicas each hold
//! their own copy and converge through TTL expiry, which is acceptable
//! because correctness rests on the CDN and regeneration tiers.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::debug;

use crate::metrics::cache::LOCAL_CACHE_EVENTS;

const KEY_PREFIX: &str = "catalog:v1";

pub fn homepage_key() -> String {
    format!("{}:home", KEY_PREFIX)
}

pub fn playlist_index_key() -> String {
    format!("{}:playlists", KEY_PREFIX)
}

pub fn playlist_key(slug: &str) -> String {
    format!("{}:playlist:{}", KEY_PREFIX, slug)
}

/// Prefix covering every playlist detail entry.
pub fn playlist_key_prefix() -> String {
    format!("{}:playlist:", KEY_PREFIX)
}

#[derive(Debug, Clone)]
struct CachedEntry {
    body: String,
    expires_at: Instant,
}

impl CachedEntry {
    #[inline]
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// In-memory rendered-response cache.
///
/// Thread-safe through `DashMap`; no locks held across await points because
/// nothing here is async.
pub struct LocalCache {
    store: DashMap<String, CachedEntry>,
    max_entries: usize,
    default_ttl: Duration,
}

impl LocalCache {
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        debug!(max_entries, ttl_secs = default_ttl.as_secs(), "initializing local response cache");

        Self {
            store: DashMap::new(),
            max_entries: max_entries.max(1),
            default_ttl,
        }
    }

    /// Fetch a cached body; expired entries are evicted on the way out.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.store.get(key) {
            if !entry.is_expired() {
                LOCAL_CACHE_EVENTS.with_label_values(&["hit"]).inc();
                return Some(entry.body.clone());
            }
            drop(entry);
            self.evict(key);
        }

        LOCAL_CACHE_EVENTS.with_label_values(&["miss"]).inc();
        None
    }

    pub fn insert(&self, key: String, body: String) {
        // TTL of zero disables caching outright.
        if self.default_ttl.is_zero() {
            return;
        }

        self.enforce_limit();
        self.store.insert(
            key,
            CachedEntry {
                body,
                expires_at: Instant::now() + self.default_ttl,
            },
        );
        LOCAL_CACHE_EVENTS.with_label_values(&["insert"]).inc();
    }

    /// Drop one entry by exact key. Returns whether it existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let removed = self.store.remove(key).is_some();
        if removed {
            LOCAL_CACHE_EVENTS.with_label_values(&["invalidation"]).inc();
        }
        removed
    }

    /// Drop every entry whose key starts with `prefix`. Returns the count.
    pub fn invalidate_prefix(&self, prefix: &str) -> usize {
        let keys: Vec<String> = self
            .store
            .iter()
            .filter(|entry| entry.key().starts_with(prefix))
            .map(|entry| entry.key().clone())
            .collect();

        let removed = keys.len();
        for key in keys {
            self.store.remove(&key);
        }

        if removed > 0 {
            LOCAL_CACHE_EVENTS
                .with_label_values(&["invalidation"])
                .inc_by(removed as u64);
            debug!(prefix = %prefix, removed, "local cache prefix invalidation");
        }

        removed
    }

    pub fn clear(&self) {
        let count = self.store.len();
        self.store.clear();
        if count > 0 {
            LOCAL_CACHE_EVENTS
                .with_label_values(&["invalidation"])
                .inc_by(count as u64);
        }
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    fn evict(&self, key: &str) {
        if self.store.remove(key).is_some() {
            LOCAL_CACHE_EVENTS.with_label_values(&["eviction"]).inc();
        }
    }

    /// Keep the map under its entry cap; evicts ~10% when full.
    ///
    /// FIFO approximation, same trade-off as elsewhere in the stack: the
    /// entry set here is tiny (homepage + index + one per playlist) so
    /// precise LRU buys nothing.
    fn enforce_limit(&self) {
        if self.store.len() < self.max_entries {
            return;
        }

        let evict_count = (self.store.len() / 10).max(1);
        let keys: Vec<String> = self
            .store
            .iter()
            .take(evict_count)
            .map(|entry| entry.key().clone())
            .collect();

        for key in keys {
            self.evict(&key);
        }
    }
}
