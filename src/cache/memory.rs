//! Memory Cache Module
//!
//! Bounded physical-key -> value map with LRU eviction and expiry re-checks.

use std::collections::HashMap;

use serde_json::Value;

use crate::cache::{CacheEntry, CacheStats, LruTracker};

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Hit(Value),
    /// Entry was present but expired; it has been dropped
    Expired,
    Miss,
}

// == Memory Cache ==
#[derive(Debug)]
pub struct MemoryCache {
    entries: HashMap<String, CacheEntry>,
    lru: LruTracker,
    stats: CacheStats,
    capacity: usize,
}

impl MemoryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::new(),
            lru: LruTracker::new(),
            stats: CacheStats::new(),
            capacity,
        }
    }

    // == Insert ==
    /// Caches `value` under `key`, evicting the least recently used entry
    /// when a new key would exceed capacity.
    pub fn insert(&mut self, key: &str, value: Value, expires_at: Option<i64>) {
        if !self.entries.contains_key(key) && self.entries.len() >= self.capacity {
            if let Some(evicted) = self.lru.evict_oldest() {
                self.entries.remove(&evicted);
                self.stats.record_eviction();
            }
        }

        self.entries
            .insert(key.to_string(), CacheEntry::new(value, expires_at));
        self.lru.touch(key);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Lookup ==
    /// Returns the cached value unless it is absent or expired at `now_ms`.
    pub fn lookup(&mut self, key: &str, now_ms: i64) -> CacheLookup {
        let Some(entry) = self.entries.get(key) else {
            self.stats.record_miss();
            return CacheLookup::Miss;
        };

        if entry.is_expired_at(now_ms) {
            self.remove(key);
            self.stats.record_expiration();
            return CacheLookup::Expired;
        }

        let value = entry.value.clone();
        self.lru.touch(key);
        self.stats.record_hit();
        CacheLookup::Hit(value)
    }

    pub fn remove(&mut self, key: &str) {
        if self.entries.remove(key).is_some() {
            self.lru.remove(key);
            self.stats.set_total_entries(self.entries.len());
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.lru.clear();
        self.stats.set_total_entries(0);
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.clone()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
