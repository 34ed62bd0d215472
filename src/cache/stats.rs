//! Cache Statistics Module
//!
//! Counters for the read-through cache.

use serde::Serialize;

// == Cache Stats ==
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from memory
    pub hits: u64,
    /// Lookups that fell through to storage
    pub misses: u64,
    /// Entries dropped to stay within capacity
    pub evictions: u64,
    /// Entries found expired on lookup
    pub expirations: u64,
    /// Current number of cached entries
    pub total_entries: usize,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// An expired entry counts as a miss as well.
    pub fn record_expiration(&mut self) {
        self.expirations += 1;
        self.misses += 1;
    }

    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
