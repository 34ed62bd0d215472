//! LRU Tracker Module
//!
//! Least Recently Used ordering for cache eviction.

use std::collections::{BTreeMap, HashMap};

// == LRU Tracker ==
/// Tracks access order for LRU eviction.
///
/// Every touch stamps the key with a fresh tick; the smallest tick in
/// `order` is the least recently used key.
#[derive(Debug, Default)]
pub struct LruTracker {
    ticks: HashMap<String, u64>,
    order: BTreeMap<u64, String>,
    next_tick: u64,
}

impl LruTracker {
    pub fn new() -> Self {
        Self::default()
    }

    // == Touch ==
    /// Marks a key as most recently used.
    pub fn touch(&mut self, key: &str) {
        let tick = self.next_tick;
        self.next_tick += 1;

        if let Some(old) = self.ticks.insert(key.to_string(), tick) {
            self.order.remove(&old);
        }
        self.order.insert(tick, key.to_string());
    }

    // == Remove ==
    pub fn remove(&mut self, key: &str) {
        if let Some(tick) = self.ticks.remove(key) {
            self.order.remove(&tick);
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let (_, key) = self.order.pop_first()?;
        self.ticks.remove(&key);
        Some(key)
    }

    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.order.values().next().map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.ticks.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ticks.contains_key(key)
    }
}
