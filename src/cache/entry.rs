//! Cache Entry Module
//!
//! A cached logical value together with the expiration it was stored with.

use serde_json::Value;

// == Cache Entry ==
/// Represents a single cached value.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    /// The logical value, never the envelope or ciphertext
    pub value: Value,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<i64>,
}

impl CacheEntry {
    pub fn new(value: Value, expires_at: Option<i64>) -> Self {
        Self { value, expires_at }
    }

    // == Is Expired ==
    /// Checks the entry against `now_ms` with the same strict rule as the
    /// stored envelope: expired only once `now_ms` is past `expires_at`.
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        self.expires_at.is_some_and(|at| at < now_ms)
    }
}
