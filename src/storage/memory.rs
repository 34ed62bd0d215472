//! In-memory storage backend with an optional byte quota.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock};

use super::StorageBackend;
use crate::error::StorageError;

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<String, String>,
    used_bytes: usize,
}

// == Memory Storage ==
/// Process-lifetime key-value map.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: RwLock<Inner>,
    /// Maximum key + value bytes, None = unbounded
    quota: Option<usize>,
}

impl MemoryStorage {
    /// Creates an unbounded storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a storage rejecting writes beyond `quota` bytes.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            inner: RwLock::default(),
            quota: Some(quota),
        }
    }

    /// Builds a storage pre-filled with `entries`, bypassing the quota.
    pub(crate) fn from_entries(entries: BTreeMap<String, String>, quota: Option<usize>) -> Self {
        let used_bytes = entries.iter().map(|(k, v)| k.len() + v.len()).sum();
        Self {
            inner: RwLock::new(Inner {
                entries,
                used_bytes,
            }),
            quota,
        }
    }

    /// Returns a copy of every entry.
    pub(crate) fn snapshot(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .clone()
    }

    /// Bytes currently used by keys and values.
    pub fn used_bytes(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .used_bytes
    }
}

impl StorageBackend for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        let previous = inner.entries.get(key).map_or(0, |old| key.len() + old.len());
        let required = inner.used_bytes - previous + key.len() + value.len();
        if let Some(quota) = self.quota {
            if required > quota {
                return Err(StorageError::QuotaExceeded { required, quota });
            }
        }

        inner.entries.insert(key.to_string(), value.to_string());
        inner.used_bytes = required;
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(old) = inner.entries.remove(key) {
            inner.used_bytes -= key.len() + old.len();
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .keys()
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }
}
