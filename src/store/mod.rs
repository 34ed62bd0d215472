//! Store Facade
//!
//! [`JsonStore`] orchestrates key building, the envelope codec, the
//! read-through cache and change notification around a storage backend.
//!
//! # Cache policy
//! Cached values carry the expiration they were stored with and every hit
//! re-checks it, so the cached path and the storage path agree on expiry.


use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::cache::{CacheLookup, CacheStats, MemoryCache};
use crate::codec::{
    build_key, current_timestamp_ms, decode, encode, strip_namespace, CipherBinding,
};
use crate::config::{StoreConfig, StoreOptions};
use crate::crypto::{AesGcmCipher, Cipher};
use crate::error::{DecodeError, EncodeError, Result, StoreError};
use crate::events::{ChangeNotifier, ListenerId};
use crate::storage::StorageBackend;

// == Json Store ==
/// Namespaced, optionally encrypted and cached JSON key-value store.
pub struct JsonStore {
    config: StoreConfig,
    backend: Arc<dyn StorageBackend>,
    cipher: Arc<dyn Cipher>,
    /// Present iff caching is enabled
    cache: Option<MemoryCache>,
    notifier: ChangeNotifier,
}

impl JsonStore {
    // == Constructors ==
    /// Resolves `options` and opens the backend selected by its storage type.
    ///
    /// Configuration is validated before any storage is touched.
    pub fn new(options: StoreOptions) -> Result<Self> {
        let config = StoreConfig::resolve(options)?;
        let backend = config
            .storage_type
            .open(&config)
            .map_err(StoreError::Unavailable)?;
        Ok(Self::from_parts(config, backend))
    }

    /// Builds a store over an injected backend, ignoring the storage type.
    pub fn with_backend(options: StoreOptions, backend: Arc<dyn StorageBackend>) -> Result<Self> {
        let config = StoreConfig::resolve(options)?;
        Ok(Self::from_parts(config, backend))
    }

    fn from_parts(config: StoreConfig, backend: Arc<dyn StorageBackend>) -> Self {
        let cache = config.cache.then(|| MemoryCache::new(config.cache_capacity));
        debug!(config = ?config, "Store created");
        Self {
            config,
            backend,
            cipher: Arc::new(AesGcmCipher::new()),
            cache,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Replaces the cipher used when encryption is enabled.
    pub fn with_cipher(mut self, cipher: impl Cipher + 'static) -> Self {
        self.cipher = Arc::new(cipher);
        self
    }

    // == Set Item ==
    /// Stores `value` under `key`.
    ///
    /// A nonzero `ttl_ms` overrides the configured default TTL.
    pub fn set_item<T>(&mut self, key: &str, value: &T, ttl_ms: Option<u64>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let physical = self.physical_key(key);
        let value = serde_json::to_value(value).map_err(|e| StoreError::Encode {
            key: key.to_string(),
            source: EncodeError::Serialize(e),
        })?;

        let record = encode(&value, ttl_ms, self.config.default_ttl_ms, self.binding()).map_err(
            |source| StoreError::Encode {
                key: key.to_string(),
                source,
            },
        )?;

        self.backend
            .set(&physical, &record.text)
            .map_err(|source| StoreError::StorageWrite {
                key: key.to_string(),
                source,
            })?;
        debug!(key = %physical, expires_at = ?record.expires_at, "Stored item");

        if let Some(cache) = self.cache.as_mut() {
            cache.insert(&physical, value.clone(), record.expires_at);
        }
        self.notifier.notify(key, Some(&value));
        Ok(())
    }

    // == Get Item ==
    /// Returns the value under `key`, or `None` when absent or expired.
    ///
    /// A record that exists but cannot be decrypted or parsed as `T` is a
    /// [`StoreError::Retrieval`]; it is left in storage for inspection.
    pub fn get_item<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        let physical = self.physical_key(key);

        let now = current_timestamp_ms();
        match self.cache.as_mut().map(|cache| cache.lookup(&physical, now)) {
            Some(CacheLookup::Hit(value)) => return Self::typed(key, value).map(Some),
            // The cache entry is already dropped; storage decides whether the record is gone
            Some(CacheLookup::Expired) => debug!(key = %physical, "Cached item expired"),
            Some(CacheLookup::Miss) | None => {}
        }

        let Some(text) = self.backend.get(&physical) else {
            return Ok(None);
        };

        let decoded = decode(&text, self.binding()).map_err(|source| {
            warn!(key = %physical, error = %source, "Failed to decode stored item");
            StoreError::Retrieval {
                key: key.to_string(),
                source,
            }
        })?;

        if decoded.expired {
            debug!(key = %physical, "Stored item expired");
            self.remove_item(key)?;
            return Ok(None);
        }

        let typed = Self::typed(key, decoded.value.clone())?;
        if let Some(cache) = self.cache.as_mut() {
            cache.insert(&physical, decoded.value, decoded.expires_at);
        }
        Ok(Some(typed))
    }

    // == Remove Item ==
    /// Deletes `key`. Removing an absent key is not an error.
    pub fn remove_item(&mut self, key: &str) -> Result<()> {
        let physical = self.physical_key(key);

        if let Some(cache) = self.cache.as_mut() {
            cache.remove(&physical);
        }
        self.backend
            .delete(&physical)
            .map_err(|source| StoreError::StorageWrite {
                key: key.to_string(),
                source,
            })?;
        debug!(key = %physical, "Removed item");

        self.notifier.notify(key, None);
        Ok(())
    }

    // == Clear ==
    /// Deletes every record in this store's namespace, or every record of
    /// the backend when no namespace is configured.
    ///
    /// Listeners are notified once per removed key. If a delete fails, the
    /// keys removed so far are still notified before the error is returned.
    pub fn clear(&mut self) -> Result<()> {
        let targets = self.scoped_keys();

        if let Some(cache) = self.cache.as_mut() {
            cache.clear();
        }

        let mut removed = Vec::with_capacity(targets.len());
        let mut failure = None;
        for (physical, logical) in targets {
            match self.backend.delete(&physical) {
                Ok(()) => removed.push(logical),
                Err(source) => {
                    failure = Some(StoreError::StorageWrite {
                        key: logical,
                        source,
                    });
                    break;
                }
            }
        }

        for logical in &removed {
            self.notifier.notify(logical, None);
        }
        info!(
            removed = removed.len(),
            namespace = ?self.config.namespace,
            "Cleared store"
        );

        failure.map_or(Ok(()), Err)
    }

    // == Keys ==
    /// Logical keys currently stored in this store's scope, sorted.
    ///
    /// Expired records are listed until they are read or purged.
    pub fn keys(&self) -> Vec<String> {
        self.scoped_keys()
            .into_iter()
            .map(|(_, logical)| logical)
            .collect()
    }

    // == Purge Expired ==
    /// Evicts every expired record in scope and returns how many were removed.
    ///
    /// Unreadable records are skipped and logged, never deleted.
    pub fn purge_expired(&mut self) -> Result<usize> {
        let mut purged = 0;
        for (physical, logical) in self.scoped_keys() {
            let Some(text) = self.backend.get(&physical) else {
                continue;
            };
            match decode(&text, self.binding()) {
                Ok(decoded) if decoded.expired => {
                    self.remove_item(&logical)?;
                    purged += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(key = %physical, error = %e, "Skipping unreadable record"),
            }
        }

        if purged > 0 {
            info!(purged, "Purged expired items");
        }
        Ok(purged)
    }

    // == Listeners ==
    /// Registers `callback` for every mutation; returns a handle for
    /// [`JsonStore::off_change`].
    pub fn on_change<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&str, Option<&Value>) + Send + Sync + 'static,
    {
        self.notifier.subscribe(callback)
    }

    /// Deregisters a listener. Returns false if it was not registered.
    pub fn off_change(&mut self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // == Accessors ==
    /// The underlying storage backend, unmediated.
    ///
    /// Reads and writes through this handle bypass namespacing, envelopes,
    /// encryption, expiration, the cache and change notification. Writing
    /// under a key this store manages can leave its cache stale.
    pub fn raw(&self) -> &dyn StorageBackend {
        self.backend.as_ref()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Cache counters, or None when caching is disabled.
    pub fn cache_stats(&self) -> Option<CacheStats> {
        self.cache.as_ref().map(MemoryCache::stats)
    }

    // == Helpers ==
    fn physical_key(&self, key: &str) -> String {
        build_key(self.config.namespace.as_deref(), key)
    }

    /// (physical, logical) pairs of every backend key in scope.
    fn scoped_keys(&self) -> Vec<(String, String)> {
        let namespace = self.config.namespace.as_deref();
        self.backend
            .keys()
            .into_iter()
            .filter_map(|physical| {
                let logical = strip_namespace(namespace, &physical)?.to_string();
                Some((physical, logical))
            })
            .collect()
    }

    fn binding(&self) -> Option<CipherBinding<'_>> {
        self.config
            .encryption_key
            .as_ref()
            .map(|key| CipherBinding {
                cipher: self.cipher.as_ref(),
                key: key.as_str(),
            })
    }

    fn typed<T: DeserializeOwned>(key: &str, value: Value) -> Result<T> {
        serde_json::from_value(value).map_err(|e| StoreError::Retrieval {
            key: key.to_string(),
            source: DecodeError::Malformed(e),
        })
    }
}

impl fmt::Debug for JsonStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonStore")
            .field("config", &self.config)
            .field("backend", &self.backend)
            .field("cache", &self.cache.as_ref().map(MemoryCache::len))
            .field("notifier", &self.notifier)
            .finish()
    }
}
