//! Configuration Module
//!
//! Partial caller options, the resolved immutable store configuration, and
//! loading options from environment variables.

use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use zeroize::Zeroizing;

use crate::error::{Result, StoreError};

/// Default capacity of the read-through cache
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Default file backing the local storage scope
pub const DEFAULT_STORAGE_PATH: &str = ".json-store/local.json";

// == Storage Type ==
/// Scope of the underlying storage primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageType {
    /// Durable across sessions, persisted to a file
    #[default]
    Local,
    /// Lives as long as the process
    Session,
}

impl FromStr for StorageType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "local" => Ok(StorageType::Local),
            "session" => Ok(StorageType::Session),
            other => Err(format!("unknown storage type: {other}")),
        }
    }
}

// == Store Options ==
/// Caller-supplied options. Every field is optional; defaults are applied
/// once by [`StoreConfig::resolve`].
#[derive(Clone, Default)]
pub struct StoreOptions {
    pub storage_type: Option<StorageType>,
    pub encrypt: Option<bool>,
    pub encryption_key: Option<String>,
    pub cache: Option<bool>,
    pub cache_capacity: Option<usize>,
    pub namespace: Option<String>,
    /// Default TTL in milliseconds, 0 disables default expiration
    pub default_ttl_ms: Option<u64>,
    pub storage_path: Option<PathBuf>,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_storage_type(mut self, storage_type: StorageType) -> Self {
        self.storage_type = Some(storage_type);
        self
    }

    /// Enables encryption with the given passphrase.
    pub fn with_encryption(mut self, key: impl Into<String>) -> Self {
        self.encrypt = Some(true);
        self.encryption_key = Some(key.into());
        self
    }

    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = Some(enabled);
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = Some(capacity);
        self
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_default_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.default_ttl_ms = Some(ttl_ms);
        self
    }

    pub fn with_storage_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.storage_path = Some(path.into());
        self
    }

    /// Loads options from environment variables.
    ///
    /// # Environment Variables
    /// - `JSON_STORE_STORAGE` - `local` or `session`
    /// - `JSON_STORE_PATH` - File backing the local scope
    /// - `JSON_STORE_NAMESPACE` - Key namespace
    /// - `JSON_STORE_ENCRYPT` - `true` to encrypt records
    /// - `JSON_STORE_ENCRYPTION_KEY` - Encryption passphrase
    /// - `JSON_STORE_CACHE` - `true` to enable the read-through cache
    /// - `JSON_STORE_CACHE_CAPACITY` - Cache capacity in entries
    /// - `JSON_STORE_DEFAULT_TTL_MS` - Default TTL in milliseconds
    ///
    /// Unset or unparseable variables are left unset.
    pub fn from_env() -> Self {
        Self {
            storage_type: env_parse("JSON_STORE_STORAGE"),
            encrypt: env_parse("JSON_STORE_ENCRYPT"),
            encryption_key: env::var("JSON_STORE_ENCRYPTION_KEY").ok(),
            cache: env_parse("JSON_STORE_CACHE"),
            cache_capacity: env_parse("JSON_STORE_CACHE_CAPACITY"),
            namespace: env::var("JSON_STORE_NAMESPACE").ok(),
            default_ttl_ms: env_parse("JSON_STORE_DEFAULT_TTL_MS"),
            storage_path: env::var("JSON_STORE_PATH").ok().map(PathBuf::from),
        }
    }
}

impl fmt::Debug for StoreOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreOptions")
            .field("storage_type", &self.storage_type)
            .field("encrypt", &self.encrypt)
            .field(
                "encryption_key",
                &self.encryption_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("cache", &self.cache)
            .field("cache_capacity", &self.cache_capacity)
            .field("namespace", &self.namespace)
            .field("default_ttl_ms", &self.default_ttl_ms)
            .field("storage_path", &self.storage_path)
            .finish()
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.trim().parse().ok())
}

// == Store Config ==
/// Resolved store configuration, immutable once built.
#[derive(Clone)]
pub struct StoreConfig {
    pub storage_type: StorageType,
    /// Present iff encryption is enabled
    pub encryption_key: Option<Zeroizing<String>>,
    pub cache: bool,
    pub cache_capacity: usize,
    /// Never empty when present
    pub namespace: Option<String>,
    pub default_ttl_ms: u64,
    pub storage_path: PathBuf,
}

impl StoreConfig {
    /// Merges options over the defaults and validates the result.
    ///
    /// Fails when encryption is requested without a non-empty key, or when
    /// caching is enabled with a zero capacity.
    pub fn resolve(options: StoreOptions) -> Result<Self> {
        let encrypt = options.encrypt.unwrap_or(false);
        let encryption_key = match (encrypt, options.encryption_key) {
            (true, Some(key)) if !key.is_empty() => Some(Zeroizing::new(key)),
            (true, _) => {
                return Err(StoreError::Configuration(
                    "Encryption key is required when encryption is enabled".to_string(),
                ))
            }
            (false, _) => None,
        };

        let cache = options.cache.unwrap_or(false);
        let cache_capacity = options.cache_capacity.unwrap_or(DEFAULT_CACHE_CAPACITY);
        if cache && cache_capacity == 0 {
            return Err(StoreError::Configuration(
                "Cache capacity must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            storage_type: options.storage_type.unwrap_or_default(),
            encryption_key,
            cache,
            cache_capacity,
            namespace: options.namespace.filter(|ns| !ns.is_empty()),
            default_ttl_ms: options.default_ttl_ms.unwrap_or(0),
            storage_path: options
                .storage_path
                .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_PATH)),
        })
    }

    pub fn encrypt(&self) -> bool {
        self.encryption_key.is_some()
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("storage_type", &self.storage_type)
            .field("encrypt", &self.encrypt())
            .field("cache", &self.cache)
            .field("cache_capacity", &self.cache_capacity)
            .field("namespace", &self.namespace)
            .field("default_ttl_ms", &self.default_ttl_ms)
            .field("storage_path", &self.storage_path)
            .finish()
    }
}
