//! Storage Module
//!
//! The flat string-keyed storage primitive the store is built on, plus the
//! two provided scopes: process-lifetime memory and durable file storage.

mod file;
mod memory;

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{self, Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock, PoisonError, Weak};

use crate::config::{StorageType, StoreConfig};
use crate::error::StorageError;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Default byte quota for provided backends (key + value bytes)
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

// == Storage Backend ==
/// Synchronous string-keyed map with bounded capacity and no transactions.
///
/// Implementations use interior mutability so one backend can be shared by
/// several stores (for example two namespaces over the same file).
pub trait StorageBackend: Send + Sync + fmt::Debug {
    /// Returns the value stored under `key`.
    fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes `key`. Removing an absent key succeeds.
    fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Returns every key, sorted.
    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize {
        self.keys().len()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// == Shared Scopes ==
/// Open file backends keyed by resolved path. Entries are weak so a file is
/// re-read once every store using it has been dropped.
static LOCAL_SCOPES: OnceLock<Mutex<HashMap<PathBuf, Weak<FileStorage>>>> = OnceLock::new();

/// The one in-memory map backing every session-scoped store in the process
static SESSION_SCOPE: OnceLock<Arc<MemoryStorage>> = OnceLock::new();

impl StorageType {
    /// Opens the backend for this scope.
    ///
    /// Stores opened on the same scope share one backend: `Local` stores on
    /// the same file get the same `FileStorage`, and every `Session` store in
    /// the process gets the same in-memory map.
    pub fn open(self, config: &StoreConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
        let backend: Arc<dyn StorageBackend> = match self {
            StorageType::Local => shared_file(&config.storage_path)?,
            StorageType::Session => SESSION_SCOPE
                .get_or_init(|| Arc::new(MemoryStorage::with_quota(DEFAULT_QUOTA_BYTES)))
                .clone(),
        };
        Ok(backend)
    }
}

fn shared_file(path: &Path) -> Result<Arc<FileStorage>, StorageError> {
    let key = resolve_path(path);
    let mut scopes = LOCAL_SCOPES
        .get_or_init(Mutex::default)
        .lock()
        .unwrap_or_else(PoisonError::into_inner);

    if let Some(storage) = scopes.get(&key).and_then(Weak::upgrade) {
        return Ok(storage);
    }

    let storage = Arc::new(FileStorage::open(path)?);
    scopes.retain(|_, open| open.strong_count() > 0);
    scopes.insert(key, Arc::downgrade(&storage));
    Ok(storage)
}

/// Resolves `path` to an absolute form that does not depend on how it was
/// spelled. The file (and its parents) may not exist yet, so the deepest
/// existing ancestor is canonicalized and the rest is appended.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();

    loop {
        if let Ok(canonical) = fs::canonicalize(existing) {
            return missing
                .iter()
                .rev()
                .fold(canonical, |resolved, part| resolved.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return absolute.clone(),
        }
    }
}
