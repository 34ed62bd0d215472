//! Durable storage backend persisting the whole map as a JSON file.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::{debug, warn};

use super::{MemoryStorage, StorageBackend, DEFAULT_QUOTA_BYTES};
use crate::error::StorageError;

// == File Storage ==
/// Key-value map mirrored to a JSON file on every mutation.
///
/// Writes go to a sibling temp file which is then renamed over the target.
/// If persisting fails, the in-memory map is rolled back so memory and disk
/// never disagree.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    entries: MemoryStorage,
    /// Serializes mutate-then-persist sequences
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Opens `path` with the default quota. A missing file starts empty.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::open_with_quota(path, DEFAULT_QUOTA_BYTES)
    }

    pub fn open_with_quota(path: impl AsRef<Path>, quota: usize) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str::<BTreeMap<String, String>>(&text)
                .map_err(StorageError::Corrupt)?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entries = entries.len(), "Opened file storage");

        Ok(Self {
            path,
            entries: MemoryStorage::from_entries(entries, Some(quota)),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string(&self.entries.snapshot()).map_err(StorageError::Corrupt)?;
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Puts `previous` back under `key` after a failed persist.
    fn restore(&self, key: &str, previous: Option<String>) {
        let restored = match previous {
            Some(value) => self.entries.set(key, &value),
            None => self.entries.delete(key),
        };
        if let Err(e) = restored {
            warn!(
                key,
                path = %self.path.display(),
                error = %e,
                "Failed to roll back after persist error"
            );
        }
    }
}

impl StorageBackend for FileStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self.entries.get(key);
        self.entries.set(key, value)?;
        self.persist().inspect_err(|_| self.restore(key, previous))
    }

    fn delete(&self, key: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(previous) = self.entries.get(key) else {
            return Ok(());
        };
        self.entries.delete(key)?;
        self.persist().inspect_err(|_| self.restore(key, Some(previous)))
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys()
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
