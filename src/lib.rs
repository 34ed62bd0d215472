//! JSON Store - A namespaced key-value store over flat string storage
//!
//! Provides typed JSON values with TTL expiration, optional encryption, an
//! optional read-through cache and change notification.

pub mod cache;
pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod events;
pub mod storage;
pub mod store;
pub mod tasks;

pub use config::{StorageType, StoreConfig, StoreOptions};
pub use error::{Result, StoreError};
pub use events::ListenerId;
pub use storage::{FileStorage, MemoryStorage, StorageBackend};
pub use store::JsonStore;
pub use tasks::spawn_sweep_task;
