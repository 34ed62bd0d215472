//! Cache Module
//!
//! In-process read-through cache consulted before the storage backend.
//! It is a pure optimization and never a source of truth.

mod entry;
mod lru;
mod memory;
mod stats;

pub use entry::CacheEntry;
pub use lru::LruTracker;
pub use memory::{CacheLookup, MemoryCache};
pub use stats::CacheStats;
