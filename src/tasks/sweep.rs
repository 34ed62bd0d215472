//! Expiry Sweep Task
//!
//! Background task that periodically purges expired records from a store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::JsonStore;

/// Spawns a task calling [`JsonStore::purge_expired`] every `interval`.
///
/// The store is locked only for the duration of each purge. A failed purge
/// is logged and retried on the next tick. Abort the returned handle to stop
/// the task.
///
/// # Example
/// ```ignore
/// let store = Arc::new(Mutex::new(JsonStore::new(StoreOptions::from_env())?));
/// let sweep_handle = spawn_sweep_task(store.clone(), Duration::from_secs(60));
/// // Later, during shutdown:
/// sweep_handle.abort();
/// ```
pub fn spawn_sweep_task(store: Arc<Mutex<JsonStore>>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(interval_ms = interval.as_millis() as u64, "Starting expiry sweep task");

        loop {
            tokio::time::sleep(interval).await;

            let result = {
                let mut guard = store.lock().await;
                guard.purge_expired()
            };

            match result {
                Ok(0) => debug!("Expiry sweep: no expired items found"),
                Ok(removed) => info!(removed, "Expiry sweep: removed expired items"),
                Err(e) => warn!(error = %e, "Expiry sweep failed"),
            }
        }
    })
}
