//! Change notification
//!
//! Synchronous fan-out of mutation events to registered observers.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};

use serde_json::Value;
use tracing::warn;

/// Observer invoked with the logical key and the new value (`None` on removal).
pub type ChangeCallback = Box<dyn Fn(&str, Option<&Value>) + Send + Sync>;

/// Handle returned by registration, used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

// == Change Notifier ==
#[derive(Default)]
pub struct ChangeNotifier {
    listeners: Vec<(ListenerId, ChangeCallback)>,
    next_id: u64,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&mut self, callback: F) -> ListenerId
    where
        F: Fn(&str, Option<&Value>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id);
        self.next_id += 1;
        self.listeners.push((id, Box::new(callback)));
        id
    }

    /// Returns false when `id` was not registered.
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Calls every listener in registration order.
    ///
    /// A panicking listener is logged and skipped; the rest still run.
    pub fn notify(&self, key: &str, value: Option<&Value>) {
        for (id, callback) in &self.listeners {
            if catch_unwind(AssertUnwindSafe(|| callback(key, value))).is_err() {
                warn!(listener = id.0, key, "Change listener panicked");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
