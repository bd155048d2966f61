//! Observer registration and isolated notification.

use parking_lot::RwLock;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::error;

/// Error an observer may report. It is logged, never propagated.
pub type ObserverError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by observers.
pub type ObserverResult = std::result::Result<(), ObserverError>;

type Callback<T> = Arc<dyn Fn(&T) -> ObserverResult + Send + Sync>;

/// Handle for removing a registered observer. Unique across registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Ordered list of observers for events of type `T`.
pub struct ObserverRegistry<T: ?Sized> {
    observers: RwLock<Vec<(ObserverId, Callback<T>)>>,
}

impl<T: ?Sized> Default for ObserverRegistry<T> {
    fn default() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }
}

impl<T: ?Sized> std::fmt::Debug for ObserverRegistry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverRegistry")
            .field("observers", &self.len())
            .finish()
    }
}

impl<T: ?Sized> ObserverRegistry<T> {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an observer; it runs after those registered earlier.
    pub fn register<F>(&self, observer: F) -> ObserverId
    where
        F: Fn(&T) -> ObserverResult + Send + Sync + 'static,
    {
        let id = ObserverId(NEXT_ID.fetch_add(1, Ordering::Relaxed));
        self.observers.write().push((id, Arc::new(observer)));
        id
    }

    /// Remove an observer. Returns whether it was registered.
    pub fn remove(&self, id: ObserverId) -> bool {
        let mut observers = self.observers.write();
        let before = observers.len();
        observers.retain(|(registered, _)| *registered != id);
        observers.len() != before
    }

    /// Number of registered observers.
    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    /// Whether no observer is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every observer in registration order and return how many
    /// failed.
    ///
    /// The list is snapshotted first, so observers run without any lock
    /// held and may register, remove or notify re-entrantly. Errors and
    /// panics are logged and do not stop the remaining observers.
    pub fn notify(&self, event: &T, kind: &'static str) -> usize {
        let snapshot: Vec<Callback<T>> = self
            .observers
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        let mut failures = 0;
        for callback in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    error!(observer = kind, error = %e, "observer failed");
                }
                Err(_) => {
                    failures += 1;
                    error!(observer = kind, "observer panicked");
                }
            }
        }
        failures
    }
}
