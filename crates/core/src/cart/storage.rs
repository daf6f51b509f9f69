//! Durable local key-value storage for the cart.
//!
//! [`LocalStorage`] is the slot the cart mirrors itself into. Storage that
//! several execution contexts share (browser tabs over one origin) also
//! implements [`ObservableStorage`], which lets a context register for
//! notifications about writes made by *other* contexts.
//!
//! [`SharedStorage`] is the in-process implementation: one storage area,
//! many [`StorageContext`] handles, change notifications over a
//! `tokio::sync::broadcast` channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

/// Capacity of the change-notification channel; slower listeners lag and resync.
const EVENT_CAPACITY: usize = 64;

/// Errors that can occur when writing to local storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The value could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The write would exceed the storage quota.
    #[error("storage quota of {quota} bytes exceeded")]
    QuotaExceeded { quota: usize },
}

/// A string key-value slot that survives the in-memory state.
pub trait LocalStorage {
    /// Read the raw value stored under `key`.
    fn get_item(&self, key: &str) -> Option<String>;

    /// Overwrite the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage refuses the write.
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Storage shared between contexts that can report foreign writes.
pub trait ObservableStorage: LocalStorage {
    /// Handle returned by [`ObservableStorage::subscribe`]; dropping it unsubscribes.
    type Subscription: StorageWatch;

    /// Register for notifications about writes to `key` made by other contexts.
    fn subscribe(&self, key: &str) -> Self::Subscription;
}

/// A registered storage observer.
pub trait StorageWatch {
    /// Drain notifications delivered since the last call, returning how many
    /// concerned the watched key.
    fn pending(&mut self) -> usize;
}

/// A change notification: some other context wrote `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    origin: u64,
}

/// An in-process storage area shared by many contexts.
///
/// Cheaply cloneable; all clones refer to the same area.
#[derive(Clone)]
pub struct SharedStorage {
    inner: Arc<SharedStorageInner>,
}

struct SharedStorageInner {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    next_context: AtomicU64,
    quota: Option<usize>,
}

impl Default for SharedStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedStorage {
    /// Create an empty, unbounded storage area.
    #[must_use]
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create an empty storage area that refuses values larger than `quota` bytes in total.
    #[must_use]
    pub fn with_quota(quota: usize) -> Self {
        Self::build(Some(quota))
    }

    fn build(quota: Option<usize>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(SharedStorageInner {
                entries: Mutex::new(HashMap::new()),
                events,
                next_context: AtomicU64::new(1),
                quota,
            }),
        }
    }

    /// Open a new context (a "tab") on this storage area.
    #[must_use]
    pub fn context(&self) -> StorageContext {
        StorageContext {
            id: self.inner.next_context.fetch_add(1, Ordering::Relaxed),
            shared: self.clone(),
        }
    }

    /// Number of live subscriptions across all contexts.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.events.receiver_count()
    }

    fn write(&self, origin: u64, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self
            .inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(quota) = self.inner.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            if others + key.len() + value.len() > quota {
                return Err(StorageError::QuotaExceeded { quota });
            }
        }

        let previous = entries.insert(key.to_owned(), value.to_owned());
        drop(entries);

        // Rewriting an identical value is not a change.
        if previous.as_deref() != Some(value) {
            // No receivers is fine: nobody is listening yet.
            let _ = self.inner.events.send(StorageEvent {
                key: key.to_owned(),
                origin,
            });
        }
        Ok(())
    }

    fn read(&self, key: &str) -> Option<String> {
        self.inner
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }
}

/// One context's view of a [`SharedStorage`].
#[derive(Clone)]
pub struct StorageContext {
    id: u64,
    shared: SharedStorage,
}

impl StorageContext {
    /// Identifier of this context within its storage area.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }
}

impl LocalStorage for StorageContext {
    fn get_item(&self, key: &str) -> Option<String> {
        self.shared.read(key)
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.shared.write(self.id, key, value)
    }
}

impl ObservableStorage for StorageContext {
    type Subscription = StorageSubscription;

    fn subscribe(&self, key: &str) -> StorageSubscription {
        StorageSubscription {
            key: key.to_owned(),
            context: self.id,
            receiver: self.shared.inner.events.subscribe(),
        }
    }
}

/// A live registration for foreign writes to one key.
pub struct StorageSubscription {
    key: String,
    context: u64,
    receiver: broadcast::Receiver<StorageEvent>,
}

impl StorageWatch for StorageSubscription {
    fn pending(&mut self) -> usize {
        let mut count = 0;
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.key == self.key && event.origin != self.context => count += 1,
                Ok(_) => {}
                // Missed events: the slot may have changed, so resync once.
                Err(TryRecvError::Lagged(_)) => count += 1,
                Err(TryRecvError::Empty | TryRecvError::Closed) => return count,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_share_entries() {
        let storage = SharedStorage::new();
        let a = storage.context();
        let b = storage.context();

        a.set_item("cart", "[]").unwrap();
        assert_eq!(b.get_item("cart").as_deref(), Some("[]"));
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_writer_does_not_see_own_writes() {
        let storage = SharedStorage::new();
        let a = storage.context();
        let b = storage.context();
        let mut watch_a = a.subscribe("cart");
        let mut watch_b = b.subscribe("cart");

        a.set_item("cart", "[1]").unwrap();

        assert_eq!(watch_a.pending(), 0);
        assert_eq!(watch_b.pending(), 1);
        assert_eq!(watch_b.pending(), 0);
    }

    #[test]
    fn test_other_keys_are_ignored() {
        let storage = SharedStorage::new();
        let a = storage.context();
        let mut watch = storage.context().subscribe("cart");

        a.set_item("theme", "dark").unwrap();
        assert_eq!(watch.pending(), 0);
    }

    #[test]
    fn test_identical_rewrite_is_not_a_change() {
        let storage = SharedStorage::new();
        let a = storage.context();
        let mut watch = storage.context().subscribe("cart");

        a.set_item("cart", "[]").unwrap();
        a.set_item("cart", "[]").unwrap();
        assert_eq!(watch.pending(), 1);
    }

    #[test]
    fn test_lagged_subscriber_resyncs() {
        let storage = SharedStorage::new();
        let a = storage.context();
        let mut watch = storage.context().subscribe("cart");

        for i in 0..(EVENT_CAPACITY + 10) {
            a.set_item("cart", &format!("[{i}]")).unwrap();
        }
        assert!(watch.pending() >= 1);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let storage = SharedStorage::new();
        let watch = storage.context().subscribe("cart");
        assert_eq!(storage.subscriber_count(), 1);
        drop(watch);
        assert_eq!(storage.subscriber_count(), 0);
    }

    #[test]
    fn test_quota() {
        let storage = SharedStorage::with_quota(16);
        let a = storage.context();

        a.set_item("cart", "[]").unwrap();
        let err = a.set_item("cart", &"x".repeat(32)).unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 16 }));
        assert_eq!(a.get_item("cart").as_deref(), Some("[]"));
    }
}
