//! Game completion - a single persisted boolean that unlocks "LOAD GAME".

use tracing::{info, warn};

use crate::storage::SharedStore;

/// Persisted record of whether the story has been completed.
pub struct CompletionRecord {
    store: SharedStore,
    key: String,
}

impl std::fmt::Debug for CompletionRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionRecord")
            .field("key", &self.key)
            .finish()
    }
}

impl CompletionRecord {
    pub fn new(store: SharedStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Whether the story has been completed. Unreadable data reads as `false`.
    pub fn is_completed(&self) -> bool {
        match self.store.borrow().load(&self.key) {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!(key = %self.key, error = %e, "completion status unreadable");
                false
            }
        }
    }

    /// Persist the completion status.
    pub fn set_completed(&self, completed: bool) {
        let value = if completed { "true" } else { "false" };
        match self.store.borrow_mut().save(&self.key, value) {
            Ok(()) => info!(completed, "game completion status saved"),
            Err(e) => warn!(key = %self.key, error = %e, "failed to save completion status"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{shared, KeyValueStore, MemoryStore};

    const KEY: &str = "memory_device_completed";

    #[test]
    fn test_defaults_to_not_completed() {
        let record = CompletionRecord::new(shared(MemoryStore::new()), KEY);
        assert!(!record.is_completed());
    }

    #[test]
    fn test_set_completed_persists() {
        let store = shared(MemoryStore::new());
        CompletionRecord::new(store.clone(), KEY).set_completed(true);

        let reopened = CompletionRecord::new(store.clone(), KEY);
        assert!(reopened.is_completed());

        reopened.set_completed(false);
        assert!(!CompletionRecord::new(store, KEY).is_completed());
    }

    #[test]
    fn test_garbage_reads_as_false() {
        let store = shared(MemoryStore::new());
        store.borrow_mut().save(KEY, "yes please").unwrap();
        assert!(!CompletionRecord::new(store, KEY).is_completed());
    }
}
