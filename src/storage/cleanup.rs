use tracing::{debug, info};

use super::keys::KNOWN_KEYS;
use super::store::KeyValueStore;

fn remove_known_keys(store: &dyn KeyValueStore) {
    for key in KNOWN_KEYS {
        if let Err(e) = store.remove_item(key) {
            debug!(key = %key, error = %e, "Failed to remove key");
        }
    }
}

/// Wipes everything this application persisted. Never fails.
///
/// A failed full clear falls back to removing the known keys one by one. The
/// session-scoped store is cleared too when one is given.
pub fn clear_all_local_storage(local: &dyn KeyValueStore, session: Option<&dyn KeyValueStore>) {
    if let Err(e) = local.clear() {
        debug!(error = %e, "Full clear failed, removing known keys");
        remove_known_keys(local);
    }

    if let Some(session) = session {
        if let Err(e) = session.clear() {
            debug!(error = %e, "Failed to clear session storage");
        }
    }

    remove_known_keys(local);
    info!("Local storage cleared");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::keys::{GUEST_SCORES_KEY, USER_ID_KEY};
    use crate::storage::{InMemoryStore, StorageError};
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Store whose clear() always fails, like a storage area that rejects bulk operations
    struct NoClearStore {
        items: Mutex<HashMap<String, String>>,
    }

    impl KeyValueStore for NoClearStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            Ok(self.items.lock().unwrap().get(key).cloned())
        }
        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.items
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_string());
            Ok(())
        }
        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.items.lock().unwrap().remove(key);
            Ok(())
        }
        fn clear(&self) -> Result<(), StorageError> {
            Err(StorageError::Unavailable("clear disabled".to_string()))
        }
    }

    #[test]
    fn test_clears_local_and_session_stores() {
        let local = InMemoryStore::with_items([(USER_ID_KEY, "user-1"), ("other", "x")]);
        let session = InMemoryStore::with_items([("tab", "1")]);

        clear_all_local_storage(&local, Some(&session));

        assert!(local.is_empty());
        assert!(session.is_empty());
    }

    #[test]
    fn test_falls_back_to_known_keys_when_clear_fails() {
        let local = NoClearStore {
            items: Mutex::new(HashMap::from([
                (USER_ID_KEY.to_string(), "user-1".to_string()),
                (GUEST_SCORES_KEY.to_string(), "[]".to_string()),
                ("unrelated".to_string(), "kept".to_string()),
            ])),
        };

        clear_all_local_storage(&local, None);

        assert_eq!(local.get_item(USER_ID_KEY).unwrap(), None);
        assert_eq!(local.get_item(GUEST_SCORES_KEY).unwrap(), None);
        assert_eq!(local.get_item("unrelated").unwrap(), Some("kept".to_string()));
    }

    #[test]
    fn test_failing_session_store_does_not_stop_cleanup() {
        let local = InMemoryStore::with_items([(USER_ID_KEY, "user-1")]);
        let session = NoClearStore {
            items: Mutex::new(HashMap::new()),
        };

        clear_all_local_storage(&local, Some(&session));
        assert!(local.is_empty());
    }
}
