use tracing::{debug, info};
use uuid::Uuid;

use super::keys::{
    GUEST_ID_PREFIX, USER_AVATAR_BASE64_KEY, USER_AVATAR_URL_KEY, USER_ID_KEY, USER_NAME_KEY,
};
use super::store::{KeyValueStore, StorageError};

const DEFAULT_GUEST_ID: &str = "guest";
const DEFAULT_GUEST_NAME: &str = "Guest Player";

/// Identity of the local user as recorded in storage
#[derive(Debug, Clone, PartialEq)]
pub struct LocalIdentity {
    pub user_id: String,
    pub display_name: String,
    pub avatar_url: Option<String>,
    pub avatar_base64: Option<String>,
}

impl LocalIdentity {
    /// Identity shown next to guest scores. Falls back to a generic guest when
    /// nothing is stored.
    pub fn guest_profile(store: &dyn KeyValueStore) -> Self {
        Self {
            user_id: current_user_id(store).unwrap_or_else(|| DEFAULT_GUEST_ID.to_string()),
            display_name: read_non_empty(store, USER_NAME_KEY)
                .unwrap_or_else(|| DEFAULT_GUEST_NAME.to_string()),
            avatar_url: read_non_empty(store, USER_AVATAR_URL_KEY),
            avatar_base64: read_non_empty(store, USER_AVATAR_BASE64_KEY),
        }
    }

    pub fn is_guest(&self) -> bool {
        is_guest_id(&self.user_id)
    }
}

fn read_non_empty(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get_item(key) {
        Ok(value) => value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()),
        Err(e) => {
            debug!(key = %key, error = %e, "Failed to read identity key");
            None
        }
    }
}

/// Returns the stored user id, if any. Unreadable storage counts as signed out.
pub fn current_user_id(store: &dyn KeyValueStore) -> Option<String> {
    read_non_empty(store, USER_ID_KEY)
}

pub fn is_guest_id(user_id: &str) -> bool {
    user_id.starts_with(GUEST_ID_PREFIX)
}

/// Records a signed-in user
pub fn sign_in(
    store: &dyn KeyValueStore,
    user_id: &str,
    display_name: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<(), StorageError> {
    store.set_item(USER_ID_KEY, user_id)?;
    if let Some(name) = display_name {
        store.set_item(USER_NAME_KEY, name)?;
    }
    if let Some(url) = avatar_url {
        store.set_item(USER_AVATAR_URL_KEY, url)?;
    }
    info!(user_id = %user_id, "Signed in");
    Ok(())
}

/// Records a new guest identity and returns its generated id
pub fn sign_in_guest(
    store: &dyn KeyValueStore,
    display_name: Option<&str>,
) -> Result<String, StorageError> {
    let user_id = format!("{}{}", GUEST_ID_PREFIX, Uuid::new_v4());
    store.set_item(USER_ID_KEY, &user_id)?;
    store.set_item(USER_NAME_KEY, display_name.unwrap_or(DEFAULT_GUEST_NAME))?;
    info!(user_id = %user_id, "Signed in as guest");
    Ok(user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;

    #[test]
    fn test_current_user_id_ignores_blank_values() {
        let store = InMemoryStore::with_items([(USER_ID_KEY, "   ")]);
        assert_eq!(current_user_id(&store), None);

        store.set_item(USER_ID_KEY, " user-7 ").unwrap();
        assert_eq!(current_user_id(&store), Some("user-7".to_string()));
    }

    #[test]
    fn test_guest_profile_defaults() {
        let store = InMemoryStore::new();
        let identity = LocalIdentity::guest_profile(&store);

        assert_eq!(identity.user_id, "guest");
        assert_eq!(identity.display_name, "Guest Player");
        assert_eq!(identity.avatar_base64, None);
    }

    #[test]
    fn test_sign_in_guest_generates_prefixed_id() {
        let store = InMemoryStore::new();
        let id = sign_in_guest(&store, Some("Pixel")).unwrap();

        assert!(is_guest_id(&id));
        let identity = LocalIdentity::guest_profile(&store);
        assert_eq!(identity.user_id, id);
        assert_eq!(identity.display_name, "Pixel");
        assert!(identity.is_guest());
    }

    #[test]
    fn test_sign_in_records_identity() {
        let store = InMemoryStore::new();
        sign_in(&store, "user-1", Some("Ada Lovelace"), None).unwrap();

        assert_eq!(current_user_id(&store), Some("user-1".to_string()));
        assert!(!is_guest_id("user-1"));
        assert_eq!(
            store.get_item(USER_NAME_KEY).unwrap(),
            Some("Ada Lovelace".to_string())
        );
    }
}
