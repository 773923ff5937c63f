// Local persistence: key-value store abstraction, guest scores and the local identity

// Public API - what other modules can use
pub use cleanup::clear_all_local_storage;
pub use guest_scores::{
    add_guest_score, guest_best_scores, guest_scores, guest_scores_for_game, GuestScoreEntry,
};
pub use identity::{current_user_id, is_guest_id, sign_in, sign_in_guest, LocalIdentity};
pub use store::{InMemoryStore, JsonFileStore, KeyValueStore, StorageError};

// Internal modules
mod cleanup;
mod guest_scores;
mod identity;
pub mod keys;
mod store;
