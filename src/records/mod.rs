// Remote record store access
//
// The application only consumes the record API: listing with filters, and
// create/update by id. Everything goes through the RecordStore trait so the
// HTTP client can be swapped for the in-memory store.

// Public API - what other modules can use
pub use memory::InMemoryRecordStore;
pub use models::{ListQuery, ListResult};
pub use pocketbase::PocketBaseClient;
pub use store::RecordStore;

// Internal modules
pub mod filter;
mod memory;
mod models;
mod pocketbase;
mod store;

/// Aggregate score cache, one record per game key (read-only)
pub const CACHE_COLLECTION: &str = "cache";
/// User profiles used for names and avatars (read-only)
pub const USERS_COLLECTION: &str = "mis_users";
/// Last-seen page per signed-in user (read-write)
pub const SESSIONS_COLLECTION: &str = "sessions";
