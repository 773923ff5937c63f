// Library crate for the arcade client core
// This file exposes the public API for the CLI and integration tests

pub mod config;
pub mod leaderboard;
pub mod records;
pub mod session;
pub mod shared;
pub mod storage;

// Re-export commonly used types for easier access in tests
pub use config::ArcadeConfig;
pub use leaderboard::{LeaderboardEntry, LeaderboardLoader, LeaderboardState, LoaderConfig};
pub use records::{InMemoryRecordStore, ListQuery, ListResult, PocketBaseClient, RecordStore};
pub use session::{
    CurrentPage, HeartbeatConfig, HeartbeatOutcome, SessionEvent, SessionEventBus,
    SessionTracker,
};
pub use shared::{AppError, AppState};
pub use storage::{InMemoryStore, JsonFileStore, KeyValueStore, StorageError};
