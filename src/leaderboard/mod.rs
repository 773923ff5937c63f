// Leaderboard loading
//
// Scores come either from the remote aggregate cache (signed-in users) or from
// local storage (guests). Both paths end in the same ranked entry list.

// Public API - what other modules can use
pub use aggregate::{best_by_user, guest_entries, rank_entries, top_scores, LEADERBOARD_SIZE};
pub use loader::{LeaderboardLoader, LoaderConfig};
pub use models::{CacheRecord, LeaderboardEntry, LeaderboardUserInfo, RawScore, UserProfile};
pub use state::LeaderboardState;

// Internal modules
mod aggregate;
mod loader;
pub mod models;
mod state;
