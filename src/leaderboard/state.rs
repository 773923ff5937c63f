use super::models::LeaderboardEntry;

/// Observable state of one leaderboard view
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeaderboardState {
    pub entries: Vec<LeaderboardEntry>,
    pub is_loading: bool,
    /// A load for the current key completed successfully
    pub has_loaded: bool,
    pub error: Option<String>,
    pub is_guest_mode: bool,
}

impl LeaderboardState {
    /// True only once a load has confirmed there is nothing to show
    pub fn is_empty(&self) -> bool {
        self.has_loaded && !self.is_loading && self.entries.is_empty() && self.error.is_none()
    }
}
