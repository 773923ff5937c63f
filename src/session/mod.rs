// Public API - what other modules can use
pub use events::{SessionEvent, SessionEventBus};
pub use models::{HeartbeatOutcome, SessionRecord};
pub use page::CurrentPage;
pub use tracker::{HeartbeatConfig, SessionTracker, SessionTrackerBuilder};

// Internal modules
mod events;
pub mod models;
mod page;
mod tracker;
