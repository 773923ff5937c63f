use tokio::sync::broadcast;
use tracing::debug;

/// Signals that change whether a session should be tracked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A user signed in somewhere in the application
    Login,
    /// The user signed out; local state must be purged
    Logout,
    /// A storage entry was changed by another context. `None` means the whole store was cleared.
    StorageChanged { key: Option<String> },
}

/// Event bus for login state, shared by every context that tracks sessions
#[derive(Debug, Clone)]
pub struct SessionEventBus {
    sender: broadcast::Sender<SessionEvent>,
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

impl SessionEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Emits an event to all current subscribers
    pub fn emit(&self, event: SessionEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => {
                debug!(receivers = receiver_count, "Session event emitted");
            }
            Err(_) => {
                debug!("Session event emitted with no receivers");
            }
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
