use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Remote record of the last page a signed-in user was seen on.
/// The record id is the user id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,
    pub user: String,
    pub last_action: String,
}

impl SessionRecord {
    pub fn new(user_id: &str, last_action: &str) -> Self {
        Self {
            id: user_id.to_string(),
            user: user_id.to_string(),
            last_action: last_action.to_string(),
        }
    }

    pub fn from_value(value: &Value) -> Option<Self> {
        let text = |field: &str| value.get(field).and_then(Value::as_str).map(str::to_string);
        Some(Self {
            id: text("id")?,
            user: text("user").unwrap_or_default(),
            last_action: text("last_action").unwrap_or_default(),
        })
    }

    /// Body sent when the record has to be created
    pub fn create_body(&self) -> Value {
        json!({
            "id": self.id,
            "user": self.user,
            "last_action": self.last_action,
        })
    }

    /// Body sent on every regular heartbeat
    pub fn update_body(last_action: &str) -> Value {
        json!({ "last_action": last_action })
    }
}

/// What a single heartbeat ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatOutcome {
    /// Nobody signed in, or no remote configured
    Skipped,
    /// Existing record updated
    Updated,
    /// Record was missing and has been created
    Created,
    /// Create failed but the follow-up update succeeded
    Reconciled,
    /// Gave up; the failure was logged and swallowed
    Failed,
}
