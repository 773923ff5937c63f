use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use misarcade::records::{CACHE_COLLECTION, SESSIONS_COLLECTION, USERS_COLLECTION};
use misarcade::storage::keys::USER_ID_KEY;
use misarcade::{
    CurrentPage, HeartbeatConfig, InMemoryStore, LeaderboardLoader, LoaderConfig,
    SessionTracker,
};

use super::mocks::MockRecordStore;

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub records: Arc<MockRecordStore>,
    pub local: Arc<InMemoryStore>,
    pub session_store: Arc<InMemoryStore>,
    pub page: CurrentPage,
    pub loader_config: LoaderConfig,
    pub heartbeat: HeartbeatConfig,
}

impl TestSetup {
    pub fn loader(&self) -> LeaderboardLoader {
        LeaderboardLoader::new(
            Some(self.records.clone()),
            self.local.clone(),
            self.loader_config.clone(),
        )
    }

    pub fn tracker(&self) -> SessionTracker {
        SessionTracker::builder(self.local.clone(), self.page.clone())
            .with_records(Some(self.records.clone()))
            .with_session_store(self.session_store.clone())
            .with_config(self.heartbeat.clone())
            .build()
    }
}

pub struct TestSetupBuilder {
    user_id: Option<String>,
    records: MockRecordStore,
    timeout: Duration,
    heartbeat: Duration,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            user_id: None,
            records: MockRecordStore::new(),
            timeout: Duration::from_secs(15),
            heartbeat: Duration::from_secs(60),
        }
    }

    pub fn signed_in_as(mut self, user_id: &str) -> Self {
        self.user_id = Some(user_id.to_string());
        self
    }

    /// Adds a cache record holding `scores` as `(user, score)` pairs
    pub fn with_scores(mut self, game_key: &str, scores: &[(&str, f64)]) -> Self {
        let high_scores: Vec<Value> = scores
            .iter()
            .map(|(user, score)| json!({"user": user, "score": score}))
            .collect();
        self.records = self.records.with_records(
            CACHE_COLLECTION,
            vec![json!({
                "id": format!("cache-{game_key}"),
                "gamekey": game_key,
                "updated": "2024-05-01 12:00:00.000Z",
                "high_scores": high_scores,
            })],
        );
        self
    }

    pub fn with_profile(mut self, user_id: &str, first_name: &str, last_name: &str) -> Self {
        self.records = self.records.with_records(
            USERS_COLLECTION,
            vec![json!({
                "id": user_id,
                "collectionId": "users0000000001",
                "firstName": first_name,
                "lastName": last_name,
            })],
        );
        self
    }

    pub fn with_session(mut self, user_id: &str, last_action: &str) -> Self {
        self.records = self.records.with_records(
            SESSIONS_COLLECTION,
            vec![json!({"id": user_id, "user": user_id, "last_action": last_action})],
        );
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_heartbeat(mut self, interval: Duration) -> Self {
        self.heartbeat = interval;
        self
    }

    pub fn build(self) -> TestSetup {
        let local = match &self.user_id {
            Some(user_id) => InMemoryStore::with_items([(USER_ID_KEY, user_id.as_str())]),
            None => InMemoryStore::new(),
        };

        TestSetup {
            records: Arc::new(self.records),
            local: Arc::new(local),
            session_store: Arc::new(InMemoryStore::with_items([("tab-state", "open")])),
            page: CurrentPage::new("https://arcade.example/"),
            loader_config: LoaderConfig {
                timeout: self.timeout,
                ..LoaderConfig::default()
            },
            heartbeat: HeartbeatConfig {
                interval: self.heartbeat,
            },
        }
    }
}

impl Default for TestSetupBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Polls `condition` until it holds, failing the test after two seconds
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition was not reached in time");
}
