use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::ArcadeConfig;
use crate::leaderboard::{LeaderboardLoader, LoaderConfig};
use crate::records::{PocketBaseClient, RecordStore};
use crate::session::{CurrentPage, HeartbeatConfig, SessionEventBus, SessionTracker};
use crate::storage::{InMemoryStore, JsonFileStore, KeyValueStore, StorageError};

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub local_store: Arc<dyn KeyValueStore>,
    pub session_store: Arc<dyn KeyValueStore>,
    pub records: Option<Arc<dyn RecordStore>>,
    pub event_bus: SessionEventBus,
    pub page: CurrentPage,
    pub config: ArcadeConfig,
}

impl AppState {
    pub fn new(
        local_store: Arc<dyn KeyValueStore>,
        records: Option<Arc<dyn RecordStore>>,
        config: ArcadeConfig,
    ) -> Self {
        Self {
            local_store,
            session_store: Arc::new(InMemoryStore::new()),
            records,
            event_bus: SessionEventBus::default(),
            page: CurrentPage::default(),
            config,
        }
    }

    /// Wires the file-backed local store and, when a URL is configured, the
    /// PocketBase client. A bad URL leaves the app in local-only mode.
    pub fn from_config(config: ArcadeConfig) -> Result<Self, AppError> {
        let local_store: Arc<dyn KeyValueStore> =
            Arc::new(JsonFileStore::open(config.storage_path.clone())?);

        let records: Option<Arc<dyn RecordStore>> = match config.pocketbase_url.as_deref() {
            Some(url) => match PocketBaseClient::new(url) {
                Ok(client) => {
                    info!(url = %url, "Using PocketBase record store");
                    Some(Arc::new(client.with_auth_store(local_store.clone())))
                }
                Err(e) => {
                    warn!(error = %e, "Record store unavailable, running in local mode");
                    None
                }
            },
            None => {
                info!("No POCKETBASE_URL configured, running in local mode");
                None
            }
        };

        Ok(Self::new(local_store, records, config))
    }

    pub fn is_remote_configured(&self) -> bool {
        self.records.is_some()
    }

    pub fn leaderboard(&self) -> LeaderboardLoader {
        LeaderboardLoader::new(
            self.records.clone(),
            self.local_store.clone(),
            LoaderConfig {
                timeout: self.config.leaderboard_timeout,
                ..LoaderConfig::default()
            },
        )
    }

    pub fn session_tracker(&self) -> SessionTracker {
        SessionTracker::builder(self.local_store.clone(), self.page.clone())
            .with_records(self.records.clone())
            .with_session_store(self.session_store.clone())
            .with_config(HeartbeatConfig {
                interval: self.config.heartbeat_interval,
            })
            .build()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timeout - please check your connection")]
    Timeout,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Internal error")]
    Internal,
}

impl AppError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::NotFound(_))
    }

    /// HTTP status of the failure, when it came from the record API
    pub fn status(&self) -> Option<u16> {
        match self {
            AppError::NotFound(_) => Some(404),
            AppError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}
