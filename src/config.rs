use std::{env, path::PathBuf, time::Duration};

use tracing::{info, warn};

pub const DEFAULT_STORAGE_PATH: &str = ".misarcade/local-storage.json";

#[derive(Debug, Clone)]
pub struct ArcadeConfig {
    /// Base URL of the record API. `None` runs everything in local (guest) mode.
    pub pocketbase_url: Option<String>,
    pub storage_path: PathBuf,
    pub heartbeat_interval: Duration,
    pub leaderboard_timeout: Duration,
}

impl Default for ArcadeConfig {
    fn default() -> Self {
        Self {
            pocketbase_url: None,
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            heartbeat_interval: Duration::from_secs(60),
            leaderboard_timeout: Duration::from_secs(15),
        }
    }
}

impl ArcadeConfig {
    pub fn load() -> Self {
        Self {
            pocketbase_url: var("POCKETBASE_URL").filter(|url| !url.is_empty()),
            storage_path: var("ARCADE_STORAGE_PATH")
                .filter(|path| !path.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    info!("ARCADE_STORAGE_PATH not set, using default: {DEFAULT_STORAGE_PATH}");
                    PathBuf::from(DEFAULT_STORAGE_PATH)
                }),
            heartbeat_interval: Duration::from_secs(try_load_positive(
                "ARCADE_HEARTBEAT_SECS",
                60,
            )),
            leaderboard_timeout: Duration::from_secs(try_load_positive(
                "ARCADE_LEADERBOARD_TIMEOUT_SECS",
                15,
            )),
        }
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string())
}

fn try_load_positive(key: &str, default: u64) -> u64 {
    match var(key).filter(|value| !value.is_empty()) {
        None => {
            info!("{key} not set, using default: {default}");
            default
        }
        Some(raw) => match raw.parse::<u64>() {
            Ok(value) if value > 0 => value,
            Ok(_) => {
                warn!("{key} must be positive, using default: {default}");
                default
            }
            Err(e) => {
                warn!("Invalid {key} value: {e}, using default: {default}");
                default
            }
        },
    }
}
