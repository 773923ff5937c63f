use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use super::aggregate::{
    best_by_user, guest_entries, rank_entries, top_scores, user_info, LEADERBOARD_SIZE,
};
use super::models::{CacheRecord, LeaderboardEntry, LeaderboardUserInfo, UserProfile};
use super::state::LeaderboardState;
use crate::records::{filter, ListQuery, RecordStore, CACHE_COLLECTION, USERS_COLLECTION};
use crate::shared::AppError;
use crate::storage::{
    current_user_id, guest_scores_for_game, is_guest_id, KeyValueStore, LocalIdentity,
};

/// Tuning for leaderboard loads
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// After this long a pending load is reported as failed. The request itself keeps running.
    pub timeout: Duration,
    /// Maximum number of rows
    pub limit: usize,
    /// Page size of the profile lookup
    pub profile_page_size: u32,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            limit: LEADERBOARD_SIZE,
            profile_page_size: 50,
        }
    }
}

/// Identifies one load. Results are only applied while the ticket is the
/// latest one issued and the game key has not moved on.
#[derive(Debug, Clone)]
struct LoadTicket {
    id: u64,
    key: String,
}

struct LoaderInner {
    records: Option<Arc<dyn RecordStore>>,
    storage: Arc<dyn KeyValueStore>,
    config: LoaderConfig,
    game_key: Mutex<String>,
    last_loaded_key: Mutex<String>,
    state: watch::Sender<LeaderboardState>,
    request_seq: AtomicU64,
    disposed: AtomicBool,
}

impl LoaderInner {
    fn current_key(&self) -> String {
        self.game_key
            .lock()
            .map(|key| key.trim().to_string())
            .unwrap_or_default()
    }

    fn last_loaded_key(&self) -> String {
        self.last_loaded_key
            .lock()
            .map(|key| key.clone())
            .unwrap_or_default()
    }

    fn set_last_loaded_key(&self, key: &str) {
        if let Ok(mut last) = self.last_loaded_key.lock() {
            *last = key.to_string();
        }
    }

    fn issue(&self, key: String) -> LoadTicket {
        let id = self.request_seq.fetch_add(1, Ordering::SeqCst) + 1;
        LoadTicket { id, key }
    }

    fn invalidate(&self) {
        self.request_seq.fetch_add(1, Ordering::SeqCst);
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn is_latest(&self, ticket: &LoadTicket) -> bool {
        !self.is_disposed() && self.request_seq.load(Ordering::SeqCst) == ticket.id
    }

    fn is_current(&self, ticket: &LoadTicket) -> bool {
        self.is_latest(ticket) && self.current_key() == ticket.key
    }

    fn update(&self, modify: impl FnOnce(&mut LeaderboardState)) {
        self.state.send_modify(modify);
    }
}

/// Loads the top scores of one game and publishes them as `LeaderboardState`
///
/// Signed-in users read the remote score cache; guests (and everyone when no
/// record store is configured) read the scores kept in local storage. Clones
/// share the same state.
#[derive(Clone)]
pub struct LeaderboardLoader {
    inner: Arc<LoaderInner>,
}

impl LeaderboardLoader {
    pub fn new(
        records: Option<Arc<dyn RecordStore>>,
        storage: Arc<dyn KeyValueStore>,
        config: LoaderConfig,
    ) -> Self {
        let (state, _) = watch::channel(LeaderboardState::default());
        Self {
            inner: Arc::new(LoaderInner {
                records,
                storage,
                config,
                game_key: Mutex::new(String::new()),
                last_loaded_key: Mutex::new(String::new()),
                state,
                request_seq: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    pub fn game_key(&self) -> String {
        self.inner.current_key()
    }

    /// Switches to another game. The state is reset before this returns;
    /// the returned task performs the load.
    ///
    /// Setting the current key again is a no-op (use `refresh` to reload).
    pub fn set_game_key(&self, key: impl Into<String>) -> JoinHandle<()> {
        let key = key.into();
        if key.trim() == self.inner.current_key() {
            debug!(game_key = %key, "Leaderboard game key unchanged");
            return tokio::spawn(async {});
        }
        debug!(game_key = %key, "Leaderboard game key changed");

        if let Ok(mut current) = self.inner.game_key.lock() {
            *current = key;
        }
        self.inner.invalidate();
        self.inner.update(|state| {
            state.has_loaded = false;
            state.entries.clear();
        });

        let loader = self.clone();
        tokio::spawn(async move { loader.load().await })
    }

    pub fn snapshot(&self) -> LeaderboardState {
        self.inner.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<LeaderboardState> {
        self.inner.state.subscribe()
    }

    /// Stops every in-flight load from touching the state again
    pub fn dispose(&self) {
        debug!("Leaderboard loader disposed");
        self.inner.disposed.store(true, Ordering::SeqCst);
    }

    /// Loads the current game unless it is already loaded
    #[instrument(skip(self))]
    pub async fn load(&self) {
        let inner = &self.inner;
        if inner.is_disposed() {
            return;
        }

        let key = inner.current_key();
        if key.is_empty() {
            inner.update(|state| {
                state.entries.clear();
                state.is_loading = false;
            });
            return;
        }

        let has_loaded = inner.state.borrow().has_loaded;
        if has_loaded && inner.last_loaded_key() == key {
            debug!(game_key = %key, "Leaderboard already loaded");
            return;
        }

        let records = match (&inner.records, current_user_id(inner.storage.as_ref())) {
            (Some(records), Some(user_id)) if !is_guest_id(&user_id) => Some(Arc::clone(records)),
            _ => None,
        };
        let guest_mode = records.is_none();

        let ticket = inner.issue(key);
        inner.update(|state| state.is_guest_mode = guest_mode);

        match records {
            Some(records) => self.load_remote(records, ticket).await,
            None => self.load_guest(&ticket),
        }
    }

    /// Forgets the loaded marker and loads again
    pub async fn refresh(&self) {
        self.inner.set_last_loaded_key("");
        self.inner.update(|state| {
            state.has_loaded = false;
            state.entries.clear();
        });
        self.load().await
    }

    fn load_guest(&self, ticket: &LoadTicket) {
        let storage = self.inner.storage.as_ref();
        let scores = guest_scores_for_game(storage, &ticket.key);
        let identity = LocalIdentity::guest_profile(storage);
        let entries = guest_entries(&scores, &identity, self.inner.config.limit);

        debug!(game_key = %ticket.key, rows = entries.len(), "Loaded guest leaderboard");

        self.inner.set_last_loaded_key(&ticket.key);
        self.inner.update(|state| {
            state.entries = entries;
            state.has_loaded = true;
            state.is_loading = false;
            state.error = None;
        });
    }

    async fn load_remote(&self, records: Arc<dyn RecordStore>, ticket: LoadTicket) {
        let inner = &self.inner;
        inner.update(|state| {
            state.is_loading = true;
            state.error = None;
        });

        let timeout = self.arm_timeout(&ticket);
        let outcome = self.fetch_entries(records.as_ref(), &ticket).await;
        timeout.abort();

        match outcome {
            Ok(Some(entries)) if inner.is_current(&ticket) => {
                info!(game_key = %ticket.key, rows = entries.len(), "Leaderboard loaded");
                inner.set_last_loaded_key(&ticket.key);
                inner.update(|state| {
                    state.entries = entries;
                    state.has_loaded = true;
                });
            }
            Ok(_) => {
                debug!(game_key = %ticket.key, request = ticket.id, "Discarding superseded leaderboard result");
            }
            Err(e) if inner.is_latest(&ticket) => {
                warn!(game_key = %ticket.key, error = %e, "Leaderboard load failed");
                inner.update(|state| state.error = Some(e.to_string()));
            }
            Err(e) => {
                debug!(game_key = %ticket.key, error = %e, "Ignoring failure of superseded request");
            }
        }

        if inner.is_latest(&ticket) {
            inner.update(|state| state.is_loading = false);
        }
    }

    fn arm_timeout(&self, ticket: &LoadTicket) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        let id = ticket.id;

        tokio::spawn(async move {
            tokio::time::sleep(inner.config.timeout).await;

            let still_loading = inner.state.borrow().is_loading;
            let latest = !inner.is_disposed() && inner.request_seq.load(Ordering::SeqCst) == id;
            if latest && still_loading {
                warn!(
                    timeout_ms = inner.config.timeout.as_millis() as u64,
                    "Leaderboard request timed out"
                );
                inner.update(|state| {
                    state.is_loading = false;
                    state.error = Some(AppError::Timeout.to_string());
                });
            }
        })
    }

    /// `Ok(None)` when the ticket went stale while waiting
    async fn fetch_entries(
        &self,
        records: &dyn RecordStore,
        ticket: &LoadTicket,
    ) -> Result<Option<Vec<LeaderboardEntry>>, AppError> {
        let query = ListQuery::new(1, 1)
            .filter(filter::eq("gamekey", &ticket.key))
            .sort("-updated");
        let list = records.get_list(CACHE_COLLECTION, &query).await?;

        if !self.inner.is_current(ticket) {
            return Ok(None);
        }

        let cache = list
            .items
            .first()
            .map(CacheRecord::from_value)
            .unwrap_or_default();
        if cache.high_scores.is_empty() {
            return Ok(Some(Vec::new()));
        }

        let top = top_scores(best_by_user(&cache.high_scores), self.inner.config.limit);
        let user_ids: Vec<&str> = top.iter().map(|(user_id, _)| user_id.as_str()).collect();
        let profiles = self.fetch_profiles(records, &user_ids).await;

        if !self.inner.is_current(ticket) {
            return Ok(None);
        }

        Ok(Some(rank_entries(top, &profiles)))
    }

    /// Profile lookup failures only cost the names, never the leaderboard
    async fn fetch_profiles(
        &self,
        records: &dyn RecordStore,
        user_ids: &[&str],
    ) -> HashMap<String, LeaderboardUserInfo> {
        let query = ListQuery::new(1, self.inner.config.profile_page_size)
            .filter(filter::any_eq("id", user_ids));

        match records.get_list(USERS_COLLECTION, &query).await {
            Ok(list) => list
                .items
                .iter()
                .filter_map(UserProfile::from_value)
                .map(|profile| {
                    let info = user_info(&profile, |p, file| {
                        records.file_url(USERS_COLLECTION, &p.record, file)
                    });
                    (profile.id.clone(), info)
                })
                .collect(),
            Err(e) => {
                warn!(error = %e, users = user_ids.len(), "Profile lookup failed, using placeholders");
                HashMap::new()
            }
        }
    }
}
