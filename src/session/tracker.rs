use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use super::events::{SessionEvent, SessionEventBus};
use super::models::{HeartbeatOutcome, SessionRecord};
use super::page::CurrentPage;
use crate::records::{RecordStore, SESSIONS_COLLECTION};
use crate::storage::keys::USER_ID_KEY;
use crate::storage::{clear_all_local_storage, current_user_id, KeyValueStore};

/// Configuration for the session heartbeat
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Time between heartbeats; the first one is sent immediately
    pub interval: Duration,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
        }
    }
}

struct TrackerInner {
    records: Option<Arc<dyn RecordStore>>,
    local: Arc<dyn KeyValueStore>,
    session_store: Option<Arc<dyn KeyValueStore>>,
    page: CurrentPage,
    config: HeartbeatConfig,
    ticker: Mutex<Option<JoinHandle<()>>>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

/// Reports the current page of the signed-in user to the sessions collection
///
/// Session tracking is best effort: nothing here returns an error. Starting
/// and attaching spawn tokio tasks, so they must run inside a runtime.
#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<TrackerInner>,
}

impl SessionTracker {
    pub fn builder(local: Arc<dyn KeyValueStore>, page: CurrentPage) -> SessionTrackerBuilder {
        SessionTrackerBuilder::new(local, page)
    }

    fn from_weak(weak: &Weak<TrackerInner>) -> Option<Self> {
        weak.upgrade().map(|inner| Self { inner })
    }

    pub fn is_tracking(&self) -> bool {
        self.inner
            .ticker
            .lock()
            .map(|ticker| ticker.as_ref().is_some_and(|handle| !handle.is_finished()))
            .unwrap_or(false)
    }

    fn is_logged_in(&self) -> bool {
        current_user_id(self.inner.local.as_ref()).is_some()
    }

    /// Starts the heartbeat. Does nothing (and returns false) when already
    /// tracking, when nobody is signed in, or when no remote is configured.
    pub fn start_tracking(&self) -> bool {
        let Ok(mut ticker) = self.inner.ticker.lock() else {
            return false;
        };
        if ticker.is_some() {
            return false;
        }
        if self.inner.records.is_none() {
            debug!("Session tracking disabled: no record store configured");
            return false;
        }
        if !self.is_logged_in() {
            return false;
        }

        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.interval;

        *ticker = Some(tokio::spawn(async move {
            let mut heartbeat = interval(period);
            loop {
                heartbeat.tick().await;
                let Some(tracker) = SessionTracker::from_weak(&weak) else {
                    break;
                };
                tracker.track_session().await;
            }
        }));

        info!(interval_secs = period.as_secs(), "Session tracking started");
        true
    }

    pub fn stop_tracking(&self) {
        let handle = self
            .inner
            .ticker
            .lock()
            .ok()
            .and_then(|mut ticker| ticker.take());

        if let Some(handle) = handle {
            handle.abort();
            info!("Session tracking stopped");
        }
    }

    /// Starts or stops tracking to match the stored identity
    pub fn check_login_status(&self) {
        if self.is_logged_in() {
            self.start_tracking();
        } else {
            self.stop_tracking();
        }
    }

    /// Sends one heartbeat: update the session record, create it when it does
    /// not exist, and retry the update once when the create loses a race
    #[instrument(skip(self))]
    pub async fn track_session(&self) -> HeartbeatOutcome {
        let Some(records) = self.inner.records.as_ref() else {
            return HeartbeatOutcome::Skipped;
        };
        let Some(user_id) = current_user_id(self.inner.local.as_ref()) else {
            return HeartbeatOutcome::Skipped;
        };

        let page = self.inner.page.get();
        let update = SessionRecord::update_body(&page);

        match records.update(SESSIONS_COLLECTION, &user_id, &update).await {
            Ok(_) => {
                debug!(user_id = %user_id, "Session heartbeat recorded");
                HeartbeatOutcome::Updated
            }
            Err(e) if e.is_not_found() => {
                let record = SessionRecord::new(&user_id, &page);
                match records
                    .create(SESSIONS_COLLECTION, &record.create_body())
                    .await
                {
                    Ok(_) => {
                        debug!(user_id = %user_id, "Session record created");
                        HeartbeatOutcome::Created
                    }
                    Err(create_error) => {
                        debug!(
                            user_id = %user_id,
                            error = %create_error,
                            "Session create failed, retrying update"
                        );
                        match records.update(SESSIONS_COLLECTION, &user_id, &update).await {
                            Ok(_) => HeartbeatOutcome::Reconciled,
                            Err(e) => {
                                debug!(user_id = %user_id, error = %e, "Session heartbeat dropped");
                                HeartbeatOutcome::Failed
                            }
                        }
                    }
                }
            }
            Err(e) => {
                debug!(user_id = %user_id, error = %e, "Session heartbeat dropped");
                HeartbeatOutcome::Failed
            }
        }
    }

    /// Reacts to a login-state signal
    pub fn handle_event(&self, event: &SessionEvent) {
        match event {
            SessionEvent::Login => self.check_login_status(),
            SessionEvent::Logout => {
                clear_all_local_storage(
                    self.inner.local.as_ref(),
                    self.inner.session_store.as_deref(),
                );
                self.stop_tracking();
            }
            SessionEvent::StorageChanged { key } => {
                if key.as_deref().map_or(true, |key| key == USER_ID_KEY) {
                    self.check_login_status();
                }
            }
        }
    }

    /// Syncs with the current login state and follows `bus` until `detach`
    pub fn attach(&self, bus: &SessionEventBus) {
        let mut events = bus.subscribe();
        self.check_login_status();

        let weak = Arc::downgrade(&self.inner);
        let listener = tokio::spawn(async move {
            loop {
                let event = match events.recv().await {
                    Ok(event) => Some(event),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Session events lagged, resyncing");
                        None
                    }
                    Err(RecvError::Closed) => break,
                };

                let Some(tracker) = SessionTracker::from_weak(&weak) else {
                    break;
                };
                match event {
                    Some(event) => tracker.handle_event(&event),
                    None => tracker.check_login_status(),
                }
            }
        });

        let previous = self
            .inner
            .listener
            .lock()
            .ok()
            .and_then(|mut slot| slot.replace(listener));
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Teardown: stops the heartbeat and stops listening for events
    pub fn detach(&self) {
        self.stop_tracking();
        let listener = self
            .inner
            .listener
            .lock()
            .ok()
            .and_then(|mut slot| slot.take());
        if let Some(listener) = listener {
            listener.abort();
        }
    }

    /// Session records of the current user (all records when signed out).
    /// Diagnostic helper; failures yield an empty list.
    #[instrument(skip(self))]
    pub async fn own_sessions(&self) -> Vec<SessionRecord> {
        let Some(records) = self.inner.records.as_ref() else {
            return Vec::new();
        };

        match records.get_full_list(SESSIONS_COLLECTION, None).await {
            Ok(items) => {
                let user_id = current_user_id(self.inner.local.as_ref());
                items
                    .iter()
                    .filter_map(SessionRecord::from_value)
                    .filter(|session| user_id.as_ref().map_or(true, |id| &session.user == id))
                    .collect()
            }
            Err(e) => {
                debug!(error = %e, "Failed to list sessions");
                Vec::new()
            }
        }
    }
}

pub struct SessionTrackerBuilder {
    records: Option<Arc<dyn RecordStore>>,
    local: Arc<dyn KeyValueStore>,
    session_store: Option<Arc<dyn KeyValueStore>>,
    page: CurrentPage,
    config: HeartbeatConfig,
}

impl SessionTrackerBuilder {
    fn new(local: Arc<dyn KeyValueStore>, page: CurrentPage) -> Self {
        Self {
            records: None,
            local,
            session_store: None,
            page,
            config: HeartbeatConfig::default(),
        }
    }

    pub fn with_records(mut self, records: Option<Arc<dyn RecordStore>>) -> Self {
        self.records = records;
        self
    }

    /// Session-scoped store cleared together with local storage on logout
    pub fn with_session_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.session_store = Some(store);
        self
    }

    pub fn with_config(mut self, config: HeartbeatConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> SessionTracker {
        SessionTracker {
            inner: Arc::new(TrackerInner {
                records: self.records,
                local: self.local,
                session_store: self.session_store,
                page: self.page,
                config: self.config,
                ticker: Mutex::new(None),
                listener: Mutex::new(None),
            }),
        }
    }
}
