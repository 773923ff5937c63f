use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use misarcade::records::{filter, CACHE_COLLECTION};
use misarcade::{AppError, InMemoryRecordStore, ListQuery, ListResult, RecordStore};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Holds a cache lookup for one game key until the test releases it
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    /// Resolves once the held request has reached the store
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.release.notify_one();
    }
}

/// Record store backed by `InMemoryRecordStore` that records every call and
/// can hold or fail individual requests
#[derive(Default)]
pub struct MockRecordStore {
    inner: InMemoryRecordStore,
    gates: Mutex<HashMap<String, Arc<Gate>>>,
    calls: Mutex<Vec<String>>,
    cache_lookups: AtomicUsize,
    list_errors: Mutex<HashMap<String, AppError>>,
    update_errors: Mutex<VecDeque<AppError>>,
    create_error: Mutex<Option<AppError>>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(self, collection: &str, records: Vec<Value>) -> Self {
        self.inner.insert_all(collection, records);
        self
    }

    /// Makes the next cache lookup for `game_key` wait for `Gate::release`
    pub fn hold(&self, game_key: &str) -> Arc<Gate> {
        let gate = Arc::new(Gate::default());
        self.gates
            .lock()
            .unwrap()
            .insert(filter::eq("gamekey", game_key), gate.clone());
        gate
    }

    /// Every list call on `collection` fails with `error`
    pub fn fail_list(&self, collection: &str, error: AppError) {
        self.list_errors
            .lock()
            .unwrap()
            .insert(collection.to_string(), error);
    }

    /// Queues an error for the next update call
    pub fn fail_next_update(&self, error: AppError) {
        self.update_errors.lock().unwrap().push_back(error);
    }

    pub fn fail_create(&self, error: AppError) {
        *self.create_error.lock().unwrap() = Some(error);
    }

    pub fn cache_lookups(&self) -> usize {
        self.cache_lookups.load(Ordering::SeqCst)
    }

    /// Calls in the order they were made, e.g. `update:sessions:user-1`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(prefix))
            .count()
    }

    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.inner.records(collection)
    }

    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    async fn get_list(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<ListResult<Value>, AppError> {
        self.log(format!(
            "list:{}:{}",
            collection,
            query.filter.as_deref().unwrap_or("")
        ));

        if collection == CACHE_COLLECTION {
            self.cache_lookups.fetch_add(1, Ordering::SeqCst);
            let gate = query
                .filter
                .as_ref()
                .and_then(|filter| self.gates.lock().unwrap().remove(filter));
            if let Some(gate) = gate {
                gate.entered.notify_one();
                gate.release.notified().await;
            }
        }

        let failure = self.list_errors.lock().unwrap().get(collection).cloned();
        if let Some(error) = failure {
            return Err(error);
        }
        self.inner.get_list(collection, query).await
    }

    async fn create(&self, collection: &str, body: &Value) -> Result<Value, AppError> {
        let id = body.get("id").and_then(Value::as_str).unwrap_or_default();
        self.log(format!("create:{collection}:{id}"));

        let failure = self.create_error.lock().unwrap().clone();
        if let Some(error) = failure {
            return Err(error);
        }
        self.inner.create(collection, body).await
    }

    async fn update(&self, collection: &str, id: &str, body: &Value) -> Result<Value, AppError> {
        self.log(format!("update:{collection}:{id}"));

        let failure = self.update_errors.lock().unwrap().pop_front();
        if let Some(error) = failure {
            return Err(error);
        }
        self.inner.update(collection, id, body).await
    }

    fn file_url(&self, collection: &str, record: &Value, filename: &str) -> Option<String> {
        self.inner.file_url(collection, record, filename)
    }
}
