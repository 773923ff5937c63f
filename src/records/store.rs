use async_trait::async_trait;
use serde_json::Value;

use super::models::{ListQuery, ListResult};
use crate::shared::AppError;

/// Page size used when reading a whole collection
pub const FULL_LIST_BATCH: u32 = 500;

/// Trait for the remote record API
///
/// Records are plain JSON objects; callers decode the fields they need.
/// Implementations never cancel a request on their own.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_list(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<ListResult<Value>, AppError>;

    async fn create(&self, collection: &str, body: &Value) -> Result<Value, AppError>;

    /// Fails with `AppError::NotFound` when no record has this id
    async fn update(&self, collection: &str, id: &str, body: &Value) -> Result<Value, AppError>;

    /// Public URL of a file attached to `record`
    fn file_url(&self, collection: &str, record: &Value, filename: &str) -> Option<String>;

    /// Reads every page matching `filter`
    async fn get_full_list(
        &self,
        collection: &str,
        filter: Option<&str>,
    ) -> Result<Vec<Value>, AppError> {
        let mut items = Vec::new();
        let mut page = 1;

        loop {
            let mut query = ListQuery::new(page, FULL_LIST_BATCH);
            if let Some(filter) = filter {
                query = query.filter(filter);
            }

            let result = self.get_list(collection, &query).await?;
            let received = result.items.len();
            items.extend(result.items);

            if received < FULL_LIST_BATCH as usize || page >= result.total_pages {
                break;
            }
            page += 1;
        }

        Ok(items)
    }
}
