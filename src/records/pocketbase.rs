use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CACHE_CONTROL};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use super::models::{ListQuery, ListResult};
use super::store::RecordStore;
use crate::shared::AppError;
use crate::storage::keys::AUTH_TOKEN_KEY;
use crate::storage::KeyValueStore;

/// HTTP client for a PocketBase server
#[derive(Clone)]
pub struct PocketBaseClient {
    http: reqwest::Client,
    base_url: Url,
    auth_store: Option<Arc<dyn KeyValueStore>>,
}

impl PocketBaseClient {
    pub fn new(base_url: &str) -> Result<Self, AppError> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(AppError::Config("PocketBase URL not configured".to_string()));
        }

        let base_url = Url::parse(trimmed)
            .map_err(|e| AppError::Config(format!("invalid PocketBase URL {trimmed}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(AppError::Config(format!(
                "PocketBase URL cannot be used as a base: {trimmed}"
            )));
        }

        let http = reqwest::Client::builder()
            .user_agent(concat!("misarcade/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| AppError::Config(e.to_string()))?;

        Ok(Self {
            http,
            base_url,
            auth_store: None,
        })
    }

    /// Reads the auth token from `pb_auth` in `store` before every request
    pub fn with_auth_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.auth_store = Some(store);
        self
    }

    fn url(&self, segments: &[&str]) -> Result<Url, AppError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::Config("PocketBase URL cannot be used as a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn auth_token(&self) -> Option<String> {
        let raw = self.auth_store.as_ref()?.get_item(AUTH_TOKEN_KEY).ok()??;
        let parsed: Value = serde_json::from_str(&raw).ok()?;
        parsed
            .get("token")
            .and_then(Value::as_str)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.http.request(method, url).header(CACHE_CONTROL, "no-store");
        match self.auth_token() {
            Some(token) => builder.header(AUTHORIZATION, token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Value, AppError> {
        let response = builder
            .send()
            .await
            .map_err(|e| AppError::Network(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<Value>()
                .await
                .map_err(|e| AppError::Decode(e.to_string()));
        }

        let body = response.json::<Value>().await.unwrap_or(Value::Null);
        let message = body
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        debug!(status = status.as_u16(), message = %message, "Record API request failed");

        if status == StatusCode::NOT_FOUND {
            Err(AppError::NotFound(message))
        } else {
            Err(AppError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}

#[async_trait]
impl RecordStore for PocketBaseClient {
    #[instrument(skip(self, query), fields(page = query.page, per_page = query.per_page))]
    async fn get_list(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<ListResult<Value>, AppError> {
        let url = self.url(&["api", "collections", collection, "records"])?;
        let body = self
            .send(self.request(Method::GET, url).query(&query.to_pairs()))
            .await?;

        serde_json::from_value(body).map_err(|e| {
            warn!(error = %e, "Unexpected list response");
            AppError::Decode(e.to_string())
        })
    }

    #[instrument(skip(self, body))]
    async fn create(&self, collection: &str, body: &Value) -> Result<Value, AppError> {
        let url = self.url(&["api", "collections", collection, "records"])?;
        self.send(self.request(Method::POST, url).json(body)).await
    }

    #[instrument(skip(self, body))]
    async fn update(&self, collection: &str, id: &str, body: &Value) -> Result<Value, AppError> {
        let url = self.url(&["api", "collections", collection, "records", id])?;
        self.send(self.request(Method::PATCH, url).json(body)).await
    }

    fn file_url(&self, collection: &str, record: &Value, filename: &str) -> Option<String> {
        if filename.is_empty() {
            return None;
        }
        let record_id = record.get("id").and_then(Value::as_str)?;
        let collection = record
            .get("collectionId")
            .or_else(|| record.get("collectionName"))
            .and_then(Value::as_str)
            .unwrap_or(collection);

        self.url(&["api", "files", collection, record_id, filename])
            .ok()
            .map(String::from)
    }
}
