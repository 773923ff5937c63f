use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{ListQuery, ListResult};
use super::store::RecordStore;
use crate::shared::AppError;

/// In-memory implementation of RecordStore for development and testing
///
/// Understands the subset of the filter language this application emits:
/// `field="value"` comparisons joined by `&&` and `||` (`&&` binds tighter).
/// Sorting takes a single field, descending when prefixed with `-`.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts records as-is, without touching ids or timestamps
    pub fn with_records(self, collection: &str, records: Vec<Value>) -> Self {
        self.insert_all(collection, records);
        self
    }

    pub fn insert_all(&self, collection: &str, records: Vec<Value>) {
        if let Ok(mut collections) = self.collections.lock() {
            collections
                .entry(collection.to_string())
                .or_default()
                .extend(records);
        }
    }

    /// Snapshot of a collection in insertion order
    pub fn records(&self, collection: &str) -> Vec<Value> {
        self.collections
            .lock()
            .ok()
            .and_then(|collections| collections.get(collection).cloned())
            .unwrap_or_default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<Value>>>, AppError> {
        self.collections
            .lock()
            .map_err(|_| AppError::Internal)
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    #[instrument(skip(self, query))]
    async fn get_list(
        &self,
        collection: &str,
        query: &ListQuery,
    ) -> Result<ListResult<Value>, AppError> {
        let filter = match &query.filter {
            Some(expr) => Some(parse_filter(expr)?),
            None => None,
        };

        let mut matching: Vec<Value> = self
            .lock()?
            .get(collection)
            .map(|records| {
                records
                    .iter()
                    .filter(|record| filter.as_ref().map_or(true, |f| f.matches(record)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(sort) = &query.sort {
            let (field, descending) = match sort.strip_prefix('-') {
                Some(field) => (field, true),
                None => (sort.trim_start_matches('+'), false),
            };
            matching.sort_by(|a, b| {
                let ordering = compare_values(a.get(field), b.get(field));
                if descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let total_items = matching.len();
        let per_page = query.per_page.max(1) as usize;
        let total_pages = total_items.div_ceil(per_page);
        let items: Vec<Value> = matching
            .into_iter()
            .skip((query.page.max(1) as usize - 1) * per_page)
            .take(per_page)
            .collect();

        debug!(
            collection = %collection,
            total_items = total_items,
            returned = items.len(),
            "Listed records in memory"
        );

        Ok(ListResult {
            page: query.page,
            per_page: query.per_page,
            total_items: total_items as u64,
            total_pages: total_pages as u32,
            items,
        })
    }

    #[instrument(skip(self, body))]
    async fn create(&self, collection: &str, body: &Value) -> Result<Value, AppError> {
        let mut record: Map<String, Value> = body.as_object().cloned().ok_or(AppError::Api {
            status: 400,
            message: "Record body must be an object".to_string(),
        })?;

        let id = match record.get("id").and_then(Value::as_str) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => Uuid::new_v4().simple().to_string()[..15].to_string(),
        };

        let mut collections = self.lock()?;
        let records = collections.entry(collection.to_string()).or_default();
        if records
            .iter()
            .any(|r| r.get("id").and_then(Value::as_str) == Some(id.as_str()))
        {
            warn!(collection = %collection, id = %id, "Record already exists in memory");
            return Err(AppError::Api {
                status: 400,
                message: "Failed to create record.".to_string(),
            });
        }

        let now = Value::String(Utc::now().to_rfc3339());
        record.insert("id".to_string(), Value::String(id.clone()));
        record.insert(
            "collectionName".to_string(),
            Value::String(collection.to_string()),
        );
        record.insert("created".to_string(), now.clone());
        record.insert("updated".to_string(), now);

        let record = Value::Object(record);
        records.push(record.clone());

        debug!(collection = %collection, id = %id, "Record created in memory");
        Ok(record)
    }

    #[instrument(skip(self, body))]
    async fn update(&self, collection: &str, id: &str, body: &Value) -> Result<Value, AppError> {
        let changes = body.as_object().ok_or(AppError::Api {
            status: 400,
            message: "Record body must be an object".to_string(),
        })?;

        let mut collections = self.lock()?;
        let record = collections
            .get_mut(collection)
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|r| r.get("id").and_then(Value::as_str) == Some(id))
            })
            .and_then(Value::as_object_mut)
            .ok_or_else(|| {
                debug!(collection = %collection, id = %id, "Record not found for update");
                AppError::NotFound("The requested resource wasn't found.".to_string())
            })?;

        for (key, value) in changes {
            if key != "id" {
                record.insert(key.clone(), value.clone());
            }
        }
        record.insert(
            "updated".to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );

        Ok(Value::Object(record.clone()))
    }

    fn file_url(&self, collection: &str, record: &Value, filename: &str) -> Option<String> {
        let id = record.get("id").and_then(Value::as_str)?;
        (!filename.is_empty()).then(|| format!("memory://{}/{}/{}", collection, id, filename))
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(a)), Some(Value::String(b))) => a.cmp(b),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Less,
        (_, None | Some(Value::Null)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

/// Disjunction of conjunctions of `field = "value"` comparisons
#[derive(Debug, PartialEq)]
struct Filter {
    any: Vec<Vec<(String, String)>>,
}

impl Filter {
    fn matches(&self, record: &Value) -> bool {
        self.any.iter().any(|all| {
            all.iter()
                .all(|(field, expected)| field_equals(record.get(field), expected))
        })
    }
}

fn field_equals(actual: Option<&Value>, expected: &str) -> bool {
    match actual {
        Some(Value::String(s)) => s == expected,
        Some(Value::Number(n)) => n.to_string() == expected,
        Some(Value::Bool(b)) => b.to_string() == expected,
        Some(Value::Null) | None => expected.is_empty(),
        _ => false,
    }
}

#[derive(Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Eq,
    And,
    Or,
}

fn invalid_filter(expr: &str) -> AppError {
    AppError::Api {
        status: 400,
        message: format!("Invalid filter expression: {expr}"),
    }
}

fn tokenize(expr: &str) -> Result<Vec<Token>, AppError> {
    let mut tokens = Vec::new();
    let mut chars = expr.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '|' | '&' => {
                chars.next();
                if chars.next() != Some(c) {
                    return Err(invalid_filter(expr));
                }
                tokens.push(if c == '|' { Token::Or } else { Token::And });
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => match chars.next() {
                            Some(escaped) => value.push(escaped),
                            None => return Err(invalid_filter(expr)),
                        },
                        Some('"') => break,
                        Some(other) => value.push(other),
                        None => return Err(invalid_filter(expr)),
                    }
                }
                tokens.push(Token::Str(value));
            }
            c if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(ident));
            }
            _ => return Err(invalid_filter(expr)),
        }
    }

    Ok(tokens)
}

fn parse_filter(expr: &str) -> Result<Filter, AppError> {
    let mut tokens = tokenize(expr)?.into_iter();
    let mut any = Vec::new();
    let mut all = Vec::new();

    loop {
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some(Token::Ident(field)), Some(Token::Eq), Some(Token::Str(value))) => {
                all.push((field, value));
            }
            _ => return Err(invalid_filter(expr)),
        }

        match tokens.next() {
            None => {
                any.push(all);
                break;
            }
            Some(Token::And) => {}
            Some(Token::Or) => any.push(std::mem::take(&mut all)),
            Some(_) => return Err(invalid_filter(expr)),
        }
    }

    Ok(Filter { any })
}
