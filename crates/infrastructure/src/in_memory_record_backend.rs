use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

use admindeck_application::{BackendResponse, RecordBackend};
use admindeck_core::{AppError, AppResult};
use admindeck_domain::{DEFAULT_ID_FIELD, Record};
use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;


const FILTER_PREFIX: &str = "filter.";

/// Failure served instead of the next reply.
#[derive(Debug, Clone, PartialEq)]
pub enum InjectedFailure {
    /// Transport failure returned as `Err`.
    Transport(AppError),
    /// Reply carrying `success: false`.
    Rejected {
        /// HTTP status of the reply.
        status: u16,
        /// Message in the reply body.
        message: String,
    },
}

/// In-memory REST backend with one collection per endpoint.
#[derive(Debug)]
pub struct InMemoryRecordBackend {
    id_field: String,
    collections: RwLock<HashMap<String, Vec<Record>>>,
    failures: RwLock<VecDeque<InjectedFailure>>,
}

impl InMemoryRecordBackend {
    /// Creates an empty backend identifying records by `_id`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_id_field(DEFAULT_ID_FIELD)
    }

    /// Creates an empty backend identifying records by `id_field`.
    #[must_use]
    pub fn with_id_field(id_field: impl Into<String>) -> Self {
        Self {
            id_field: id_field.into(),
            collections: RwLock::new(HashMap::new()),
            failures: RwLock::new(VecDeque::new()),
        }
    }

    /// Appends records to an endpoint's collection.
    pub async fn seed(&self, endpoint: &str, records: impl IntoIterator<Item = Record>) {
        self.collections
            .write()
            .await
            .entry(collection_name(endpoint))
            .or_default()
            .extend(records);
    }

    /// Returns a snapshot of an endpoint's collection.
    pub async fn records(&self, endpoint: &str) -> Vec<Record> {
        self.collections
            .read()
            .await
            .get(&collection_name(endpoint))
            .cloned()
            .unwrap_or_default()
    }

    /// Queues a failure for the next call, whatever its kind.
    pub async fn fail_next(&self, failure: InjectedFailure) {
        self.failures.write().await.push_back(failure);
    }

    async fn injected(&self) -> Option<AppResult<BackendResponse>> {
        let failure = self.failures.write().await.pop_front()?;
        debug!(failure = ?failure, "serving injected failure");
        Some(match failure {
            InjectedFailure::Transport(error) => Err(error),
            InjectedFailure::Rejected { status, message } => Ok(BackendResponse::new(
                status,
                json!({"success": false, "message": message}),
            )),
        })
    }

    fn id_of(&self, record: &Record) -> Option<String> {
        record.id(self.id_field.as_str())
    }
}

impl Default for InMemoryRecordBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecordBackend for InMemoryRecordBackend {
    async fn get_data(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> AppResult<BackendResponse> {
        if let Some(reply) = self.injected().await {
            return reply;
        }

        let query = match ListQuery::from_params(params) {
            Ok(query) => query,
            Err(error) => return Ok(rejected(400, error.message())),
        };
        let collections = self.collections.read().await;
        let mut matching: Vec<&Record> = collections
            .get(&collection_name(endpoint))
            .map(|records| records.iter().filter(|record| query.matches(record)).collect())
            .unwrap_or_default();

        if let Some((field, descending)) = &query.sort {
            matching.sort_by(|left, right| {
                let ordering = compare_values(left.value_or_null(field), right.value_or_null(field));
                if *descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }

        let total = matching.len();
        let page: Vec<Value> = matching
            .into_iter()
            .skip(query.skip)
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|record| record.clone().into_value())
            .collect();

        Ok(success(json!({"success": true, "data": page, "total": total})))
    }

    async fn post_data(&self, endpoint: &str, payload: Value) -> AppResult<BackendResponse> {
        if let Some(reply) = self.injected().await {
            return reply;
        }

        let mut record = match Record::from_value(payload) {
            Ok(record) => record,
            Err(error) => return Ok(rejected(400, error.message())),
        };
        if self.id_of(&record).is_none() {
            record.insert(self.id_field.as_str(), Value::String(Uuid::new_v4().to_string()));
        }

        let mut collections = self.collections.write().await;
        let collection = collections.entry(collection_name(endpoint)).or_default();
        let id = self.id_of(&record);
        if collection.iter().any(|existing| self.id_of(existing) == id) {
            return Ok(rejected(
                409,
                &format!("record '{}' already exists", id.unwrap_or_default()),
            ));
        }

        collection.push(record.clone());
        Ok(success(json!({"success": true, "data": record.into_value()})))
    }

    async fn put_data(
        &self,
        endpoint: &str,
        id: &str,
        payload: Value,
    ) -> AppResult<BackendResponse> {
        if let Some(reply) = self.injected().await {
            return reply;
        }

        let Value::Object(fields) = payload else {
            return Ok(rejected(400, "update payload must be an object"));
        };

        let mut collections = self.collections.write().await;
        let Some(existing) = collections
            .get_mut(&collection_name(endpoint))
            .and_then(|records| {
                records
                    .iter_mut()
                    .find(|record| self.id_of(record).as_deref() == Some(id))
            })
        else {
            return Ok(rejected(404, &format!("record '{id}' not found")));
        };

        for (key, value) in fields {
            if key != self.id_field {
                existing.insert(key, value);
            }
        }
        Ok(success(json!({"success": true, "data": existing.clone().into_value()})))
    }

    async fn delete_data(&self, endpoint: &str, id: &str) -> AppResult<BackendResponse> {
        if let Some(reply) = self.injected().await {
            return reply;
        }

        let mut collections = self.collections.write().await;
        let Some(records) = collections.get_mut(&collection_name(endpoint)) else {
            return Ok(rejected(404, &format!("record '{id}' not found")));
        };
        let Some(position) = records
            .iter()
            .position(|record| self.id_of(record).as_deref() == Some(id))
        else {
            return Ok(rejected(404, &format!("record '{id}' not found")));
        };

        let removed = records.remove(position);
        Ok(success(json!({"success": true, "data": removed.into_value()})))
    }
}

struct ListQuery {
    skip: usize,
    limit: Option<usize>,
    search: Option<String>,
    sort: Option<(String, bool)>,
    filters: Vec<(String, String)>,
}

impl ListQuery {
    fn from_params(params: &[(String, String)]) -> AppResult<Self> {
        let mut query = Self {
            skip: 0,
            limit: None,
            search: None,
            sort: None,
            filters: Vec::new(),
        };
        let mut descending = false;

        for (key, value) in params {
            match key.as_str() {
                "skip" => query.skip = parse_count(key, value)?,
                "limit" => query.limit = Some(parse_count(key, value)?),
                "search" => {
                    query.search = Some(value.trim().to_lowercase()).filter(|term| !term.is_empty());
                }
                "sort" => query.sort = Some((value.clone(), false)),
                "order" => descending = value.eq_ignore_ascii_case("desc"),
                other => {
                    if let Some(field) = other.strip_prefix(FILTER_PREFIX) {
                        query.filters.push((field.to_owned(), value.clone()));
                    }
                }
            }
        }

        if let Some((_, sort_descending)) = &mut query.sort {
            *sort_descending = descending;
        }
        Ok(query)
    }

    fn matches(&self, record: &Record) -> bool {
        let searched = self.search.as_ref().is_none_or(|term| {
            record
                .as_map()
                .values()
                .filter_map(Value::as_str)
                .any(|text| text.to_lowercase().contains(term.as_str()))
        });

        searched
            && self.filters.iter().all(|(field, expected)| {
                record
                    .get(field)
                    .is_some_and(|value| value_matches(value, expected))
            })
    }
}

fn parse_count(key: &str, value: &str) -> AppResult<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("query parameter '{key}' must be a count")))
}

fn value_matches(value: &Value, expected: &str) -> bool {
    match value {
        Value::String(text) => text == expected,
        Value::Array(items) => items.iter().any(|item| value_matches(item, expected)),
        other => other.to_string() == expected,
    }
}

fn compare_values(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        (Value::Number(left), Value::Number(right)) => left
            .as_f64()
            .zip(right.as_f64())
            .and_then(|(left, right)| left.partial_cmp(&right))
            .unwrap_or(Ordering::Equal),
        (Value::String(left), Value::String(right)) => left.cmp(right),
        (Value::Bool(left), Value::Bool(right)) => left.cmp(right),
        (left, right) => left.to_string().cmp(&right.to_string()),
    }
}

fn collection_name(endpoint: &str) -> String {
    endpoint.trim().trim_matches('/').to_owned()
}

fn success(body: Value) -> BackendResponse {
    BackendResponse::new(200, body)
}

fn rejected(status: u16, message: &str) -> BackendResponse {
    BackendResponse::new(status, json!({"success": false, "message": message}))
}
