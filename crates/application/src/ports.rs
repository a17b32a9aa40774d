use admindeck_core::{AppError, AppResult, StorageKey};
use admindeck_domain::DEFAULT_ID_FIELD;
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

/// Raw backend reply: HTTP-like status plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendResponse {
    /// Status code.
    pub status: u16,
    /// Response body.
    pub data: Value,
}

impl BackendResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, data: Value) -> Self {
        Self { status, data }
    }

    /// Returns whether the backend reported success (`200` and `success: true`).
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == 200 && self.data.get("success").and_then(Value::as_bool) == Some(true)
    }

    /// Returns the body on success, or a server error carrying the backend message.
    pub fn into_success(self) -> AppResult<Value> {
        if self.is_success() {
            return Ok(self.data);
        }

        let message = ["message", "error"]
            .iter()
            .find_map(|key| self.data.get(*key).and_then(Value::as_str))
            .map(str::to_owned)
            .unwrap_or_else(|| format!("request failed with status {}", self.status));

        Err(AppError::Server(message))
    }
}

/// Endpoints backing one CRUD page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrudEndpoints {
    /// Paginated list endpoint.
    pub list: String,
    /// Create endpoint.
    pub create: String,
    /// Update endpoint; the record id is passed separately.
    pub update: String,
    /// Delete endpoint; the record id is passed separately.
    pub delete: String,
    /// Record key holding the identifier.
    pub id_field: String,
}

impl CrudEndpoints {
    /// Uses one resource path for every operation and the default id key.
    #[must_use]
    pub fn resource(path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            list: path.clone(),
            create: path.clone(),
            update: path.clone(),
            delete: path,
            id_field: DEFAULT_ID_FIELD.to_owned(),
        }
    }

    /// Returns a copy using another identifier key.
    #[must_use]
    pub fn with_id_field(mut self, id_field: impl Into<String>) -> Self {
        self.id_field = id_field.into();
        self
    }
}

/// REST backend collaborator.
///
/// `Err` is reserved for transport failures; application-level failures come
/// back as a [`BackendResponse`] that is not a success.
#[async_trait]
pub trait RecordBackend: Send + Sync {
    /// Reads from `endpoint` with query parameters.
    async fn get_data(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> AppResult<BackendResponse>;

    /// Creates a resource.
    async fn post_data(&self, endpoint: &str, payload: Value) -> AppResult<BackendResponse>;

    /// Updates resource `id`.
    async fn put_data(&self, endpoint: &str, id: &str, payload: Value)
    -> AppResult<BackendResponse>;

    /// Deletes resource `id`.
    async fn delete_data(&self, endpoint: &str, id: &str) -> AppResult<BackendResponse>;
}

/// File handed to the upload collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    /// Original file name.
    pub file_name: String,
    /// MIME type.
    pub content_type: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

/// File-upload collaborator returning a storage reference.
#[async_trait]
pub trait FileUploader: Send + Sync {
    /// Stores the file and returns its reference string.
    async fn upload(&self, file: UploadFile) -> AppResult<String>;
}

/// Ephemeral key/value store keyed by `namespace:feature:id`.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Reads a value.
    async fn get(&self, key: &StorageKey) -> AppResult<Option<Value>>;

    /// Writes a value.
    async fn set(&self, key: &StorageKey, value: Value) -> AppResult<()>;

    /// Removes a value.
    async fn remove(&self, key: &StorageKey) -> AppResult<()>;
}

/// Reads from the store, treating failures as a miss.
pub(crate) async fn read_best_effort(store: &dyn LocalStore, key: &StorageKey) -> Option<Value> {
    match store.get(key).await {
        Ok(value) => value,
        Err(error) => {
            debug!(key = %key, error = %error, "local store read ignored");
            None
        }
    }
}

/// Writes to the store, ignoring failures.
pub(crate) async fn write_best_effort(store: &dyn LocalStore, key: &StorageKey, value: Value) {
    if let Err(error) = store.set(key, value).await {
        debug!(key = %key, error = %error, "local store write ignored");
    }
}
