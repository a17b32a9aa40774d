use std::collections::HashMap;

use admindeck_application::LocalStore;
use admindeck_core::{AppResult, StorageKey};
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

/// Process-local key/value store.
#[derive(Debug, Default)]
pub struct InMemoryLocalStore {
    entries: RwLock<HashMap<StorageKey, Value>>,
}

impl InMemoryLocalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored keys.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Returns whether nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl LocalStore for InMemoryLocalStore {
    async fn get(&self, key: &StorageKey) -> AppResult<Option<Value>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &StorageKey, value: Value) -> AppResult<()> {
        self.entries.write().await.insert(key.clone(), value);
        Ok(())
    }

    async fn remove(&self, key: &StorageKey) -> AppResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
