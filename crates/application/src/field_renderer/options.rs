use std::collections::HashMap;
use std::sync::Arc;

use admindeck_core::{AppError, AppResult, StorageKey};
use admindeck_domain::{AttributeDescriptor, AttributeSchema, OptionItem, OptionSource};
use serde_json::Value;
use tracing::{debug, warn};

use super::OptionsState;
use crate::ports::{LocalStore, RecordBackend, read_best_effort, write_best_effort};

/// Inline message shown by a select whose options could not be fetched.
pub const UNAVAILABLE_OPTIONS_MESSAGE: &str = "unable to load options";

const OPTIONS_FEATURE: &str = "options";

/// Resolved options keyed by attribute name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OptionsCatalog {
    entries: HashMap<String, OptionsState>,
}

impl OptionsCatalog {
    /// Creates an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns options for an attribute.
    #[must_use]
    pub fn get(&self, attribute_name: &str) -> Option<&OptionsState> {
        self.entries.get(attribute_name)
    }

    /// Stores options for an attribute.
    pub fn insert(&mut self, attribute_name: impl Into<String>, state: OptionsState) {
        self.entries.insert(attribute_name.into(), state);
    }

    /// Returns the number of resolved attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether nothing was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Resolves static and API-backed option sources.
#[derive(Clone)]
pub struct OptionsResolver {
    backend: Arc<dyn RecordBackend>,
    cache: Option<(Arc<dyn LocalStore>, String)>,
}

impl OptionsResolver {
    /// Creates a resolver without a lookup cache.
    #[must_use]
    pub fn new(backend: Arc<dyn RecordBackend>) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    /// Caches fetched option lists under `<namespace>:options:<attribute>`.
    #[must_use]
    pub fn with_cache(mut self, store: Arc<dyn LocalStore>, namespace: impl Into<String>) -> Self {
        self.cache = Some((store, namespace.into()));
        self
    }

    /// Resolves options of every select attribute in the schema.
    pub async fn resolve_schema(&self, schema: &AttributeSchema) -> OptionsCatalog {
        let mut catalog = OptionsCatalog::new();
        for attribute in schema.iter() {
            if attribute.options().is_some() {
                catalog.insert(attribute.name(), self.resolve(attribute).await);
            }
        }
        catalog
    }

    /// Resolves one attribute. Fetch failures fall back to the cache, then to
    /// an unavailable state; they never fail the caller.
    pub async fn resolve(&self, attribute: &AttributeDescriptor) -> OptionsState {
        let (endpoint, value_key, label_key) = match attribute.options() {
            None => return OptionsState::Ready(Vec::new()),
            Some(OptionSource::Static { options }) => return OptionsState::Ready(options.clone()),
            Some(OptionSource::Api {
                endpoint,
                value_key,
                label_key,
            }) => (endpoint, value_key, label_key),
        };

        let cache_key = self.cache_key(attribute);
        match self.fetch(endpoint, value_key, label_key).await {
            Ok(items) => {
                if let (Some((store, _)), Some(key)) = (&self.cache, &cache_key)
                    && let Ok(encoded) = serde_json::to_value(&items)
                {
                    write_best_effort(store.as_ref(), key, encoded).await;
                }
                OptionsState::Ready(items)
            }
            Err(error) => {
                warn!(
                    attribute = %attribute.name(),
                    endpoint = %endpoint,
                    error = %error,
                    "option fetch failed"
                );
                match self.cached(cache_key.as_ref()).await {
                    Some(items) => {
                        debug!(attribute = %attribute.name(), "using cached options");
                        OptionsState::Ready(items)
                    }
                    None => OptionsState::Unavailable {
                        message: UNAVAILABLE_OPTIONS_MESSAGE.to_owned(),
                    },
                }
            }
        }
    }

    async fn fetch(
        &self,
        endpoint: &str,
        value_key: &str,
        label_key: &str,
    ) -> AppResult<Vec<OptionItem>> {
        let body = self.backend.get_data(endpoint, &[]).await?.into_success()?;
        let items = body.get("data").and_then(Value::as_array).ok_or_else(|| {
            AppError::Server(format!("option endpoint '{endpoint}' returned no data list"))
        })?;

        Ok(items
            .iter()
            .filter_map(|item| {
                let value = item.get(value_key)?.clone();
                let label = match item.get(label_key) {
                    Some(Value::String(label)) => label.clone(),
                    Some(Value::Number(label)) => label.to_string(),
                    _ => super::value_key(&value),
                };
                Some(OptionItem { value, label })
            })
            .collect())
    }

    fn cache_key(&self, attribute: &AttributeDescriptor) -> Option<StorageKey> {
        let (_, namespace) = self.cache.as_ref()?;
        StorageKey::new(namespace.as_str(), OPTIONS_FEATURE, attribute.name()).ok()
    }

    async fn cached(&self, key: Option<&StorageKey>) -> Option<Vec<OptionItem>> {
        let (store, _) = self.cache.as_ref()?;
        let value = read_best_effort(store.as_ref(), key?).await?;
        serde_json::from_value(value).ok()
    }
}
