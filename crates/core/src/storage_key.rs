use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{AppError, AppResult};

/// Key into the best-effort local store, rendered as `namespace:feature:id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StorageKey {
    namespace: String,
    feature: String,
    id: String,
}

impl StorageKey {
    /// Creates a validated storage key.
    ///
    /// `namespace` and `feature` must be non-empty and must not contain `:`.
    /// `id` must be non-empty and may contain `:`.
    pub fn new(
        namespace: impl Into<String>,
        feature: impl Into<String>,
        id: impl Into<String>,
    ) -> AppResult<Self> {
        let namespace = namespace.into();
        let feature = feature.into();
        let id = id.into();

        for (segment, value) in [("namespace", &namespace), ("feature", &feature)] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!(
                    "storage key {segment} must not be empty"
                )));
            }
            if value.contains(':') {
                return Err(AppError::Validation(format!(
                    "storage key {segment} '{value}' must not contain ':'"
                )));
            }
        }

        if id.trim().is_empty() {
            return Err(AppError::Validation(
                "storage key id must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            namespace,
            feature,
            id,
        })
    }

    /// Returns the namespace segment.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.namespace.as_str()
    }

    /// Returns the feature segment.
    #[must_use]
    pub fn feature(&self) -> &str {
        self.feature.as_str()
    }

    /// Returns the identifier segment.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }
}

impl Display for StorageKey {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}:{}:{}", self.namespace, self.feature, self.id)
    }
}

impl FromStr for StorageKey {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let mut parts = value.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(namespace), Some(feature), Some(id)) => Self::new(namespace, feature, id),
            _ => Err(AppError::Validation(format!(
                "storage key '{value}' must have the form namespace:feature:id"
            ))),
        }
    }
}

impl TryFrom<String> for StorageKey {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StorageKey> for String {
    fn from(value: StorageKey) -> Self {
        value.to_string()
    }
}
