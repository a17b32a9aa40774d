//! Shared primitives for all Rust crates in admindeck.

#![forbid(unsafe_code)]

/// Session identity primitives shared across crates.
pub mod auth;

mod storage_key;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use auth::UserIdentity;
pub use storage_key::StorageKey;

/// Result type used across admindeck crates.
pub type AppResult<T> = Result<T, AppError>;

/// A validated non-empty UTF-8 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

impl NonEmptyString {
    /// Creates a validated non-empty string.
    pub fn new(value: impl Into<String>) -> AppResult<Self> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(AppError::Validation(
                "value must not be empty or whitespace".to_owned(),
            ));
        }

        Ok(Self(value))
    }

    /// Returns the underlying string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

/// Common application error categories.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppError {
    /// Invalid user input; recoverable and reported next to the offending field.
    #[error("validation error: {0}")]
    Validation(String),

    /// Transport failure talking to a collaborator; the operation may be retried.
    #[error("network error: {0}")]
    Network(String),

    /// Schema or renderer misconfiguration, such as an unknown attribute type.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Backend answered with a non-success status or `success: false`.
    #[error("server error: {0}")]
    Server(String),

    /// Requested resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Operation is not allowed in the component's current state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Internal unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns whether the user can retry the failed operation as-is.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Server(_))
    }

    /// Returns the message without the category prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(message)
            | Self::Network(message)
            | Self::Configuration(message)
            | Self::Server(message)
            | Self::NotFound(message)
            | Self::InvalidState(message)
            | Self::Internal(message) => message.as_str(),
        }
    }
}
