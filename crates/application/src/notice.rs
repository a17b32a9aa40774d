use admindeck_core::AppError;

/// Severity of a user-visible notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    /// Neutral information.
    Info,
    /// Completed action.
    Success,
    /// Failed action.
    Error,
}

/// Banner or toast shown to the user in place of a propagated error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    level: NoticeLevel,
    message: String,
    retryable: bool,
}

impl Notice {
    /// Creates an informational notice.
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
            retryable: false,
        }
    }

    /// Converts an error into an error notice prefixed with what was attempted.
    #[must_use]
    pub fn from_error(action: &str, error: &AppError) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: format!("{action}: {}", error.message()),
            retryable: error.is_retryable(),
        }
    }

    /// Returns the severity.
    #[must_use]
    pub fn level(&self) -> NoticeLevel {
        self.level
    }

    /// Returns the message.
    #[must_use]
    pub fn message(&self) -> &str {
        self.message.as_str()
    }

    /// Returns whether a retry action should be offered.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.retryable
    }
}
