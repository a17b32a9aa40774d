use std::env;
use std::time::Duration;

use admindeck_core::{AppError, AppResult};
use admindeck_domain::{DEFAULT_ID_FIELD, DEFAULT_PAGE_SIZE};

/// Settings read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub schema_path: String,
    pub endpoint: String,
    pub id_field: String,
    pub page_size: usize,
    pub http_timeout: Duration,
}

impl ConsoleConfig {
    pub fn load() -> AppResult<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let required = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .ok_or_else(|| AppError::Validation(format!("{name} is required")))
        };
        let optional = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let api_base_url = required("ADMINDECK_API_BASE_URL")?;
        let schema_path = required("ADMINDECK_SCHEMA_PATH")?;
        let endpoint = required("ADMINDECK_ENDPOINT")?;
        let api_token = optional("ADMINDECK_API_TOKEN");
        let id_field =
            optional("ADMINDECK_ID_FIELD").unwrap_or_else(|| DEFAULT_ID_FIELD.to_owned());
        let page_size = parse_count(
            "ADMINDECK_PAGE_SIZE",
            optional("ADMINDECK_PAGE_SIZE"),
            DEFAULT_PAGE_SIZE as u64,
        )?;
        let timeout_seconds = parse_count(
            "ADMINDECK_HTTP_TIMEOUT_SECONDS",
            optional("ADMINDECK_HTTP_TIMEOUT_SECONDS"),
            15,
        )?;

        let page_size = usize::try_from(page_size).map_err(|_| {
            AppError::Validation(format!("ADMINDECK_PAGE_SIZE value '{page_size}' is too large"))
        })?;

        Ok(Self {
            api_base_url,
            api_token,
            schema_path,
            endpoint,
            id_field,
            page_size,
            http_timeout: Duration::from_secs(timeout_seconds),
        })
    }
}

fn parse_count(name: &str, value: Option<String>, default: u64) -> AppResult<u64> {
    let Some(value) = value else {
        return Ok(default);
    };

    match value.parse::<u64>() {
        Ok(0) => Err(AppError::Validation(format!(
            "{name} must be greater than zero"
        ))),
        Ok(parsed) => Ok(parsed),
        Err(error) => Err(AppError::Validation(format!(
            "invalid {name} value '{value}': {error}"
        ))),
    }
}
