use std::time::Duration;

use admindeck_application::{BackendResponse, RecordBackend};
use admindeck_core::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::header;
use serde_json::Value;
use tracing::{Instrument, debug, debug_span, warn};
use url::Url;


/// REST backend reached over HTTP with JSON bodies.
///
/// Non-2xx replies are returned as unsuccessful [`BackendResponse`]s; only
/// transport failures become `Err`.
#[derive(Debug, Clone)]
pub struct HttpRecordBackend {
    http_client: reqwest::Client,
    base_url: Url,
    api_token: Option<String>,
}

impl HttpRecordBackend {
    /// Creates a backend rooted at `base_url`.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        api_token: Option<String>,
    ) -> AppResult<Self> {
        Ok(Self {
            http_client,
            base_url: parse_base_url(base_url)?,
            api_token: api_token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// Builds the shared HTTP client with a request timeout.
    pub fn build_client(timeout: Duration) -> AppResult<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| AppError::Internal(format!("failed to build HTTP client: {error}")))
    }

    /// Returns the base URL every endpoint is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolves `endpoint` (and an optional record id path segment).
    pub fn endpoint_url(&self, endpoint: &str, id: Option<&str>) -> AppResult<Url> {
        resolve_endpoint(&self.base_url, endpoint, id)
    }

    async fn execute(
        &self,
        method: reqwest::Method,
        url: Url,
        body: Option<&Value>,
    ) -> AppResult<BackendResponse> {
        let span = debug_span!("backend_request", method = %method, url = %url);

        async move {
            let mut builder = self.http_client.request(method, url.clone());
            if let Some(token) = &self.api_token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            if let Some(body) = body {
                builder = builder.json(body);
            }

            let response = builder.send().await.map_err(|error| {
                warn!(error = %error, "backend request failed");
                AppError::Network(format!("request to {url} failed: {error}"))
            })?;

            let status = response.status().as_u16();
            let text = response.text().await.map_err(|error| {
                AppError::Network(format!("failed to read response from {url}: {error}"))
            })?;
            debug!(status, "backend replied");

            Ok(BackendResponse::new(status, decode_body(status, &text)))
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl RecordBackend for HttpRecordBackend {
    async fn get_data(
        &self,
        endpoint: &str,
        params: &[(String, String)],
    ) -> AppResult<BackendResponse> {
        let mut url = self.endpoint_url(endpoint, None)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        self.execute(reqwest::Method::GET, url, None).await
    }

    async fn post_data(&self, endpoint: &str, payload: Value) -> AppResult<BackendResponse> {
        let url = self.endpoint_url(endpoint, None)?;
        self.execute(reqwest::Method::POST, url, Some(&payload))
            .await
    }

    async fn put_data(
        &self,
        endpoint: &str,
        id: &str,
        payload: Value,
    ) -> AppResult<BackendResponse> {
        let url = self.endpoint_url(endpoint, Some(id))?;
        self.execute(reqwest::Method::PUT, url, Some(&payload))
            .await
    }

    async fn delete_data(&self, endpoint: &str, id: &str) -> AppResult<BackendResponse> {
        let url = self.endpoint_url(endpoint, Some(id))?;
        self.execute(reqwest::Method::DELETE, url, None).await
    }
}

/// Parses a base URL, making sure relative endpoints resolve beneath it.
pub(crate) fn parse_base_url(base_url: &str) -> AppResult<Url> {
    let mut url = Url::parse(base_url.trim()).map_err(|error| {
        AppError::Configuration(format!("invalid API base URL '{base_url}': {error}"))
    })?;
    if url.cannot_be_a_base() {
        return Err(AppError::Configuration(format!(
            "API base URL '{base_url}' cannot hold endpoint paths"
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

pub(crate) fn resolve_endpoint(base_url: &Url, endpoint: &str, id: Option<&str>) -> AppResult<Url> {
    let relative = endpoint.trim().trim_start_matches('/');
    if relative.is_empty() {
        return Err(AppError::Configuration("endpoint must not be empty".to_owned()));
    }

    let mut url = base_url.join(relative).map_err(|error| {
        AppError::Configuration(format!("invalid endpoint '{endpoint}': {error}"))
    })?;

    if let Some(id) = id {
        url.path_segments_mut()
            .map_err(|()| {
                AppError::Configuration(format!("endpoint '{endpoint}' cannot hold a record id"))
            })?
            .pop_if_empty()
            .push(id);
    }

    Ok(url)
}

/// Decodes a reply body. Non-JSON bodies keep the status-based failure path.
pub(crate) fn decode_body(status: u16, text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }

    serde_json::from_str(text).unwrap_or_else(|error| {
        warn!(status, error = %error, "backend reply is not JSON");
        Value::Null
    })
}
