use admindeck_application::{BackendResponse, FileUploader, UploadFile};
use admindeck_core::{AppError, AppResult};
use async_trait::async_trait;
use reqwest::header;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::http_record_backend::{decode_body, parse_base_url, resolve_endpoint};

const FILE_FIELD: &str = "file";

/// Upload endpoint accepting multipart form data and replying with
/// `{ success, data: { url } }`.
#[derive(Debug, Clone)]
pub struct HttpFileUploader {
    http_client: reqwest::Client,
    upload_url: Url,
    api_token: Option<String>,
}

impl HttpFileUploader {
    /// Creates an uploader posting to `endpoint` under `base_url`.
    pub fn new(
        http_client: reqwest::Client,
        base_url: &str,
        endpoint: &str,
        api_token: Option<String>,
    ) -> AppResult<Self> {
        let base_url = parse_base_url(base_url)?;
        Ok(Self {
            http_client,
            upload_url: resolve_endpoint(&base_url, endpoint, None)?,
            api_token: api_token.filter(|token| !token.trim().is_empty()),
        })
    }

    /// Returns the upload URL.
    #[must_use]
    pub fn upload_url(&self) -> &Url {
        &self.upload_url
    }
}

#[async_trait]
impl FileUploader for HttpFileUploader {
    async fn upload(&self, file: UploadFile) -> AppResult<String> {
        let file_name = file.file_name.clone();
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(file.content_type.as_str())
            .map_err(|error| {
                AppError::Validation(format!(
                    "invalid content type '{}': {error}",
                    file.content_type
                ))
            })?;

        let mut builder = self
            .http_client
            .post(self.upload_url.clone())
            .multipart(Form::new().part(FILE_FIELD, part));
        if let Some(token) = &self.api_token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = builder.send().await.map_err(|error| {
            warn!(file_name = %file_name, error = %error, "upload request failed");
            AppError::Network(format!("upload to {} failed: {error}", self.upload_url))
        })?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|error| AppError::Network(format!("failed to read upload reply: {error}")))?;

        let reference = reference_from_reply(BackendResponse::new(status, decode_body(status, &text)))?;
        info!(file_name = %file_name, reference = %reference, "file uploaded");
        Ok(reference)
    }
}

/// Extracts `data.url` from a successful upload reply.
pub(crate) fn reference_from_reply(response: BackendResponse) -> AppResult<String> {
    let body = response.into_success()?;
    body.get("data")
        .and_then(|data| data.get("url"))
        .and_then(Value::as_str)
        .filter(|reference| !reference.trim().is_empty())
        .map(str::to_owned)
        .ok_or_else(|| AppError::Server("upload reply has no data.url".to_owned()))
}
