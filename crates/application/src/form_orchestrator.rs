use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use admindeck_core::{AppError, AppResult};
use admindeck_domain::{
    AttributeDescriptor, AttributeSchema, FieldType, Record, VisibilityContext, is_empty_value,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::field_renderer::{FieldInput, OptionsState, parse_input};
use crate::notice::Notice;
use crate::ports::{BackendResponse, CrudEndpoints, FileUploader, RecordBackend, UploadFile};

#[cfg(test)]
mod tests;

/// Whether the form creates a new record or updates an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormMode {
    /// New record.
    Create,
    /// Existing record.
    Update,
}

impl FormMode {
    /// Returns the visibility context attributes are filtered by.
    #[must_use]
    pub fn context(&self) -> VisibilityContext {
        match self {
            Self::Create => VisibilityContext::Add,
            Self::Update => VisibilityContext::Update,
        }
    }

    /// Returns a stable label.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
        }
    }
}

/// Form lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormPhase {
    /// No form shown.
    Closed,
    /// Form shown and editable.
    Open(FormMode),
    /// Submit request in flight.
    Submitting(FormMode),
}

/// Values and field errors of an open form.
#[derive(Debug, Clone, PartialEq)]
pub struct FormState {
    values: Record,
    errors: BTreeMap<String, String>,
    mode: FormMode,
    record_id: Option<String>,
    unparsed: BTreeSet<String>,
}

impl FormState {
    /// Returns current values.
    #[must_use]
    pub fn values(&self) -> &Record {
        &self.values
    }

    /// Returns field errors keyed by attribute name.
    #[must_use]
    pub fn errors(&self) -> &BTreeMap<String, String> {
        &self.errors
    }

    /// Returns the error of one field.
    #[must_use]
    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    /// Returns the form mode.
    #[must_use]
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Returns the identifier of the record being updated.
    #[must_use]
    pub fn record_id(&self) -> Option<&str> {
        self.record_id.as_deref()
    }
}

/// Result of a submit attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Backend accepted the record; the form closed and the list must refresh.
    Saved {
        /// Mode that was submitted.
        mode: FormMode,
        /// Record echoed by the backend, when it returned one.
        record: Option<Record>,
    },
    /// Client-side validation failed; no request was sent.
    Invalid {
        /// Field errors.
        errors: BTreeMap<String, String>,
    },
    /// Backend or network failure; the form stays open for a retry.
    Failed(Notice),
    /// The form was closed or reopened while the request was in flight.
    Discarded,
}

/// Submit request detached from the orchestrator so it can be awaited
/// while the form keeps handling events.
pub struct SubmitRequest {
    generation: u64,
    mode: FormMode,
    endpoint: String,
    record_id: Option<String>,
    payload: Value,
    backend: Arc<dyn RecordBackend>,
}

impl SubmitRequest {
    /// Returns the payload that will be sent.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the form mode being submitted.
    #[must_use]
    pub fn mode(&self) -> FormMode {
        self.mode
    }

    /// Sends the request.
    pub async fn send(self) -> SubmitResponse {
        let result = match (self.mode, self.record_id.as_deref()) {
            (FormMode::Update, Some(record_id)) => {
                self.backend
                    .put_data(self.endpoint.as_str(), record_id, self.payload)
                    .await
            }
            (FormMode::Update, None) => Err(AppError::InvalidState(
                "update submit has no record identifier".to_owned(),
            )),
            (FormMode::Create, _) => {
                self.backend
                    .post_data(self.endpoint.as_str(), self.payload)
                    .await
            }
        };

        SubmitResponse {
            generation: self.generation,
            result,
        }
    }
}

/// Backend reply to a [`SubmitRequest`].
#[derive(Debug)]
pub struct SubmitResponse {
    generation: u64,
    result: AppResult<BackendResponse>,
}

/// Drives one create/update form over an attribute schema.
pub struct FormOrchestrator {
    schema: Arc<AttributeSchema>,
    backend: Arc<dyn RecordBackend>,
    uploader: Option<Arc<dyn FileUploader>>,
    endpoints: CrudEndpoints,
    phase: FormPhase,
    state: Option<FormState>,
    notice: Option<Notice>,
    generation: u64,
}

impl FormOrchestrator {
    /// Creates a closed form.
    #[must_use]
    pub fn new(
        schema: Arc<AttributeSchema>,
        backend: Arc<dyn RecordBackend>,
        endpoints: CrudEndpoints,
    ) -> Self {
        Self {
            schema,
            backend,
            uploader: None,
            endpoints,
            phase: FormPhase::Closed,
            state: None,
            notice: None,
            generation: 0,
        }
    }

    /// Attaches the upload collaborator used by image attributes.
    #[must_use]
    pub fn with_uploader(mut self, uploader: Arc<dyn FileUploader>) -> Self {
        self.uploader = Some(uploader);
        self
    }

    /// Returns the lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> FormPhase {
        self.phase
    }

    /// Returns the open form's state.
    #[must_use]
    pub fn state(&self) -> Option<&FormState> {
        self.state.as_ref()
    }

    /// Returns the last submit failure message.
    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    /// Opens the form.
    ///
    /// Create mode seeds values from `initial_values` and fills attribute
    /// defaults for missing keys. Update mode seeds from the record verbatim
    /// and requires it to carry an identifier.
    pub fn open(&mut self, mode: FormMode, initial_values: Option<Record>) -> AppResult<()> {
        if let FormPhase::Submitting(_) = self.phase {
            return Err(AppError::InvalidState(
                "cannot open the form while a submit is in flight".to_owned(),
            ));
        }

        let (values, record_id) = match mode {
            FormMode::Create => {
                let mut values = initial_values.unwrap_or_default();
                for attribute in self.schema.value_attributes() {
                    if let Some(default_value) = attribute.default_value()
                        && !values.contains_key(attribute.name())
                    {
                        values.insert(attribute.name(), default_value.clone());
                    }
                }
                (values, None)
            }
            FormMode::Update => {
                let record = initial_values.ok_or_else(|| {
                    AppError::Validation("update form requires the record to edit".to_owned())
                })?;
                let record_id = record.id(self.endpoints.id_field.as_str()).ok_or_else(|| {
                    AppError::Validation(format!(
                        "record has no '{}' identifier",
                        self.endpoints.id_field
                    ))
                })?;
                (record, Some(record_id))
            }
        };

        self.generation = self.generation.wrapping_add(1);
        self.phase = FormPhase::Open(mode);
        self.notice = None;
        self.state = Some(FormState {
            values,
            errors: BTreeMap::new(),
            mode,
            record_id,
            unparsed: BTreeSet::new(),
        });

        debug!(mode = mode.as_str(), "form opened");
        Ok(())
    }

    /// Stores a value and re-validates that field.
    ///
    /// Validation failures are recorded in the form errors, not returned.
    pub fn set_field(&mut self, name: &str, value: Value) -> AppResult<()> {
        let schema = Arc::clone(&self.schema);
        let attribute = value_attribute(&schema, name)?;
        let state = self.editable_state()?;

        let check = attribute.validate_value(&value);
        state.values.insert(name, value);
        state.unparsed.remove(name);
        match check {
            Ok(()) => {
                state.errors.remove(name);
            }
            Err(error) => {
                state.errors.insert(name.to_owned(), error.message().to_owned());
            }
        }

        Ok(())
    }

    /// Converts raw control input and stores it.
    ///
    /// Input that cannot be converted leaves the stored value untouched and
    /// records an error that blocks submit until the field is set again.
    pub fn set_input(
        &mut self,
        name: &str,
        input: FieldInput,
        options: Option<&OptionsState>,
    ) -> AppResult<()> {
        let schema = Arc::clone(&self.schema);
        let attribute = value_attribute(&schema, name)?;

        match parse_input(attribute, input, options) {
            Ok(value) => self.set_field(name, value),
            Err(AppError::Validation(message)) => {
                let state = self.editable_state()?;
                state.errors.insert(name.to_owned(), message);
                state.unparsed.insert(name.to_owned());
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Uploads an image and stores the returned reference in the field.
    ///
    /// Upload failures become a field error; the form stays open.
    pub async fn attach_image(&mut self, name: &str, file: UploadFile) -> AppResult<()> {
        let schema = Arc::clone(&self.schema);
        let attribute = value_attribute(&schema, name)?;
        if attribute.field_type() != FieldType::Image {
            return Err(AppError::Configuration(format!(
                "attribute '{name}' is not an image attribute"
            )));
        }
        let uploader = self.uploader.clone().ok_or_else(|| {
            AppError::Configuration("no file uploader configured for image attributes".to_owned())
        })?;
        self.editable_state()?;

        match uploader.upload(file).await {
            Ok(reference) => self.set_field(name, Value::String(reference)),
            Err(error) => {
                warn!(attribute = %name, error = %error, "image upload failed");
                let state = self.editable_state()?;
                state.errors.insert(
                    name.to_owned(),
                    format!("unable to upload image: {}", error.message()),
                );
                Ok(())
            }
        }
    }

    /// Validates the whole form and, when valid, moves to `Submitting` and
    /// returns the request to send. Returns `None` when validation failed.
    pub fn begin_submit(&mut self) -> AppResult<Option<SubmitRequest>> {
        let mode = match self.phase {
            FormPhase::Open(mode) => mode,
            FormPhase::Closed => {
                return Err(AppError::InvalidState(
                    "cannot submit a closed form".to_owned(),
                ));
            }
            FormPhase::Submitting(_) => {
                return Err(AppError::InvalidState(
                    "a submit is already in flight".to_owned(),
                ));
            }
        };

        let schema = Arc::clone(&self.schema);
        let state = self.editable_state()?;
        let context = mode.context();

        let mut errors = BTreeMap::new();
        for attribute in schema.submitted_in(context) {
            let name = attribute.name();
            if state.unparsed.contains(name)
                && let Some(message) = state.errors.get(name)
            {
                errors.insert(name.to_owned(), message.clone());
                continue;
            }

            let value = state.values.value_or_null(name);
            if attribute.is_required() && is_empty_value(value) {
                errors.insert(name.to_owned(), format!("{} is required", attribute.label()));
            } else if let Err(error) = attribute.validate_value(value) {
                errors.insert(name.to_owned(), error.message().to_owned());
            }
        }
        state.errors = errors;

        if !state.errors.is_empty() {
            debug!(
                mode = mode.as_str(),
                error_count = state.errors.len(),
                "form submit blocked by validation"
            );
            return Ok(None);
        }

        let payload = state
            .values
            .restricted_to(schema.submitted_in(context).map(AttributeDescriptor::name))
            .into_value();
        let record_id = state.record_id.clone();
        let endpoint = match mode {
            FormMode::Create => self.endpoints.create.clone(),
            FormMode::Update => self.endpoints.update.clone(),
        };

        self.phase = FormPhase::Submitting(mode);
        self.notice = None;

        Ok(Some(SubmitRequest {
            generation: self.generation,
            mode,
            endpoint,
            record_id,
            payload,
            backend: Arc::clone(&self.backend),
        }))
    }

    /// Applies the reply of a request from [`Self::begin_submit`].
    pub fn complete_submit(&mut self, response: SubmitResponse) -> SubmitOutcome {
        let mode = match self.phase {
            FormPhase::Submitting(mode) if response.generation == self.generation => mode,
            _ => {
                debug!("submit response ignored; form was closed or reopened");
                return SubmitOutcome::Discarded;
            }
        };

        match response.result.and_then(BackendResponse::into_success) {
            Ok(body) => {
                let record = body
                    .get("data")
                    .cloned()
                    .and_then(|data| Record::from_value(data).ok());
                info!(mode = mode.as_str(), "record saved");
                self.close();
                SubmitOutcome::Saved { mode, record }
            }
            Err(error) => {
                warn!(mode = mode.as_str(), error = %error, "record save failed");
                let notice = Notice::from_error("Unable to save record", &error);
                self.phase = FormPhase::Open(mode);
                self.notice = Some(notice.clone());
                SubmitOutcome::Failed(notice)
            }
        }
    }

    /// Validates, sends, and applies the reply in one step.
    ///
    /// Only state-machine misuse is returned as `Err`; validation and backend
    /// failures are reported through the outcome.
    pub async fn submit(&mut self) -> AppResult<SubmitOutcome> {
        let Some(request) = self.begin_submit()? else {
            let errors = self
                .state
                .as_ref()
                .map(|state| state.errors.clone())
                .unwrap_or_default();
            return Ok(SubmitOutcome::Invalid { errors });
        };

        let response = request.send().await;
        Ok(self.complete_submit(response))
    }

    /// Discards the form from any phase. A submit in flight completes but its
    /// reply is ignored.
    pub fn close(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.phase = FormPhase::Closed;
        self.state = None;
        self.notice = None;
    }

    fn editable_state(&mut self) -> AppResult<&mut FormState> {
        match (self.phase, self.state.as_mut()) {
            (FormPhase::Open(_), Some(state)) => Ok(state),
            (FormPhase::Submitting(_), _) => Err(AppError::InvalidState(
                "form is read-only while submitting".to_owned(),
            )),
            _ => Err(AppError::InvalidState("form is not open".to_owned())),
        }
    }
}

fn value_attribute<'a>(schema: &'a AttributeSchema, name: &str) -> AppResult<&'a AttributeDescriptor> {
    let attribute = schema
        .get(name)
        .ok_or_else(|| AppError::Configuration(format!("unknown attribute '{name}'")))?;
    if !attribute.carries_value() {
        return Err(AppError::Configuration(format!(
            "attribute '{name}' is structural and carries no value"
        )));
    }
    Ok(attribute)
}
