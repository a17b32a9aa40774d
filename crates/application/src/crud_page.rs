use std::sync::Arc;

use admindeck_core::{AppError, AppResult};
use admindeck_domain::{AttributeSchema, QueryState};
use tracing::debug;

use crate::app_context::AppContext;
use crate::field_renderer::{
    FieldInput, FieldRendererRegistry, OptionsCatalog, OptionsResolver, RenderedField,
};
use crate::form_orchestrator::{FormMode, FormOrchestrator, SubmitOutcome};
use crate::list_orchestrator::{ListOrchestrator, LoadOutcome};
use crate::ports::CrudEndpoints;

/// One list and one form over the same schema and endpoints.
///
/// A successful save refreshes the list directly.
pub struct CrudPage {
    schema: Arc<AttributeSchema>,
    registry: FieldRendererRegistry,
    resolver: OptionsResolver,
    options: OptionsCatalog,
    list: ListOrchestrator,
    form: FormOrchestrator,
}

impl CrudPage {
    /// Builds a page with the standard field renderers.
    pub fn new(
        context: &AppContext,
        schema: AttributeSchema,
        endpoints: CrudEndpoints,
        page_size: usize,
    ) -> AppResult<Self> {
        Self::with_registry(
            context,
            schema,
            endpoints,
            page_size,
            FieldRendererRegistry::standard(),
        )
    }

    /// Builds a page, failing when the registry cannot render every attribute.
    pub fn with_registry(
        context: &AppContext,
        schema: AttributeSchema,
        endpoints: CrudEndpoints,
        page_size: usize,
        registry: FieldRendererRegistry,
    ) -> AppResult<Self> {
        registry.validate_schema(&schema)?;
        let schema = Arc::new(schema);
        let ports = context.ports();

        let list = ListOrchestrator::new(
            Arc::clone(&schema),
            Arc::clone(&ports.backend),
            endpoints.clone(),
            QueryState::new(page_size)?,
        );
        let mut form = FormOrchestrator::new(Arc::clone(&schema), Arc::clone(&ports.backend), endpoints);
        if let Some(uploader) = &ports.uploader {
            form = form.with_uploader(Arc::clone(uploader));
        }

        Ok(Self {
            schema,
            registry,
            resolver: context.options_resolver(),
            options: OptionsCatalog::new(),
            list,
            form,
        })
    }

    /// Resolves select options, then loads the first page.
    pub async fn initialize(&mut self) -> LoadOutcome {
        self.refresh_options().await;
        self.list.load().await
    }

    /// Re-resolves select options.
    pub async fn refresh_options(&mut self) {
        self.options = self.resolver.resolve_schema(&self.schema).await;
        self.list.set_options(self.options.clone());
        debug!(attributes = self.options.len(), "options resolved");
    }

    /// Returns the schema.
    #[must_use]
    pub fn schema(&self) -> &AttributeSchema {
        &self.schema
    }

    /// Returns the resolved options.
    #[must_use]
    pub fn options(&self) -> &OptionsCatalog {
        &self.options
    }

    /// Returns the list.
    #[must_use]
    pub fn list(&self) -> &ListOrchestrator {
        &self.list
    }

    /// Returns the list for searching, paging, and deleting.
    pub fn list_mut(&mut self) -> &mut ListOrchestrator {
        &mut self.list
    }

    /// Returns the form.
    #[must_use]
    pub fn form(&self) -> &FormOrchestrator {
        &self.form
    }

    /// Returns the form for field edits and uploads.
    pub fn form_mut(&mut self) -> &mut FormOrchestrator {
        &mut self.form
    }

    /// Opens an empty create form.
    pub fn request_create(&mut self) -> AppResult<()> {
        self.form.open(FormMode::Create, None)
    }

    /// Opens the update form seeded with a row of the current page.
    pub fn request_edit(&mut self, record_id: &str) -> AppResult<()> {
        let record = self.list.find(record_id).cloned().ok_or_else(|| {
            AppError::NotFound(format!("record '{record_id}' is not on the current page"))
        })?;
        self.form.open(FormMode::Update, Some(record))
    }

    /// Converts control input with the page's resolved options and stores it.
    pub fn set_input(&mut self, name: &str, input: FieldInput) -> AppResult<()> {
        self.form.set_input(name, input, self.options.get(name))
    }

    /// Submits the form and reloads the list after a save.
    pub async fn submit_form(&mut self) -> AppResult<SubmitOutcome> {
        let outcome = self.form.submit().await?;
        if let SubmitOutcome::Saved { .. } = outcome {
            self.list.load().await;
        }
        Ok(outcome)
    }

    /// Discards the form.
    pub fn close_form(&mut self) {
        self.form.close();
    }

    /// Renders the open form; empty when closed.
    #[must_use]
    pub fn form_fields(&self) -> Vec<RenderedField> {
        match self.form.state() {
            Some(state) => self.registry.render_form(&self.schema, state, &self.options),
            None => Vec::new(),
        }
    }
}
