use std::sync::Arc;

use admindeck_core::{AppError, AppResult};
use admindeck_domain::{
    AttributeSchema, FieldType, QueryState, Record, SortDirection, SortSpec, VisibilityContext,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::field_renderer::{OptionsCatalog, format_cell};
use crate::notice::{Notice, NoticeLevel};
use crate::ports::{BackendResponse, CrudEndpoints, RecordBackend};

mod delete;

#[cfg(test)]
mod tests;

pub use delete::{DeleteOutcome, DeleteRequest, DeleteResponse};

use delete::DeleteStage;

/// One page of records parsed from a list reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ListPage {
    /// Records on the page.
    pub records: Vec<Record>,
    /// Total matching records, when the backend reports it.
    pub total: Option<usize>,
}

impl ListPage {
    /// Parses `{ data: [...], total | count | totalCount }`.
    pub fn from_body(body: &Value) -> AppResult<Self> {
        let items = body
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| AppError::Server("list reply has no data list".to_owned()))?;

        let records = items
            .iter()
            .cloned()
            .map(Record::from_value)
            .collect::<AppResult<Vec<_>>>()
            .map_err(|error| AppError::Server(format!("list reply is malformed: {}", error.message())))?;

        let total = ["total", "count", "totalCount"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_u64))
            .and_then(|total| usize::try_from(total).ok());

        Ok(Self { records, total })
    }
}

/// Fetch detached from the orchestrator, tagged with its sequence number.
pub struct LoadRequest {
    sequence: u64,
    endpoint: String,
    params: Vec<(String, String)>,
    backend: Arc<dyn RecordBackend>,
}

impl LoadRequest {
    /// Returns the sequence number.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Returns the encoded query parameters.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Performs the fetch.
    pub async fn fetch(self) -> LoadResponse {
        let result = self
            .backend
            .get_data(self.endpoint.as_str(), &self.params)
            .await;
        LoadResponse {
            sequence: self.sequence,
            result,
        }
    }
}

/// Backend reply to a [`LoadRequest`].
#[derive(Debug)]
pub struct LoadResponse {
    sequence: u64,
    result: AppResult<BackendResponse>,
}

impl LoadResponse {
    /// Returns the sequence number of the originating request.
    #[must_use]
    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

/// Result of applying a load reply.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    /// Rows replaced.
    Applied {
        /// Rows now shown.
        rows: usize,
    },
    /// A newer request was issued; the reply was dropped.
    Superseded,
    /// Fetch failed; previous rows stay visible.
    Failed(Notice),
}

/// Column header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnView {
    /// Attribute name.
    pub name: String,
    /// Header label.
    pub label: String,
}

/// One rendered cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellView {
    /// Attribute name.
    pub name: String,
    /// Display text.
    pub text: String,
}

/// One rendered row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    /// Record identifier.
    pub record_id: Option<String>,
    /// Cells in column order.
    pub cells: Vec<CellView>,
}

/// Keeps query state and rows of one list page consistent with the backend.
pub struct ListOrchestrator {
    schema: Arc<AttributeSchema>,
    backend: Arc<dyn RecordBackend>,
    endpoints: CrudEndpoints,
    options: OptionsCatalog,
    query: QueryState,
    rows: Vec<Record>,
    total: Option<usize>,
    loading: bool,
    notice: Option<Notice>,
    issued_sequence: u64,
    applied_sequence: Option<u64>,
    delete_stage: Option<DeleteStage>,
}

impl ListOrchestrator {
    /// Creates an empty list.
    #[must_use]
    pub fn new(
        schema: Arc<AttributeSchema>,
        backend: Arc<dyn RecordBackend>,
        endpoints: CrudEndpoints,
        query: QueryState,
    ) -> Self {
        Self {
            schema,
            backend,
            endpoints,
            options: OptionsCatalog::new(),
            query,
            rows: Vec::new(),
            total: None,
            loading: false,
            notice: None,
            issued_sequence: 0,
            applied_sequence: None,
            delete_stage: None,
        }
    }

    /// Replaces the resolved options used to label select cells.
    pub fn set_options(&mut self, options: OptionsCatalog) {
        self.options = options;
    }

    /// Returns the query state.
    #[must_use]
    pub fn query(&self) -> &QueryState {
        &self.query
    }

    /// Returns the rows currently shown.
    #[must_use]
    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Returns the total reported by the backend.
    #[must_use]
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    /// Returns whether the latest request is still in flight.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Returns the current banner.
    #[must_use]
    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Dismisses the current banner.
    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Returns the sequence number of the rows on display.
    #[must_use]
    pub fn applied_sequence(&self) -> Option<u64> {
        self.applied_sequence
    }

    /// Returns the row with the given identifier.
    #[must_use]
    pub fn find(&self, record_id: &str) -> Option<&Record> {
        self.position_of(record_id).map(|index| &self.rows[index])
    }

    /// Issues a fetch for the current query. Any older request in flight is
    /// superseded.
    pub fn begin_load(&mut self) -> LoadRequest {
        self.issued_sequence += 1;
        self.loading = true;
        debug!(
            endpoint = %self.endpoints.list,
            sequence = self.issued_sequence,
            "list load issued"
        );

        LoadRequest {
            sequence: self.issued_sequence,
            endpoint: self.endpoints.list.clone(),
            params: self.query.to_params(),
            backend: Arc::clone(&self.backend),
        }
    }

    /// Applies a reply if it belongs to the most recent request.
    pub fn apply_load(&mut self, response: LoadResponse) -> LoadOutcome {
        if response.sequence != self.issued_sequence {
            debug!(
                sequence = response.sequence,
                latest = self.issued_sequence,
                "stale list reply discarded"
            );
            return LoadOutcome::Superseded;
        }

        self.loading = false;
        let page = response
            .result
            .and_then(BackendResponse::into_success)
            .and_then(|body| ListPage::from_body(&body));

        match page {
            Ok(page) => {
                self.rows = page.records;
                self.total = page.total;
                self.applied_sequence = Some(response.sequence);
                if self
                    .notice
                    .as_ref()
                    .is_some_and(|notice| notice.level() == NoticeLevel::Error)
                {
                    self.notice = None;
                }
                LoadOutcome::Applied {
                    rows: self.rows.len(),
                }
            }
            Err(error) => {
                warn!(
                    endpoint = %self.endpoints.list,
                    sequence = response.sequence,
                    error = %error,
                    "list load failed"
                );
                let notice = Notice::from_error("Unable to load records", &error);
                self.notice = Some(notice.clone());
                LoadOutcome::Failed(notice)
            }
        }
    }

    /// Fetches the current query and applies the reply.
    pub async fn load(&mut self) -> LoadOutcome {
        let request = self.begin_load();
        let response = request.fetch().await;
        self.apply_load(response)
    }

    /// Replaces the whole query, e.g. to restore a saved one.
    pub fn set_query(&mut self, query: QueryState) {
        self.query = query;
    }

    /// Loads with a caller-supplied query.
    pub async fn load_with(&mut self, query: QueryState) -> LoadOutcome {
        self.set_query(query);
        self.load().await
    }

    /// Sets the search term and issues a fetch from the first page.
    pub fn begin_search(&mut self, term: &str) -> LoadRequest {
        self.query.set_search(term);
        self.begin_load()
    }

    /// Searches and applies the reply.
    pub async fn search(&mut self, term: &str) -> LoadOutcome {
        let request = self.begin_search(term);
        let response = request.fetch().await;
        self.apply_load(response)
    }

    /// Sets one filter (`null` clears it) and reloads from the first page.
    pub async fn set_filter(&mut self, key: &str, value: Value) -> AppResult<LoadOutcome> {
        self.query.set_filter(key, value)?;
        Ok(self.load().await)
    }

    /// Moves to a zero-based page and reloads.
    pub async fn set_page(&mut self, page: usize) -> LoadOutcome {
        self.query.set_page(page);
        self.load().await
    }

    /// Changes the page size and reloads from the first page.
    pub async fn set_page_size(&mut self, limit: usize) -> AppResult<LoadOutcome> {
        self.query.set_page_size(limit)?;
        Ok(self.load().await)
    }

    /// Sorts by a view-visible attribute and reloads. `None` clears sorting.
    pub async fn set_sort(
        &mut self,
        sort: Option<(&str, SortDirection)>,
    ) -> AppResult<LoadOutcome> {
        let sort = match sort {
            Some((field, direction)) => {
                if self.schema.get(field).is_none() {
                    return Err(AppError::Configuration(format!(
                        "cannot sort by unknown attribute '{field}'"
                    )));
                }
                Some(SortSpec::new(field, direction)?)
            }
            None => None,
        };
        self.query.set_sort(sort);
        Ok(self.load().await)
    }

    /// Table columns: view-visible, value-carrying, non-hidden attributes.
    #[must_use]
    pub fn columns(&self) -> Vec<ColumnView> {
        self.schema
            .visible_in(VisibilityContext::View)
            .filter(|attribute| {
                attribute.carries_value() && attribute.field_type() != FieldType::Hidden
            })
            .map(|attribute| ColumnView {
                name: attribute.name().to_owned(),
                label: attribute.label().to_owned(),
            })
            .collect()
    }

    /// Renders the rows on display.
    #[must_use]
    pub fn row_views(&self) -> Vec<RowView> {
        let columns: Vec<_> = self
            .schema
            .visible_in(VisibilityContext::View)
            .filter(|attribute| {
                attribute.carries_value() && attribute.field_type() != FieldType::Hidden
            })
            .collect();

        self.rows
            .iter()
            .map(|record| RowView {
                record_id: record.id(self.endpoints.id_field.as_str()),
                cells: columns
                    .iter()
                    .map(|attribute| CellView {
                        name: attribute.name().to_owned(),
                        text: format_cell(attribute, record, self.options.get(attribute.name())),
                    })
                    .collect(),
            })
            .collect()
    }

    fn position_of(&self, record_id: &str) -> Option<usize> {
        let id_field = self.endpoints.id_field.as_str();
        self.rows
            .iter()
            .position(|record| record.id(id_field).as_deref() == Some(record_id))
    }

    fn log_deleted(&self, record_id: &str) {
        info!(
            endpoint = %self.endpoints.delete,
            record_id = %record_id,
            "record deleted"
        );
    }
}
