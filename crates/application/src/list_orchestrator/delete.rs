use std::sync::Arc;

use admindeck_core::{AppError, AppResult};
use admindeck_domain::Record;
use tracing::{debug, warn};

use super::ListOrchestrator;
use crate::notice::Notice;
use crate::ports::{BackendResponse, RecordBackend};

/// Delete flow progress.
#[derive(Debug, Clone)]
pub(super) enum DeleteStage {
    /// Waiting for the user to proceed or cancel.
    AwaitingConfirmation { record_id: String },
    /// Row removed locally; backend reply pending.
    InFlight {
        record_id: String,
        index: usize,
        record: Record,
        previous_total: Option<usize>,
    },
}

/// Delete call detached from the orchestrator.
pub struct DeleteRequest {
    record_id: String,
    endpoint: String,
    backend: Arc<dyn RecordBackend>,
}

impl DeleteRequest {
    /// Returns the record being deleted.
    #[must_use]
    pub fn record_id(&self) -> &str {
        self.record_id.as_str()
    }

    /// Calls the backend.
    pub async fn send(self) -> DeleteResponse {
        let result = self
            .backend
            .delete_data(self.endpoint.as_str(), self.record_id.as_str())
            .await;
        DeleteResponse {
            record_id: self.record_id,
            result,
        }
    }
}

/// Backend reply to a [`DeleteRequest`].
#[derive(Debug)]
pub struct DeleteResponse {
    record_id: String,
    result: AppResult<BackendResponse>,
}

/// Result of reconciling a delete.
#[derive(Debug, Clone, PartialEq)]
pub enum DeleteOutcome {
    /// Backend confirmed; the row stays removed.
    Deleted {
        /// Deleted record.
        record_id: String,
        /// The page must be fetched again to fill or step back.
        reload_required: bool,
    },
    /// Backend refused or was unreachable; the row was restored.
    RolledBack(Notice),
}

impl ListOrchestrator {
    /// Starts the delete flow for a row; nothing is removed until
    /// [`Self::confirm_delete`].
    pub fn request_delete(&mut self, record_id: &str) -> AppResult<()> {
        if let Some(DeleteStage::InFlight { .. }) = self.delete_stage {
            return Err(AppError::InvalidState(
                "another delete is still in flight".to_owned(),
            ));
        }
        if self.position_of(record_id).is_none() {
            return Err(AppError::NotFound(format!(
                "record '{record_id}' is not on the current page"
            )));
        }

        self.delete_stage = Some(DeleteStage::AwaitingConfirmation {
            record_id: record_id.to_owned(),
        });
        Ok(())
    }

    /// Returns the record awaiting delete confirmation.
    #[must_use]
    pub fn pending_delete(&self) -> Option<&str> {
        match &self.delete_stage {
            Some(DeleteStage::AwaitingConfirmation { record_id }) => Some(record_id.as_str()),
            _ => None,
        }
    }

    /// Returns whether a delete reply is pending.
    #[must_use]
    pub fn is_deleting(&self) -> bool {
        matches!(self.delete_stage, Some(DeleteStage::InFlight { .. }))
    }

    /// Abandons a delete awaiting confirmation.
    pub fn cancel_delete(&mut self) {
        if let Some(DeleteStage::AwaitingConfirmation { .. }) = self.delete_stage {
            self.delete_stage = None;
        }
    }

    /// Proceeds with the pending delete: removes the row locally and returns
    /// the backend call to send.
    pub fn confirm_delete(&mut self) -> AppResult<DeleteRequest> {
        let record_id = match self.delete_stage.take() {
            Some(DeleteStage::AwaitingConfirmation { record_id }) => record_id,
            other => {
                self.delete_stage = other;
                return Err(AppError::InvalidState(
                    "no delete is awaiting confirmation".to_owned(),
                ));
            }
        };

        let index = self.position_of(&record_id).ok_or_else(|| {
            AppError::NotFound(format!("record '{record_id}' is no longer on the page"))
        })?;
        let record = self.rows.remove(index);
        let previous_total = self.total;
        self.total = self.total.map(|total| total.saturating_sub(1));

        debug!(record_id = %record_id, index, "row removed pending delete confirmation");
        self.delete_stage = Some(DeleteStage::InFlight {
            record_id: record_id.clone(),
            index,
            record,
            previous_total,
        });

        Ok(DeleteRequest {
            record_id,
            endpoint: self.endpoints.delete.clone(),
            backend: Arc::clone(&self.backend),
        })
    }

    /// Reconciles the local removal with the backend reply: keeps it on
    /// success, restores the row on failure.
    pub fn finish_delete(&mut self, response: DeleteResponse) -> AppResult<DeleteOutcome> {
        let (index, record, previous_total) = match self.delete_stage.take() {
            Some(DeleteStage::InFlight {
                record_id,
                index,
                record,
                previous_total,
            }) if record_id == response.record_id => (index, record, previous_total),
            other => {
                self.delete_stage = other;
                return Err(AppError::InvalidState(format!(
                    "no delete of '{}' is in flight",
                    response.record_id
                )));
            }
        };

        match response.result.and_then(BackendResponse::into_success) {
            Ok(_) => {
                // A reload applied mid-flight can bring the row back.
                if let Some(stale) = self.position_of(&response.record_id) {
                    self.rows.remove(stale);
                    self.total = self.total.map(|total| total.saturating_sub(1));
                }
                self.log_deleted(&response.record_id);
                let reload_required = self.revalidate_pagination();
                self.notice = Some(Notice::success("Record deleted"));
                Ok(DeleteOutcome::Deleted {
                    record_id: response.record_id,
                    reload_required,
                })
            }
            Err(error) => {
                warn!(
                    record_id = %response.record_id,
                    error = %error,
                    "delete failed; restoring row"
                );
                if self.position_of(&response.record_id).is_none() {
                    let index = index.min(self.rows.len());
                    self.rows.insert(index, record);
                    self.total = previous_total;
                }
                let notice = Notice::from_error("Unable to delete record", &error);
                self.notice = Some(notice.clone());
                Ok(DeleteOutcome::RolledBack(notice))
            }
        }
    }

    /// Confirms, sends, reconciles, and reloads when pagination shifted.
    pub async fn delete_confirmed(&mut self) -> AppResult<DeleteOutcome> {
        let request = self.confirm_delete()?;
        let response = request.send().await;
        let outcome = self.finish_delete(response)?;

        if let DeleteOutcome::Deleted {
            reload_required: true,
            ..
        } = outcome
        {
            self.load().await;
        }

        Ok(outcome)
    }

    /// Steps back a page when the current one emptied, and reports whether
    /// rows beyond this page should be pulled in.
    fn revalidate_pagination(&mut self) -> bool {
        let pagination = self.query.pagination();

        if self.rows.is_empty() && pagination.skip() > 0 {
            self.query.set_page(pagination.page() - 1);
            return true;
        }

        self.total
            .is_some_and(|total| total > pagination.skip() + self.rows.len())
    }
}
