//! Application services and ports for attribute-driven CRUD pages.

#![forbid(unsafe_code)]

mod app_context;
mod crud_page;
mod field_renderer;
mod form_orchestrator;
mod list_orchestrator;
mod notice;
mod ports;

#[cfg(test)]
mod test_support;

pub use app_context::{AppContext, AppPorts, MenuState};
pub use crud_page::CrudPage;
pub use field_renderer::{
    Control, FieldContext, FieldInput, FieldRendererRegistry, OptionsCatalog, OptionsResolver,
    OptionsState, RenderFieldFn, RenderedField, UNAVAILABLE_OPTIONS_MESSAGE, format_cell,
    parse_input,
};
pub use form_orchestrator::{
    FormMode, FormOrchestrator, FormPhase, FormState, SubmitOutcome, SubmitRequest,
    SubmitResponse,
};
pub use list_orchestrator::{
    CellView, ColumnView, DeleteOutcome, DeleteRequest, DeleteResponse, ListOrchestrator,
    ListPage, LoadOutcome, LoadRequest, LoadResponse, RowView,
};
pub use notice::{Notice, NoticeLevel};
pub use ports::{BackendResponse, CrudEndpoints, FileUploader, LocalStore, RecordBackend, UploadFile};
