//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod http_file_uploader;
mod http_record_backend;
mod in_memory_local_store;
mod in_memory_record_backend;

pub use http_file_uploader::HttpFileUploader;
pub use http_record_backend::HttpRecordBackend;
pub use in_memory_local_store::InMemoryLocalStore;
pub use in_memory_record_backend::{InMemoryRecordBackend, InjectedFailure};
