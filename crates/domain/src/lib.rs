//! Domain entities and invariants for attribute-driven list and form pages.

#![forbid(unsafe_code)]

mod attribute;
mod query;
mod record;
mod schema;
mod validation;

pub use attribute::{
    AttributeDescriptor, AttributeDescriptorInput, AttributeVisibility, CellRenderer, FieldType,
    OptionItem, OptionSource, VisibilityContext, is_empty_value,
};
pub use query::{DEFAULT_PAGE_SIZE, Pagination, QueryState, SortDirection, SortSpec};
pub use record::{DEFAULT_ID_FIELD, Record};
pub use schema::AttributeSchema;
pub use validation::{FieldPattern, ValidationRule};
