//! Report domain module.
//!
//! A report is a request for a rendered artifact: it is persisted once,
//! announced to the worker fleet with a [`ReportMessage`], then moved through
//! its lifecycle by status updates until it finishes, fails or is
//! soft-deleted.

mod aggregate;
mod filters;
mod message;
mod metadata;
mod query;
pub mod status;

pub use aggregate::Report;
pub use filters::{ColumnFilters, FilterCondition, ReportFilters};
pub use message::{is_reserved_field, OutputFormat, ReportMessage, RESERVED_FIELDS};
pub use metadata::{Metadata, MAX_METADATA_KEY_LENGTH, MAX_METADATA_VALUE_LENGTH};
pub use query::{Cursor, ReportQuery, SortOrder, DEFAULT_LIMIT};
