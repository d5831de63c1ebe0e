//! Foundation module - Shared domain primitives.
//!
//! Contains identifiers, timestamps and the error taxonomy that form the
//! vocabulary of the report domain.

mod classify;
mod errors;
mod ids;
mod timestamp;

pub use classify::{classify, find_business_error, ErrorCategory};
pub use errors::{DomainError, ErrorCode, ErrorKind};
pub use ids::{ReportId, TemplateId};
pub use timestamp::Timestamp;
