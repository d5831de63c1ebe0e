//! Error types for the domain layer.

use std::collections::BTreeMap;
use std::error::Error;
use std::fmt;

/// Category a business error belongs to.
///
/// Only `Internal` is an infrastructure category; every other kind is an
/// expected outcome the caller can act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    ValidationKnownFields,
    ValidationUnknownFields,
    Validation,
    Unprocessable,
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    /// Returns true for kinds that are surfaced to callers with a 4xx status.
    pub fn is_business(&self) -> bool {
        !matches!(self, ErrorKind::Internal)
    }
}

/// Error codes known to the report domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredFields,
    InvalidFilters,
    InvalidMetadata,
    InvalidPagination,
    InvalidCursor,
    InvalidDateFormat,
    InvalidOutputFormat,
    InvalidSortOrder,
    InvalidIdentifier,
    InvalidPublishTarget,
    UnexpectedFields,

    // Not found errors
    ReportNotFound,

    // State errors
    DuplicateReport,
    InvalidStatusTransition,

    // Authorization errors
    Unauthorized,
    Forbidden,

    // Infrastructure errors
    InternalError,
}

impl ErrorCode {
    /// Public, stable code carried in error responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::MissingRequiredFields => "RPT-0001",
            ErrorCode::InvalidFilters => "RPT-0002",
            ErrorCode::InvalidMetadata => "RPT-0003",
            ErrorCode::InvalidPagination => "RPT-0004",
            ErrorCode::InvalidCursor => "RPT-0005",
            ErrorCode::InvalidDateFormat => "RPT-0006",
            ErrorCode::InvalidOutputFormat => "RPT-0007",
            ErrorCode::InvalidSortOrder => "RPT-0008",
            ErrorCode::InvalidIdentifier => "RPT-0009",
            ErrorCode::ReportNotFound => "RPT-0010",
            ErrorCode::DuplicateReport => "RPT-0011",
            ErrorCode::InvalidStatusTransition => "RPT-0012",
            ErrorCode::InvalidPublishTarget => "RPT-0013",
            ErrorCode::UnexpectedFields => "RPT-0014",
            ErrorCode::Unauthorized => "RPT-0401",
            ErrorCode::Forbidden => "RPT-0403",
            ErrorCode::InternalError => "RPT-0500",
        }
    }

    /// Kind the code is classified under.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ErrorCode::MissingRequiredFields
            | ErrorCode::InvalidFilters
            | ErrorCode::InvalidPagination
            | ErrorCode::InvalidCursor
            | ErrorCode::InvalidDateFormat
            | ErrorCode::InvalidOutputFormat
            | ErrorCode::InvalidSortOrder
            | ErrorCode::InvalidIdentifier
            | ErrorCode::InvalidPublishTarget => ErrorKind::Validation,
            ErrorCode::InvalidMetadata => ErrorKind::ValidationKnownFields,
            ErrorCode::UnexpectedFields => ErrorKind::ValidationUnknownFields,
            ErrorCode::ReportNotFound => ErrorKind::NotFound,
            ErrorCode::DuplicateReport => ErrorKind::Conflict,
            ErrorCode::InvalidStatusTransition => ErrorKind::Unprocessable,
            ErrorCode::Unauthorized => ErrorKind::Unauthorized,
            ErrorCode::Forbidden => ErrorKind::Forbidden,
            ErrorCode::InternalError => ErrorKind::Internal,
        }
    }

    /// Short human-readable title.
    pub fn title(&self) -> &'static str {
        match self {
            ErrorCode::MissingRequiredFields => "Missing required fields",
            ErrorCode::InvalidFilters => "Invalid filters",
            ErrorCode::InvalidMetadata => "Invalid metadata",
            ErrorCode::InvalidPagination => "Invalid pagination",
            ErrorCode::InvalidCursor => "Invalid cursor",
            ErrorCode::InvalidDateFormat => "Invalid date format",
            ErrorCode::InvalidOutputFormat => "Invalid output format",
            ErrorCode::InvalidSortOrder => "Invalid sort order",
            ErrorCode::InvalidIdentifier => "Invalid identifier",
            ErrorCode::InvalidPublishTarget => "Invalid publish target",
            ErrorCode::UnexpectedFields => "Unexpected fields",
            ErrorCode::ReportNotFound => "Report not found",
            ErrorCode::DuplicateReport => "Duplicate report",
            ErrorCode::InvalidStatusTransition => "Invalid status transition",
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::Forbidden => "Forbidden",
            ErrorCode::InternalError => "Internal server error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Standard domain error with kind, public code, message and optional details.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainError {
    pub kind: ErrorKind,
    pub code: String,
    pub title: String,
    pub message: String,
    pub entity_type: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl DomainError {
    /// Creates a new domain error from a catalogue code.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            kind: code.kind(),
            code: code.as_str().to_string(),
            title: code.title().to_string(),
            message: message.into(),
            entity_type: None,
            fields: BTreeMap::new(),
        }
    }

    /// Creates an error with a code owned by another module (e.g. `TPL-0011`).
    pub fn business(kind: ErrorKind, code: impl Into<String>, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            code: code.into(),
            title: message.clone(),
            message,
            entity_type: None,
            fields: BTreeMap::new(),
        }
    }

    /// Creates a not-found error for a report.
    pub fn report_not_found(id: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ReportNotFound, format!("Report not found: {}", id))
            .with_entity("Report")
    }

    /// Rejects a completion time earlier than the report's creation.
    pub fn completed_before_created(id: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidStatusTransition,
            format!("Report {} cannot complete before it was created", id),
        )
        .with_entity("Report")
        .with_field("completedAt", "must not precede createdAt")
    }

    /// Sets the entity the error refers to.
    pub fn with_entity(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Adds a field-level reason.
    pub fn with_field(mut self, field: impl Into<String>, reason: impl Into<String>) -> Self {
        self.fields.insert(field.into(), reason.into());
        self
    }

    /// Returns true when `code` matches this error's public code.
    pub fn has_code(&self, code: ErrorCode) -> bool {
        self.code == code.as_str()
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_error_displays_code_and_message() {
        let err = DomainError::new(ErrorCode::ReportNotFound, "Report not found");
        assert_eq!(format!("{}", err), "[RPT-0010] Report not found");
    }

    #[test]
    fn domain_error_with_field_adds_field() {
        let err = DomainError::new(ErrorCode::InvalidMetadata, "Invalid metadata")
            .with_field("metadata.owner", "value too long")
            .with_field("metadata.team", "nested object");

        assert_eq!(err.fields.len(), 2);
        assert_eq!(
            err.fields.get("metadata.owner"),
            Some(&"value too long".to_string())
        );
    }

    #[test]
    fn error_code_kind_is_consistent() {
        assert_eq!(ErrorCode::ReportNotFound.kind(), ErrorKind::NotFound);
        assert_eq!(ErrorCode::DuplicateReport.kind(), ErrorKind::Conflict);
        assert_eq!(ErrorCode::MissingRequiredFields.kind(), ErrorKind::Validation);
        assert_eq!(ErrorCode::InternalError.kind(), ErrorKind::Internal);
        assert!(!ErrorKind::Internal.is_business());
        assert!(ErrorKind::Forbidden.is_business());
    }

    #[test]
    fn business_error_keeps_foreign_code() {
        let err = DomainError::business(ErrorKind::NotFound, "TPL-0011", "Template not found");
        assert_eq!(err.code, "TPL-0011");
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(!err.has_code(ErrorCode::ReportNotFound));
    }

    #[test]
    fn completed_before_created_is_unprocessable() {
        let err = DomainError::completed_before_created("abc");
        assert_eq!(err.kind, ErrorKind::Unprocessable);
        assert!(err.fields.contains_key("completedAt"));
    }

    #[test]
    fn report_not_found_sets_entity() {
        let err = DomainError::report_not_found("abc");
        assert!(err.has_code(ErrorCode::ReportNotFound));
        assert_eq!(err.entity_type.as_deref(), Some("Report"));
    }
}
