//! Error taxonomy adapter.
//!
//! Partitions any error produced by the publisher or the repository into a
//! business category (caller-visible, 4xx) or `InternalServerError`.
//!
//! Classification matches on the *kind* of the first [`DomainError`] found
//! while walking [`Error::source`], so wrapping an error with extra context
//! never changes its category.

use std::error::Error;

use super::{DomainError, ErrorKind};

/// Caller-visible category of an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    NotFound,
    Conflict,
    ValidationKnownFields,
    ValidationUnknownFields,
    Validation,
    Unprocessable,
    Unauthorized,
    Forbidden,
    InternalServerError,
}

impl ErrorCategory {
    /// HTTP status code for the category.
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorCategory::NotFound => 404,
            ErrorCategory::Conflict => 409,
            ErrorCategory::ValidationKnownFields
            | ErrorCategory::ValidationUnknownFields
            | ErrorCategory::Validation => 400,
            ErrorCategory::Unprocessable => 422,
            ErrorCategory::Unauthorized => 401,
            ErrorCategory::Forbidden => 403,
            ErrorCategory::InternalServerError => 500,
        }
    }

    /// Returns true for every category except `InternalServerError`.
    pub fn is_business(&self) -> bool {
        !matches!(self, ErrorCategory::InternalServerError)
    }
}

impl From<ErrorKind> for ErrorCategory {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::NotFound => ErrorCategory::NotFound,
            ErrorKind::Conflict => ErrorCategory::Conflict,
            ErrorKind::ValidationKnownFields => ErrorCategory::ValidationKnownFields,
            ErrorKind::ValidationUnknownFields => ErrorCategory::ValidationUnknownFields,
            ErrorKind::Validation => ErrorCategory::Validation,
            ErrorKind::Unprocessable => ErrorCategory::Unprocessable,
            ErrorKind::Unauthorized => ErrorCategory::Unauthorized,
            ErrorKind::Forbidden => ErrorCategory::Forbidden,
            ErrorKind::Internal => ErrorCategory::InternalServerError,
        }
    }
}

/// Finds the first business [`DomainError`] in the source chain of `err`.
///
/// Returns `None` when the chain holds no domain error, or when the first one
/// found is an internal error.
pub fn find_business_error<'a>(err: &'a (dyn Error + 'static)) -> Option<&'a DomainError> {
    let mut current: Option<&'a (dyn Error + 'static)> = Some(err);
    while let Some(candidate) = current {
        if let Some(domain) = candidate.downcast_ref::<DomainError>() {
            return domain.kind.is_business().then_some(domain);
        }
        current = candidate.source();
    }
    None
}

/// Classifies an error for the caller.
pub fn classify(err: &(dyn Error + 'static)) -> ErrorCategory {
    find_business_error(err)
        .map(|domain| ErrorCategory::from(domain.kind))
        .unwrap_or(ErrorCategory::InternalServerError)
}
