//! Error type shared by the report use cases.

use thiserror::Error;

use crate::domain::foundation::DomainError;
use crate::ports::{PublishError, RepositoryError};

/// Failure of a report use case.
///
/// Every variant keeps its cause in the source chain, so
/// [`classify`](crate::domain::foundation::classify) sees the original
/// domain error however deep it sits.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("report storage failed")]
    Repository(#[from] RepositoryError),

    #[error("report publish failed")]
    Publish(#[from] PublishError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{classify, ErrorCategory, ReportId};

    #[test]
    fn not_found_from_storage_stays_not_found() {
        let err = ReportError::from(RepositoryError::from(DomainError::report_not_found(
            ReportId::new(),
        )));
        assert_eq!(classify(&err), ErrorCategory::NotFound);
    }

    #[test]
    fn exhausted_publish_is_internal() {
        let err = ReportError::from(PublishError::TenantRequired);
        assert_eq!(classify(&err), ErrorCategory::InternalServerError);
        assert!(std::error::Error::source(&err)
            .unwrap()
            .to_string()
            .contains("tenant ID is required"));
    }
}
