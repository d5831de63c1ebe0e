//! Report repository port.
//!
//! Defines the contract for persisting report requests in the document
//! store. Tenancy is never a method argument: implementations resolve the
//! tenant database from the [`RequestContext`] and fall back to the shared
//! connection when none is attached.
//!
//! # Design
//!
//! - **Soft delete**: rows with `deleted_at` set are invisible to reads
//! - **Partial updates**: status updates only touch the fields supplied
//! - **Lenient updates**: an update matching no live row is logged, not failed

use std::error::Error;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::{ContextError, RequestContext, TenantContextError};
use crate::domain::foundation::{DomainError, ReportId, Timestamp};
use crate::domain::report::{Metadata, Report, ReportQuery};

/// Repository failures.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Business outcome (not found, duplicate) carried for classification.
    #[error("{0}")]
    Domain(#[from] DomainError),

    #[error("tenant database resolution failed")]
    Tenant(#[from] TenantContextError),

    #[error("{operation} failed")]
    Database {
        operation: &'static str,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },

    #[error("{operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },

    #[error("{operation} interrupted")]
    Context {
        operation: &'static str,
        #[source]
        source: ContextError,
    },

    #[error("stored report is malformed")]
    Decode(#[source] Box<dyn Error + Send + Sync>),
}

impl RepositoryError {
    pub fn database(operation: &'static str, source: impl Error + Send + Sync + 'static) -> Self {
        RepositoryError::Database {
            operation,
            source: Box::new(source),
        }
    }

    /// Returns the business error, if this is one.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            RepositoryError::Domain(err) => Some(err),
            _ => None,
        }
    }
}

/// Repository port for report persistence.
#[async_trait]
pub trait ReportRepository: Send + Sync {
    /// Create the secondary index set. Existing indexes count as success.
    ///
    /// # Errors
    ///
    /// - `Timeout` when provisioning exceeds its bound
    /// - `Database` on any other driver failure
    async fn ensure_indexes(&self, ctx: &RequestContext) -> Result<(), RepositoryError>;

    /// Drop every custom index.
    async fn drop_indexes(&self, ctx: &RequestContext) -> Result<(), RepositoryError>;

    /// Insert a new report, returning the stored form.
    ///
    /// `created_at` and `updated_at` are stamped at insert; `deleted_at` is
    /// always cleared.
    ///
    /// # Errors
    ///
    /// - `DuplicateReport` if a row with the same id exists
    async fn create(&self, ctx: &RequestContext, report: &Report) -> Result<Report, RepositoryError>;

    /// Find a live report.
    ///
    /// # Errors
    ///
    /// - `ReportNotFound` if the id is unknown or soft-deleted
    async fn find_by_id(&self, ctx: &RequestContext, id: &ReportId) -> Result<Report, RepositoryError>;

    /// One page of live reports, newest first.
    async fn find_list(
        &self,
        ctx: &RequestContext,
        query: &ReportQuery,
    ) -> Result<Vec<Report>, RepositoryError>;

    /// Partial update of a live report.
    ///
    /// An empty `status` leaves the status untouched, as do `None` for
    /// `completed_at` and `metadata`. The `deleted` label also soft-deletes
    /// the row.
    async fn update_report_status_by_id(
        &self,
        ctx: &RequestContext,
        status: &str,
        id: &ReportId,
        completed_at: Option<Timestamp>,
        metadata: Option<&Metadata>,
    ) -> Result<(), RepositoryError>;

    /// Mark a live report as deleted.
    async fn soft_delete_by_id(&self, ctx: &RequestContext, id: &ReportId) -> Result<(), RepositoryError>;
}
