//! Report entity.
//!
//! A report is a request for a generated artifact. It has two construction
//! paths: [`Report::new`] validates caller data, [`Report::reconstruct`]
//! hydrates trusted data from the document store without validation so that
//! rows written under older rules stay readable.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, ReportId, TemplateId, Timestamp};

use super::{Metadata, ReportFilters};

/// Report entity.
///
/// # Invariants
///
/// - `id` and `template_id` are non-nil and `status` is non-empty
///   (constructor path only)
/// - `created_at <= updated_at`, `updated_at <= completed_at` and
///   `created_at <= deleted_at` when present
/// - a row with `deleted_at` set is invisible to live reads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    id: ReportId,
    template_id: TemplateId,
    filters: Option<ReportFilters>,
    status: String,
    metadata: Option<Metadata>,
    completed_at: Option<Timestamp>,
    created_at: Timestamp,
    updated_at: Timestamp,
    deleted_at: Option<Timestamp>,
}

impl Report {
    /// Create a new report request.
    ///
    /// # Errors
    ///
    /// - `MissingRequiredFields` if `id` or `template_id` is nil, or `status`
    ///   is empty
    /// - `InvalidFilters` if a filter condition has no values
    pub fn new(
        id: ReportId,
        template_id: TemplateId,
        status: impl Into<String>,
        filters: Option<ReportFilters>,
    ) -> Result<Self, DomainError> {
        let status = status.into();

        let mut missing = Vec::new();
        if id.is_nil() {
            missing.push("id");
        }
        if template_id.is_nil() {
            missing.push("templateId");
        }
        if status.trim().is_empty() {
            missing.push("status");
        }
        if !missing.is_empty() {
            let err = DomainError::new(
                ErrorCode::MissingRequiredFields,
                format!("Missing required fields: {}", missing.join(", ")),
            )
            .with_entity("Report");
            return Err(missing
                .into_iter()
                .fold(err, |err, field| err.with_field(field, "required")));
        }

        if let Some(filters) = &filters {
            filters.validate()?;
        }

        let now = Timestamp::now();
        Ok(Self {
            id,
            template_id,
            filters,
            status,
            metadata: None,
            completed_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Reconstruct a report from persistence (no validation, timestamps kept).
    #[allow(clippy::too_many_arguments)]
    pub fn reconstruct(
        id: ReportId,
        template_id: TemplateId,
        status: String,
        filters: Option<ReportFilters>,
        metadata: Option<Metadata>,
        completed_at: Option<Timestamp>,
        created_at: Timestamp,
        updated_at: Timestamp,
        deleted_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id,
            template_id,
            filters,
            status,
            metadata,
            completed_at,
            created_at,
            updated_at,
            deleted_at,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────────────────────────────────

    pub fn id(&self) -> &ReportId {
        &self.id
    }

    pub fn template_id(&self) -> &TemplateId {
        &self.template_id
    }

    pub fn filters(&self) -> Option<&ReportFilters> {
        self.filters.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn completed_at(&self) -> Option<&Timestamp> {
        self.completed_at.as_ref()
    }

    pub fn created_at(&self) -> &Timestamp {
        &self.created_at
    }

    pub fn updated_at(&self) -> &Timestamp {
        &self.updated_at
    }

    pub fn deleted_at(&self) -> Option<&Timestamp> {
        self.deleted_at.as_ref()
    }

    /// Returns true when the row has been soft-deleted.
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Checks the timestamp ordering invariants.
    pub fn has_consistent_timeline(&self) -> bool {
        let updated_ok = !self.updated_at.is_before(&self.created_at);
        let completed_ok = self
            .completed_at
            .map_or(true, |completed| !completed.is_before(&self.updated_at));
        let deleted_ok = self
            .deleted_at
            .map_or(true, |deleted| !deleted.is_before(&self.created_at));
        updated_ok && completed_ok && deleted_ok
    }
}
