//! List query and pagination cursor.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DomainError, ErrorCode, ReportId, TemplateId};

use super::OutputFormat;

/// Default page size when the caller gives none.
pub const DEFAULT_LIMIT: u32 = 10;

/// Sort direction on `created_at`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            _ => Err(DomainError::new(
                ErrorCode::InvalidSortOrder,
                format!("Invalid sort order: {}", s),
            )
            .with_field("sort_order", "must be asc or desc")),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

/// Opaque pagination token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    pub id: ReportId,
    pub points_next: bool,
}

impl Cursor {
    pub fn new(id: ReportId, points_next: bool) -> Self {
        Self { id, points_next }
    }

    /// Encodes the cursor as URL-safe base64 of its JSON form.
    pub fn encode(&self) -> String {
        // Serializing a uuid and a bool cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        URL_SAFE_NO_PAD.encode(json)
    }

    /// Decodes a token produced by [`Cursor::encode`].
    ///
    /// # Errors
    ///
    /// - `InvalidCursor` if the token is not valid base64 or JSON
    pub fn decode(token: &str) -> Result<Self, DomainError> {
        let invalid = || {
            DomainError::new(ErrorCode::InvalidCursor, "Cursor is malformed")
                .with_field("cursor", "invalid token")
        };
        let bytes = URL_SAFE_NO_PAD
            .decode(token.trim().trim_end_matches('='))
            .map_err(|_| invalid())?;
        serde_json::from_slice(&bytes).map_err(|_| invalid())
    }
}

/// Validated list query.
///
/// `limit` and `page` bounds are enforced by the caller layer before the
/// query reaches the repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportQuery {
    pub limit: u32,
    pub page: u32,
    pub sort_order: SortOrder,
    pub cursor: Option<Cursor>,
    pub status: Option<String>,
    pub template_id: Option<TemplateId>,
    pub created_at: Option<NaiveDate>,
    pub output_format: Option<OutputFormat>,
    pub metadata: BTreeMap<String, String>,
}

impl Default for ReportQuery {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            page: 1,
            sort_order: SortOrder::Desc,
            cursor: None,
            status: None,
            template_id: None,
            created_at: None,
            output_format: None,
            metadata: BTreeMap::new(),
        }
    }
}

impl ReportQuery {
    /// Number of rows to skip for offset pagination.
    pub fn skip(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }

    /// Template filter, ignoring the nil identifier.
    pub fn effective_template_id(&self) -> Option<TemplateId> {
        self.template_id.filter(|id| !id.is_nil())
    }

    /// Status filter, ignoring blank labels.
    pub fn effective_status(&self) -> Option<&str> {
        self.status.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// Checks the paging bounds against `max_limit`.
    ///
    /// # Errors
    ///
    /// - `InvalidPagination` if `limit` is outside `1..=max_limit` or `page`
    ///   is zero
    pub fn validate(&self, max_limit: u32) -> Result<(), DomainError> {
        if self.limit == 0 || self.limit > max_limit {
            return Err(DomainError::new(
                ErrorCode::InvalidPagination,
                format!("limit must be between 1 and {}", max_limit),
            )
            .with_field("limit", "out of range"));
        }
        if self.page == 0 {
            return Err(DomainError::new(
                ErrorCode::InvalidPagination,
                "page must be a positive integer",
            )
            .with_field("page", "out of range"));
        }
        Ok(())
    }
}
