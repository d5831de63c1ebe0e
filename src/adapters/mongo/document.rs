//! Storage form of a report.
//!
//! Field names are snake_case; ids are stored as binary UUIDs and times as
//! BSON dates. Reads always go through [`Report::reconstruct`].

use bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{ReportId, TemplateId, Timestamp};
use crate::domain::report::{Metadata, Report, ReportFilters};

/// One row of the report collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<ObjectId>,
    pub id: bson::Uuid,
    pub template_id: bson::Uuid,
    #[serde(default)]
    pub filters: Option<ReportFilters>,
    pub status: String,
    #[serde(default)]
    pub metadata: Option<Metadata>,
    #[serde(default)]
    pub completed_at: Option<bson::DateTime>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
    #[serde(default)]
    pub deleted_at: Option<bson::DateTime>,
}

pub(crate) fn to_bson_uuid(uuid: &uuid::Uuid) -> bson::Uuid {
    bson::Uuid::from_bytes(*uuid.as_bytes())
}

pub(crate) fn to_bson_datetime(timestamp: &Timestamp) -> bson::DateTime {
    bson::DateTime::from_chrono(*timestamp.as_datetime())
}

fn to_timestamp(datetime: bson::DateTime) -> Timestamp {
    Timestamp::from_datetime(datetime.to_chrono())
}

impl ReportDocument {
    /// Storage form of `report`, as given.
    pub fn from_report(report: &Report) -> Self {
        Self {
            object_id: None,
            id: to_bson_uuid(report.id().as_uuid()),
            template_id: to_bson_uuid(report.template_id().as_uuid()),
            filters: report.filters().cloned(),
            status: report.status().to_string(),
            metadata: report.metadata().cloned(),
            completed_at: report.completed_at().map(to_bson_datetime),
            created_at: to_bson_datetime(report.created_at()),
            updated_at: to_bson_datetime(report.updated_at()),
            deleted_at: report.deleted_at().map(to_bson_datetime),
        }
    }

    /// Storage form for a fresh insert: timestamps stamped, never deleted.
    pub fn for_insert(report: &Report, now: &Timestamp) -> Self {
        Self {
            created_at: to_bson_datetime(now),
            updated_at: to_bson_datetime(now),
            deleted_at: None,
            ..Self::from_report(report)
        }
    }

    /// Trusted hydration into the domain entity.
    pub fn into_report(self) -> Report {
        Report::reconstruct(
            ReportId::from_uuid(uuid::Uuid::from_bytes(self.id.bytes())),
            TemplateId::from_uuid(uuid::Uuid::from_bytes(self.template_id.bytes())),
            self.status,
            self.filters,
            self.metadata,
            self.completed_at.map(to_timestamp),
            to_timestamp(self.created_at),
            to_timestamp(self.updated_at),
            self.deleted_at.map(to_timestamp),
        )
    }
}
