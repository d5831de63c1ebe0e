//! Filter and update documents for the report collection.
//!
//! The list filter emits its fields in a fixed order (status, template,
//! creation day, deletion marker, then metadata) so the query planner keeps
//! picking the `complete` index.

use bson::{doc, Bson, Document};
use mongodb::options::FindOptions;

use crate::domain::foundation::{ReportId, Timestamp};
use crate::domain::report::{status, Metadata, ReportQuery};

use super::document::{to_bson_datetime, to_bson_uuid};

/// Live row with the given id.
pub fn live_by_id(id: &ReportId) -> Document {
    doc! {
        "id": to_bson_uuid(id.as_uuid()),
        "deleted_at": Bson::Null,
    }
}

/// Live row a status update may touch.
///
/// With a completion time the row must also have been created no later
/// than it, so `updated_at` never falls behind `created_at`.
pub fn status_update_filter(id: &ReportId, completed_at: Option<&Timestamp>) -> Document {
    let mut filter = live_by_id(id);
    if let Some(completed_at) = completed_at {
        filter.insert("created_at", doc! { "$lte": to_bson_datetime(completed_at) });
    }
    filter
}

/// Filter for one page of [`ReportQuery`].
pub fn list_filter(query: &ReportQuery) -> Document {
    let mut filter = Document::new();

    if let Some(status) = query.effective_status() {
        filter.insert("status", status);
    }
    if let Some(template_id) = query.effective_template_id() {
        filter.insert("template_id", to_bson_uuid(template_id.as_uuid()));
    }
    if let Some(day) = query.created_at {
        let start = Timestamp::start_of_day(day);
        filter.insert(
            "created_at",
            doc! {
                "$gte": to_bson_datetime(&start),
                "$lt": to_bson_datetime(&start.add_days(1)),
            },
        );
    }
    filter.insert("deleted_at", Bson::Null);

    for (key, value) in &query.metadata {
        filter.insert(format!("metadata.{}", key), value.as_str());
    }

    filter
}

/// Sort, skip and limit for one page.
pub fn list_options(query: &ReportQuery) -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "created_at": -1 })
        .skip(query.skip())
        .limit(i64::from(query.limit))
        .build()
}

/// `$set` for a partial status update.
///
/// `updated_at` follows `completed_at` when one is given so the row keeps
/// `updated_at <= completed_at`. The `deleted` label also stamps
/// `deleted_at`.
pub fn status_update(
    new_status: &str,
    completed_at: Option<&Timestamp>,
    metadata: Option<&Metadata>,
    now: &Timestamp,
) -> Result<Document, bson::ser::Error> {
    let mut set = Document::new();

    if !new_status.is_empty() {
        set.insert("status", new_status);
    }
    if let Some(completed_at) = completed_at {
        set.insert("completed_at", to_bson_datetime(completed_at));
    }
    if let Some(metadata) = metadata {
        set.insert("metadata", bson::to_bson(metadata)?);
    }
    if new_status == status::DELETED {
        set.insert("deleted_at", to_bson_datetime(now));
    }
    set.insert("updated_at", to_bson_datetime(completed_at.unwrap_or(now)));

    Ok(doc! { "$set": set })
}

/// `$set` marking a row deleted.
pub fn soft_delete(now: &Timestamp) -> Document {
    doc! {
        "$set": {
            "deleted_at": to_bson_datetime(now),
            "updated_at": to_bson_datetime(now),
        }
    }
}
