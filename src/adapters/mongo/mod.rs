//! Document-store adapters (MongoDB).
//!
//! - `connection` - shared client and default database
//! - `document` - storage form of a report
//! - `indexes` - secondary index catalogue
//! - `query` - filter and update documents
//! - `report_repository` - tenant-routed [`ReportRepository`](crate::ports::ReportRepository)

mod connection;
mod document;
mod indexes;
mod query;
mod report_repository;

pub use connection::MongoConnection;
pub use document::ReportDocument;
pub use indexes::{is_duplicate_key, is_index_conflict, report_indexes, IndexSpec};
pub use query::{
    list_filter, list_options, live_by_id, soft_delete, status_update, status_update_filter,
};
pub use report_repository::{MongoReportRepository, REPORT_COLLECTION};
