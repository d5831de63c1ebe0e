//! Report command and query handlers.

mod delete_report;
mod error;
mod get_report;
mod list_reports;
mod request_report;
mod update_report_status;

pub use delete_report::{DeleteReportCommand, DeleteReportHandler};
pub use error::ReportError;
pub use get_report::{GetReportHandler, GetReportQuery};
pub use list_reports::{ListReportsHandler, ReportPage};
pub use request_report::{
    PublishTarget, RequestReportCommand, RequestReportHandler, RequestReportResult,
};
pub use update_report_status::{UpdateReportStatusCommand, UpdateReportStatusHandler};
