//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod report;

pub use report::{
    DeleteReportCommand, DeleteReportHandler, GetReportHandler, GetReportQuery,
    ListReportsHandler, PublishTarget, ReportError, ReportPage, RequestReportCommand,
    RequestReportHandler, RequestReportResult, UpdateReportStatusCommand,
    UpdateReportStatusHandler,
};
