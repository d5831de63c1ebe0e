//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.

pub mod handlers;

pub use handlers::{
    DeleteReportCommand, DeleteReportHandler, GetReportHandler, GetReportQuery,
    ListReportsHandler, PublishTarget, ReportError, ReportPage, RequestReportCommand,
    RequestReportHandler, RequestReportResult, UpdateReportStatusCommand,
    UpdateReportStatusHandler,
};
