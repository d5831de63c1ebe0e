//! GetReportHandler - Query handler for a single report.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::domain::foundation::ReportId;
use crate::domain::report::Report;
use crate::ports::ReportRepository;

use super::ReportError;

/// Query to get a report by ID.
#[derive(Debug, Clone)]
pub struct GetReportQuery {
    pub report_id: ReportId,
}

/// Handler for retrieving a live report.
pub struct GetReportHandler {
    repository: Arc<dyn ReportRepository>,
}

impl GetReportHandler {
    pub fn new(repository: Arc<dyn ReportRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, ctx: &RequestContext, query: GetReportQuery) -> Result<Report, ReportError> {
        Ok(self.repository.find_by_id(ctx, &query.report_id).await?)
    }
}
