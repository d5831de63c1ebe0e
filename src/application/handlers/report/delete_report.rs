//! DeleteReportHandler - Command handler for withdrawing a report.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::domain::foundation::ReportId;
use crate::ports::ReportRepository;

use super::ReportError;

/// Command to soft-delete a report.
#[derive(Debug, Clone)]
pub struct DeleteReportCommand {
    pub report_id: ReportId,
}

/// Handler for soft deletes. The row stays in storage, hidden from reads.
pub struct DeleteReportHandler {
    repository: Arc<dyn ReportRepository>,
}

impl DeleteReportHandler {
    pub fn new(repository: Arc<dyn ReportRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, ctx: &RequestContext, cmd: DeleteReportCommand) -> Result<(), ReportError> {
        self.repository.soft_delete_by_id(ctx, &cmd.report_id).await?;
        Ok(())
    }
}
