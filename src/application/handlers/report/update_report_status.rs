//! UpdateReportStatusHandler - Command handler for worker status callbacks.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::context::RequestContext;
use crate::domain::foundation::{DomainError, ErrorCode, ReportId, Timestamp};
use crate::domain::report::{status, Metadata};
use crate::ports::ReportRepository;

use super::ReportError;

/// Command to record a report's progress.
///
/// Empty `status` and `None` fields leave the stored values untouched.
#[derive(Debug, Clone, Default)]
pub struct UpdateReportStatusCommand {
    pub report_id: ReportId,
    pub status: String,
    pub completed_at: Option<Timestamp>,
    pub metadata: Option<BTreeMap<String, Value>>,
}

/// Handler for status updates.
pub struct UpdateReportStatusHandler {
    repository: Arc<dyn ReportRepository>,
}

impl UpdateReportStatusHandler {
    pub fn new(repository: Arc<dyn ReportRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, ctx: &RequestContext, cmd: UpdateReportStatusCommand) -> Result<(), ReportError> {
        if cmd.completed_at.is_some() && !status::is_terminal(&cmd.status) {
            return Err(DomainError::new(
                ErrorCode::InvalidStatusTransition,
                format!(
                    "completedAt requires a terminal status, got '{}'",
                    cmd.status
                ),
            )
            .with_entity("Report")
            .with_field("completedAt", "only allowed with finished, error or deleted")
            .into());
        }

        let metadata = cmd.metadata.map(Metadata::new).transpose()?;

        self.repository
            .update_report_status_by_id(
                ctx,
                &cmd.status,
                &cmd.report_id,
                cmd.completed_at,
                metadata.as_ref(),
            )
            .await?;
        Ok(())
    }
}
