//! ListReportsHandler - Query handler for one page of reports.

use std::sync::Arc;

use crate::context::RequestContext;
use crate::domain::report::{Cursor, Report, ReportQuery};
use crate::ports::ReportRepository;

use super::ReportError;

/// One page of live reports, newest first.
#[derive(Debug, Clone)]
pub struct ReportPage {
    pub reports: Vec<Report>,
    pub page: u32,
    pub limit: u32,
    /// Points past the last item when the page came back full.
    pub next_cursor: Option<Cursor>,
}

/// Handler for listing reports.
pub struct ListReportsHandler {
    repository: Arc<dyn ReportRepository>,
    max_limit: u32,
}

impl ListReportsHandler {
    pub fn new(repository: Arc<dyn ReportRepository>, max_limit: u32) -> Self {
        Self {
            repository,
            max_limit,
        }
    }

    pub async fn handle(&self, ctx: &RequestContext, query: ReportQuery) -> Result<ReportPage, ReportError> {
        query.validate(self.max_limit)?;

        let reports = self.repository.find_list(ctx, &query).await?;
        let next_cursor = match reports.last() {
            Some(last) if reports.len() as u32 == query.limit => Some(Cursor::new(*last.id(), true)),
            _ => None,
        };

        Ok(ReportPage {
            reports,
            page: query.page,
            limit: query.limit,
            next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryReportRepository;
    use crate::domain::foundation::{classify, ErrorCategory, ReportId, TemplateId};
    use crate::domain::report::status;
    use uuid::Uuid;

    async fn seeded(count: usize) -> (Arc<InMemoryReportRepository>, RequestContext) {
        let repository = Arc::new(InMemoryReportRepository::new());
        let ctx = RequestContext::new();
        let template = TemplateId::from_uuid(Uuid::new_v4());
        for _ in 0..count {
            let report = Report::new(ReportId::new(), template, status::PROCESSING, None).unwrap();
            repository.create(&ctx, &report).await.unwrap();
        }
        (repository, ctx)
    }

    #[tokio::test]
    async fn full_page_carries_next_cursor() {
        let (repository, ctx) = seeded(3).await;
        let handler = ListReportsHandler::new(repository, 100);

        let query = ReportQuery {
            limit: 2,
            ..Default::default()
        };
        let page = handler.handle(&ctx, query).await.unwrap();
        assert_eq!(page.reports.len(), 2);
        assert_eq!(page.next_cursor.map(|c| c.id), Some(*page.reports[1].id()));
    }

    #[tokio::test]
    async fn short_page_has_no_cursor() {
        let (repository, ctx) = seeded(1).await;
        let handler = ListReportsHandler::new(repository, 100);

        let page = handler.handle(&ctx, ReportQuery::default()).await.unwrap();
        assert_eq!(page.reports.len(), 1);
        assert!(page.next_cursor.is_none());
    }

    #[tokio::test]
    async fn limit_over_max_is_rejected() {
        let (repository, ctx) = seeded(0).await;
        let handler = ListReportsHandler::new(repository, 5);

        let query = ReportQuery {
            limit: 6,
            ..Default::default()
        };
        let err = handler.handle(&ctx, query).await.unwrap_err();
        assert_eq!(classify(&err), ErrorCategory::Validation);
    }
}
