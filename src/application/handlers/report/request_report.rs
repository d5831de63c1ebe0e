//! RequestReportHandler - Command handler for new report requests.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::domain::foundation::{ReportId, TemplateId};
use crate::domain::report::{status, OutputFormat, Report, ReportFilters, ReportMessage};
use crate::ports::{ReportPublisher, ReportRepository};

use super::ReportError;

/// Where report requests are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishTarget {
    pub exchange: String,
    pub routing_key: String,
}

impl PublishTarget {
    pub fn new(exchange: impl Into<String>, routing_key: impl Into<String>) -> Self {
        Self {
            exchange: exchange.into(),
            routing_key: routing_key.into(),
        }
    }
}

/// Command to request a new report.
#[derive(Debug, Clone)]
pub struct RequestReportCommand {
    pub template_id: TemplateId,
    pub output_format: OutputFormat,
    pub filters: Option<ReportFilters>,
    /// Extra message fields passed through to workers untouched.
    pub extra: Map<String, Value>,
}

/// Result of a successful report request.
#[derive(Debug, Clone)]
pub struct RequestReportResult {
    pub report: Report,
    pub message: ReportMessage,
}

/// Persists a `processing` report, then publishes it for rendering.
///
/// The two steps are not atomic. A publish failure leaves the row in
/// `processing`, where a sweeper can find and republish it.
pub struct RequestReportHandler {
    repository: Arc<dyn ReportRepository>,
    publisher: Arc<dyn ReportPublisher>,
    target: PublishTarget,
}

impl RequestReportHandler {
    pub fn new(
        repository: Arc<dyn ReportRepository>,
        publisher: Arc<dyn ReportPublisher>,
        target: PublishTarget,
    ) -> Self {
        Self {
            repository,
            publisher,
            target,
        }
    }

    pub async fn handle(
        &self,
        ctx: &RequestContext,
        cmd: RequestReportCommand,
    ) -> Result<RequestReportResult, ReportError> {
        let report = Report::new(ReportId::new(), cmd.template_id, status::PROCESSING, cmd.filters)?;
        let message = ReportMessage::for_report(&report, cmd.output_format).with_extras(cmd.extra)?;
        let report = self.repository.create(ctx, &report).await?;

        if let Err(err) = self
            .publisher
            .publish(ctx, &self.target.exchange, &self.target.routing_key, &message)
            .await
        {
            warn!(
                request_id = %ctx.request_id(),
                report_id = %report.id(),
                error = %err,
                "report stored but not published"
            );
            return Err(err.into());
        }

        info!(
            request_id = %ctx.request_id(),
            tenant_id = %ctx.tenant_id(),
            report_id = %report.id(),
            "report requested"
        );
        Ok(RequestReportResult { report, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::broker::{BrokerRouter, InMemoryBroker, RecordingSleeper, ReportProducer, RetryPolicy};
    use crate::adapters::memory::InMemoryReportRepository;
    use crate::domain::foundation::{classify, ErrorCategory};
    use crate::domain::report::FilterCondition;
    use serde_json::json;
    use uuid::Uuid;

    struct Fixture {
        broker: InMemoryBroker,
        repository: Arc<InMemoryReportRepository>,
        handler: RequestReportHandler,
    }

    fn fixture() -> Fixture {
        let broker = InMemoryBroker::new();
        let router = Arc::new(BrokerRouter::single(Arc::new(broker.clone()), "/"));
        let policy = RetryPolicy {
            max_retries: 2,
            ..RetryPolicy::default()
        };
        let producer = ReportProducer::with_sleeper(router, policy, Arc::new(RecordingSleeper::new()));
        let repository = Arc::new(InMemoryReportRepository::new());
        let handler = RequestReportHandler::new(
            repository.clone(),
            Arc::new(producer),
            PublishTarget::new("report.generate", "report.generate.key"),
        );
        Fixture {
            broker,
            repository,
            handler,
        }
    }

    fn command() -> RequestReportCommand {
        RequestReportCommand {
            template_id: TemplateId::from_uuid(Uuid::new_v4()),
            output_format: OutputFormat::Csv,
            filters: Some(ReportFilters::new().with_condition(
                "orders",
                "region",
                "eq",
                FilterCondition::equals([json!("eu")]),
            )),
            extra: Map::from_iter([("locale".to_string(), json!("de-DE"))]),
        }
    }

    #[tokio::test]
    async fn stores_then_publishes() {
        let f = fixture();
        let ctx = RequestContext::new().with_request_id("r1");

        let result = f.handler.handle(&ctx, command()).await.unwrap();
        assert_eq!(result.report.status(), status::PROCESSING);

        let stored = f.repository.find_by_id(&ctx, result.report.id()).await.unwrap();
        assert_eq!(stored.id(), result.report.id());

        let published = f.broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].exchange, "report.generate");
        let body: Value = serde_json::from_slice(&published[0].message.body).unwrap();
        assert_eq!(body["reportId"], json!(result.report.id().to_string()));
        assert_eq!(body["outputFormat"], "csv");
        assert_eq!(body["locale"], "de-DE");
    }

    #[tokio::test]
    async fn nil_template_is_rejected_before_storage() {
        let f = fixture();
        let ctx = RequestContext::new();
        let cmd = RequestReportCommand {
            template_id: TemplateId::nil(),
            ..command()
        };

        let err = f.handler.handle(&ctx, cmd).await.unwrap_err();
        assert_eq!(classify(&err), ErrorCategory::Validation);
        assert!(f.repository.all_rows(&ctx).await.is_empty());
        assert_eq!(f.broker.publish_attempts(), 0);
    }

    #[tokio::test]
    async fn extra_fields_cannot_replace_report_id() {
        let f = fixture();
        let ctx = RequestContext::new();
        let mut cmd = command();
        cmd.extra
            .insert("reportId".to_string(), json!("00000000-0000-0000-0000-000000000001"));

        let err = f.handler.handle(&ctx, cmd).await.unwrap_err();
        assert_eq!(classify(&err), ErrorCategory::ValidationUnknownFields);
        assert!(f.repository.all_rows(&ctx).await.is_empty());
        assert_eq!(f.broker.publish_attempts(), 0);
    }

    #[tokio::test]
    async fn publish_failure_leaves_processing_row() {
        let f = fixture();
        f.broker.fail_all_publishes();
        let ctx = RequestContext::new();

        let err = f.handler.handle(&ctx, command()).await.unwrap_err();
        assert!(matches!(err, ReportError::Publish(_)));
        assert_eq!(classify(&err), ErrorCategory::InternalServerError);

        let rows = f.repository.all_rows(&ctx).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status(), status::PROCESSING);
    }
}
