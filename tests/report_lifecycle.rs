//! Integration tests for the report lifecycle and error classification.
//!
//! Covers the flow request -> worker status update -> list -> delete through
//! the application handlers over in-memory adapters, and checks that errors
//! keep their category (and HTTP status) through any amount of wrapping.

use std::collections::BTreeMap;
use std::error::Error;
use std::sync::Arc;

use anyhow::Context;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use proptest::prelude::*;
use serde_json::{json, Map};
use thiserror::Error;
use uuid::Uuid;

use report_relay::adapters::broker::{BrokerRouter, InMemoryBroker, RecordingSleeper, ReportProducer, RetryPolicy};
use report_relay::adapters::http::ApiError;
use report_relay::adapters::memory::InMemoryReportRepository;
use report_relay::application::{
    DeleteReportCommand, DeleteReportHandler, GetReportHandler, GetReportQuery,
    ListReportsHandler, PublishTarget, ReportError, RequestReportCommand, RequestReportHandler,
    UpdateReportStatusCommand, UpdateReportStatusHandler,
};
use report_relay::context::{RequestContext, TenantContextError};
use report_relay::domain::foundation::{
    classify, DomainError, ErrorCategory, ErrorCode, ErrorKind, ReportId, TemplateId, Timestamp,
};
use report_relay::domain::report::{status, OutputFormat, Report, ReportQuery};
use report_relay::ports::{ReportRepository, RepositoryError};

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Debug, Error)]
#[error("{context}")]
struct Wrapped {
    context: String,
    #[source]
    source: Box<dyn Error + Send + Sync>,
}

fn wrap(context: impl Into<String>, err: impl Into<Box<dyn Error + Send + Sync>>) -> Wrapped {
    Wrapped {
        context: context.into(),
        source: err.into(),
    }
}

fn template() -> TemplateId {
    TemplateId::from_uuid(Uuid::new_v4())
}

fn new_report() -> Report {
    Report::new(ReportId::new(), template(), status::PROCESSING, None).unwrap()
}

struct Service {
    broker: InMemoryBroker,
    repository: Arc<InMemoryReportRepository>,
    request: RequestReportHandler,
    get: GetReportHandler,
    list: ListReportsHandler,
    update: UpdateReportStatusHandler,
    delete: DeleteReportHandler,
}

fn service() -> Service {
    let broker = InMemoryBroker::new();
    let router = Arc::new(BrokerRouter::single(Arc::new(broker.clone()), "/"));
    let producer = Arc::new(ReportProducer::with_sleeper(
        router,
        RetryPolicy::default(),
        Arc::new(RecordingSleeper::new()),
    ));
    let repository = Arc::new(InMemoryReportRepository::new());
    let repo: Arc<dyn ReportRepository> = repository.clone();

    Service {
        broker,
        request: RequestReportHandler::new(
            repo.clone(),
            producer,
            PublishTarget::new("report.generate", "report.generate.key"),
        ),
        get: GetReportHandler::new(repo.clone()),
        list: ListReportsHandler::new(repo.clone(), 100),
        update: UpdateReportStatusHandler::new(repo.clone()),
        delete: DeleteReportHandler::new(repo),
        repository,
    }
}

// =============================================================================
// Lifecycle
// =============================================================================

#[tokio::test]
async fn soft_delete_hides_row() {
    let repo = InMemoryReportRepository::new();
    let ctx = RequestContext::new();
    let r1 = repo.create(&ctx, &new_report()).await.unwrap();

    repo.update_report_status_by_id(&ctx, status::DELETED, r1.id(), Some(Timestamp::now()), None)
        .await
        .unwrap();

    let err = repo.find_by_id(&ctx, r1.id()).await.unwrap_err();
    assert_eq!(classify(&err), ErrorCategory::NotFound);
    assert!(err.as_domain().unwrap().has_code(ErrorCode::ReportNotFound));
}

#[tokio::test]
async fn deleted_rows_leave_list_results() {
    let repo = InMemoryReportRepository::new();
    let ctx = RequestContext::new();
    let kept = repo.create(&ctx, &new_report()).await.unwrap();
    let gone = repo.create(&ctx, &new_report()).await.unwrap();

    repo.soft_delete_by_id(&ctx, gone.id()).await.unwrap();

    let listed = repo.find_list(&ctx, &ReportQuery::default()).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id(), kept.id());
}

#[tokio::test]
async fn request_finish_list_and_delete() {
    let svc = service();
    let ctx = RequestContext::new().with_request_id("req-42");

    let requested = svc
        .request
        .handle(
            &ctx,
            RequestReportCommand {
                template_id: template(),
                output_format: OutputFormat::Html,
                filters: None,
                extra: Map::new(),
            },
        )
        .await
        .unwrap();
    let id = *requested.report.id();
    assert_eq!(svc.broker.published().len(), 1);

    svc.update
        .handle(
            &ctx,
            UpdateReportStatusCommand {
                report_id: id,
                status: status::FINISHED.to_string(),
                completed_at: Some(Timestamp::now()),
                metadata: Some(BTreeMap::from([("owner".to_string(), json!("ops"))])),
            },
        )
        .await
        .unwrap();

    let finished = svc.get.handle(&ctx, GetReportQuery { report_id: id }).await.unwrap();
    assert_eq!(finished.status(), status::FINISHED);
    assert!(finished.has_consistent_timeline());

    let by_owner = ReportQuery {
        status: Some(status::FINISHED.to_string()),
        metadata: BTreeMap::from([("owner".to_string(), "ops".to_string())]),
        ..Default::default()
    };
    let page = svc.list.handle(&ctx, by_owner.clone()).await.unwrap();
    assert_eq!(page.reports.len(), 1);

    svc.delete
        .handle(&ctx, DeleteReportCommand { report_id: id })
        .await
        .unwrap();

    let err = svc.get.handle(&ctx, GetReportQuery { report_id: id }).await.unwrap_err();
    assert_eq!(classify(&err), ErrorCategory::NotFound);
    assert!(svc.list.handle(&ctx, by_owner).await.unwrap().reports.is_empty());
    assert_eq!(svc.repository.all_rows(&ctx).await.len(), 1);
}

#[tokio::test]
async fn nil_identifiers_fail_construction() {
    for (id, tid, label) in [
        (ReportId::nil(), template(), status::PROCESSING),
        (ReportId::new(), TemplateId::nil(), status::PROCESSING),
        (ReportId::new(), template(), ""),
    ] {
        let err = Report::new(id, tid, label, None).unwrap_err();
        assert!(err.has_code(ErrorCode::MissingRequiredFields));
    }
}

// =============================================================================
// Tenant context
// =============================================================================

#[test]
fn empty_context_has_no_tenant_database() {
    assert!(matches!(
        RequestContext::background().tenant_database(),
        Err(TenantContextError::Required)
    ));
    assert!(matches!(
        RequestContext::new()
            .with_tenant_id("acme")
            .with_tenant_database(None)
            .tenant_database(),
        Err(TenantContextError::Required)
    ));
}

// =============================================================================
// Classification under wrapping
// =============================================================================

#[tokio::test]
async fn doubly_wrapped_foreign_not_found_translates_to_404() {
    let err = DomainError::business(ErrorKind::NotFound, "TPL-0011", "template not found");
    let wrapped = wrap("handler", wrap("repository", err));
    assert_eq!(classify(&wrapped), ErrorCategory::NotFound);

    let response = ApiError::from(wrapped).into_response();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(String::from_utf8_lossy(&body).contains("TPL-0011"));
}

#[test]
fn anyhow_context_keeps_category() {
    let result: Result<(), DomainError> =
        Err(DomainError::new(ErrorCode::DuplicateReport, "Report already exists"));
    let err = result
        .context("inserting report")
        .context("handling request")
        .unwrap_err();

    assert_eq!(classify(err.as_ref()), ErrorCategory::Conflict);
    assert_eq!(ApiError::from_error(err.as_ref()).status(), StatusCode::CONFLICT);
}

#[test]
fn layered_crate_errors_keep_category() {
    let err = ReportError::from(RepositoryError::from(DomainError::new(
        ErrorCode::InvalidStatusTransition,
        "completedAt requires a terminal status",
    )));
    let err = anyhow::Error::new(err).context("worker callback");

    assert_eq!(classify(err.as_ref()), ErrorCategory::Unprocessable);
}

#[test]
fn wrapped_infrastructure_error_is_internal() {
    let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "server selection timeout");
    let err = wrap("find_list", RepositoryError::database("find_list", io));
    assert_eq!(classify(&err), ErrorCategory::InternalServerError);
}

fn business_code() -> impl Strategy<Value = ErrorCode> {
    prop::sample::select(vec![
        ErrorCode::ReportNotFound,
        ErrorCode::DuplicateReport,
        ErrorCode::InvalidMetadata,
        ErrorCode::UnexpectedFields,
        ErrorCode::InvalidPagination,
        ErrorCode::InvalidStatusTransition,
        ErrorCode::Unauthorized,
        ErrorCode::Forbidden,
    ])
}

proptest! {
    #[test]
    fn wrapping_never_changes_category(
        code in business_code(),
        contexts in prop::collection::vec("[a-z ]{0,12}", 0..8),
    ) {
        let original = DomainError::new(code, "boom");
        let expected = classify(&original);

        let mut current: Box<dyn Error + Send + Sync> = Box::new(original);
        for context in contexts {
            current = Box::new(wrap(context, current));
        }

        prop_assert_eq!(classify(current.as_ref()), expected);
        prop_assert!(expected.is_business());
    }
}
