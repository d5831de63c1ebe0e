//! In-memory implementation of ReportRepository.
//!
//! Mirrors the document-store semantics (tenant buckets, soft delete, list
//! filter and ordering, lenient updates) for tests and local runs. Stored
//! times keep millisecond precision, like BSON dates.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::context::{RequestContext, TenantContextError};
use crate::domain::foundation::{DomainError, ErrorCode, ReportId, Timestamp};
use crate::domain::report::{status, Metadata, Report, ReportQuery};
use crate::ports::{ReportRepository, RepositoryError};

/// Bucket used when the request carries no tenant database.
const SHARED_BUCKET: &str = "";

#[derive(Default)]
struct Bucket {
    reports: Vec<Report>,
    indexes: BTreeSet<&'static str>,
}

/// In-memory report store, bucketed by tenant database name.
#[derive(Default)]
pub struct InMemoryReportRepository {
    buckets: RwLock<HashMap<String, Bucket>>,
}

impl InMemoryReportRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn bucket_name(ctx: &RequestContext) -> Result<String, RepositoryError> {
        match ctx.tenant_database() {
            Ok(tenant) => Ok(tenant.name().to_string()),
            Err(TenantContextError::Required) => Ok(SHARED_BUCKET.to_string()),
            Err(err) => Err(err.into()),
        }
    }

    fn check(ctx: &RequestContext, operation: &'static str) -> Result<String, RepositoryError> {
        if let Some(source) = ctx.err() {
            return Err(RepositoryError::Context { operation, source });
        }
        Self::bucket_name(ctx)
    }

    // === Test Helpers ===

    /// Every stored row of the bucket the context resolves to, deleted or not.
    pub async fn all_rows(&self, ctx: &RequestContext) -> Vec<Report> {
        let Ok(bucket) = Self::bucket_name(ctx) else {
            return Vec::new();
        };
        self.buckets
            .read()
            .await
            .get(&bucket)
            .map(|bucket| bucket.reports.clone())
            .unwrap_or_default()
    }

    /// Index names provisioned in the bucket the context resolves to.
    pub async fn index_names(&self, ctx: &RequestContext) -> Vec<&'static str> {
        let Ok(bucket) = Self::bucket_name(ctx) else {
            return Vec::new();
        };
        self.buckets
            .read()
            .await
            .get(&bucket)
            .map(|bucket| bucket.indexes.iter().copied().collect())
            .unwrap_or_default()
    }

    fn stamp() -> Timestamp {
        Timestamp::now().truncated_to_millis()
    }

    fn log_unmatched(ctx: &RequestContext, id: &ReportId, operation: &'static str) {
        info!(
            name: "report_update_unmatched",
            request_id = %ctx.request_id(),
            tenant_id = %ctx.tenant_id(),
            report_id = %id,
            operation,
            "no live report matched the update"
        );
    }
}

const INDEX_NAMES: [&str; 5] = ["id_deleted", "list_main", "status_poll", "template", "complete"];

fn matches_query(report: &Report, query: &ReportQuery) -> bool {
    if report.is_deleted() {
        return false;
    }
    if let Some(wanted) = query.effective_status() {
        if report.status() != wanted {
            return false;
        }
    }
    if let Some(template_id) = query.effective_template_id() {
        if report.template_id() != &template_id {
            return false;
        }
    }
    if let Some(day) = query.created_at {
        let start = Timestamp::start_of_day(day);
        let end = start.add_days(1);
        let created = report.created_at();
        if created.is_before(&start) || !created.is_before(&end) {
            return false;
        }
    }
    query.metadata.iter().all(|(key, wanted)| {
        report
            .metadata()
            .and_then(|metadata| metadata.get(key))
            .map_or(false, |value| metadata_matches(value, wanted))
    })
}

/// String equality, or membership for arrays, as a document-store equality
/// filter on `metadata.<key>` behaves.
fn metadata_matches(value: &Value, wanted: &str) -> bool {
    match value {
        Value::String(s) => s == wanted,
        Value::Array(items) => items
            .iter()
            .any(|item| matches!(item, Value::String(s) if s == wanted)),
        _ => false,
    }
}

fn with_status_update(
    report: &Report,
    new_status: &str,
    completed_at: Option<Timestamp>,
    metadata: Option<&Metadata>,
    now: Timestamp,
) -> Report {
    let status = if new_status.is_empty() {
        report.status().to_string()
    } else {
        new_status.to_string()
    };
    let deleted_at = if new_status == status::DELETED {
        Some(now)
    } else {
        report.deleted_at().copied()
    };

    Report::reconstruct(
        *report.id(),
        *report.template_id(),
        status,
        report.filters().cloned(),
        metadata.cloned().or_else(|| report.metadata().cloned()),
        completed_at.or_else(|| report.completed_at().copied()),
        *report.created_at(),
        completed_at.unwrap_or(now),
        deleted_at,
    )
}

fn soft_deleted(report: &Report, now: Timestamp) -> Report {
    Report::reconstruct(
        *report.id(),
        *report.template_id(),
        report.status().to_string(),
        report.filters().cloned(),
        report.metadata().cloned(),
        report.completed_at().copied(),
        *report.created_at(),
        now,
        Some(now),
    )
}

#[async_trait]
impl ReportRepository for InMemoryReportRepository {
    async fn ensure_indexes(&self, ctx: &RequestContext) -> Result<(), RepositoryError> {
        let bucket = Self::check(ctx, "ensure_indexes")?;
        let mut buckets = self.buckets.write().await;
        buckets.entry(bucket).or_default().indexes.extend(INDEX_NAMES);
        Ok(())
    }

    async fn drop_indexes(&self, ctx: &RequestContext) -> Result<(), RepositoryError> {
        let bucket = Self::check(ctx, "drop_indexes")?;
        if let Some(bucket) = self.buckets.write().await.get_mut(&bucket) {
            bucket.indexes.clear();
        }
        Ok(())
    }

    async fn create(&self, ctx: &RequestContext, report: &Report) -> Result<Report, RepositoryError> {
        let bucket = Self::check(ctx, "create")?;
        let mut buckets = self.buckets.write().await;
        let bucket = buckets.entry(bucket).or_default();

        let duplicate = bucket
            .reports
            .iter()
            .any(|existing| existing.id() == report.id() && !existing.is_deleted());
        if duplicate {
            return Err(DomainError::new(
                ErrorCode::DuplicateReport,
                format!("Report already exists: {}", report.id()),
            )
            .with_entity("Report")
            .into());
        }

        let now = Self::stamp();
        let stored = Report::reconstruct(
            *report.id(),
            *report.template_id(),
            report.status().to_string(),
            report.filters().cloned(),
            report.metadata().cloned(),
            report.completed_at().map(Timestamp::truncated_to_millis),
            now,
            now,
            None,
        );
        bucket.reports.push(stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, ctx: &RequestContext, id: &ReportId) -> Result<Report, RepositoryError> {
        let bucket = Self::check(ctx, "find_by_id")?;
        self.buckets
            .read()
            .await
            .get(&bucket)
            .and_then(|bucket| {
                bucket
                    .reports
                    .iter()
                    .find(|report| report.id() == id && !report.is_deleted())
                    .cloned()
            })
            .ok_or_else(|| DomainError::report_not_found(id).into())
    }

    async fn find_list(
        &self,
        ctx: &RequestContext,
        query: &ReportQuery,
    ) -> Result<Vec<Report>, RepositoryError> {
        let bucket = Self::check(ctx, "find_list")?;
        let buckets = self.buckets.read().await;
        let Some(bucket) = buckets.get(&bucket) else {
            return Ok(Vec::new());
        };

        let mut matching: Vec<Report> = bucket
            .reports
            .iter()
            .filter(|report| matches_query(report, query))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at().cmp(a.created_at()));

        let skip = usize::try_from(query.skip()).unwrap_or(usize::MAX);
        Ok(matching
            .into_iter()
            .skip(skip)
            .take(query.limit as usize)
            .collect())
    }

    async fn update_report_status_by_id(
        &self,
        ctx: &RequestContext,
        status: &str,
        id: &ReportId,
        completed_at: Option<Timestamp>,
        metadata: Option<&Metadata>,
    ) -> Result<(), RepositoryError> {
        let bucket = Self::check(ctx, "update_report_status_by_id")?;
        let completed_at = completed_at.map(|at| at.truncated_to_millis());
        let mut buckets = self.buckets.write().await;
        let live = buckets.get_mut(&bucket).and_then(|bucket| {
            bucket
                .reports
                .iter_mut()
                .find(|report| report.id() == id && !report.is_deleted())
        });

        match live {
            Some(report) => {
                if completed_at.is_some_and(|at| at.is_before(report.created_at())) {
                    return Err(DomainError::completed_before_created(id).into());
                }
                *report = with_status_update(report, status, completed_at, metadata, Self::stamp());
            }
            None => Self::log_unmatched(ctx, id, "update_report_status_by_id"),
        }
        Ok(())
    }

    async fn soft_delete_by_id(&self, ctx: &RequestContext, id: &ReportId) -> Result<(), RepositoryError> {
        let bucket = Self::check(ctx, "soft_delete_by_id")?;
        let mut buckets = self.buckets.write().await;
        let live = buckets.get_mut(&bucket).and_then(|bucket| {
            bucket
                .reports
                .iter_mut()
                .find(|report| report.id() == id && !report.is_deleted())
        });

        match live {
            Some(report) => *report = soft_deleted(report, Self::stamp()),
            None => Self::log_unmatched(ctx, id, "soft_delete_by_id"),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CancellationSignal;
    use crate::domain::foundation::{classify, ErrorCategory, TemplateId};
    use serde_json::json;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn new_report(template: TemplateId) -> Report {
        Report::new(ReportId::new(), template, status::PROCESSING, None).unwrap()
    }

    fn template() -> TemplateId {
        TemplateId::from_uuid(Uuid::new_v4())
    }

    #[tokio::test]
    async fn create_stamps_timestamps_and_finds_row() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let report = new_report(template());

        let stored = repo.create(&ctx, &report).await.unwrap();
        assert_eq!(stored.created_at(), stored.updated_at());
        assert!(stored.deleted_at().is_none());

        let found = repo.find_by_id(&ctx, report.id()).await.unwrap();
        assert_eq!(found, stored);
    }

    #[tokio::test]
    async fn duplicate_live_id_is_conflict() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let report = new_report(template());
        repo.create(&ctx, &report).await.unwrap();

        let err = repo.create(&ctx, &report).await.unwrap_err();
        assert_eq!(classify(&err), ErrorCategory::Conflict);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let repo = InMemoryReportRepository::new();
        let err = repo
            .find_by_id(&RequestContext::new(), &ReportId::new())
            .await
            .unwrap_err();
        assert!(err.as_domain().unwrap().has_code(ErrorCode::ReportNotFound));
    }

    #[tokio::test]
    async fn deleted_status_hides_row() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let report = repo.create(&ctx, &new_report(template())).await.unwrap();

        repo.update_report_status_by_id(&ctx, status::DELETED, report.id(), Some(Timestamp::now()), None)
            .await
            .unwrap();

        let err = repo.find_by_id(&ctx, report.id()).await.unwrap_err();
        assert_eq!(classify(&err), ErrorCategory::NotFound);
        assert!(repo.all_rows(&ctx).await[0].is_deleted());
    }

    #[tokio::test]
    async fn partial_update_keeps_untouched_fields() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let report = repo.create(&ctx, &new_report(template())).await.unwrap();
        let metadata = Metadata::new(BTreeMap::from([("pages".to_string(), json!(4))])).unwrap();

        repo.update_report_status_by_id(&ctx, "", report.id(), None, Some(&metadata))
            .await
            .unwrap();

        let updated = repo.find_by_id(&ctx, report.id()).await.unwrap();
        assert_eq!(updated.status(), status::PROCESSING);
        assert_eq!(updated.metadata(), Some(&metadata));
        assert!(updated.completed_at().is_none());
        assert!(updated.has_consistent_timeline());
    }

    #[tokio::test]
    async fn completion_before_creation_is_rejected() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let report = repo.create(&ctx, &new_report(template())).await.unwrap();

        let err = repo
            .update_report_status_by_id(
                &ctx,
                status::FINISHED,
                report.id(),
                Some(Timestamp::from_unix_millis(1_000)),
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(classify(&err), ErrorCategory::Unprocessable);
        assert!(err.as_domain().unwrap().has_code(ErrorCode::InvalidStatusTransition));

        let unchanged = repo.find_by_id(&ctx, report.id()).await.unwrap();
        assert_eq!(unchanged, report);
        assert!(unchanged.has_consistent_timeline());
    }

    #[tokio::test]
    async fn completion_at_creation_instant_is_accepted() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let report = repo.create(&ctx, &new_report(template())).await.unwrap();

        repo.update_report_status_by_id(&ctx, status::FINISHED, report.id(), Some(*report.created_at()), None)
            .await
            .unwrap();

        let finished = repo.find_by_id(&ctx, report.id()).await.unwrap();
        assert_eq!(finished.updated_at(), report.created_at());
        assert!(finished.has_consistent_timeline());
    }

    #[tokio::test]
    async fn stored_times_have_millisecond_precision() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let stored = repo.create(&ctx, &new_report(template())).await.unwrap();
        assert_eq!(stored.created_at(), &stored.created_at().truncated_to_millis());

        let completed_at = Timestamp::now();
        repo.update_report_status_by_id(&ctx, status::FINISHED, stored.id(), Some(completed_at), None)
            .await
            .unwrap();
        let finished = repo.find_by_id(&ctx, stored.id()).await.unwrap();
        assert_eq!(finished.completed_at(), Some(&completed_at.truncated_to_millis()));
    }

    #[tokio::test]
    async fn unmatched_update_succeeds() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        repo.update_report_status_by_id(&ctx, status::FINISHED, &ReportId::new(), None, None)
            .await
            .unwrap();
        repo.soft_delete_by_id(&ctx, &ReportId::new()).await.unwrap();
    }

    #[tokio::test]
    async fn list_filters_sorts_and_paginates() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let wanted = template();

        let mut created = Vec::new();
        for _ in 0..5 {
            created.push(repo.create(&ctx, &new_report(wanted)).await.unwrap());
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        repo.create(&ctx, &new_report(template())).await.unwrap();
        repo.soft_delete_by_id(&ctx, created[4].id()).await.unwrap();

        let query = ReportQuery {
            template_id: Some(wanted),
            limit: 2,
            page: 1,
            ..Default::default()
        };
        let first = repo.find_list(&ctx, &query).await.unwrap();
        assert_eq!(
            first.iter().map(|r| *r.id()).collect::<Vec<_>>(),
            vec![*created[3].id(), *created[2].id()]
        );

        let third = repo
            .find_list(&ctx, &ReportQuery { page: 2, ..query.clone() })
            .await
            .unwrap();
        assert_eq!(
            third.iter().map(|r| *r.id()).collect::<Vec<_>>(),
            vec![*created[1].id(), *created[0].id()]
        );
    }

    #[tokio::test]
    async fn list_matches_metadata_strings() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let report = repo.create(&ctx, &new_report(template())).await.unwrap();
        repo.create(&ctx, &new_report(template())).await.unwrap();
        let metadata = Metadata::new(BTreeMap::from([("owner".to_string(), json!("ops"))])).unwrap();
        repo.update_report_status_by_id(&ctx, "", report.id(), None, Some(&metadata))
            .await
            .unwrap();

        let query = ReportQuery {
            metadata: BTreeMap::from([("owner".to_string(), "ops".to_string())]),
            ..Default::default()
        };
        let found = repo.find_list(&ctx, &query).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id(), report.id());
    }

    #[tokio::test]
    async fn list_matches_metadata_array_members() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        let report = repo.create(&ctx, &new_report(template())).await.unwrap();
        let metadata =
            Metadata::new(BTreeMap::from([("owner".to_string(), json!(["ops", "finance"]))])).unwrap();
        repo.update_report_status_by_id(&ctx, "", report.id(), None, Some(&metadata))
            .await
            .unwrap();

        let by_owner = |owner: &str| ReportQuery {
            metadata: BTreeMap::from([("owner".to_string(), owner.to_string())]),
            ..Default::default()
        };
        assert_eq!(repo.find_list(&ctx, &by_owner("finance")).await.unwrap().len(), 1);
        assert!(repo.find_list(&ctx, &by_owner("legal")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ensure_indexes_is_idempotent() {
        let repo = InMemoryReportRepository::new();
        let ctx = RequestContext::new();
        repo.ensure_indexes(&ctx).await.unwrap();
        repo.ensure_indexes(&ctx).await.unwrap();
        assert_eq!(repo.index_names(&ctx).await.len(), 5);

        repo.drop_indexes(&ctx).await.unwrap();
        assert!(repo.index_names(&ctx).await.is_empty());
    }

    #[tokio::test]
    async fn cancelled_context_is_refused() {
        let repo = InMemoryReportRepository::new();
        let (handle, signal) = CancellationSignal::pair();
        handle.cancel();
        let ctx = RequestContext::new().with_cancellation(signal);

        let err = repo.find_list(&ctx, &ReportQuery::default()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Context { .. }));
    }
}
