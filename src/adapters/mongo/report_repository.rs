//! MongoDB implementation of ReportRepository.
//!
//! Every operation first resolves the database: the tenant database attached
//! to the request context, or the shared connection when the context reports
//! that no tenant database is attached. Driver calls run under the context so
//! cancellation and deadlines reach the wire.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::Collection;
use tracing::{debug, info};

use crate::context::{RequestContext, TenantContextError};
use crate::domain::foundation::{DomainError, ErrorCode, ReportId, Timestamp};
use crate::domain::report::{Metadata, Report, ReportQuery};
use crate::ports::{ReportRepository, RepositoryError};

use super::connection::MongoConnection;
use super::document::ReportDocument;
use super::indexes::{is_duplicate_key, is_index_conflict, is_namespace_not_found, report_indexes};
use super::query;

/// Default collection name.
pub const REPORT_COLLECTION: &str = "report";

/// MongoDB implementation of ReportRepository.
#[derive(Clone)]
pub struct MongoReportRepository {
    connection: MongoConnection,
    collection: String,
    index_provision_timeout: Duration,
    index_drop_timeout: Duration,
}

impl MongoReportRepository {
    pub fn new(connection: MongoConnection) -> Self {
        Self {
            connection,
            collection: REPORT_COLLECTION.to_string(),
            index_provision_timeout: Duration::from_secs(60),
            index_drop_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_index_timeouts(mut self, provision: Duration, drop: Duration) -> Self {
        self.index_provision_timeout = provision;
        self.index_drop_timeout = drop;
        self
    }

    fn collection(&self, ctx: &RequestContext) -> Result<Collection<ReportDocument>, RepositoryError> {
        let database = match ctx.tenant_database() {
            Ok(tenant) => tenant.database().clone(),
            Err(TenantContextError::Required) => self.connection.get_db(),
            Err(err) => return Err(err.into()),
        };
        Ok(database.collection(&self.collection))
    }

    /// Runs a driver call under the request context.
    async fn run<T, F>(
        ctx: &RequestContext,
        operation: &'static str,
        call: F,
    ) -> Result<T, RepositoryError>
    where
        F: Future<Output = Result<T, mongodb::error::Error>>,
    {
        ctx.run(call)
            .await
            .map_err(|source| RepositoryError::Context { operation, source })?
            .map_err(|err| RepositoryError::database(operation, err))
    }

    /// Runs `work` under the request context and a hard timeout.
    async fn bounded<F>(
        ctx: &RequestContext,
        operation: &'static str,
        timeout: Duration,
        work: F,
    ) -> Result<(), RepositoryError>
    where
        F: Future<Output = Result<(), RepositoryError>>,
    {
        match tokio::time::timeout(timeout, ctx.run(work)).await {
            Err(_) => Err(RepositoryError::Timeout { operation, timeout }),
            Ok(Err(source)) => Err(RepositoryError::Context { operation, source }),
            Ok(Ok(result)) => result,
        }
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

#[async_trait]
impl ReportRepository for MongoReportRepository {
    async fn ensure_indexes(&self, ctx: &RequestContext) -> Result<(), RepositoryError> {
        let collection = self.collection(ctx)?;
        Self::bounded(ctx, "ensure_indexes", self.index_provision_timeout, async {
            for spec in report_indexes() {
                match collection.create_index(spec.to_model(), None).await {
                    Ok(_) => debug!(index = spec.name, "index created"),
                    Err(err) if is_index_conflict(&err) => {
                        debug!(index = spec.name, "index already present")
                    }
                    Err(err) => return Err(RepositoryError::database("ensure_indexes", err)),
                }
            }
            Ok(())
        })
        .await
    }

    async fn drop_indexes(&self, ctx: &RequestContext) -> Result<(), RepositoryError> {
        let collection = self.collection(ctx)?;
        Self::bounded(ctx, "drop_indexes", self.index_drop_timeout, async {
            match collection.drop_indexes(None).await {
                Ok(()) => Ok(()),
                Err(err) if is_namespace_not_found(&err) => Ok(()),
                Err(err) => Err(RepositoryError::database("drop_indexes", err)),
            }
        })
        .await
    }

    async fn create(&self, ctx: &RequestContext, report: &Report) -> Result<Report, RepositoryError> {
        let collection = self.collection(ctx)?;
        let document = ReportDocument::for_insert(report, &Timestamp::now());

        match ctx.run(collection.insert_one(&document, None)).await {
            Err(source) => Err(RepositoryError::Context {
                operation: "create",
                source,
            }),
            Ok(Err(err)) if is_duplicate_key(&err) => Err(DomainError::new(
                ErrorCode::DuplicateReport,
                format!("Report already exists: {}", report.id()),
            )
            .with_entity("Report")
            .into()),
            Ok(Err(err)) => Err(RepositoryError::database("create", err)),
            Ok(Ok(_)) => Ok(document.into_report()),
        }
    }

    async fn find_by_id(&self, ctx: &RequestContext, id: &ReportId) -> Result<Report, RepositoryError> {
        let collection = self.collection(ctx)?;
        let found = Self::run(
            ctx,
            "find_by_id",
            collection.find_one(query::live_by_id(id), None),
        )
        .await?;

        found
            .map(ReportDocument::into_report)
            .ok_or_else(|| DomainError::report_not_found(id).into())
    }

    async fn find_list(
        &self,
        ctx: &RequestContext,
        query: &ReportQuery,
    ) -> Result<Vec<Report>, RepositoryError> {
        let collection = self.collection(ctx)?;
        let filter = query::list_filter(query);
        let options = query::list_options(query);

        let documents = Self::run(ctx, "find_list", async {
            let cursor = collection.find(filter, options).await?;
            let documents: Vec<ReportDocument> = cursor.try_collect().await?;
            Ok::<_, mongodb::error::Error>(documents)
        })
        .await?;

        Ok(documents.into_iter().map(ReportDocument::into_report).collect())
    }

    async fn update_report_status_by_id(
        &self,
        ctx: &RequestContext,
        status: &str,
        id: &ReportId,
        completed_at: Option<Timestamp>,
        metadata: Option<&Metadata>,
    ) -> Result<(), RepositoryError> {
        let collection = self.collection(ctx)?;
        let update = query::status_update(status, completed_at.as_ref(), metadata, &Timestamp::now())
            .map_err(|err| RepositoryError::database("update_report_status_by_id", err))?;

        let result = Self::run(
            ctx,
            "update_report_status_by_id",
            collection.update_one(query::status_update_filter(id, completed_at.as_ref()), update, None),
        )
        .await?;

        if result.matched_count == 0 {
            if completed_at.is_some() {
                let live = Self::run(
                    ctx,
                    "update_report_status_by_id",
                    collection.count_documents(query::live_by_id(id), None),
                )
                .await?;
                if live > 0 {
                    return Err(DomainError::completed_before_created(id).into());
                }
            }
            Self::log_unmatched(ctx, id, "update_report_status_by_id");
        }
        Ok(())
    }

    async fn soft_delete_by_id(&self, ctx: &RequestContext, id: &ReportId) -> Result<(), RepositoryError> {
        let collection = self.collection(ctx)?;
        let result = Self::run(
            ctx,
            "soft_delete_by_id",
            collection.update_one(query::live_by_id(id), query::soft_delete(&Timestamp::now()), None),
        )
        .await?;

        if result.matched_count == 0 {
            Self::log_unmatched(ctx, id, "soft_delete_by_id");
        } else {
            info!(report_id = %id, "report soft-deleted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::TenantDatabase;
    use mongodb::options::{ClientOptions, ServerAddress};
    use mongodb::Client;

    fn connection() -> MongoConnection {
        let options = ClientOptions::builder()
            .hosts(vec![ServerAddress::Tcp {
                host: "localhost".to_string(),
                port: Some(27017),
            }])
            .build();
        MongoConnection::from_client(Client::with_options(options).unwrap(), "reports")
    }

    #[tokio::test]
    async fn falls_back_to_shared_database_without_tenant() {
        let repo = MongoReportRepository::new(connection());
        let collection = repo.collection(&RequestContext::background()).unwrap();
        assert_eq!(collection.namespace().db, "reports");
        assert_eq!(collection.name(), REPORT_COLLECTION);
    }

    #[tokio::test]
    async fn uses_tenant_database_when_attached() {
        let conn = connection();
        let tenant_db = conn.client().database("tenant_acme");
        let repo = MongoReportRepository::new(conn).with_collection("report_v2");
        let ctx = RequestContext::new()
            .with_tenant_id("acme")
            .with_tenant_database(TenantDatabase::new("acme", tenant_db));

        let collection = repo.collection(&ctx).unwrap();
        assert_eq!(collection.namespace().db, "tenant_acme");
        assert_eq!(collection.name(), "report_v2");
    }

    #[tokio::test]
    async fn tenant_mismatch_is_fatal() {
        let conn = connection();
        let other = conn.client().database("tenant_globex");
        let repo = MongoReportRepository::new(conn);
        let ctx = RequestContext::new()
            .with_tenant_id("acme")
            .with_tenant_database(TenantDatabase::new("globex", other));

        assert!(matches!(
            repo.collection(&ctx),
            Err(RepositoryError::Tenant(TenantContextError::Mismatch { .. }))
        ));
    }
}
