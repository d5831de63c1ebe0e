//! Request-scoped context.
//!
//! A [`RequestContext`] travels with every publish and repository call. It
//! carries the request id, the tenant id, an optional pre-resolved tenant
//! database, the W3C trace position, a cancellation signal and a deadline.
//!
//! The context is an explicit value threaded through call sites; nothing in
//! this crate keeps request data in globals or task-locals.

mod cancellation;
mod tenant;
mod trace;

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

pub use cancellation::{CancelHandle, CancellationSignal, ContextError};
pub use tenant::{TenantContextError, TenantDatabase};
pub use trace::TraceContext;

/// Header carrying the request id end to end.
pub const REQUEST_ID_HEADER: &str = "x-request-id";
/// Header carrying the tenant id.
pub const TENANT_ID_HEADER: &str = "x-tenant-id";
/// Header counting publish retries.
pub const RETRY_COUNT_HEADER: &str = "x-retry-count";
/// W3C trace parent header.
pub const TRACEPARENT_HEADER: &str = "traceparent";
/// W3C trace state header.
pub const TRACESTATE_HEADER: &str = "tracestate";

/// Context of a single inbound request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: String,
    tenant_id: Option<String>,
    tenant_database: Option<TenantDatabase>,
    trace: TraceContext,
    cancellation: CancellationSignal,
    deadline: Option<Instant>,
}

impl RequestContext {
    /// Fresh context with a generated request id and a new root trace.
    pub fn new() -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            tenant_id: None,
            tenant_database: None,
            trace: TraceContext::new_root(),
            cancellation: CancellationSignal::never(),
            deadline: None,
        }
    }

    /// Context for work not tied to an inbound request (startup, sweeps).
    pub fn background() -> Self {
        Self::new()
    }

    /// Replaces the request id. Blank ids are ignored.
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        let request_id = request_id.into();
        if !request_id.trim().is_empty() {
            self.request_id = request_id;
        }
        self
    }

    /// Stores the tenant id. An empty id leaves the context unchanged.
    pub fn with_tenant_id(mut self, tenant_id: impl Into<String>) -> Self {
        let tenant_id = tenant_id.into();
        if !tenant_id.is_empty() {
            self.tenant_id = Some(tenant_id);
        }
        self
    }

    /// Stores (or clears, with `None`) the resolved tenant database.
    pub fn with_tenant_database(mut self, database: impl Into<Option<TenantDatabase>>) -> Self {
        self.tenant_database = database.into();
        self
    }

    pub fn with_trace(mut self, trace: TraceContext) -> Self {
        self.trace = trace;
        self
    }

    pub fn with_cancellation(mut self, cancellation: CancellationSignal) -> Self {
        self.cancellation = cancellation;
        self
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) if existing < deadline => existing,
            _ => deadline,
        });
        self
    }

    /// Sets a deadline `timeout` from now, keeping an earlier one if present.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Tenant id, or the empty string when unset.
    pub fn tenant_id(&self) -> &str {
        self.tenant_id.as_deref().unwrap_or_default()
    }

    pub fn has_tenant(&self) -> bool {
        self.tenant_id.is_some()
    }

    pub fn trace(&self) -> &TraceContext {
        &self.trace
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns the attached tenant database.
    ///
    /// # Errors
    ///
    /// - `Required` when no handle is attached; callers fall back to the
    ///   shared connection
    /// - `Mismatch` when the handle belongs to a different tenant than the
    ///   request
    pub fn tenant_database(&self) -> Result<&TenantDatabase, TenantContextError> {
        let database = self
            .tenant_database
            .as_ref()
            .ok_or(TenantContextError::Required)?;

        if let Some(tenant_id) = &self.tenant_id {
            if database.tenant_id() != tenant_id {
                return Err(TenantContextError::Mismatch {
                    expected: tenant_id.clone(),
                    actual: database.tenant_id().to_string(),
                });
            }
        }
        Ok(database)
    }

    /// Returns why the context is finished, if it is.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancellation.is_cancelled() {
            return Some(ContextError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves when the context is cancelled or its deadline passes.
    pub async fn done(&self) -> ContextError {
        let deadline = async {
            match self.deadline {
                Some(deadline) => tokio::time::sleep_until(deadline).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => ContextError::Cancelled,
            _ = deadline => ContextError::DeadlineExceeded,
        }
    }

    /// Runs `fut` unless the context finishes first.
    pub async fn run<F: Future>(&self, fut: F) -> Result<F::Output, ContextError> {
        if let Some(err) = self.err() {
            return Err(err);
        }
        tokio::select! {
            biased;
            err = self.done() => Err(err),
            output = fut => Ok(output),
        }
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}
