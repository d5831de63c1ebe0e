//! Request context extraction from inbound HTTP headers.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::HeaderMap;

use crate::context::{
    RequestContext, TraceContext, REQUEST_ID_HEADER, TENANT_ID_HEADER, TRACEPARENT_HEADER,
    TRACESTATE_HEADER,
};

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Builds a [`RequestContext`] from request headers.
///
/// A missing request id is generated. A valid `traceparent` continues the
/// caller's trace with a fresh span; otherwise a new root trace starts.
pub fn request_context_from_headers(headers: &HeaderMap) -> RequestContext {
    let mut ctx = RequestContext::new();

    if let Some(request_id) = header(headers, REQUEST_ID_HEADER) {
        ctx = ctx.with_request_id(request_id);
    }
    if let Some(tenant_id) = header(headers, TENANT_ID_HEADER) {
        ctx = ctx.with_tenant_id(tenant_id);
    }

    let trace = header(headers, TRACEPARENT_HEADER)
        .and_then(|parent| TraceContext::parse(parent, header(headers, TRACESTATE_HEADER)))
        .map(|parent| parent.child())
        .unwrap_or_else(TraceContext::new_root);

    ctx.with_trace(trace)
}

/// Extractor yielding the request's [`RequestContext`].
#[derive(Debug, Clone)]
pub struct RequestScope(pub RequestContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequestScope
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(request_context_from_headers(&parts.headers)))
    }
}
