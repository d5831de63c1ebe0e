//! Header assembly for outbound report messages.

use crate::context::{
    RequestContext, TraceContext, REQUEST_ID_HEADER, RETRY_COUNT_HEADER, TENANT_ID_HEADER,
    TRACEPARENT_HEADER, TRACESTATE_HEADER,
};
use crate::ports::HeaderValue;

/// Headers for one publish attempt.
///
/// `x-tenant-id` is only present for a non-empty tenant id.
pub fn publish_headers(
    ctx: &RequestContext,
    trace: &TraceContext,
    retry_count: u32,
) -> Vec<(String, HeaderValue)> {
    let mut headers = vec![
        (
            REQUEST_ID_HEADER.to_string(),
            HeaderValue::Text(ctx.request_id().to_string()),
        ),
        (
            RETRY_COUNT_HEADER.to_string(),
            HeaderValue::Int(i64::from(retry_count)),
        ),
    ];

    let tenant_id = ctx.tenant_id();
    if !tenant_id.is_empty() {
        headers.push((
            TENANT_ID_HEADER.to_string(),
            HeaderValue::Text(tenant_id.to_string()),
        ));
    }

    headers.push((
        TRACEPARENT_HEADER.to_string(),
        HeaderValue::Text(trace.traceparent()),
    ));
    if let Some(state) = trace.tracestate() {
        headers.push((
            TRACESTATE_HEADER.to_string(),
            HeaderValue::Text(state.to_string()),
        ));
    }

    headers
}
