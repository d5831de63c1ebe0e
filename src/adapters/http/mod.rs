//! HTTP adapters - Error translation and request decoding.
//!
//! Routing and handlers live with the host service; this module provides the
//! pieces every report endpoint needs.

mod context;
mod error_response;
mod query_params;

pub use context::{request_context_from_headers, RequestScope};
pub use error_response::{ApiError, ErrorResponse};
pub use query_params::parse_report_query;
