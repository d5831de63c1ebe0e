//! Translation of classified errors into HTTP responses.

use std::error::Error;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::foundation::{find_business_error, ErrorCategory, ErrorCode};

/// Standard error response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling (e.g. `RPT-0010`, `TPL-0011`).
    pub error_code: String,
    /// Human-readable error message.
    pub message: String,
    /// Field-level reasons, when the error carries any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

/// Any error, classified and ready to be rendered.
#[derive(Debug)]
pub struct ApiError {
    category: ErrorCategory,
    body: ErrorResponse,
}

impl ApiError {
    /// Classifies `err` by walking its source chain.
    ///
    /// Infrastructure errors are logged in full and rendered with a generic
    /// message so internals never leak to callers.
    pub fn from_error(err: &(dyn Error + 'static)) -> Self {
        match find_business_error(err) {
            Some(domain) => {
                let body = if domain.fields.is_empty() {
                    ErrorResponse::new(&domain.code, &domain.message)
                } else {
                    ErrorResponse::with_details(
                        &domain.code,
                        &domain.message,
                        serde_json::json!({ "fields": domain.fields }),
                    )
                };
                Self {
                    category: ErrorCategory::from(domain.kind),
                    body,
                }
            }
            None => {
                error!(error = %err, "request failed with an infrastructure error");
                Self {
                    category: ErrorCategory::InternalServerError,
                    body: ErrorResponse::new(
                        ErrorCode::InternalError.as_str(),
                        ErrorCode::InternalError.title(),
                    ),
                }
            }
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.category.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn body(&self) -> &ErrorResponse {
        &self.body
    }
}

impl<E> From<E> for ApiError
where
    E: Error + 'static,
{
    fn from(err: E) -> Self {
        Self::from_error(&err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self.body)).into_response()
    }
}
