//! API error types and responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// API error type.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Invalid input; lists every failing field. No side effects occurred.
    #[error("validation failed: {0:?}")]
    Validation(Vec<String>),

    /// Bad request - malformed input.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Webhook signature missing or invalid. No state change.
    #[error("invalid webhook signature")]
    Signature,

    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// Payment gateway call failed; the checkout can be retried from scratch.
    #[error("payment gateway error: {0}")]
    Gateway(String),

    /// Internal server error. For webhook deliveries a 500 tells the provider
    /// to retry; the unique-insert guards make the retry safe.
    #[error("internal error: {0}")]
    Internal(String),
}

/// JSON error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Validation failed".to_string(),
                Some(serde_json::json!({ "errors": errors })),
            ),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone(), None),
            Self::Signature => (
                StatusCode::BAD_REQUEST,
                "invalid_signature",
                self.to_string(),
                None,
            ),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone(), None),
            Self::Gateway(msg) => (StatusCode::BAD_GATEWAY, "gateway_error", msg.clone(), None),
            Self::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<storefront_store::StoreError> for ApiError {
    fn from(err: storefront_store::StoreError) -> Self {
        match err {
            storefront_store::StoreError::NotFound => Self::NotFound("record not found".into()),
            // Handlers resolve duplicate-key conflicts themselves; one
            // reaching this conversion is a bug, not a benign race.
            storefront_store::StoreError::DuplicateKey { keyspace, key } => {
                Self::Internal(format!("unresolved duplicate key in {keyspace}: {key}"))
            }
            storefront_store::StoreError::Database(msg)
            | storefront_store::StoreError::Serialization(msg) => Self::Internal(msg),
        }
    }
}

impl From<crate::stripe::StripeError> for ApiError {
    fn from(err: crate::stripe::StripeError) -> Self {
        match err {
            crate::stripe::StripeError::InvalidSignature => Self::Signature,
            other => Self::Gateway(other.to_string()),
        }
    }
}
