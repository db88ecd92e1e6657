//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from gbadge-state, gbadge-baker, etc. to HTTP status
//! codes and returns JSON error bodies with a machine-readable code.
//! Internal error details are never exposed to clients.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use gbadge_baker::BakeError;
use gbadge_state::BadgeError;

/// Structured JSON error response body.
///
/// All error responses use this format across the API surface.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "INVALID_STATE").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Additional details, present only for client errors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
///
/// The variants mirror the domain error taxonomy; transition rejection
/// messages pass through verbatim because clients match on them.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("{0}")]
    NotFound(String),

    /// Request failed business validation (400).
    #[error("{0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("{0}")]
    BadRequest(String),

    /// Authentication failure (401).
    #[error("{0}")]
    Unauthorized(String),

    /// Authorization failure (403).
    #[error("{0}")]
    Forbidden(String),

    /// The transition is not legal from the current badge status (409).
    #[error("{0}")]
    InvalidState(String),

    /// A per-badge limit was hit (409).
    #[error("{0}")]
    QuotaExceeded(String),

    /// Internal server error (500). Message is logged, not returned.
    #[error("{0}")]
    Internal(String),
}

impl AppError {
    /// The HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::InvalidState(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            Self::QuotaExceeded(_) => (StatusCode::CONFLICT, "QUOTA_EXCEEDED"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal error messages to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            other => other.to_string(),
        };

        if matches!(&self, Self::Internal(_)) {
            tracing::error!(error = %self, "internal server error");
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
                details: None,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Map domain lifecycle errors onto the HTTP taxonomy. Messages pass
/// through unchanged; the claim rejection strings are contractual.
impl From<BadgeError> for AppError {
    fn from(err: BadgeError) -> Self {
        match err {
            BadgeError::NotFound(m) => Self::NotFound(m),
            BadgeError::Forbidden(m) => Self::Forbidden(m),
            BadgeError::InvalidState(m) => Self::InvalidState(m),
            BadgeError::QuotaExceeded(m) => Self::QuotaExceeded(m),
            BadgeError::Validation(m) => Self::Validation(m),
            BadgeError::Assertion(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<BakeError> for AppError {
    fn from(err: BakeError) -> Self {
        match err {
            BakeError::OutputTooLarge { .. } => Self::Validation(err.to_string()),
            BakeError::InvalidSignature
            | BakeError::TruncatedChunk { .. }
            | BakeError::MissingIhdr => Self::Validation(err.to_string()),
            BakeError::Assertion(e) => Self::Internal(e.to_string()),
        }
    }
}
