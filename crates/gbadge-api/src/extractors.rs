//! # Request Extractors
//!
//! Helpers for pulling validated JSON bodies out of requests. Handlers take
//! `Result<Json<T>, JsonRejection>` and call [`extract_validated_json`] so a
//! malformed body becomes a structured 400 instead of Axum's plain-text
//! rejection.

use axum::extract::rejection::JsonRejection;
use axum::Json;

use crate::error::AppError;

/// Request types that carry business validation beyond deserialization.
pub trait Validate {
    /// Check the request's fields, returning the first violation found.
    fn validate(&self) -> Result<(), AppError>;
}

/// Unwrap a JSON extraction, converting rejections into [`AppError`].
pub fn extract_json<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    match payload {
        Ok(Json(value)) => Ok(value),
        Err(rejection) => Err(AppError::BadRequest(format!(
            "Invalid request body: {rejection}"
        ))),
    }
}

/// Unwrap a JSON extraction and run the payload's own validation.
pub fn extract_validated_json<T: Validate>(
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, AppError> {
    let value = extract_json(payload)?;
    value.validate()?;
    Ok(value)
}
