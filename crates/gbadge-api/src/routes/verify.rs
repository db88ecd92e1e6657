//! # Public Verification Route
//!
//! Unauthenticated lookup by verification id. Revoked badges are served
//! with cache-busting headers so a verifier never sees a stale GOOD result
//! after revocation; everything else may be cached briefly.

use axum::extract::{Path, State};
use axum::http::header::{HeaderName, CACHE_CONTROL};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use uuid::Uuid;

use gbadge_core::{Timestamp, VerificationId};
use gbadge_state::EffectiveStatus;

use crate::error::AppError;
use crate::state::AppState;

/// Public verification route, mounted outside the auth middleware.
pub fn router() -> Router<AppState> {
    Router::new().route("/verify/:verification_id", get(verify_badge))
}

/// Verify a badge by its public verification id.
#[utoipa::path(
    get,
    path = "/verify/{verification_id}",
    params(("verification_id" = String, Path, description = "Public verification id")),
    responses(
        (status = 200, description = "Verification report"),
        (status = 404, description = "Unknown verification id", body = crate::error::ErrorBody),
    ),
    tag = "verification"
)]
pub(crate) async fn verify_badge(
    State(state): State<AppState>,
    Path(verification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // A malformed id must read exactly like an unknown one: no oracle.
    let verification_id = Uuid::parse_str(&verification_id)
        .map_err(|_| AppError::NotFound("Badge not found".to_string()))?;
    let report = state
        .resolver
        .resolve(VerificationId(verification_id), Timestamp::now())?;

    // Revocation must be visible immediately; other statuses may be cached
    // for a minute.
    let cache_control = if report.effective_status == EffectiveStatus::Revoked {
        "no-cache, no-store, must-revalidate"
    } else {
        "public, max-age=60"
    };

    Ok((
        [
            (CACHE_CONTROL, cache_control.to_string()),
            (
                HeaderName::from_static("x-verification-status"),
                report.effective_status.as_str().to_string(),
            ),
        ],
        Json(report),
    ))
}
