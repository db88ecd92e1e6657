//! # Claim Routes
//!
//! Two paths to the same CLAIMED state: an authenticated claim by badge id,
//! and a public claim by token for recipients following the emailed deep
//! link. Both go through the lifecycle's compare-and-set, so concurrent
//! claims have exactly one winner.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use gbadge_core::{BadgeId, Timestamp};

use crate::auth::CallerIdentity;
use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::routes::badges::BadgeResponse;
use crate::state::AppState;

/// Authenticated claim route.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/badges/:id/claim", post(claim_badge))
}

/// Public claim-by-token route, mounted outside the auth middleware.
pub fn public_router() -> Router<AppState> {
    Router::new().route("/v1/claim", post(claim_by_token))
}

/// Request body for claiming by token.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ClaimByTokenRequest {
    /// The token from the claim link.
    pub claim_token: String,
}

impl Validate for ClaimByTokenRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.claim_token.trim().is_empty() {
            return Err(AppError::Validation(
                "claim_token is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Claim a badge as its recipient.
#[utoipa::path(
    post,
    path = "/v1/badges/{id}/claim",
    params(("id" = Uuid, Path, description = "Badge id")),
    responses(
        (status = 200, description = "Badge claimed", body = BadgeResponse),
        (status = 403, description = "Caller is not the recipient", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown badge", body = crate::error::ErrorBody),
        (status = 409, description = "Badge is not claimable", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "claims"
)]
pub(crate) async fn claim_badge(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<BadgeResponse>, AppError> {
    let actor = identity.actor()?;
    let badge = state.lifecycle.claim(BadgeId(id), &actor)?;

    tracing::info!(badge_id = %badge.id, "badge claimed");

    if let Some(pool) = &state.db {
        db::mirror_claim(pool, &badge).await;
    }

    Ok(Json(BadgeResponse::from_badge(
        &badge,
        Timestamp::now(),
        state.lifecycle.generator(),
    )))
}

/// Claim a badge with a claim token.
#[utoipa::path(
    post,
    path = "/v1/claim",
    request_body = ClaimByTokenRequest,
    responses(
        (status = 200, description = "Badge claimed", body = BadgeResponse),
        (status = 404, description = "Unknown or spent token", body = crate::error::ErrorBody),
        (status = 409, description = "Badge is not claimable", body = crate::error::ErrorBody),
    ),
    tag = "claims"
)]
pub(crate) async fn claim_by_token(
    State(state): State<AppState>,
    payload: Result<Json<ClaimByTokenRequest>, JsonRejection>,
) -> Result<Json<BadgeResponse>, AppError> {
    let request = extract_validated_json(payload)?;
    let badge = state.lifecycle.claim_by_token(request.claim_token.trim())?;

    tracing::info!(badge_id = %badge.id, "badge claimed via token");

    if let Some(pool) = &state.db {
        db::mirror_claim(pool, &badge).await;
    }

    Ok(Json(BadgeResponse::from_badge(
        &badge,
        Timestamp::now(),
        state.lifecycle.generator(),
    )))
}
