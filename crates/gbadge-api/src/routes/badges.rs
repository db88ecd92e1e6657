//! # Badge Routes
//!
//! Issuance, lookup, revocation, audit trail, and baking. All routes here
//! sit behind the auth middleware; per-badge access checks live in the
//! domain layer and in the handlers below.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use gbadge_assertion::{AssertionGenerator, TemplateSnapshot};
use gbadge_core::{BadgeId, TemplateId, Timestamp, UserId};
use gbadge_state::{Badge, BadgeRepository, RevocationReason};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Badge routes behind authentication.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/badges", post(issue_badge))
        .route("/v1/badges/:id", get(get_badge))
        .route("/v1/badges/:id/revoke", post(revoke_badge))
        .route("/v1/badges/:id/audit", get(audit_trail))
        .route("/v1/badges/:id/bake", post(bake_badge))
}

// ── DTOs ────────────────────────────────────────────────────────────────────

/// Request body for issuing a badge.
#[derive(Debug, Deserialize, ToSchema)]
pub struct IssueBadgeRequest {
    /// Source template id.
    pub template_id: Uuid,
    /// Badge name, frozen onto the badge at issuance.
    pub name: String,
    /// What the badge represents.
    pub description: String,
    /// Badge artwork URL.
    pub image_url: String,
    /// What the recipient did to earn the badge.
    pub criteria_narrative: String,
    /// Skills the badge attests to.
    #[serde(default)]
    pub skills: Vec<String>,
    /// Who receives the badge.
    pub recipient_id: Uuid,
    /// Recipient's email. Hashed into the assertion, never stored.
    pub recipient_email: String,
    /// Validity window in days from issuance. Omit for no expiry.
    pub validity_days: Option<i64>,
}

impl Validate for IssueBadgeRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("name must not be empty".to_string()));
        }
        let email = self.recipient_email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(AppError::Validation(
                "recipient_email must be a valid email address".to_string(),
            ));
        }
        if let Some(days) = self.validity_days {
            if days <= 0 {
                return Err(AppError::Validation(
                    "validity_days must be a positive number of days".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A badge as returned to authenticated callers.
#[derive(Debug, Serialize, ToSchema)]
pub struct BadgeResponse {
    pub id: Uuid,
    pub verification_id: Uuid,
    pub name: String,
    pub description: String,
    pub image_url: String,
    /// Stored lifecycle status: PENDING, CLAIMED, or REVOKED.
    pub status: String,
    /// Status with expiry derived at read time.
    pub effective_status: String,
    pub recipient_id: Uuid,
    /// Masked recipient email.
    pub recipient: String,
    pub issuer_id: Uuid,
    /// Hex SHA-256 digest over the issuance-time template snapshot.
    pub metadata_hash: String,
    pub issued_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_notes: Option<String>,
    /// Public verification page for this badge.
    pub verify_url: String,
}

impl BadgeResponse {
    pub(crate) fn from_badge(badge: &Badge, now: Timestamp, generator: &AssertionGenerator) -> Self {
        Self {
            id: *badge.id.as_uuid(),
            verification_id: *badge.verification_id.as_uuid(),
            name: badge.template.name.clone(),
            description: badge.template.description.clone(),
            image_url: badge.template.image_url.clone(),
            status: badge.status.as_str().to_string(),
            effective_status: badge.effective_status(now).as_str().to_string(),
            recipient_id: *badge.recipient_id.as_uuid(),
            recipient: badge.recipient_email_masked.clone(),
            issuer_id: *badge.issuer_id.as_uuid(),
            metadata_hash: badge.metadata_hash.to_hex(),
            issued_at: *badge.issued_at.as_datetime(),
            claimed_at: badge.claimed_at.map(|t| *t.as_datetime()),
            expires_at: badge.expires_at.map(|t| *t.as_datetime()),
            revoked_at: badge.revoked_at.map(|t| *t.as_datetime()),
            revocation_reason: badge.revocation_reason.map(|r| r.as_str().to_string()),
            revocation_notes: badge.revocation_notes.clone(),
            verify_url: generator.verification_url(badge.verification_id),
        }
    }
}

/// Issuance response: the badge plus its one-time claim link.
#[derive(Debug, Serialize, ToSchema)]
pub struct IssueBadgeResponse {
    #[serde(flatten)]
    pub badge: BadgeResponse,
    /// Claim deep link to deliver to the recipient.
    pub claim_url: String,
    /// The hosted Open Badges assertion, frozen at issuance.
    #[schema(value_type = Object)]
    pub assertion: serde_json::Value,
}

/// Request body for revoking a badge.
#[derive(Debug, Deserialize, ToSchema)]
pub struct RevokeBadgeRequest {
    /// One of POLICY_VIOLATION, ISSUED_IN_ERROR, EXPIRED, DUPLICATE,
    /// FRAUD, OTHER.
    pub reason: String,
    /// Free-text context, at most 500 characters.
    pub notes: Option<String>,
}

impl Validate for RevokeBadgeRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.reason.trim().is_empty() {
            return Err(AppError::Validation("reason is required".to_string()));
        }
        Ok(())
    }
}

/// One append-only audit trail entry.
#[derive(Debug, Serialize, ToSchema)]
pub struct AuditEntryResponse {
    pub id: Uuid,
    pub badge_id: Uuid,
    /// The acting user, absent for anonymous token claims.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<Uuid>,
    /// ISSUED, CLAIMED, or REVOKED.
    pub action: String,
    #[schema(value_type = Object)]
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// Issue a badge to a recipient.
#[utoipa::path(
    post,
    path = "/v1/badges",
    request_body = IssueBadgeRequest,
    responses(
        (status = 201, description = "Badge issued", body = IssueBadgeResponse),
        (status = 400, description = "Validation failure", body = crate::error::ErrorBody),
        (status = 403, description = "Caller lacks the manager role", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "badges"
)]
pub(crate) async fn issue_badge(
    State(state): State<AppState>,
    identity: CallerIdentity,
    payload: Result<Json<IssueBadgeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<IssueBadgeResponse>), AppError> {
    require_role(&identity, Role::Manager)?;
    let actor = identity.actor()?;
    let request = extract_validated_json(payload)?;

    let template = TemplateSnapshot {
        template_id: TemplateId(request.template_id),
        name: request.name,
        description: request.description,
        image_url: request.image_url,
        criteria_narrative: request.criteria_narrative,
        skills: request.skills,
    };

    let badge = state.lifecycle.issue(gbadge_state::IssueRequest {
        template,
        recipient_id: UserId(request.recipient_id),
        recipient_email: request.recipient_email,
        issuer_id: actor.user_id,
        validity_days: request.validity_days,
    })?;

    tracing::info!(badge_id = %badge.id, issuer = %badge.issuer_id, "badge issued");

    if let Some(pool) = &state.db {
        db::mirror_badge(pool, &badge).await;
    }

    let generator = state.lifecycle.generator();
    let response = IssueBadgeResponse {
        badge: BadgeResponse::from_badge(&badge, Timestamp::now(), generator),
        claim_url: generator.claim_url(&badge.claim_token),
        assertion: badge.assertion.clone(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Fetch a badge by id.
#[utoipa::path(
    get,
    path = "/v1/badges/{id}",
    params(("id" = Uuid, Path, description = "Badge id")),
    responses(
        (status = 200, description = "The badge", body = BadgeResponse),
        (status = 403, description = "Not the recipient, issuer, or an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown badge", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "badges"
)]
pub(crate) async fn get_badge(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<BadgeResponse>, AppError> {
    let actor = identity.actor()?;
    let badge = state
        .repo
        .get(BadgeId(id))
        .ok_or_else(|| AppError::NotFound("Badge not found".to_string()))?;

    if !actor.privileged
        && badge.recipient_id != actor.user_id
        && badge.issuer_id != actor.user_id
    {
        return Err(AppError::Forbidden(
            "You do not have access to this badge".to_string(),
        ));
    }

    Ok(Json(BadgeResponse::from_badge(
        &badge,
        Timestamp::now(),
        state.lifecycle.generator(),
    )))
}

/// Revoke a badge.
#[utoipa::path(
    post,
    path = "/v1/badges/{id}/revoke",
    params(("id" = Uuid, Path, description = "Badge id")),
    request_body = RevokeBadgeRequest,
    responses(
        (status = 200, description = "Badge revoked", body = BadgeResponse),
        (status = 400, description = "Unknown revocation reason", body = crate::error::ErrorBody),
        (status = 403, description = "Not the issuer or an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown badge", body = crate::error::ErrorBody),
        (status = 409, description = "Already revoked", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "badges"
)]
pub(crate) async fn revoke_badge(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(id): Path<Uuid>,
    payload: Result<Json<RevokeBadgeRequest>, JsonRejection>,
) -> Result<Json<BadgeResponse>, AppError> {
    let actor = identity.actor()?;
    let request = extract_validated_json(payload)?;

    let reason: RevocationReason =
        serde_json::from_value(serde_json::Value::String(request.reason.clone()))
            .map_err(|_| AppError::Validation("Invalid revocation reason".to_string()))?;

    let badge = state
        .lifecycle
        .revoke(BadgeId(id), &actor, reason, request.notes)?;

    tracing::info!(badge_id = %badge.id, reason = %reason, "badge revoked");

    if let Some(pool) = &state.db {
        db::mirror_revocation(pool, &badge).await;
    }

    Ok(Json(BadgeResponse::from_badge(
        &badge,
        Timestamp::now(),
        state.lifecycle.generator(),
    )))
}

/// The append-only audit trail for a badge.
#[utoipa::path(
    get,
    path = "/v1/badges/{id}/audit",
    params(("id" = Uuid, Path, description = "Badge id")),
    responses(
        (status = 200, description = "Audit entries, oldest first", body = [AuditEntryResponse]),
        (status = 403, description = "Not the issuer or an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown badge", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "badges"
)]
pub(crate) async fn audit_trail(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<AuditEntryResponse>>, AppError> {
    let actor = identity.actor()?;
    let badge = state
        .repo
        .get(BadgeId(id))
        .ok_or_else(|| AppError::NotFound("Badge not found".to_string()))?;

    if !actor.privileged && badge.issuer_id != actor.user_id {
        return Err(AppError::Forbidden(
            "Only the badge issuer or an administrator can view the audit trail".to_string(),
        ));
    }

    let entries = state
        .audit
        .for_badge(badge.id)
        .into_iter()
        .map(|e| AuditEntryResponse {
            id: e.id,
            badge_id: *e.badge_id.as_uuid(),
            actor: e.actor.map(|u| *u.as_uuid()),
            action: e.action.as_str().to_string(),
            metadata: e.metadata,
            created_at: *e.created_at.as_datetime(),
        })
        .collect();

    Ok(Json(entries))
}

/// Bake the badge's assertion into a PNG.
///
/// The request body is the badge artwork as a PNG; the response is the same
/// image with the hosted assertion embedded in an iTXt chunk. Pixel data is
/// untouched.
#[utoipa::path(
    post,
    path = "/v1/badges/{id}/bake",
    params(("id" = Uuid, Path, description = "Badge id")),
    request_body(content = Vec<u8>, content_type = "image/png"),
    responses(
        (status = 200, description = "Baked PNG", content_type = "image/png"),
        (status = 400, description = "Not a valid PNG", body = crate::error::ErrorBody),
        (status = 403, description = "Not the badge recipient", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown badge", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "badges"
)]
pub(crate) async fn bake_badge(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(id): Path<Uuid>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let actor = identity.actor()?;
    let badge = state
        .repo
        .get(BadgeId(id))
        .ok_or_else(|| AppError::NotFound("Badge not found".to_string()))?;

    if !actor.privileged && badge.recipient_id != actor.user_id {
        return Err(AppError::Forbidden(
            "Only the badge recipient can download the baked badge".to_string(),
        ));
    }

    let baked = gbadge_baker::bake(&body, &badge.assertion)?;
    Ok(([(header::CONTENT_TYPE, "image/png")], baked))
}
