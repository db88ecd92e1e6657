//! # Evidence Routes
//!
//! File and URL evidence attachments, plus the bulk fan-out that shares one
//! set of URL evidence across many badges. File uploads arrive as raw bytes
//! with the file name and MIME type in headers; only metadata is retained.

use axum::body::Bytes;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use gbadge_core::{BadgeId, EvidenceId};
use gbadge_state::{EvidenceRecord, NewFileEvidence, NewUrlEvidence};

use crate::auth::{require_role, CallerIdentity, Role};
use crate::db;
use crate::error::AppError;
use crate::extractors::{extract_validated_json, Validate};
use crate::state::AppState;

/// Evidence routes behind authentication.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/badges/:id/evidence", get(list_evidence))
        .route("/v1/badges/:id/evidence/file", post(attach_file))
        .route("/v1/badges/:id/evidence/url", post(attach_url))
        .route("/v1/badges/:id/evidence/:evidence_id", delete(remove_evidence))
        .route("/v1/evidence/fan-out", post(fan_out))
}

// ── DTOs ────────────────────────────────────────────────────────────────────

/// Request body for URL evidence.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UrlEvidenceRequest {
    /// The link. Must be http or https.
    pub url: String,
    /// Optional caption.
    #[serde(default)]
    pub description: Option<String>,
}

impl Validate for UrlEvidenceRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.url.trim().is_empty() {
            return Err(AppError::Validation("url is required".to_string()));
        }
        Ok(())
    }
}

/// Request body for the bulk fan-out.
#[derive(Debug, Deserialize, ToSchema)]
pub struct FanOutRequest {
    /// Badges to attach the evidence to.
    pub badge_ids: Vec<Uuid>,
    /// URL evidence shared across every badge in the batch.
    pub items: Vec<UrlEvidenceRequest>,
}

impl Validate for FanOutRequest {
    fn validate(&self) -> Result<(), AppError> {
        if self.badge_ids.is_empty() {
            return Err(AppError::Validation(
                "badge_ids must not be empty".to_string(),
            ));
        }
        if self.items.is_empty() {
            return Err(AppError::Validation("items must not be empty".to_string()));
        }
        for item in &self.items {
            item.validate()?;
        }
        Ok(())
    }
}

/// An evidence attachment as returned to callers.
#[derive(Debug, Serialize, ToSchema)]
pub struct EvidenceResponse {
    pub id: Uuid,
    pub badge_id: Uuid,
    /// FILE or URL.
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub added_by: Uuid,
    pub added_at: DateTime<Utc>,
}

impl From<EvidenceRecord> for EvidenceResponse {
    fn from(record: EvidenceRecord) -> Self {
        Self {
            id: *record.id.as_uuid(),
            badge_id: *record.badge_id.as_uuid(),
            kind: match record.kind {
                gbadge_state::EvidenceKind::File => "FILE".to_string(),
                gbadge_state::EvidenceKind::Url => "URL".to_string(),
            },
            file_name: record.file_name,
            mime_type: record.mime_type,
            size_bytes: record.size_bytes,
            url: record.url,
            description: record.description,
            added_by: *record.added_by.as_uuid(),
            added_at: *record.added_at.as_datetime(),
        }
    }
}

/// Per-badge outcome of a fan-out batch.
#[derive(Debug, Serialize, ToSchema)]
pub struct FanOutEntryResponse {
    pub badge_id: Uuid,
    /// ATTACHED or FAILED.
    pub status: String,
    /// Number of items attached on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attached: Option<usize>,
    /// Failure message for skipped badges.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ── Handlers ────────────────────────────────────────────────────────────────

/// List a badge's evidence.
#[utoipa::path(
    get,
    path = "/v1/badges/{id}/evidence",
    params(("id" = Uuid, Path, description = "Badge id")),
    responses(
        (status = 200, description = "Evidence attachments", body = [EvidenceResponse]),
        (status = 403, description = "No access to this badge", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown badge", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "evidence"
)]
pub(crate) async fn list_evidence(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<EvidenceResponse>>, AppError> {
    let actor = identity.actor()?;
    let records = state.evidence.list(BadgeId(id), &actor)?;
    Ok(Json(records.into_iter().map(EvidenceResponse::from).collect()))
}

/// Attach an uploaded file as evidence.
///
/// The body is the raw file content; the original file name comes from the
/// `X-File-Name` header and the declared MIME type from `Content-Type`.
#[utoipa::path(
    post,
    path = "/v1/badges/{id}/evidence/file",
    params(
        ("id" = Uuid, Path, description = "Badge id"),
        ("X-File-Name" = String, Header, description = "Original file name"),
    ),
    request_body(content = Vec<u8>, content_type = "application/octet-stream"),
    responses(
        (status = 201, description = "Evidence attached", body = EvidenceResponse),
        (status = 400, description = "Rejected file", body = crate::error::ErrorBody),
        (status = 403, description = "Not the issuer or an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown badge", body = crate::error::ErrorBody),
        (status = 409, description = "Evidence quota reached", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "evidence"
)]
pub(crate) async fn attach_file(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<EvidenceResponse>), AppError> {
    let actor = identity.actor()?;

    let file_name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::Validation("X-File-Name header is required".to_string()))?;
    let mime_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.split(';').next().unwrap_or(v).trim())
        .ok_or_else(|| AppError::Validation("Content-Type header is required".to_string()))?;

    let record = state.evidence.attach_file(
        BadgeId(id),
        &actor,
        NewFileEvidence {
            file_name,
            mime_type,
            bytes: &body,
        },
    )?;

    if let Some(pool) = &state.db {
        db::mirror_evidence_added(pool, &record).await;
    }

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Attach a URL as evidence.
#[utoipa::path(
    post,
    path = "/v1/badges/{id}/evidence/url",
    params(("id" = Uuid, Path, description = "Badge id")),
    request_body = UrlEvidenceRequest,
    responses(
        (status = 201, description = "Evidence attached", body = EvidenceResponse),
        (status = 400, description = "Rejected URL", body = crate::error::ErrorBody),
        (status = 403, description = "Not the issuer or an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown badge", body = crate::error::ErrorBody),
        (status = 409, description = "Evidence quota reached", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "evidence"
)]
pub(crate) async fn attach_url(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path(id): Path<Uuid>,
    payload: Result<Json<UrlEvidenceRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<EvidenceResponse>), AppError> {
    let actor = identity.actor()?;
    let request = extract_validated_json(payload)?;

    let record = state.evidence.attach_url(
        BadgeId(id),
        &actor,
        NewUrlEvidence {
            url: request.url,
            description: request.description,
        },
    )?;

    if let Some(pool) = &state.db {
        db::mirror_evidence_added(pool, &record).await;
    }

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// Remove an evidence attachment.
#[utoipa::path(
    delete,
    path = "/v1/badges/{id}/evidence/{evidence_id}",
    params(
        ("id" = Uuid, Path, description = "Badge id"),
        ("evidence_id" = Uuid, Path, description = "Evidence id"),
    ),
    responses(
        (status = 204, description = "Evidence removed"),
        (status = 403, description = "Not the issuer or an admin", body = crate::error::ErrorBody),
        (status = 404, description = "Unknown badge or evidence", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "evidence"
)]
pub(crate) async fn remove_evidence(
    State(state): State<AppState>,
    identity: CallerIdentity,
    Path((id, evidence_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let actor = identity.actor()?;
    state
        .evidence
        .remove(BadgeId(id), EvidenceId(evidence_id), &actor)?;

    if let Some(pool) = &state.db {
        db::mirror_evidence_removed(pool, EvidenceId(evidence_id)).await;
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Attach one set of URL evidence to many badges.
///
/// Each badge succeeds or fails independently; one revoked or over-quota
/// badge never aborts the rest of the batch.
#[utoipa::path(
    post,
    path = "/v1/evidence/fan-out",
    request_body = FanOutRequest,
    responses(
        (status = 200, description = "Per-badge outcomes", body = [FanOutEntryResponse]),
        (status = 400, description = "Validation failure", body = crate::error::ErrorBody),
        (status = 403, description = "Caller lacks the manager role", body = crate::error::ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "evidence"
)]
pub(crate) async fn fan_out(
    State(state): State<AppState>,
    identity: CallerIdentity,
    payload: Result<Json<FanOutRequest>, JsonRejection>,
) -> Result<Json<Vec<FanOutEntryResponse>>, AppError> {
    require_role(&identity, Role::Manager)?;
    let actor = identity.actor()?;
    let request = extract_validated_json(payload)?;

    let badge_ids: Vec<BadgeId> = request.badge_ids.into_iter().map(BadgeId).collect();
    let items: Vec<NewUrlEvidence> = request
        .items
        .into_iter()
        .map(|i| NewUrlEvidence {
            url: i.url,
            description: i.description,
        })
        .collect();

    let results = state.evidence.attach_shared(&badge_ids, &actor, &items);

    let response = results
        .into_iter()
        .map(|r| match r.outcome {
            Ok(attached) => FanOutEntryResponse {
                badge_id: *r.badge_id.as_uuid(),
                status: "ATTACHED".to_string(),
                attached: Some(attached),
                error: None,
            },
            Err(err) => FanOutEntryResponse {
                badge_id: *r.badge_id.as_uuid(),
                status: "FAILED".to_string(),
                attached: None,
                error: Some(err.to_string()),
            },
        })
        .collect();

    Ok(Json(response))
}
