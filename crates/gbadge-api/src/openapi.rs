//! OpenAPI document for the badge API.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer scheme referenced by the `security` clauses on handlers.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "GBadge API",
        description = "Badge lifecycle and verification engine: issuance, claims, revocation, evidence, public verification, and PNG baking.",
        license(name = "MIT")
    ),
    paths(
        crate::routes::badges::issue_badge,
        crate::routes::badges::get_badge,
        crate::routes::badges::revoke_badge,
        crate::routes::badges::audit_trail,
        crate::routes::badges::bake_badge,
        crate::routes::claim::claim_badge,
        crate::routes::claim::claim_by_token,
        crate::routes::evidence::list_evidence,
        crate::routes::evidence::attach_file,
        crate::routes::evidence::attach_url,
        crate::routes::evidence::remove_evidence,
        crate::routes::evidence::fan_out,
        crate::routes::verify::verify_badge,
    ),
    components(schemas(
        crate::routes::badges::IssueBadgeRequest,
        crate::routes::badges::BadgeResponse,
        crate::routes::badges::IssueBadgeResponse,
        crate::routes::badges::RevokeBadgeRequest,
        crate::routes::badges::AuditEntryResponse,
        crate::routes::claim::ClaimByTokenRequest,
        crate::routes::evidence::UrlEvidenceRequest,
        crate::routes::evidence::FanOutRequest,
        crate::routes::evidence::EvidenceResponse,
        crate::routes::evidence::FanOutEntryResponse,
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "badges", description = "Badge lifecycle"),
        (name = "claims", description = "Claiming badges"),
        (name = "evidence", description = "Evidence attachments"),
        (name = "verification", description = "Public verification"),
    )
)]
pub struct ApiDoc;

/// Serves the OpenAPI document.
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/api-docs/openapi.json",
        get(|| async { Json(ApiDoc::openapi()) }),
    )
}
