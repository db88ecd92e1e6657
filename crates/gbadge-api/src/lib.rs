//! # gbadge-api
//!
//! HTTP surface for the badge lifecycle and verification engine. The
//! authenticated API covers issuance, claims, revocation, evidence, audit,
//! and baking; verification and token claims are public.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::routing::get;
use axum::{Extension, Json, Router};
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::state::AppState;

/// Liveness probe.
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Assemble the full application router.
///
/// Badge, claim, and evidence routes sit behind the bearer-token
/// middleware. Health, the OpenAPI document, public verification, and the
/// claim-by-token route are mounted outside it.
pub fn app(state: AppState, auth_config: AuthConfig) -> Router {
    let authenticated = Router::new()
        .merge(routes::badges::router())
        .merge(routes::claim::router())
        .merge(routes::evidence::router())
        .layer(from_fn(auth::auth_middleware))
        .layer(Extension(auth_config));

    Router::new()
        .merge(authenticated)
        .merge(routes::claim::public_router())
        .merge(routes::verify::router())
        .merge(openapi::router())
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::state::AppConfig;
    use gbadge_assertion::IssuerProfile;

    const SECRET: &str = "sekrit";

    fn test_state() -> AppState {
        let config = AppConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            public_base_url: "https://badges.example.com".to_string(),
            api_token: Some(SECRET.to_string()),
            database_url: None,
            issuer: IssuerProfile {
                id: "https://badges.example.com/issuer".to_string(),
                name: "Example Org".to_string(),
                url: "https://example.com".to_string(),
                email: "badges@example.com".to_string(),
            },
        };
        AppState::new(&config, None).unwrap()
    }

    fn test_app() -> Router {
        app(test_state(), AuthConfig::new(SECRET))
    }

    fn bearer(role: &str, user: Uuid) -> String {
        format!("Bearer {role}:{user}:{SECRET}")
    }

    fn request(
        method: &str,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            builder = builder.header("authorization", auth);
        }
        match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn issue_body(recipient: Uuid) -> Value {
        json!({
            "template_id": Uuid::new_v4(),
            "name": "Rust Fundamentals",
            "description": "Completed the Rust fundamentals track",
            "image_url": "https://cdn.example.com/rust.png",
            "criteria_narrative": "Finished all modules",
            "skills": ["rust", "ownership"],
            "recipient_id": recipient,
            "recipient_email": "jane@example.com",
        })
    }

    async fn issue(app: &Router, issuer: Uuid, recipient: Uuid) -> Value {
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/v1/badges",
                Some(&bearer("manager", issuer)),
                Some(issue_body(recipient)),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        body_json(response).await
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = test_app()
            .oneshot(request("GET", "/health", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = test_app()
            .oneshot(request("GET", "/api-docs/openapi.json", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let doc = body_json(response).await;
        assert!(doc["paths"]["/v1/badges"].is_object());
    }

    #[tokio::test]
    async fn issuance_requires_authentication() {
        let response = test_app()
            .oneshot(request(
                "POST",
                "/v1/badges",
                None,
                Some(issue_body(Uuid::new_v4())),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn employees_cannot_issue() {
        let response = test_app()
            .oneshot(request(
                "POST",
                "/v1/badges",
                Some(&bearer("employee", Uuid::new_v4())),
                Some(issue_body(Uuid::new_v4())),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn issue_then_claim_then_reclaim() {
        let app = test_app();
        let issuer = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let issued = issue(&app, issuer, recipient).await;
        assert_eq!(issued["status"], "PENDING");
        assert_eq!(issued["recipient"], "j***@example.com");

        let id = issued["id"].as_str().unwrap();
        let claim_uri = format!("/v1/badges/{id}/claim");
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &claim_uri,
                Some(&bearer("employee", recipient)),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let claimed = body_json(response).await;
        assert_eq!(claimed["status"], "CLAIMED");

        // A second claim hits the compare-and-set guard.
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &claim_uri,
                Some(&bearer("employee", recipient)),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Badge has already been claimed");
    }

    #[tokio::test]
    async fn only_the_recipient_can_claim() {
        let app = test_app();
        let issued = issue(&app, Uuid::new_v4(), Uuid::new_v4()).await;
        let id = issued["id"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/v1/badges/{id}/claim"),
                Some(&bearer("employee", Uuid::new_v4())),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn claim_by_token_is_public_and_single_use() {
        let app = test_app();
        let issued = issue(&app, Uuid::new_v4(), Uuid::new_v4()).await;
        let claim_url = issued["claim_url"].as_str().unwrap();
        let token = claim_url.rsplit('/').next().unwrap();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/v1/claim",
                None,
                Some(json!({ "claim_token": token })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let claimed = body_json(response).await;
        assert_eq!(claimed["status"], "CLAIMED");

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/v1/claim",
                None,
                Some(json!({ "claim_token": token })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn revoked_badges_verify_with_cache_busting() {
        let app = test_app();
        let issuer = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let issued = issue(&app, issuer, recipient).await;
        let id = issued["id"].as_str().unwrap();
        let vid = issued["verification_id"].as_str().unwrap();

        // Active badge: cacheable for a minute.
        let response = app
            .clone()
            .oneshot(request("GET", &format!("/verify/{vid}"), None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["cache-control"],
            "public, max-age=60"
        );
        assert_eq!(response.headers()["x-verification-status"], "PENDING");

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/v1/badges/{id}/revoke"),
                Some(&bearer("manager", issuer)),
                Some(json!({ "reason": "POLICY_VIOLATION", "notes": "terms breach" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(request("GET", &format!("/verify/{vid}"), None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["cache-control"],
            "no-cache, no-store, must-revalidate"
        );
        assert_eq!(response.headers()["x-verification-status"], "REVOKED");

        // Claims after revocation are rejected with the documented message.
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/v1/badges/{id}/claim"),
                Some(&bearer("employee", recipient)),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(
            body["error"]["message"],
            "Badge has been revoked and cannot be claimed"
        );
    }

    #[tokio::test]
    async fn unknown_revocation_reason_is_rejected() {
        let app = test_app();
        let issuer = Uuid::new_v4();
        let issued = issue(&app, issuer, Uuid::new_v4()).await;
        let id = issued["id"].as_str().unwrap();
        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &format!("/v1/badges/{id}/revoke"),
                Some(&bearer("manager", issuer)),
                Some(json!({ "reason": "BECAUSE" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_verification_id_reads_like_unknown() {
        let response = test_app()
            .oneshot(request("GET", "/verify/not-a-uuid", None, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Badge not found");
    }

    #[tokio::test]
    async fn verification_of_unknown_id_is_not_found() {
        let response = test_app()
            .oneshot(request(
                "GET",
                &format!("/verify/{}", Uuid::new_v4()),
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["message"], "Badge not found");
    }

    #[tokio::test]
    async fn url_evidence_quota_is_enforced() {
        let app = test_app();
        let issuer = Uuid::new_v4();
        let issued = issue(&app, issuer, Uuid::new_v4()).await;
        let id = issued["id"].as_str().unwrap();
        let uri = format!("/v1/badges/{id}/evidence/url");

        for i in 0..5 {
            let response = app
                .clone()
                .oneshot(request(
                    "POST",
                    &uri,
                    Some(&bearer("manager", issuer)),
                    Some(json!({ "url": format!("https://example.com/proof/{i}") })),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                &uri,
                Some(&bearer("manager", issuer)),
                Some(json!({ "url": "https://example.com/one-too-many" })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(
            body["error"]["message"],
            "Maximum of 5 evidence items per badge"
        );
    }

    #[tokio::test]
    async fn file_evidence_rejects_mismatched_content() {
        let app = test_app();
        let issuer = Uuid::new_v4();
        let issued = issue(&app, issuer, Uuid::new_v4()).await;
        let id = issued["id"].as_str().unwrap();

        // Declares PDF, but the bytes are not a PDF.
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/badges/{id}/evidence/file"))
                    .header("authorization", bearer("manager", issuer))
                    .header("content-type", "application/pdf")
                    .header("x-file-name", "report.pdf")
                    .body(Body::from(&b"not a pdf at all"[..]))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn fan_out_reports_per_badge_outcomes() {
        let app = test_app();
        let issuer = Uuid::new_v4();
        let a = issue(&app, issuer, Uuid::new_v4()).await;
        let b = issue(&app, issuer, Uuid::new_v4()).await;
        let missing = Uuid::new_v4();

        let response = app
            .clone()
            .oneshot(request(
                "POST",
                "/v1/evidence/fan-out",
                Some(&bearer("manager", issuer)),
                Some(json!({
                    "badge_ids": [a["id"], b["id"], missing],
                    "items": [{ "url": "https://example.com/cohort-results" }],
                })),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let outcomes = body_json(response).await;
        let outcomes = outcomes.as_array().unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0]["status"], "ATTACHED");
        assert_eq!(outcomes[1]["status"], "ATTACHED");
        assert_eq!(outcomes[2]["status"], "FAILED");
    }

    #[tokio::test]
    async fn audit_trail_records_the_lifecycle() {
        let app = test_app();
        let issuer = Uuid::new_v4();
        let recipient = Uuid::new_v4();
        let issued = issue(&app, issuer, recipient).await;
        let id = issued["id"].as_str().unwrap();

        app.clone()
            .oneshot(request(
                "POST",
                &format!("/v1/badges/{id}/claim"),
                Some(&bearer("employee", recipient)),
                None,
            ))
            .await
            .unwrap();

        let response = app
            .clone()
            .oneshot(request(
                "GET",
                &format!("/v1/badges/{id}/audit"),
                Some(&bearer("manager", issuer)),
                None,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let entries = body_json(response).await;
        let entries = entries.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["action"], "ISSUED");
        assert_eq!(entries[1]["action"], "CLAIMED");
    }

    // ── Baking ──────────────────────────────────────────────────────────────

    fn png_chunk(chunk_type: &[u8; 4], data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&(data.len() as u32).to_be_bytes());
        out.extend_from_slice(chunk_type);
        out.extend_from_slice(data);
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(chunk_type);
        hasher.update(data);
        out.extend_from_slice(&hasher.finalize().to_be_bytes());
        out
    }

    fn sample_png() -> Vec<u8> {
        let mut ihdr = Vec::new();
        ihdr.extend_from_slice(&2u32.to_be_bytes());
        ihdr.extend_from_slice(&2u32.to_be_bytes());
        ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);

        let mut png = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        png.extend_from_slice(&png_chunk(b"IHDR", &ihdr));
        png.extend_from_slice(&png_chunk(b"IDAT", &[0u8; 16]));
        png.extend_from_slice(&png_chunk(b"IEND", &[]));
        png
    }

    #[tokio::test]
    async fn baked_badge_embeds_the_assertion() {
        let app = test_app();
        let recipient = Uuid::new_v4();
        let issued = issue(&app, Uuid::new_v4(), recipient).await;
        let id = issued["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/badges/{id}/bake"))
                    .header("authorization", bearer("employee", recipient))
                    .header("content-type", "image/png")
                    .body(Body::from(sample_png()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "image/png");

        let baked = response.into_body().collect().await.unwrap().to_bytes();
        let embedded = gbadge_baker::extract(&baked).unwrap().unwrap();
        assert_eq!(embedded, issued["assertion"]);
    }

    #[tokio::test]
    async fn baking_is_recipient_only() {
        let app = test_app();
        let issued = issue(&app, Uuid::new_v4(), Uuid::new_v4()).await;
        let id = issued["id"].as_str().unwrap();

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/badges/{id}/bake"))
                    .header("authorization", bearer("employee", Uuid::new_v4()))
                    .body(Body::from(sample_png()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
