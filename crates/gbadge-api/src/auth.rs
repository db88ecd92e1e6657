//! # Authentication & Role-Based Access
//!
//! Bearer-token middleware for the authenticated API surface. Tokens carry
//! an explicit role and user binding in the form `{role}:{user_id}:{secret}`;
//! the secret is compared in constant time against the configured value. A
//! bare `{secret}` token is accepted for operator tooling and maps to an
//! admin identity with no user binding.
//!
//! Public routes (health, verification, token claims) are mounted outside
//! this middleware and never see it.

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use gbadge_core::UserId;
use gbadge_state::Actor;

use crate::error::{AppError, ErrorBody, ErrorDetail};

/// Caller roles, ordered by privilege.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can claim their own badges and view what they hold.
    Employee,
    /// Can issue badges and manage their evidence.
    Manager,
    /// Full access, including revocation of any badge.
    Admin,
}

impl Role {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "employee" => Some(Self::Employee),
            "manager" => Some(Self::Manager),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Employee => "employee",
            Self::Manager => "manager",
            Self::Admin => "admin",
        }
    }
}

/// The authenticated caller, inserted into request extensions by
/// [`auth_middleware`].
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub role: Role,
    /// The user the token is bound to. `None` for bare operator tokens.
    pub user_id: Option<Uuid>,
}

impl CallerIdentity {
    /// Whether the caller holds `required` or a more privileged role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role >= required
    }

    /// The caller as a lifecycle actor. Operations that act on behalf of a
    /// specific user require a user-bound token.
    pub fn actor(&self) -> Result<Actor, AppError> {
        let user_id = self.user_id.ok_or_else(|| {
            AppError::Unauthorized("Token is not bound to a user".to_string())
        })?;
        Ok(Actor {
            user_id: UserId(user_id),
            privileged: self.has_role(Role::Manager),
        })
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .copied()
            .ok_or_else(|| AppError::Unauthorized("Missing authentication".to_string()))
    }
}

/// Reject callers below the required role.
pub fn require_role(identity: &CallerIdentity, required: Role) -> Result<(), AppError> {
    if identity.has_role(required) {
        return Ok(());
    }
    Err(AppError::Forbidden(format!(
        "This operation requires the {} role",
        required.as_str()
    )))
}

/// Auth middleware configuration, shared via request extensions.
#[derive(Clone)]
pub struct AuthConfig {
    token: Option<String>,
}

impl AuthConfig {
    /// Enabled configuration with the given shared secret.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    /// Disabled configuration: every request runs as an unbound admin.
    pub fn disabled() -> Self {
        Self { token: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }
}

// The secret never appears in logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        // Burn a comparison anyway so a length mismatch costs the same.
        let _ = provided.ct_eq(provided);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token value into a caller identity.
///
/// Accepted forms:
/// - `{role}:{user_id}:{secret}` where role is employee/manager/admin
/// - `{secret}` alone, which maps to an unbound admin
fn parse_bearer_token(value: &str, expected_secret: &str) -> Option<CallerIdentity> {
    let mut parts = value.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(role), Some(user_id), Some(secret)) => {
            let role = Role::parse(role)?;
            let user_id = Uuid::parse_str(user_id).ok()?;
            if !constant_time_token_eq(secret, expected_secret) {
                return None;
            }
            Some(CallerIdentity {
                role,
                user_id: Some(user_id),
            })
        }
        (Some(secret), None, None) => {
            if !constant_time_token_eq(secret, expected_secret) {
                return None;
            }
            Some(CallerIdentity {
                role: Role::Admin,
                user_id: None,
            })
        }
        _ => None,
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}

/// Bearer-token middleware for the authenticated router.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let Some(config) = request.extensions().get::<AuthConfig>().cloned() else {
        return unauthorized_response("Authentication is not configured");
    };

    let Some(expected) = config.token else {
        // Auth disabled: local development runs as an unbound admin.
        request.extensions_mut().insert(CallerIdentity {
            role: Role::Admin,
            user_id: None,
        });
        return next.run(request).await;
    };

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(header_value) = header_value else {
        return unauthorized_response("Missing Authorization header");
    };

    let Some(token) = header_value.strip_prefix("Bearer ") else {
        return unauthorized_response("Authorization header must use the Bearer scheme");
    };

    let Some(identity) = parse_bearer_token(token, &expected) else {
        tracing::warn!("rejected request with invalid bearer token");
        return unauthorized_response("Invalid bearer token");
    };

    request.extensions_mut().insert(identity);
    next.run(request).await
}
