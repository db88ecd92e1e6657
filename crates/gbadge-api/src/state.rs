//! # Application State
//!
//! Shared state for the HTTP layer: the in-memory badge repository (the
//! source of truth), the lifecycle engine, evidence manager, verification
//! resolver, and an optional Postgres pool used as a write-through mirror.

use std::sync::Arc;

use sqlx::PgPool;

use gbadge_assertion::{AssertionConfig, AssertionGenerator, IssuerProfile};
use gbadge_state::{
    AuditLog, BadgeLifecycle, BadgeRepository, EvidenceManager, MemoryRepository,
    VerificationResolver,
};

use crate::error::AppError;

/// Deployment configuration, read from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Socket address to bind, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
    /// Public base URL used in assertion, claim, and verification links.
    pub public_base_url: String,
    /// Shared API secret. `None` disables authentication.
    pub api_token: Option<String>,
    /// Postgres connection string for the write-through mirror.
    pub database_url: Option<String>,
    /// The issuing organization embedded in every assertion.
    pub issuer: IssuerProfile,
}

impl AppConfig {
    /// Read configuration from the environment, with local-dev defaults.
    pub fn from_env() -> Self {
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_else(|_| "http://localhost:8080".to_string());
        let issuer = IssuerProfile {
            id: format!("{}/issuer", public_base_url.trim_end_matches('/')),
            name: std::env::var("ISSUER_NAME").unwrap_or_else(|_| "GBadge Issuer".to_string()),
            url: std::env::var("ISSUER_URL").unwrap_or_else(|_| public_base_url.clone()),
            email: std::env::var("ISSUER_EMAIL")
                .unwrap_or_else(|_| "badges@example.com".to_string()),
        };
        Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            public_base_url,
            api_token: std::env::var("API_TOKEN").ok().filter(|t| !t.is_empty()),
            database_url: std::env::var("DATABASE_URL").ok().filter(|u| !u.is_empty()),
            issuer,
        }
    }
}

/// Shared application state, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<MemoryRepository>,
    pub audit: Arc<AuditLog>,
    pub lifecycle: Arc<BadgeLifecycle>,
    pub evidence: Arc<EvidenceManager>,
    pub resolver: Arc<VerificationResolver>,
    /// Optional Postgres mirror. Writes are best-effort.
    pub db: Option<PgPool>,
}

impl AppState {
    /// Wire up the engine from configuration.
    ///
    /// # Errors
    ///
    /// Fails when the public base URL is not an absolute http(s) URL.
    pub fn new(config: &AppConfig, db: Option<PgPool>) -> Result<Self, AppError> {
        let assertion_config = AssertionConfig::new(&config.public_base_url, config.issuer.clone())
            .map_err(|e| AppError::Internal(e.to_string()))?;
        let generator = AssertionGenerator::new(assertion_config);

        let repo = MemoryRepository::shared();
        let audit = Arc::new(AuditLog::new());
        let lifecycle = Arc::new(BadgeLifecycle::new(
            repo.clone() as Arc<dyn BadgeRepository>,
            audit.clone(),
            generator,
        ));
        let evidence = Arc::new(EvidenceManager::new(repo.clone() as Arc<dyn BadgeRepository>));
        let resolver = Arc::new(VerificationResolver::new(
            repo.clone() as Arc<dyn BadgeRepository>,
        ));

        Ok(Self {
            repo,
            audit,
            lifecycle,
            evidence,
            resolver,
            db,
        })
    }
}
