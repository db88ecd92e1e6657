//! # Postgres Mirror
//!
//! Optional write-through mirror of the in-memory engine. The in-memory
//! repository stays the source of truth; mirror writes are best-effort and
//! a failure is logged, never surfaced to the caller.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE badges (
//!     id UUID PRIMARY KEY,
//!     verification_id UUID NOT NULL UNIQUE,
//!     template_id UUID NOT NULL,
//!     name TEXT NOT NULL,
//!     recipient_id UUID NOT NULL,
//!     recipient_masked TEXT NOT NULL,
//!     issuer_id UUID NOT NULL,
//!     status TEXT NOT NULL,
//!     claim_token TEXT NOT NULL UNIQUE,
//!     metadata_hash TEXT NOT NULL,
//!     assertion JSONB NOT NULL,
//!     issued_at TIMESTAMPTZ NOT NULL,
//!     claimed_at TIMESTAMPTZ,
//!     expires_at TIMESTAMPTZ,
//!     revoked_at TIMESTAMPTZ,
//!     revoked_by UUID,
//!     revocation_reason TEXT,
//!     revocation_notes TEXT
//! );
//!
//! CREATE TABLE evidence (
//!     id UUID PRIMARY KEY,
//!     badge_id UUID NOT NULL REFERENCES badges(id),
//!     kind TEXT NOT NULL,
//!     file_name TEXT,
//!     mime_type TEXT,
//!     size_bytes BIGINT,
//!     url TEXT,
//!     description TEXT,
//!     added_by UUID NOT NULL,
//!     added_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use gbadge_core::EvidenceId;
use gbadge_state::{Badge, EvidenceKind, EvidenceRecord};

/// Connect to the mirror database.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(8)
        .connect(database_url)
        .await
}

/// Insert a freshly issued badge.
pub async fn mirror_badge(pool: &PgPool, badge: &Badge) {
    let result = sqlx::query(
        r#"
        INSERT INTO badges (
            id, verification_id, template_id, name, recipient_id,
            recipient_masked, issuer_id, status, claim_token, metadata_hash,
            assertion, issued_at, expires_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(badge.id.as_uuid())
    .bind(badge.verification_id.as_uuid())
    .bind(badge.template.template_id.as_uuid())
    .bind(&badge.template.name)
    .bind(badge.recipient_id.as_uuid())
    .bind(&badge.recipient_email_masked)
    .bind(badge.issuer_id.as_uuid())
    .bind(badge.status.as_str())
    .bind(&badge.claim_token)
    .bind(badge.metadata_hash.to_hex())
    .bind(&badge.assertion)
    .bind(badge.issued_at.as_datetime())
    .bind(badge.expires_at.map(|t| *t.as_datetime()))
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(badge_id = %badge.id, error = %e, "badge mirror insert failed");
    }
}

/// Mirror a claim. The status guard matches the in-memory compare-and-set.
pub async fn mirror_claim(pool: &PgPool, badge: &Badge) {
    let result = sqlx::query(
        "UPDATE badges SET status = $2, claimed_at = $3 \
         WHERE id = $1 AND status = 'PENDING'",
    )
    .bind(badge.id.as_uuid())
    .bind(badge.status.as_str())
    .bind(badge.claimed_at.map(|t| *t.as_datetime()))
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(badge_id = %badge.id, error = %e, "claim mirror update failed");
    }
}

/// Mirror a revocation. Guarded so a mirrored revocation is never undone.
pub async fn mirror_revocation(pool: &PgPool, badge: &Badge) {
    let result = sqlx::query(
        "UPDATE badges SET status = 'REVOKED', revoked_at = $2, revoked_by = $3, \
         revocation_reason = $4, revocation_notes = $5 \
         WHERE id = $1 AND status <> 'REVOKED'",
    )
    .bind(badge.id.as_uuid())
    .bind(badge.revoked_at.map(|t| *t.as_datetime()))
    .bind(badge.revoked_by.map(|u| *u.as_uuid()))
    .bind(badge.revocation_reason.map(|r| r.as_str()))
    .bind(&badge.revocation_notes)
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(badge_id = %badge.id, error = %e, "revocation mirror update failed");
    }
}

/// Mirror a new evidence attachment.
pub async fn mirror_evidence_added(pool: &PgPool, record: &EvidenceRecord) {
    let kind = match record.kind {
        EvidenceKind::File => "FILE",
        EvidenceKind::Url => "URL",
    };
    let result = sqlx::query(
        r#"
        INSERT INTO evidence (
            id, badge_id, kind, file_name, mime_type, size_bytes, url,
            description, added_by, added_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        "#,
    )
    .bind(record.id.as_uuid())
    .bind(record.badge_id.as_uuid())
    .bind(kind)
    .bind(&record.file_name)
    .bind(&record.mime_type)
    .bind(record.size_bytes.map(|s| s as i64))
    .bind(&record.url)
    .bind(&record.description)
    .bind(record.added_by.as_uuid())
    .bind(record.added_at.as_datetime())
    .execute(pool)
    .await;

    if let Err(e) = result {
        tracing::warn!(evidence_id = %record.id, error = %e, "evidence mirror insert failed");
    }
}

/// Mirror an evidence removal.
pub async fn mirror_evidence_removed(pool: &PgPool, evidence_id: EvidenceId) {
    let result = sqlx::query("DELETE FROM evidence WHERE id = $1")
        .bind(evidence_id.as_uuid())
        .execute(pool)
        .await;

    if let Err(e) = result {
        tracing::warn!(evidence_id = %evidence_id, error = %e, "evidence mirror delete failed");
    }
}
