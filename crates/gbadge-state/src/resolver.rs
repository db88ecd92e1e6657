//! # Verification Resolver — Public Badge Lookup
//!
//! Third parties verify a badge with nothing but its `VerificationId`. The
//! resolver is deliberately read-only and unauthenticated: it never takes
//! the internal badge id, never exposes the plaintext recipient email, and
//! reports an unknown id exactly like a missing badge.

use serde::{Deserialize, Serialize};

use gbadge_core::{ContentDigest, Timestamp, VerificationId};

use std::sync::Arc;

use crate::badge::{BadgeError, EffectiveStatus, RevocationReason};
use crate::repo::BadgeRepository;

/// Everything a verifier gets to see about a badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    /// The public id that was looked up.
    pub verification_id: VerificationId,
    /// Status with expiry derived at resolution time.
    pub effective_status: EffectiveStatus,
    /// Badge name from the issuance-time template snapshot.
    pub badge_name: String,
    /// Badge description from the snapshot.
    pub description: String,
    /// Badge artwork URL from the snapshot.
    pub image_url: String,
    /// Masked recipient email (`j***@example.com`).
    pub recipient: String,
    /// When the badge was issued.
    pub issued_at: Timestamp,
    /// When it was claimed, if it has been.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_at: Option<Timestamp>,
    /// End of the validity window, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<Timestamp>,
    /// When it was revoked, if it has been.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revoked_at: Option<Timestamp>,
    /// Why it was revoked, if it has been.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revocation_reason: Option<RevocationReason>,
    /// Digest over the issuance-time template snapshot.
    pub metadata_hash: ContentDigest,
    /// The Open Badges assertion, verbatim from issuance.
    pub assertion: serde_json::Value,
}

/// Resolves public verification lookups.
pub struct VerificationResolver {
    repo: Arc<dyn BadgeRepository>,
}

impl VerificationResolver {
    /// Create a resolver over the given repository.
    pub fn new(repo: Arc<dyn BadgeRepository>) -> Self {
        Self { repo }
    }

    /// Resolve a verification id at the given instant.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids. The error is byte-identical
    /// whether the badge never existed or the id is simply wrong.
    pub fn resolve(
        &self,
        verification_id: VerificationId,
        now: Timestamp,
    ) -> Result<VerificationReport, BadgeError> {
        let badge = self
            .repo
            .get_by_verification_id(verification_id)
            .ok_or_else(BadgeError::badge_not_found)?;

        Ok(VerificationReport {
            verification_id,
            effective_status: badge.effective_status(now),
            badge_name: badge.template.name,
            description: badge.template.description,
            image_url: badge.template.image_url,
            recipient: badge.recipient_email_masked,
            issued_at: badge.issued_at,
            claimed_at: badge.claimed_at,
            expires_at: badge.expires_at,
            revoked_at: badge.revoked_at,
            revocation_reason: badge.revocation_reason,
            metadata_hash: badge.metadata_hash,
            assertion: badge.assertion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::badge::testutil::sample_badge;
    use crate::badge::BadgeStatus;
    use crate::repo::MemoryRepository;
    use gbadge_core::UserId;

    fn now() -> Timestamp {
        Timestamp::parse("2026-06-01T00:00:00Z").unwrap()
    }

    #[test]
    fn resolves_by_verification_id_only() {
        let repo = MemoryRepository::shared();
        let badge = sample_badge(BadgeStatus::Pending, None);
        let vid = badge.verification_id;
        let internal_id = badge.id;
        repo.insert(badge);
        let resolver = VerificationResolver::new(repo as Arc<dyn BadgeRepository>);

        let report = resolver.resolve(vid, now()).unwrap();
        assert_eq!(report.effective_status, EffectiveStatus::Pending);
        assert_eq!(report.recipient, "j***@example.com");

        // The internal badge id is not a valid verification key.
        let err = resolver
            .resolve(VerificationId(*internal_id.as_uuid()), now())
            .unwrap_err();
        assert_eq!(err.to_string(), "Badge not found");
    }

    #[test]
    fn unknown_id_reads_like_missing_badge() {
        let repo = MemoryRepository::shared();
        let resolver = VerificationResolver::new(repo as Arc<dyn BadgeRepository>);
        let err = resolver.resolve(VerificationId::new(), now()).unwrap_err();
        assert_eq!(err.to_string(), "Badge not found");
    }

    #[test]
    fn expired_is_derived_at_resolution() {
        let repo = MemoryRepository::shared();
        let past = Timestamp::parse("2026-05-01T00:00:00Z").unwrap();
        let badge = sample_badge(BadgeStatus::Claimed, Some(past));
        let vid = badge.verification_id;
        repo.insert(badge);
        let resolver = VerificationResolver::new(repo as Arc<dyn BadgeRepository>);

        let report = resolver.resolve(vid, now()).unwrap();
        assert_eq!(report.effective_status, EffectiveStatus::Expired);
    }

    #[test]
    fn revoked_report_carries_reason() {
        let repo = MemoryRepository::shared();
        let mut badge = sample_badge(BadgeStatus::Revoked, None);
        badge.revoked_at = Some(now());
        badge.revoked_by = Some(UserId::new());
        badge.revocation_reason = Some(RevocationReason::Fraud);
        let vid = badge.verification_id;
        repo.insert(badge);
        let resolver = VerificationResolver::new(repo as Arc<dyn BadgeRepository>);

        let report = resolver.resolve(vid, now()).unwrap();
        assert_eq!(report.effective_status, EffectiveStatus::Revoked);
        assert_eq!(report.revocation_reason, Some(RevocationReason::Fraud));
        assert!(report.revoked_at.is_some());
    }

    #[test]
    fn report_never_contains_plaintext_email() {
        let repo = MemoryRepository::shared();
        let badge = sample_badge(BadgeStatus::Claimed, None);
        let vid = badge.verification_id;
        repo.insert(badge);
        let resolver = VerificationResolver::new(repo as Arc<dyn BadgeRepository>);

        let report = resolver.resolve(vid, now()).unwrap();
        let json = serde_json::to_string(&report).unwrap();
        assert!(!json.contains("jane@example.com"));
        assert!(json.contains("j***@example.com"));
    }

    #[test]
    fn assertion_is_served_verbatim() {
        let repo = MemoryRepository::shared();
        let badge = sample_badge(BadgeStatus::Pending, None);
        let vid = badge.verification_id;
        let assertion = badge.assertion.clone();
        repo.insert(badge);
        let resolver = VerificationResolver::new(repo as Arc<dyn BadgeRepository>);

        let report = resolver.resolve(vid, now()).unwrap();
        assert_eq!(report.assertion, assertion);
    }
}
