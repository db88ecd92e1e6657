//! # Badge State Machine
//!
//! Stored statuses are `PENDING`, `CLAIMED`, and `REVOKED`. `EXPIRED` never
//! hits storage: it is derived at read time from `expires_at`, so a badge
//! whose validity window lapses needs no background job to flip it.
//!
//! Transition rules:
//!
//! - `PENDING → CLAIMED` — the only path to a claimed badge.
//! - `PENDING → REVOKED`, `CLAIMED → REVOKED` — revocation is terminal.
//!
//! Rejection messages for invalid claims are part of the client contract and
//! must not be reworded.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gbadge_assertion::{AssertionError, TemplateSnapshot};
use gbadge_core::{BadgeId, ContentDigest, Timestamp, UserId, VerificationId};

/// Stored badge status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeStatus {
    /// Issued, waiting for the recipient to claim.
    Pending,
    /// Accepted by the recipient.
    Claimed,
    /// Withdrawn by the issuer; terminal.
    Revoked,
}

impl BadgeStatus {
    /// The wire-format status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Claimed => "CLAIMED",
            Self::Revoked => "REVOKED",
        }
    }
}

impl std::fmt::Display for BadgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status as seen by readers, with expiry derived on the fly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EffectiveStatus {
    /// Issued, not yet claimed.
    Pending,
    /// Claimed and within its validity window.
    Claimed,
    /// Revoked; takes precedence over everything else.
    Revoked,
    /// Validity window has lapsed. Derived, never stored.
    Expired,
}

impl EffectiveStatus {
    /// The wire-format status name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Claimed => "CLAIMED",
            Self::Revoked => "REVOKED",
            Self::Expired => "EXPIRED",
        }
    }
}

impl std::fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed set of reasons an issuer may give when revoking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RevocationReason {
    /// The recipient violated platform or company policy.
    PolicyViolation,
    /// The badge should never have been issued.
    IssuedInError,
    /// The underlying achievement has lapsed.
    Expired,
    /// A duplicate of another badge.
    Duplicate,
    /// Fraudulent achievement.
    Fraud,
    /// Anything else; pair with free-text notes.
    Other,
}

impl RevocationReason {
    /// The wire-format reason name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PolicyViolation => "POLICY_VIOLATION",
            Self::IssuedInError => "ISSUED_IN_ERROR",
            Self::Expired => "EXPIRED",
            Self::Duplicate => "DUPLICATE",
            Self::Fraud => "FRAUD",
            Self::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The authenticated principal acting on a badge.
///
/// Built by the transport layer from the verified identity, never from a
/// client-supplied body field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    /// The acting user.
    pub user_id: UserId,
    /// True for managers and administrators.
    pub privileged: bool,
}

/// Errors in the badge lifecycle domain.
#[derive(Error, Debug)]
pub enum BadgeError {
    /// The badge (or claim token) does not exist. The message is identical
    /// whether the resource never existed or the identifier is simply wrong.
    #[error("{0}")]
    NotFound(String),

    /// The actor is authenticated but not allowed to do this.
    #[error("{0}")]
    Forbidden(String),

    /// The transition is not legal from the badge's current status.
    #[error("{0}")]
    InvalidState(String),

    /// A per-badge limit was hit.
    #[error("{0}")]
    QuotaExceeded(String),

    /// The input failed validation.
    #[error("{0}")]
    Validation(String),

    /// Assertion generation failed.
    #[error("assertion error: {0}")]
    Assertion(#[from] AssertionError),
}

impl BadgeError {
    /// NotFound with the default badge message.
    pub fn badge_not_found() -> Self {
        Self::NotFound("Badge not found".to_string())
    }
}

/// The rejection returned when a claim finds the badge in a non-PENDING
/// status. The strings are contractual.
pub(crate) fn claim_rejection(status: BadgeStatus) -> BadgeError {
    match status {
        BadgeStatus::Claimed => {
            BadgeError::InvalidState("Badge has already been claimed".to_string())
        }
        BadgeStatus::Revoked => {
            BadgeError::InvalidState("Badge has been revoked and cannot be claimed".to_string())
        }
        other => BadgeError::InvalidState(format!(
            "Badge status is {}, expected PENDING",
            other.as_str()
        )),
    }
}

/// An issued badge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Badge {
    /// Internal primary key.
    pub id: BadgeId,
    /// Public verification key; never equals `id`.
    pub verification_id: VerificationId,
    /// Template snapshot frozen at issuance.
    pub template: TemplateSnapshot,
    /// The recipient.
    pub recipient_id: UserId,
    /// Masked recipient email (`j***@example.com`) for verification output.
    /// The plaintext email is never stored.
    pub recipient_email_masked: String,
    /// The issuing user.
    pub issuer_id: UserId,
    /// Stored status.
    pub status: BadgeStatus,
    /// Claim-link token. Retained after claim; re-claims are blocked by the
    /// status guard, and the token keeps wallet deep-links alive.
    pub claim_token: String,
    /// Digest over the canonical template snapshot.
    pub metadata_hash: ContentDigest,
    /// The Open Badges assertion, stored verbatim from issuance.
    pub assertion: serde_json::Value,
    /// When the badge was issued.
    pub issued_at: Timestamp,
    /// When the recipient claimed it, if they have.
    pub claimed_at: Option<Timestamp>,
    /// End of the validity window; `None` means the badge never expires.
    pub expires_at: Option<Timestamp>,
    /// When the badge was revoked.
    pub revoked_at: Option<Timestamp>,
    /// Who revoked it.
    pub revoked_by: Option<UserId>,
    /// Why it was revoked.
    pub revocation_reason: Option<RevocationReason>,
    /// Free-text revocation notes (max 500 chars).
    pub revocation_notes: Option<String>,
}

impl Badge {
    /// Derive the reader-facing status at the given instant.
    ///
    /// Precedence: REVOKED beats EXPIRED beats the stored status. A revoked
    /// badge stays revoked even after its validity window lapses.
    pub fn effective_status(&self, now: Timestamp) -> EffectiveStatus {
        if self.status == BadgeStatus::Revoked {
            return EffectiveStatus::Revoked;
        }
        if let Some(expires) = self.expires_at {
            if expires.is_before(now) {
                return EffectiveStatus::Expired;
            }
        }
        match self.status {
            BadgeStatus::Pending => EffectiveStatus::Pending,
            BadgeStatus::Claimed => EffectiveStatus::Claimed,
            BadgeStatus::Revoked => EffectiveStatus::Revoked,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testutil::sample_badge;
    use super::*;

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&BadgeStatus::Pending).unwrap(),
            "\"PENDING\""
        );
        assert_eq!(
            serde_json::to_string(&EffectiveStatus::Expired).unwrap(),
            "\"EXPIRED\""
        );
        assert_eq!(
            serde_json::to_string(&RevocationReason::PolicyViolation).unwrap(),
            "\"POLICY_VIOLATION\""
        );
    }

    #[test]
    fn revocation_reason_set_is_closed() {
        // Unknown reasons must not deserialize.
        let parsed: Result<RevocationReason, _> = serde_json::from_str("\"BAD_VIBES\"");
        assert!(parsed.is_err());
        let parsed: Result<RevocationReason, _> = serde_json::from_str("\"FRAUD\"");
        assert_eq!(parsed.unwrap(), RevocationReason::Fraud);
    }

    #[test]
    fn effective_status_plain() {
        let now = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        let badge = sample_badge(BadgeStatus::Pending, None);
        assert_eq!(badge.effective_status(now), EffectiveStatus::Pending);

        let badge = sample_badge(BadgeStatus::Claimed, None);
        assert_eq!(badge.effective_status(now), EffectiveStatus::Claimed);
    }

    #[test]
    fn claimed_badge_past_expiry_reads_expired() {
        let now = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        let past = Timestamp::parse("2026-05-01T00:00:00Z").unwrap();
        let badge = sample_badge(BadgeStatus::Claimed, Some(past));
        assert_eq!(badge.effective_status(now), EffectiveStatus::Expired);
        // Stored status is untouched.
        assert_eq!(badge.status, BadgeStatus::Claimed);
    }

    #[test]
    fn revoked_beats_expired() {
        let now = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        let past = Timestamp::parse("2026-05-01T00:00:00Z").unwrap();
        let badge = sample_badge(BadgeStatus::Revoked, Some(past));
        assert_eq!(badge.effective_status(now), EffectiveStatus::Revoked);
    }

    #[test]
    fn future_expiry_is_not_expired() {
        let now = Timestamp::parse("2026-06-01T00:00:00Z").unwrap();
        let future = Timestamp::parse("2027-06-01T00:00:00Z").unwrap();
        let badge = sample_badge(BadgeStatus::Claimed, Some(future));
        assert_eq!(badge.effective_status(now), EffectiveStatus::Claimed);
    }

    #[test]
    fn claim_rejection_messages_are_contractual() {
        assert_eq!(
            claim_rejection(BadgeStatus::Claimed).to_string(),
            "Badge has already been claimed"
        );
        assert_eq!(
            claim_rejection(BadgeStatus::Revoked).to_string(),
            "Badge has been revoked and cannot be claimed"
        );
        assert_eq!(
            claim_rejection(BadgeStatus::Pending).to_string(),
            "Badge status is PENDING, expected PENDING"
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::testutil::sample_badge;
    use super::*;
    use proptest::prelude::*;

    fn any_status() -> impl Strategy<Value = BadgeStatus> {
        prop_oneof![
            Just(BadgeStatus::Pending),
            Just(BadgeStatus::Claimed),
            Just(BadgeStatus::Revoked),
        ]
    }

    proptest! {
        /// A revoked badge reads REVOKED at every instant, expiry or not.
        #[test]
        fn revoked_is_absorbing(offset_days in -1000i64..1000) {
            let issued = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
            let badge = sample_badge(BadgeStatus::Revoked, Some(issued.plus_days(30)));
            let now = issued.plus_days(offset_days);
            prop_assert_eq!(badge.effective_status(now), EffectiveStatus::Revoked);
        }

        /// A badge with no expiry never reads EXPIRED.
        #[test]
        fn no_expiry_never_expires(status in any_status(), offset_days in 0i64..10000) {
            let issued = Timestamp::parse("2026-01-15T12:00:00Z").unwrap();
            let badge = sample_badge(status, None);
            let derived = badge.effective_status(issued.plus_days(offset_days));
            prop_assert_ne!(derived, EffectiveStatus::Expired);
        }
    }
}
