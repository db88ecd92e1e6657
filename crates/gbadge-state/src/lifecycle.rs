//! # Badge Lifecycle Service
//!
//! Orchestrates issue, claim, and revoke on top of the repository, the
//! assertion generator, and the audit log. All authorization decisions take
//! the authenticated [`Actor`] — never an id out of a request body.

use std::sync::Arc;

use gbadge_assertion::{
    generate_claim_token, generate_salt, mask_email, AssertionGenerator, AssertionInput,
    TemplateSnapshot,
};
use gbadge_core::{BadgeId, Timestamp, UserId, VerificationId};

use crate::audit::{AuditAction, AuditLog};
use crate::badge::{claim_rejection, Actor, Badge, BadgeError, BadgeStatus, RevocationReason};
use crate::repo::{BadgeRepository, CasOutcome, StatusGuard};

/// Maximum length of free-text revocation notes.
pub const MAX_REVOCATION_NOTES_CHARS: usize = 500;

/// Inputs to [`BadgeLifecycle::issue`].
#[derive(Debug, Clone)]
pub struct IssueRequest {
    /// Template snapshot frozen onto the badge.
    pub template: TemplateSnapshot,
    /// Who receives the badge.
    pub recipient_id: UserId,
    /// Recipient's email; hashed into the assertion and masked for display,
    /// never stored in plaintext.
    pub recipient_email: String,
    /// Who is issuing.
    pub issuer_id: UserId,
    /// Validity window in days from issuance; `None` means never expires.
    pub validity_days: Option<i64>,
}

/// The lifecycle orchestrator.
pub struct BadgeLifecycle {
    repo: Arc<dyn BadgeRepository>,
    audit: Arc<AuditLog>,
    generator: AssertionGenerator,
}

impl BadgeLifecycle {
    /// Wire up a lifecycle service.
    pub fn new(
        repo: Arc<dyn BadgeRepository>,
        audit: Arc<AuditLog>,
        generator: AssertionGenerator,
    ) -> Self {
        Self {
            repo,
            audit,
            generator,
        }
    }

    /// The assertion generator, for URL construction at the transport layer.
    pub fn generator(&self) -> &AssertionGenerator {
        &self.generator
    }

    /// Issue a badge: PENDING status, fresh salt and claim token, assertion
    /// generated and frozen, audit `ISSUED`.
    pub fn issue(&self, request: IssueRequest) -> Result<Badge, BadgeError> {
        if let Some(days) = request.validity_days {
            if days <= 0 {
                return Err(BadgeError::Validation(
                    "validity_days must be a positive number of days".to_string(),
                ));
            }
        }

        let id = BadgeId::new();
        let mut verification_id = VerificationId::new();
        // The public verification key must never equal the internal id.
        while verification_id.as_uuid() == id.as_uuid() {
            verification_id = VerificationId::new();
        }

        let issued_at = Timestamp::now();
        let expires_at = request.validity_days.map(|d| issued_at.plus_days(d));
        let salt = generate_salt();
        let claim_token = generate_claim_token();

        let assertion = self.generator.generate(AssertionInput {
            verification_id,
            template: &request.template,
            recipient_email: &request.recipient_email,
            salt: &salt,
            issued_at,
            expires_at,
        })?;
        let assertion = serde_json::to_value(&assertion)
            .map_err(|e| BadgeError::Validation(format!("assertion serialization failed: {e}")))?;
        let metadata_hash = AssertionGenerator::metadata_hash(&request.template)?;

        let badge = Badge {
            id,
            verification_id,
            recipient_email_masked: mask_email(request.recipient_email.trim()),
            template: request.template,
            recipient_id: request.recipient_id,
            issuer_id: request.issuer_id,
            status: BadgeStatus::Pending,
            claim_token,
            metadata_hash,
            assertion,
            issued_at,
            claimed_at: None,
            expires_at,
            revoked_at: None,
            revoked_by: None,
            revocation_reason: None,
            revocation_notes: None,
        };

        self.repo.insert(badge.clone());
        self.audit.append(
            badge.id,
            Some(badge.issuer_id),
            AuditAction::Issued,
            serde_json::json!({
                "badgeName": badge.template.name,
                "templateId": badge.template.template_id,
                "newStatus": BadgeStatus::Pending,
            }),
        );
        Ok(badge)
    }

    /// Claim a badge as its recipient.
    ///
    /// Only the badge's recipient may claim it, and only from PENDING. The
    /// status flip is a compare-and-update, so two racing claims produce
    /// exactly one CLAIMED badge and one rejection.
    pub fn claim(&self, id: BadgeId, actor: &Actor) -> Result<Badge, BadgeError> {
        let badge = self.repo.get(id).ok_or_else(BadgeError::badge_not_found)?;
        if badge.recipient_id != actor.user_id {
            return Err(BadgeError::Forbidden(
                "Only the badge recipient can claim this badge".to_string(),
            ));
        }
        self.claim_pending(badge.id, Some(actor.user_id))
    }

    /// Claim a badge through its emailed claim token.
    ///
    /// The token is the credential here, so no authenticated identity is
    /// required. An unknown token reads the same as a missing badge — the
    /// endpoint is not an oracle for token existence.
    pub fn claim_by_token(&self, claim_token: &str) -> Result<Badge, BadgeError> {
        let badge = self.repo.get_by_claim_token(claim_token).ok_or_else(|| {
            BadgeError::NotFound(
                "This claim link is invalid or has already been used. If you have already \
                 claimed this badge, you can find it in your wallet."
                    .to_string(),
            )
        })?;
        self.claim_pending(badge.id, None)
    }

    fn claim_pending(&self, id: BadgeId, actor: Option<UserId>) -> Result<Badge, BadgeError> {
        let now = Timestamp::now();
        let outcome =
            self.repo
                .compare_and_update(id, StatusGuard::Is(BadgeStatus::Pending), &|badge| {
                    badge.status = BadgeStatus::Claimed;
                    badge.claimed_at = Some(now);
                });
        match outcome {
            CasOutcome::Updated(badge) => {
                self.audit.append(
                    badge.id,
                    actor,
                    AuditAction::Claimed,
                    serde_json::json!({
                        "badgeName": badge.template.name,
                        "oldStatus": BadgeStatus::Pending,
                        "newStatus": BadgeStatus::Claimed,
                    }),
                );
                Ok(badge)
            }
            CasOutcome::PreconditionFailed(badge) => Err(claim_rejection(badge.status)),
            CasOutcome::NotFound => Err(BadgeError::badge_not_found()),
        }
    }

    /// Revoke a badge with a reason from the closed set.
    ///
    /// Allowed from PENDING or CLAIMED; guarded by `status <> REVOKED` so a
    /// double revoke is rejected, not silently absorbed.
    pub fn revoke(
        &self,
        id: BadgeId,
        actor: &Actor,
        reason: RevocationReason,
        notes: Option<String>,
    ) -> Result<Badge, BadgeError> {
        let badge = self.repo.get(id).ok_or_else(BadgeError::badge_not_found)?;
        if !actor.privileged && badge.issuer_id != actor.user_id {
            return Err(BadgeError::Forbidden(
                "Only the badge issuer or an administrator can revoke this badge".to_string(),
            ));
        }
        if let Some(ref n) = notes {
            if n.chars().count() > MAX_REVOCATION_NOTES_CHARS {
                return Err(BadgeError::Validation(format!(
                    "Revocation notes must be at most {MAX_REVOCATION_NOTES_CHARS} characters"
                )));
            }
        }

        let now = Timestamp::now();
        let old_status = badge.status;
        let revoked_by = actor.user_id;
        let notes_for_update = notes.clone();
        let outcome =
            self.repo
                .compare_and_update(id, StatusGuard::Not(BadgeStatus::Revoked), &|badge| {
                    badge.status = BadgeStatus::Revoked;
                    badge.revoked_at = Some(now);
                    badge.revoked_by = Some(revoked_by);
                    badge.revocation_reason = Some(reason);
                    badge.revocation_notes = notes_for_update.clone();
                });
        match outcome {
            CasOutcome::Updated(badge) => {
                self.audit.append(
                    badge.id,
                    Some(actor.user_id),
                    AuditAction::Revoked,
                    serde_json::json!({
                        "badgeName": badge.template.name,
                        "oldStatus": old_status,
                        "newStatus": BadgeStatus::Revoked,
                        "reason": reason,
                        "notes": notes,
                    }),
                );
                Ok(badge)
            }
            CasOutcome::PreconditionFailed(_) => Err(BadgeError::InvalidState(
                "Badge has already been revoked".to_string(),
            )),
            CasOutcome::NotFound => Err(BadgeError::badge_not_found()),
        }
    }
}
