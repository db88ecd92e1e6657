//! # Assertion Generator — Hosted Open Badges 2.0 Assertions
//!
//! Builds the assertion JSON attached to a badge at issuance. The assertion
//! is generated once, stored verbatim on the badge, and served unmodified by
//! the public verification resolver; nothing regenerates it later.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use gbadge_core::{sha256_digest, CanonicalBytes, CanonicalizationError, ContentDigest};
use gbadge_core::{TemplateId, Timestamp, VerificationId};

use crate::recipient::hash_recipient;

/// The JSON-LD context for Open Badges 2.0 assertions.
pub const OPEN_BADGES_CONTEXT: &str = "https://w3id.org/openbadges/v2";

/// Errors produced while generating assertions.
#[derive(Error, Debug)]
pub enum AssertionError {
    /// Recipient email was empty after trimming.
    #[error("recipient email must not be empty")]
    EmptyEmail,

    /// The configured public base URL is not a valid absolute URL.
    #[error("invalid public base URL {url:?}: {reason}")]
    InvalidBaseUrl {
        /// The offending URL string.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// Canonicalization of the template snapshot failed.
    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// The issuer Profile embedded in every badge class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuerProfile {
    /// Issuer identifier URI.
    pub id: String,
    /// Display name of the issuing organization.
    pub name: String,
    /// Issuer homepage.
    pub url: String,
    /// Contact email for the issuing organization.
    pub email: String,
}

/// Immutable template snapshot captured at issuance.
///
/// The badge stores a digest over this snapshot (`metadata_hash`); template
/// edits after issuance do not affect already-issued badges, and any
/// divergence is detectable by re-hashing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateSnapshot {
    /// The source template.
    pub template_id: TemplateId,
    /// Badge name shown to verifiers.
    pub name: String,
    /// What the badge represents.
    pub description: String,
    /// Badge artwork URL.
    pub image_url: String,
    /// What the recipient did to earn the badge.
    pub criteria_narrative: String,
    /// Skill tags attached to the template.
    #[serde(default)]
    pub skills: Vec<String>,
}

/// The hashed recipient block of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientIdentity {
    /// Identity scheme; always `"email"`.
    #[serde(rename = "type")]
    pub identity_type: String,
    /// Always true; plaintext identities are never emitted.
    pub hashed: bool,
    /// Per-badge salt used in the hash.
    pub salt: String,
    /// `sha256$<hex>` over the normalized email plus salt.
    pub identity: String,
}

/// The badge class block of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BadgeClass {
    /// Always `"BadgeClass"`.
    #[serde(rename = "type")]
    pub class_type: String,
    /// Badge class URI.
    pub id: String,
    /// Badge name.
    pub name: String,
    /// Badge description.
    pub description: String,
    /// Badge artwork URL.
    pub image: String,
    /// Earning criteria.
    pub criteria: Criteria,
    /// The issuing organization.
    pub issuer: ProfileBlock,
}

/// Criteria narrative wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    /// What the recipient did to earn the badge.
    pub narrative: String,
}

/// Issuer profile as serialized inside the badge class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileBlock {
    /// Always `"Profile"`.
    #[serde(rename = "type")]
    pub profile_type: String,
    /// Issuer identifier URI.
    pub id: String,
    /// Issuer display name.
    pub name: String,
    /// Issuer homepage.
    pub url: String,
    /// Issuer contact email.
    pub email: String,
}

/// The hosted-verification block of an assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationObject {
    /// Always `"hosted"`.
    #[serde(rename = "type")]
    pub verification_type: String,
    /// Public resolver URL for this badge.
    #[serde(rename = "verificationUrl")]
    pub verification_url: String,
}

/// A complete Open Badges 2.0 assertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    /// JSON-LD context.
    #[serde(rename = "@context")]
    pub context: String,
    /// Always `"Assertion"`.
    #[serde(rename = "type")]
    pub assertion_type: String,
    /// Hosted assertion URL, keyed by verification id.
    pub id: String,
    /// Hashed recipient identity.
    pub recipient: RecipientIdentity,
    /// The badge class this assertion instantiates.
    pub badge: BadgeClass,
    /// Issuance instant, UTC ISO8601.
    #[serde(rename = "issuedOn")]
    pub issued_on: String,
    /// Expiry instant, UTC ISO8601; absent when the badge never expires.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires: Option<String>,
    /// Hosted verification metadata.
    pub verification: VerificationObject,
}

/// Inputs to [`AssertionGenerator::generate`].
#[derive(Debug, Clone)]
pub struct AssertionInput<'a> {
    /// Public verification id of the badge being issued.
    pub verification_id: VerificationId,
    /// Template snapshot taken at issuance.
    pub template: &'a TemplateSnapshot,
    /// Recipient's plaintext email (hashed before emission, never stored).
    pub recipient_email: &'a str,
    /// Per-badge salt from [`crate::generate_salt`].
    pub salt: &'a str,
    /// Issuance instant.
    pub issued_at: Timestamp,
    /// Expiry instant, if the template carries a validity window.
    pub expires_at: Option<Timestamp>,
}

/// Configuration for assertion generation.
#[derive(Debug, Clone)]
pub struct AssertionConfig {
    /// Base URL of the public deployment, no trailing slash.
    public_base_url: String,
    /// The issuing organization's profile.
    issuer: IssuerProfile,
}

impl AssertionConfig {
    /// Build a config, validating the base URL up front.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::InvalidBaseUrl`] when the base URL does not
    /// parse as an absolute http(s) URL.
    pub fn new(public_base_url: &str, issuer: IssuerProfile) -> Result<Self, AssertionError> {
        let parsed = Url::parse(public_base_url).map_err(|e| AssertionError::InvalidBaseUrl {
            url: public_base_url.to_string(),
            reason: e.to_string(),
        })?;
        if parsed.scheme() != "http" && parsed.scheme() != "https" {
            return Err(AssertionError::InvalidBaseUrl {
                url: public_base_url.to_string(),
                reason: format!("unsupported scheme {:?}", parsed.scheme()),
            });
        }
        Ok(Self {
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
            issuer,
        })
    }

    /// The configured issuer profile.
    pub fn issuer(&self) -> &IssuerProfile {
        &self.issuer
    }
}

/// Generates hosted Open Badges assertions and template digests.
#[derive(Debug, Clone)]
pub struct AssertionGenerator {
    config: AssertionConfig,
}

impl AssertionGenerator {
    /// Create a generator from a validated config.
    pub fn new(config: AssertionConfig) -> Self {
        Self { config }
    }

    /// The hosted assertion URL for a badge.
    pub fn assertion_url(&self, verification_id: VerificationId) -> String {
        format!(
            "{}/api/badges/{}/assertion",
            self.config.public_base_url, verification_id
        )
    }

    /// The public verification page URL for a badge.
    pub fn verification_url(&self, verification_id: VerificationId) -> String {
        format!("{}/verify/{}", self.config.public_base_url, verification_id)
    }

    /// The claim deep-link URL for a claim token.
    pub fn claim_url(&self, claim_token: &str) -> String {
        format!("{}/claim/{}", self.config.public_base_url, claim_token)
    }

    /// Generate the assertion for a badge being issued.
    ///
    /// # Errors
    ///
    /// Returns [`AssertionError::EmptyEmail`] when the recipient email is
    /// blank.
    pub fn generate(&self, input: AssertionInput<'_>) -> Result<Assertion, AssertionError> {
        let identity = hash_recipient(input.recipient_email, input.salt)?;
        let issuer = &self.config.issuer;

        Ok(Assertion {
            context: OPEN_BADGES_CONTEXT.to_string(),
            assertion_type: "Assertion".to_string(),
            id: self.assertion_url(input.verification_id),
            recipient: RecipientIdentity {
                identity_type: "email".to_string(),
                hashed: true,
                salt: input.salt.to_string(),
                identity,
            },
            badge: BadgeClass {
                class_type: "BadgeClass".to_string(),
                id: format!(
                    "{}/api/badge-classes/{}",
                    self.config.public_base_url, input.template.template_id
                ),
                name: input.template.name.clone(),
                description: input.template.description.clone(),
                image: input.template.image_url.clone(),
                criteria: Criteria {
                    narrative: input.template.criteria_narrative.clone(),
                },
                issuer: ProfileBlock {
                    profile_type: "Profile".to_string(),
                    id: issuer.id.clone(),
                    name: issuer.name.clone(),
                    url: issuer.url.clone(),
                    email: issuer.email.clone(),
                },
            },
            issued_on: input.issued_at.to_iso8601(),
            expires: input.expires_at.map(|t| t.to_iso8601()),
            verification: VerificationObject {
                verification_type: "hosted".to_string(),
                verification_url: self.verification_url(input.verification_id),
            },
        })
    }

    /// Digest over the canonical template snapshot.
    ///
    /// Stored on the badge as `metadata_hash` at issuance; semantically
    /// equal snapshots always hash identically.
    pub fn metadata_hash(template: &TemplateSnapshot) -> Result<ContentDigest, AssertionError> {
        let canonical = CanonicalBytes::new(template)?;
        Ok(sha256_digest(&canonical))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gbadge_core::TemplateId;

    fn test_issuer() -> IssuerProfile {
        IssuerProfile {
            id: "https://badges.example.com/issuer".to_string(),
            name: "Learning & Development".to_string(),
            url: "https://badges.example.com".to_string(),
            email: "badges@example.com".to_string(),
        }
    }

    fn test_template() -> TemplateSnapshot {
        TemplateSnapshot {
            template_id: TemplateId::new(),
            name: "Rust Fundamentals".to_string(),
            description: "Completed the Rust fundamentals track".to_string(),
            image_url: "https://badges.example.com/img/rust.png".to_string(),
            criteria_narrative: "Passed all module assessments".to_string(),
            skills: vec!["rust".to_string(), "systems".to_string()],
        }
    }

    fn test_generator() -> AssertionGenerator {
        let config = AssertionConfig::new("https://badges.example.com/", test_issuer()).unwrap();
        AssertionGenerator::new(config)
    }

    fn test_input<'a>(
        template: &'a TemplateSnapshot,
        vid: VerificationId,
        expires: Option<Timestamp>,
    ) -> AssertionInput<'a> {
        AssertionInput {
            verification_id: vid,
            template,
            recipient_email: "jane@example.com",
            salt: "0123456789abcdef0123456789abcdef",
            issued_at: Timestamp::parse("2026-01-15T12:00:00Z").unwrap(),
            expires_at: expires,
        }
    }

    #[test]
    fn config_rejects_bad_base_url() {
        assert!(AssertionConfig::new("not a url", test_issuer()).is_err());
        assert!(AssertionConfig::new("ftp://badges.example.com", test_issuer()).is_err());
    }

    #[test]
    fn config_strips_trailing_slash() {
        let gen = test_generator();
        let vid = VerificationId::new();
        assert_eq!(
            gen.verification_url(vid),
            format!("https://badges.example.com/verify/{vid}")
        );
    }

    #[test]
    fn assertion_has_open_badges_shape() {
        let template = test_template();
        let vid = VerificationId::new();
        let assertion = test_generator().generate(test_input(&template, vid, None)).unwrap();

        let value = serde_json::to_value(&assertion).unwrap();
        assert_eq!(value["@context"], OPEN_BADGES_CONTEXT);
        assert_eq!(value["type"], "Assertion");
        assert_eq!(value["recipient"]["type"], "email");
        assert_eq!(value["recipient"]["hashed"], true);
        assert_eq!(value["badge"]["type"], "BadgeClass");
        assert_eq!(value["badge"]["issuer"]["type"], "Profile");
        assert_eq!(value["verification"]["type"], "hosted");
        assert_eq!(
            value["verification"]["verificationUrl"],
            format!("https://badges.example.com/verify/{vid}")
        );
        assert_eq!(value["issuedOn"], "2026-01-15T12:00:00Z");
    }

    #[test]
    fn assertion_never_contains_plaintext_email() {
        let template = test_template();
        let assertion = test_generator()
            .generate(test_input(&template, VerificationId::new(), None))
            .unwrap();
        let json = serde_json::to_string(&assertion).unwrap();
        assert!(!json.contains("jane@example.com"));
        assert!(assertion.recipient.identity.starts_with("sha256$"));
    }

    #[test]
    fn expires_omitted_when_absent() {
        let template = test_template();
        let assertion = test_generator()
            .generate(test_input(&template, VerificationId::new(), None))
            .unwrap();
        let value = serde_json::to_value(&assertion).unwrap();
        assert!(value.get("expires").is_none());
    }

    #[test]
    fn expires_present_when_set() {
        let template = test_template();
        let expires = Timestamp::parse("2027-01-15T12:00:00Z").unwrap();
        let assertion = test_generator()
            .generate(test_input(&template, VerificationId::new(), Some(expires)))
            .unwrap();
        let value = serde_json::to_value(&assertion).unwrap();
        assert_eq!(value["expires"], "2027-01-15T12:00:00Z");
    }

    #[test]
    fn metadata_hash_is_stable_and_sensitive() {
        let template = test_template();
        let a = AssertionGenerator::metadata_hash(&template).unwrap();
        let b = AssertionGenerator::metadata_hash(&template).unwrap();
        assert_eq!(a, b);

        let mut edited = template.clone();
        edited.description = "Edited after issuance".to_string();
        let c = AssertionGenerator::metadata_hash(&edited).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn claim_url_embeds_token() {
        let gen = test_generator();
        assert_eq!(
            gen.claim_url("deadbeefdeadbeefdeadbeefdeadbeef"),
            "https://badges.example.com/claim/deadbeefdeadbeefdeadbeefdeadbeef"
        );
    }

    #[test]
    fn empty_email_surfaces_error() {
        let template = test_template();
        let mut input = test_input(&template, VerificationId::new(), None);
        input.recipient_email = "  ";
        assert!(matches!(
            test_generator().generate(input),
            Err(AssertionError::EmptyEmail)
        ));
    }

    #[test]
    fn assertion_roundtrips_through_serde() {
        let template = test_template();
        let assertion = test_generator()
            .generate(test_input(&template, VerificationId::new(), None))
            .unwrap();
        let json = serde_json::to_string(&assertion).unwrap();
        let back: Assertion = serde_json::from_str(&json).unwrap();
        assert_eq!(back, assertion);
    }
}
