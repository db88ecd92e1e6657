//! # gbadge-assertion — Open Badges Assertion Generation
//!
//! Produces the Open Badges 2.0 assertion attached to every issued badge:
//!
//! - **Recipient hashing** ([`hash_recipient`]) — salted SHA-256 identity so
//!   the assertion never carries a plaintext email.
//! - **Per-badge salts** ([`generate_salt`]) — every badge gets its own
//!   random salt, stored in the assertion for verifier-side hash checks.
//!   A single shared salt would let anyone who learns it unmask every
//!   recipient in one dictionary pass.
//! - **Claim tokens** ([`generate_claim_token`]) — 128-bit unguessable
//!   tokens backing the emailed claim link.
//! - **Assertion generation** ([`AssertionGenerator`]) — hosted-verification
//!   assertion JSON plus the `metadata_hash` over the canonical template
//!   snapshot taken at issuance.
//!
//! ## Security Invariants
//!
//! - All digest computation uses [`CanonicalBytes`](gbadge_core::CanonicalBytes),
//!   never raw `serde_json::to_vec()`.
//! - Plaintext recipient emails never appear in any generated structure.

pub mod generator;
pub mod recipient;
pub mod token;

// Re-export primary types.
pub use generator::{
    Assertion, AssertionConfig, AssertionError, AssertionGenerator, AssertionInput, BadgeClass,
    IssuerProfile, RecipientIdentity, TemplateSnapshot, VerificationObject, OPEN_BADGES_CONTEXT,
};
pub use recipient::{generate_salt, hash_recipient, mask_email};
pub use token::generate_claim_token;
