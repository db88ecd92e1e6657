//! # gbadge-core — Foundational Types for the Badge Engine
//!
//! This crate is the bedrock of the gbadge workspace. It defines the
//! type-system primitives every other crate builds on; it depends on nothing
//! internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain identifiers.** `BadgeId`,
//!    `VerificationId`, `TemplateId`, `UserId`, `EvidenceId` — no bare UUIDs
//!    or strings cross a function boundary. A `BadgeId` can never be handed
//!    to a resolver expecting a `VerificationId`.
//!
//! 2. **`CanonicalBytes` newtype.** ALL digest computation flows through
//!    `CanonicalBytes::new()`. No raw `serde_json::to_vec()` for digests.
//!    Template snapshots hashed at issuance stay verifiable forever because
//!    semantically equal JSON always produces the same bytes.
//!
//! 3. **UTC-only timestamps.** The `Timestamp` type enforces UTC with Z
//!    suffix and seconds precision, matching the canonicalization rules.
//!
//! 4. **`sha256_digest()` accepts only `&CanonicalBytes`.** Compile-time
//!    enforcement that all digest paths flow through canonicalization.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `gbadge-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement
//!   `Serialize`/`Deserialize`.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{BadgeId, EvidenceId, TemplateId, UserId, VerificationId};
pub use temporal::Timestamp;
