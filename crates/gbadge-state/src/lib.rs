//! # gbadge-state — Badge Lifecycle Engine
//!
//! The heart of the badge platform: a small, explicit state machine with
//! atomic transitions and a tamper-evident trail around it.
//!
//! - **State machine** ([`badge`]) — `PENDING → CLAIMED`, and
//!   `PENDING | CLAIMED → REVOKED`. `EXPIRED` is derived at read time and
//!   never stored.
//! - **Repository + CAS** ([`repo`]) — every transition is a
//!   compare-and-update against a status guard, so two racing claims can
//!   never both succeed.
//! - **Lifecycle service** ([`lifecycle`]) — issue, claim, claim-by-token,
//!   revoke; each successful transition appends exactly one audit entry.
//! - **Evidence manager** ([`evidence`]) — bounded evidence attachments with
//!   MIME and size validation, plus bulk fan-out.
//! - **Audit log** ([`audit`]) — append-only, no update or delete surface.
//! - **Verification resolver** ([`resolver`]) — public lookup keyed by
//!   `VerificationId`, never by the internal badge id.

pub mod audit;
pub mod badge;
pub mod evidence;
pub mod lifecycle;
pub mod repo;
pub mod resolver;

// Re-export primary types.
pub use audit::{AuditAction, AuditLog, AuditLogEntry};
pub use badge::{Actor, Badge, BadgeError, BadgeStatus, EffectiveStatus, RevocationReason};
pub use evidence::{
    EvidenceKind, EvidenceManager, EvidenceRecord, FanoutResult, NewFileEvidence, NewUrlEvidence,
    ALLOWED_MIME_TYPES, MAX_EVIDENCE_ITEMS, MAX_FILE_BYTES,
};
pub use lifecycle::{BadgeLifecycle, IssueRequest};
pub use repo::{BadgeRepository, CasOutcome, MemoryRepository, StatusGuard};
pub use resolver::{VerificationReport, VerificationResolver};
