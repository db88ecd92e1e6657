//! # Badge Repository — Guarded Compare-and-Update
//!
//! All status transitions go through [`BadgeRepository::compare_and_update`]:
//! the caller names the status guard the row must satisfy, and the update
//! applies only if it still does. This is the in-process equivalent of
//! `UPDATE badges SET status = 'CLAIMED' WHERE id = $1 AND status = 'PENDING'`
//! — read-then-write races cannot double-claim a badge.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use gbadge_core::{BadgeId, UserId, VerificationId};

use crate::badge::{Badge, BadgeStatus};

/// The status precondition of a compare-and-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusGuard {
    /// Row must currently be in exactly this status (`WHERE status = ?`).
    Is(BadgeStatus),
    /// Row must currently NOT be in this status (`WHERE status <> ?`).
    Not(BadgeStatus),
}

impl StatusGuard {
    /// Whether a badge in `status` satisfies this guard.
    pub fn permits(&self, status: BadgeStatus) -> bool {
        match self {
            Self::Is(required) => status == *required,
            Self::Not(excluded) => status != *excluded,
        }
    }
}

/// Result of a guarded update.
#[derive(Debug, Clone)]
pub enum CasOutcome {
    /// Guard held; the update was applied. Carries the new row.
    Updated(Badge),
    /// Guard failed; nothing changed. Carries the current row so callers
    /// can build a precise rejection.
    PreconditionFailed(Badge),
    /// No badge with that id.
    NotFound,
}

/// Storage abstraction for badges.
///
/// Synchronous and object-safe so services can hold `Arc<dyn BadgeRepository>`
/// without caring whether the backing store is memory or a database mirror.
pub trait BadgeRepository: Send + Sync {
    /// Store a freshly issued badge.
    fn insert(&self, badge: Badge);

    /// Fetch by internal id.
    fn get(&self, id: BadgeId) -> Option<Badge>;

    /// Fetch by public verification id.
    fn get_by_verification_id(&self, verification_id: VerificationId) -> Option<Badge>;

    /// Fetch by claim token.
    fn get_by_claim_token(&self, claim_token: &str) -> Option<Badge>;

    /// All badges issued to a recipient, in issuance order.
    fn list_by_recipient(&self, recipient_id: UserId) -> Vec<Badge>;

    /// Atomically apply `apply` to the badge iff `guard` holds.
    ///
    /// Implementations must make the read-validate-update sequence atomic:
    /// no other writer may interleave between the guard check and the
    /// update.
    fn compare_and_update(
        &self,
        id: BadgeId,
        guard: StatusGuard,
        apply: &dyn Fn(&mut Badge),
    ) -> CasOutcome;
}

#[derive(Default)]
struct Inner {
    badges: HashMap<BadgeId, Badge>,
    by_verification: HashMap<VerificationId, BadgeId>,
    by_token: HashMap<String, BadgeId>,
    insertion_order: Vec<BadgeId>,
}

/// In-memory repository backed by a single `RwLock`.
///
/// `compare_and_update` holds the write lock across the guard check and the
/// mutation, which serializes racing transitions.
#[derive(Default)]
pub struct MemoryRepository {
    inner: RwLock<Inner>,
}

impl MemoryRepository {
    /// Create an empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shared handle, ready to hand to services.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored badges.
    pub fn len(&self) -> usize {
        self.inner.read().badges.len()
    }

    /// True when no badges are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BadgeRepository for MemoryRepository {
    fn insert(&self, badge: Badge) {
        let mut inner = self.inner.write();
        inner.by_verification.insert(badge.verification_id, badge.id);
        inner.by_token.insert(badge.claim_token.clone(), badge.id);
        inner.insertion_order.push(badge.id);
        inner.badges.insert(badge.id, badge);
    }

    fn get(&self, id: BadgeId) -> Option<Badge> {
        self.inner.read().badges.get(&id).cloned()
    }

    fn get_by_verification_id(&self, verification_id: VerificationId) -> Option<Badge> {
        let inner = self.inner.read();
        let id = inner.by_verification.get(&verification_id)?;
        inner.badges.get(id).cloned()
    }

    fn get_by_claim_token(&self, claim_token: &str) -> Option<Badge> {
        let inner = self.inner.read();
        let id = inner.by_token.get(claim_token)?;
        inner.badges.get(id).cloned()
    }

    fn list_by_recipient(&self, recipient_id: UserId) -> Vec<Badge> {
        let inner = self.inner.read();
        inner
            .insertion_order
            .iter()
            .filter_map(|id| inner.badges.get(id))
            .filter(|b| b.recipient_id == recipient_id)
            .cloned()
            .collect()
    }

    fn compare_and_update(
        &self,
        id: BadgeId,
        guard: StatusGuard,
        apply: &dyn Fn(&mut Badge),
    ) -> CasOutcome {
        let mut inner = self.inner.write();
        match inner.badges.get_mut(&id) {
            None => CasOutcome::NotFound,
            Some(badge) => {
                if !guard.permits(badge.status) {
                    return CasOutcome::PreconditionFailed(badge.clone());
                }
                apply(badge);
                CasOutcome::Updated(badge.clone())
            }
        }
    }
}
