//! # Audit Log — Append-Only Transition Trail
//!
//! Every successful lifecycle transition appends exactly one entry. The log
//! exposes append and read operations only; there is no update or delete
//! surface, so the trail is tamper-evident by construction at the API level.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gbadge_core::{BadgeId, Timestamp, UserId};

/// The lifecycle transitions that get recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// Badge created in PENDING.
    Issued,
    /// Recipient accepted the badge.
    Claimed,
    /// Issuer withdrew the badge.
    Revoked,
}

impl AuditAction {
    /// The wire-format action name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Issued => "ISSUED",
            Self::Claimed => "CLAIMED",
            Self::Revoked => "REVOKED",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recorded transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    /// Entry id.
    pub id: Uuid,
    /// The badge the transition happened on.
    pub badge_id: BadgeId,
    /// Who triggered it. `None` for unauthenticated token claims.
    pub actor: Option<UserId>,
    /// Which transition.
    pub action: AuditAction,
    /// Transition context: `oldStatus`, `newStatus`, `reason`, `notes`,
    /// `badgeName` as applicable.
    pub metadata: serde_json::Value,
    /// When the entry was appended.
    pub created_at: Timestamp,
}

/// In-memory append-only audit log.
///
/// Entries come back in append order. Nothing removes or rewrites an entry.
#[derive(Default)]
pub struct AuditLog {
    entries: RwLock<Vec<AuditLogEntry>>,
}

impl AuditLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one entry; returns its id.
    pub fn append(
        &self,
        badge_id: BadgeId,
        actor: Option<UserId>,
        action: AuditAction,
        metadata: serde_json::Value,
    ) -> Uuid {
        let entry = AuditLogEntry {
            id: Uuid::new_v4(),
            badge_id,
            actor,
            action,
            metadata,
            created_at: Timestamp::now(),
        };
        let id = entry.id;
        self.entries.write().push(entry);
        id
    }

    /// All entries for one badge, oldest first.
    pub fn for_badge(&self, badge_id: BadgeId) -> Vec<AuditLogEntry> {
        self.entries
            .read()
            .iter()
            .filter(|e| e.badge_id == badge_id)
            .cloned()
            .collect()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when no entries have been appended.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
