//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all domain identifiers in the badge engine.
//! These prevent accidental identifier confusion — you cannot pass a
//! `BadgeId` where a `VerificationId` is expected.
//!
//! ## Security Invariant
//!
//! `BadgeId` and `VerificationId` are distinct types on purpose: the public
//! verification surface is keyed exclusively by `VerificationId`, so the
//! internal badge primary key never leaks into shareable URLs, and a leaked
//! badge id grants nothing on the public resolver.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Internal primary key of an issued badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BadgeId(pub Uuid);

/// Public, unguessable identifier used for third-party verification.
///
/// Distinct from [`BadgeId`]; the two never share a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VerificationId(pub Uuid);

/// Identifier of the badge template a badge was issued from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TemplateId(pub Uuid);

/// Identifier of a platform user (issuer or recipient).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

/// Identifier of an evidence attachment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EvidenceId(pub Uuid);

macro_rules! uuid_id_impl {
    ($name:ident) => {
        impl $name {
            /// Generate a new random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the inner UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }
    };
}

uuid_id_impl!(BadgeId);
uuid_id_impl!(VerificationId);
uuid_id_impl!(TemplateId);
uuid_id_impl!(UserId);
uuid_id_impl!(EvidenceId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_random() {
        assert_ne!(BadgeId::new(), BadgeId::new());
        assert_ne!(VerificationId::new(), VerificationId::new());
    }

    #[test]
    fn display_is_plain_uuid() {
        let id = BadgeId::new();
        assert_eq!(id.to_string(), id.as_uuid().to_string());
    }

    #[test]
    fn serde_is_transparent() {
        let id = VerificationId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.as_uuid()));
        let back: VerificationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
