//! # Evidence Attachment Manager
//!
//! Evidence items justify a badge: uploaded documents or external links.
//! Attachments are bounded per badge, validated for type and size, and
//! access-controlled against the authenticated actor. Blob storage itself
//! lives outside this crate; the manager records metadata and enforces the
//! rules.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use url::Url;

use gbadge_core::{BadgeId, EvidenceId, Timestamp, UserId};

use crate::badge::{Actor, BadgeError};
use crate::repo::BadgeRepository;

/// A badge holds at most this many evidence items.
pub const MAX_EVIDENCE_ITEMS: usize = 5;

/// Maximum file evidence size: 10 MB.
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types accepted for file evidence.
pub const ALLOWED_MIME_TYPES: [&str; 5] = [
    "application/pdf",
    "image/png",
    "image/jpeg",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

/// Whether an evidence item is an uploaded file or an external link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceKind {
    /// Uploaded document.
    File,
    /// External link.
    Url,
}

/// A recorded evidence attachment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvidenceRecord {
    /// Attachment id.
    pub id: EvidenceId,
    /// The badge it supports.
    pub badge_id: BadgeId,
    /// File or URL.
    pub kind: EvidenceKind,
    /// Original file name (file evidence only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Declared MIME type (file evidence only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    /// File size in bytes (file evidence only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// The link (URL evidence only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Optional caption.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Who attached it.
    pub added_by: UserId,
    /// When it was attached.
    pub added_at: Timestamp,
}

/// File evidence being attached. Only a prefix of the content is needed for
/// sniffing, but callers usually pass the whole upload.
#[derive(Debug, Clone, Copy)]
pub struct NewFileEvidence<'a> {
    /// Original file name.
    pub file_name: &'a str,
    /// Declared MIME type.
    pub mime_type: &'a str,
    /// File content.
    pub bytes: &'a [u8],
}

/// URL evidence being attached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUrlEvidence {
    /// The link.
    pub url: String,
    /// Optional caption.
    #[serde(default)]
    pub description: Option<String>,
}

/// Per-badge outcome of a bulk fan-out.
#[derive(Debug)]
pub struct FanoutResult {
    /// The badge this outcome is about.
    pub badge_id: BadgeId,
    /// Number of items attached, or why the badge was skipped.
    pub outcome: Result<usize, BadgeError>,
}

/// Records evidence metadata and enforces quota, type, and access rules.
pub struct EvidenceManager {
    repo: Arc<dyn BadgeRepository>,
    records: RwLock<HashMap<BadgeId, Vec<EvidenceRecord>>>,
}

impl EvidenceManager {
    /// Create a manager over the given badge repository.
    pub fn new(repo: Arc<dyn BadgeRepository>) -> Self {
        Self {
            repo,
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Attach file evidence. Issuer or privileged actors only.
    pub fn attach_file(
        &self,
        badge_id: BadgeId,
        actor: &Actor,
        file: NewFileEvidence<'_>,
    ) -> Result<EvidenceRecord, BadgeError> {
        self.authorize_modify(badge_id, actor)?;
        validate_file(&file)?;

        let record = EvidenceRecord {
            id: EvidenceId::new(),
            badge_id,
            kind: EvidenceKind::File,
            file_name: Some(file.file_name.to_string()),
            mime_type: Some(file.mime_type.to_string()),
            size_bytes: Some(file.bytes.len() as u64),
            url: None,
            description: None,
            added_by: actor.user_id,
            added_at: Timestamp::now(),
        };
        self.append_under_quota(badge_id, record)
    }

    /// Attach URL evidence. Issuer or privileged actors only.
    pub fn attach_url(
        &self,
        badge_id: BadgeId,
        actor: &Actor,
        evidence: NewUrlEvidence,
    ) -> Result<EvidenceRecord, BadgeError> {
        self.authorize_modify(badge_id, actor)?;
        validate_url(&evidence.url)?;

        let record = EvidenceRecord {
            id: EvidenceId::new(),
            badge_id,
            kind: EvidenceKind::Url,
            file_name: None,
            mime_type: None,
            size_bytes: None,
            url: Some(evidence.url),
            description: evidence.description,
            added_by: actor.user_id,
            added_at: Timestamp::now(),
        };
        self.append_under_quota(badge_id, record)
    }

    /// List a badge's evidence. Recipient, issuer, or privileged actors.
    pub fn list(&self, badge_id: BadgeId, actor: &Actor) -> Result<Vec<EvidenceRecord>, BadgeError> {
        let badge = self
            .repo
            .get(badge_id)
            .ok_or_else(BadgeError::badge_not_found)?;
        if !actor.privileged
            && badge.issuer_id != actor.user_id
            && badge.recipient_id != actor.user_id
        {
            return Err(BadgeError::Forbidden(
                "You do not have access to this badge's evidence".to_string(),
            ));
        }
        Ok(self
            .records
            .read()
            .get(&badge_id)
            .cloned()
            .unwrap_or_default())
    }

    /// Remove one evidence item. Issuer or privileged actors only.
    pub fn remove(
        &self,
        badge_id: BadgeId,
        evidence_id: EvidenceId,
        actor: &Actor,
    ) -> Result<(), BadgeError> {
        self.authorize_modify(badge_id, actor)?;
        let mut records = self.records.write();
        let items = records.get_mut(&badge_id).ok_or_else(|| {
            BadgeError::NotFound("Evidence not found".to_string())
        })?;
        let before = items.len();
        items.retain(|r| r.id != evidence_id);
        if items.len() == before {
            return Err(BadgeError::NotFound("Evidence not found".to_string()));
        }
        Ok(())
    }

    /// Attach the same URL evidence set to many badges.
    ///
    /// Each badge is processed independently; one badge hitting its quota
    /// or failing authorization does not abort the rest.
    pub fn attach_shared(
        &self,
        badge_ids: &[BadgeId],
        actor: &Actor,
        items: &[NewUrlEvidence],
    ) -> Vec<FanoutResult> {
        badge_ids
            .iter()
            .map(|&badge_id| {
                let outcome = self.attach_all(badge_id, actor, items);
                FanoutResult { badge_id, outcome }
            })
            .collect()
    }

    fn attach_all(
        &self,
        badge_id: BadgeId,
        actor: &Actor,
        items: &[NewUrlEvidence],
    ) -> Result<usize, BadgeError> {
        self.authorize_modify(badge_id, actor)?;
        for item in items {
            validate_url(&item.url)?;
        }

        // Quota is checked against the whole batch under one write lock, so
        // a fan-out either fully lands on a badge or not at all.
        let mut records = self.records.write();
        let existing = records.entry(badge_id).or_default();
        if existing.len() + items.len() > MAX_EVIDENCE_ITEMS {
            return Err(BadgeError::QuotaExceeded(format!(
                "Maximum of {MAX_EVIDENCE_ITEMS} evidence items per badge"
            )));
        }
        let now = Timestamp::now();
        for item in items {
            existing.push(EvidenceRecord {
                id: EvidenceId::new(),
                badge_id,
                kind: EvidenceKind::Url,
                file_name: None,
                mime_type: None,
                size_bytes: None,
                url: Some(item.url.clone()),
                description: item.description.clone(),
                added_by: actor.user_id,
                added_at: now,
            });
        }
        Ok(items.len())
    }

    fn authorize_modify(&self, badge_id: BadgeId, actor: &Actor) -> Result<(), BadgeError> {
        let badge = self
            .repo
            .get(badge_id)
            .ok_or_else(BadgeError::badge_not_found)?;
        if !actor.privileged && badge.issuer_id != actor.user_id {
            return Err(BadgeError::Forbidden(
                "Only the badge issuer can modify evidence".to_string(),
            ));
        }
        Ok(())
    }

    fn append_under_quota(
        &self,
        badge_id: BadgeId,
        record: EvidenceRecord,
    ) -> Result<EvidenceRecord, BadgeError> {
        let mut records = self.records.write();
        let items = records.entry(badge_id).or_default();
        if items.len() >= MAX_EVIDENCE_ITEMS {
            return Err(BadgeError::QuotaExceeded(format!(
                "Maximum of {MAX_EVIDENCE_ITEMS} evidence items per badge"
            )));
        }
        items.push(record.clone());
        Ok(record)
    }
}

/// Validate file evidence: size cap, MIME allow-list, and content sniffing.
fn validate_file(file: &NewFileEvidence<'_>) -> Result<(), BadgeError> {
    if file.bytes.is_empty() {
        return Err(BadgeError::Validation("File is empty".to_string()));
    }
    if file.bytes.len() as u64 > MAX_FILE_BYTES {
        return Err(BadgeError::Validation(
            "File size exceeds 10MB limit".to_string(),
        ));
    }
    if !ALLOWED_MIME_TYPES.contains(&file.mime_type) {
        return Err(BadgeError::Validation(format!(
            "File type {} is not allowed. Allowed types: PDF, PNG, JPEG, DOC, DOCX",
            file.mime_type
        )));
    }
    if !magic_bytes_match(file.mime_type, file.bytes) {
        return Err(BadgeError::Validation(format!(
            "File content does not match declared type {}",
            file.mime_type
        )));
    }
    Ok(())
}

/// Check the leading bytes against the declared MIME type.
fn magic_bytes_match(mime_type: &str, bytes: &[u8]) -> bool {
    match mime_type {
        "application/pdf" => bytes.starts_with(b"%PDF"),
        "image/png" => bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]),
        "image/jpeg" => bytes.starts_with(&[0xff, 0xd8, 0xff]),
        // Legacy .doc is an OLE compound file; .docx is a ZIP container.
        "application/msword" => bytes.starts_with(&[0xd0, 0xcf, 0x11, 0xe0]),
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => {
            bytes.starts_with(b"PK\x03\x04")
        }
        _ => false,
    }
}

/// Validate URL evidence: must parse as an absolute http(s) URL.
fn validate_url(raw: &str) -> Result<(), BadgeError> {
    let parsed = Url::parse(raw).map_err(|_| {
        BadgeError::Validation("Invalid URL format. Only HTTP and HTTPS URLs are allowed".to_string())
    })?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(BadgeError::Validation(
            "Invalid URL format. Only HTTP and HTTPS URLs are allowed".to_string(),
        ));
    }
    Ok(())
}
