//! # Recipient Hashing — Salted Identity Protection
//!
//! The assertion identifies its recipient as `sha256$<hex>` where the hash
//! covers the normalized email plus a per-badge salt. Verifiers holding the
//! recipient's email can recompute the hash from the salt in the assertion;
//! nobody else can reverse it without a per-badge dictionary attack.

use sha2::{Digest, Sha256};

use crate::generator::AssertionError;

/// Length of the per-badge salt in random bytes (hex-encoded to 32 chars).
pub const SALT_BYTES: usize = 16;

/// Generate a fresh random salt for one badge.
///
/// Returns 16 bytes from the OS RNG as lowercase hex. Each badge gets its
/// own salt; salts are stored in the assertion and are not secrets.
pub fn generate_salt() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; SALT_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Hash a recipient email with a salt, producing the assertion identity.
///
/// The email is trimmed and lowercased before hashing so the same inbox
/// always produces the same identity for a given salt. Output format is
/// `sha256$<64 hex chars>` per the Open Badges hashed-identity convention.
///
/// # Errors
///
/// Returns [`AssertionError::EmptyEmail`] when the email is empty after
/// trimming.
pub fn hash_recipient(email: &str, salt: &str) -> Result<String, AssertionError> {
    let normalized = email.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(AssertionError::EmptyEmail);
    }
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hasher.update(salt.as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().map(|b| format!("{b:02x}")).collect();
    Ok(format!("sha256${hex}"))
}

/// Mask an email for human-facing verification output.
///
/// `jane.doe@example.com` becomes `j***@example.com`. Inputs without an
/// `@` are fully masked rather than echoed back.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() => {
            let first = local.chars().next().map(String::from).unwrap_or_default();
            format!("{first}***@{domain}")
        }
        Some((_, domain)) => format!("***@{domain}"),
        None => "***".to_string(),
    }
}
