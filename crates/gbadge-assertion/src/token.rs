//! # Claim Tokens
//!
//! The claim link emailed to a recipient carries an unguessable token. The
//! token is the only thing standing between a public endpoint and a claim,
//! so it must carry real entropy.

/// Length of the claim token in random bytes (hex-encoded to 32 chars).
pub const CLAIM_TOKEN_BYTES: usize = 16;

/// Generate a claim token: 16 bytes (128 bits) from the OS RNG as
/// lowercase hex.
pub fn generate_claim_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; CLAIM_TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn token_is_32_hex_chars() {
        let token = generate_claim_token();
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn tokens_do_not_collide_in_practice() {
        let tokens: HashSet<String> = (0..1000).map(|_| generate_claim_token()).collect();
        assert_eq!(tokens.len(), 1000);
    }
}
