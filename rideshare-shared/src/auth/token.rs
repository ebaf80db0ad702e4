//! Opaque API token generation and hashing
//!
//! Tokens are 40 random alphanumeric characters (base62). Clients send them as
//! `Authorization: Token <key>`; the server only keeps the SHA-256 hex digest.
//!
//! # Example
//!
//! ```
//! use rideshare_shared::auth::token::{generate_token, hash_token, TOKEN_LENGTH};
//!
//! let (key, hash) = generate_token();
//! assert_eq!(key.len(), TOKEN_LENGTH);
//! assert_eq!(hash_token(&key), hash);
//! ```

use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of a token key in characters
pub const TOKEN_LENGTH: usize = 40;

/// Authorization header scheme keyword
pub const TOKEN_KEYWORD: &str = "Token";

/// Generates a new token
///
/// Returns `(plaintext_key, sha256_hex)`.
pub fn generate_token() -> (String, String) {
    let key = generate_random_string(TOKEN_LENGTH);
    let hash = hash_token(&key);

    (key, hash)
}

fn generate_random_string(length: usize) -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
    let mut rng = rand::thread_rng();

    (0..length)
        .map(|_| {
            let idx = rng.gen_range(0..CHARSET.len());
            CHARSET[idx] as char
        })
        .collect()
}

/// Hashes a token key with SHA-256, hex-encoded (64 characters)
pub fn hash_token(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// Extracts the key from an `Authorization` header value
///
/// The keyword is matched case-insensitively. Returns `None` for any other
/// scheme, a missing key, or a key containing whitespace.
///
/// ```
/// use rideshare_shared::auth::token::parse_authorization;
///
/// assert_eq!(parse_authorization("Token abc123"), Some("abc123"));
/// assert_eq!(parse_authorization("token abc123"), Some("abc123"));
/// assert_eq!(parse_authorization("Bearer abc123"), None);
/// ```
pub fn parse_authorization(header: &str) -> Option<&str> {
    let mut parts = header.split_whitespace();
    let scheme = parts.next()?;
    let key = parts.next()?;

    if !scheme.eq_ignore_ascii_case(TOKEN_KEYWORD) || parts.next().is_some() {
        return None;
    }

    Some(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_token_format() {
        let (key, hash) = generate_token();

        assert_eq!(key.len(), TOKEN_LENGTH);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn test_generate_token_uniqueness() {
        let (key1, _) = generate_token();
        let (key2, _) = generate_token();
        assert_ne!(key1, key2);
    }

    #[test]
    fn test_hash_token_deterministic() {
        assert_eq!(hash_token("abc"), hash_token("abc"));
        assert_ne!(hash_token("abc"), hash_token("abd"));
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_parse_authorization() {
        assert_eq!(parse_authorization("Token abc"), Some("abc"));
        assert_eq!(parse_authorization("TOKEN abc"), Some("abc"));
        assert_eq!(parse_authorization("  Token   abc  "), Some("abc"));
        assert_eq!(parse_authorization("Token"), None);
        assert_eq!(parse_authorization("Token abc def"), None);
        assert_eq!(parse_authorization("Bearer abc"), None);
        assert_eq!(parse_authorization(""), None);
    }
}
