//! Deterministic SHA-256 hashing for equality-lookup fields
//!
//! No salt: the same input must always produce the same digest so that
//! emails and access codes can be found by hash without ever storing
//! their plaintext.

use sha2::{Digest, Sha256};

/// SHA-256 of the input, as a lowercase hex string
pub fn sha256_hex(text: &str) -> String {
    format!("{:x}", Sha256::digest(text.as_bytes()))
}

/// Hash an email for case-insensitive matching
///
/// Lowercases and trims before hashing so "A@B.com" and "a@b.com" collide
/// on purpose.
pub fn hash_email(email: &str) -> String {
    sha256_hex(&email.trim().to_lowercase())
}

/// Hash a raw 6-digit access code
pub fn hash_access_code(code: &str) -> String {
    sha256_hex(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_deterministic() {
        assert_eq!(sha256_hex("hello"), sha256_hex("hello"));
        assert_ne!(sha256_hex("hello"), sha256_hex("hello "));
    }

    #[test]
    fn test_known_digest() {
        // SHA-256 of the empty string, a fixed vector.
        assert_eq!(
            sha256_hex(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_email_hash_case_insensitive() {
        assert_eq!(hash_email("A@B.com"), hash_email("a@b.com"));
        assert_eq!(hash_email("  a@b.com  "), hash_email("a@b.com"));
        assert_ne!(hash_email("a@b.com"), hash_email("c@b.com"));
    }

    #[test]
    fn test_access_code_hash_is_exact() {
        assert_eq!(hash_access_code("123456"), sha256_hex("123456"));
        assert_ne!(hash_access_code("123456"), hash_access_code("123457"));
    }
}
