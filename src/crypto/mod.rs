//! Cryptography for fields at rest
//!
//! Two complementary primitives:
//! - [`hash`]: deterministic, unsalted SHA-256 hashing for fields that are
//!   looked up by equality (emails, access codes) without storing plaintext.
//! - [`cipher`]: reversible AES-256-GCM encryption for fields that must be
//!   read back (names, emails, titles, comments, manager tokens).
//!
//! Key material comes from two places, kept distinct:
//! evaluation title and manager token are encrypted under a key derived
//! from the manager token itself, so the server cannot read them at rest
//! without being handed the token; member PII and response comments are
//! encrypted under the service master key, because member-facing flows
//! must decrypt them without any manager involvement.

pub mod cipher;
pub mod hash;

pub use cipher::{decrypt_field, encrypt_field, FieldKey};
pub use hash::{hash_access_code, hash_email, sha256_hex};
