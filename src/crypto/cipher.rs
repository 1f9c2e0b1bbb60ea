//! AES-256-GCM encryption of individual string fields
//!
//! Ciphertexts are stored as `v1.<base64url(nonce)>.<base64url(ciphertext+tag)>`
//! strings. A fresh 96-bit nonce comes from the OS CSPRNG on every call, so
//! encrypting the same plaintext twice yields different envelopes.
//!
//! Decryption failure is a single opaque error: a wrong key, a tampered
//! envelope, and non-UTF-8 plaintext are indistinguishable to callers, so
//! the API cannot be used as a key-checking oracle.

use crate::error::{PeerpulseError, Result};
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Byte length of an AES-256 key
pub const KEY_LEN: usize = 32;

/// Byte length of an AES-GCM nonce
pub const NONCE_LEN: usize = 12;

/// Prefix that appears at the start of every encrypted field value
const VERSION_PREFIX: &str = "v1";

/// Symmetric key for field encryption
///
/// Always derived, never supplied raw: `FieldKey::derive` hashes arbitrary
/// key material (a manager token, the service master secret) down to the
/// fixed AES-256 key length.
#[derive(Clone)]
pub struct FieldKey([u8; KEY_LEN]);

impl FieldKey {
    /// Derive a key as SHA-256 of the given material
    ///
    /// Used both for the self-referential manager-token scheme (the token
    /// is hashed into the key that wraps the token) and for turning the
    /// free-form `ENCRYPTION_KEY` secret into exact key bytes.
    pub fn derive(material: &str) -> Self {
        let digest = Sha256::digest(material.as_bytes());
        let mut key = [0u8; KEY_LEN];
        key.copy_from_slice(&digest);
        Self(key)
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key bytes must never appear in logs or debug output.
        f.write_str("FieldKey(<redacted>)")
    }
}

/// Encrypt a plaintext string field under the given key
///
/// Rejects empty plaintext: every encrypted column is required, and an
/// empty envelope would be indistinguishable from a missing one.
pub fn encrypt_field(plaintext: &str, key: &FieldKey) -> Result<String> {
    if plaintext.is_empty() {
        return Err(PeerpulseError::Encryption(
            "plaintext must not be empty".to_string(),
        ));
    }

    let cipher = Aes256Gcm::new_from_slice(&key.0)
        .map_err(|e| PeerpulseError::Encryption(e.to_string()))?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| PeerpulseError::Encryption(e.to_string()))?;

    Ok(format!(
        "{}.{}.{}",
        VERSION_PREFIX,
        URL_SAFE_NO_PAD.encode(nonce_bytes),
        URL_SAFE_NO_PAD.encode(&ciphertext),
    ))
}

/// Decrypt an envelope produced by [`encrypt_field`]
///
/// Any failure (malformed envelope, wrong key, tampered ciphertext,
/// non-UTF-8 plaintext) collapses to the same generic error.
pub fn decrypt_field(envelope: &str, key: &FieldKey) -> Result<String> {
    let parts: Vec<&str> = envelope.splitn(3, '.').collect();
    if parts.len() != 3 || parts[0] != VERSION_PREFIX {
        return Err(PeerpulseError::DecryptionFailed);
    }

    let nonce_bytes = URL_SAFE_NO_PAD
        .decode(parts[1])
        .map_err(|_| PeerpulseError::DecryptionFailed)?;
    if nonce_bytes.len() != NONCE_LEN {
        return Err(PeerpulseError::DecryptionFailed);
    }

    let ciphertext = URL_SAFE_NO_PAD
        .decode(parts[2])
        .map_err(|_| PeerpulseError::DecryptionFailed)?;

    let cipher =
        Aes256Gcm::new_from_slice(&key.0).map_err(|_| PeerpulseError::DecryptionFailed)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
        .map_err(|_| PeerpulseError::DecryptionFailed)?;

    String::from_utf8(plaintext).map_err(|_| PeerpulseError::DecryptionFailed)
}
