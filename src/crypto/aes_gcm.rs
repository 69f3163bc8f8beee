// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! AES-256-GCM for environment variable values
//!
//! **Encoded value** as stored on chain:
//! ```text
//! [iv (12 bytes) | ciphertext | tag (16 bytes)]
//! ```
//!
//! - IV: 12 random bytes, fresh for every value
//! - No Additional Authenticated Data

use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::RngCore;

use super::error::CryptoError;

pub const IV_SIZE: usize = 12;
pub const TAG_SIZE: usize = 16;

/// Encrypt a UTF-8 value with a fresh random IV
///
/// # Returns
///
/// `iv || ciphertext || tag`
pub fn encrypt_aes_gcm(plaintext: &str, key: &[u8; 32]) -> Result<Vec<u8>, CryptoError> {
    let mut iv = [0u8; IV_SIZE];
    rand::thread_rng().fill_bytes(&mut iv);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::EncryptionFailed {
        operation: "env_var".to_string(),
        reason: e.to_string(),
    })?;

    // aes-gcm appends the tag to the ciphertext
    let sealed = cipher
        .encrypt(
            Nonce::from_slice(&iv),
            Payload {
                msg: plaintext.as_bytes(),
                aad: b"",
            },
        )
        .map_err(|e| CryptoError::EncryptionFailed {
            operation: "env_var".to_string(),
            reason: e.to_string(),
        })?;

    let mut encoded = Vec::with_capacity(IV_SIZE + sealed.len());
    encoded.extend_from_slice(&iv);
    encoded.extend_from_slice(&sealed);
    Ok(encoded)
}

/// Decrypt an `iv || ciphertext || tag` value
///
/// # Errors
///
/// Returns error if:
/// - The value is shorter than IV plus tag
/// - The tag does not verify (wrong key or tampered data)
/// - The plaintext is not valid UTF-8
pub fn decrypt_aes_gcm(encoded: &[u8], key: &[u8; 32]) -> Result<String, CryptoError> {
    if encoded.len() < IV_SIZE + TAG_SIZE {
        return Err(CryptoError::InvalidPayload {
            field: "encrypted_value".to_string(),
            reason: format!(
                "expected at least {} bytes, got {}",
                IV_SIZE + TAG_SIZE,
                encoded.len()
            ),
        });
    }

    let nonce = Nonce::from_slice(&encoded[..IV_SIZE]);
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|e| CryptoError::DecryptionFailed {
        operation: "env_var".to_string(),
        reason: e.to_string(),
    })?;

    let plaintext = cipher
        .decrypt(
            nonce,
            Payload {
                msg: &encoded[IV_SIZE..],
                aad: b"",
            },
        )
        .map_err(|e| CryptoError::DecryptionFailed {
            operation: "env_var".to_string(),
            reason: format!("authentication error - wrong key or corrupted data: {}", e),
        })?;

    String::from_utf8(plaintext).map_err(|e| CryptoError::DecryptionFailed {
        operation: "env_var".to_string(),
        reason: format!("decrypted data is not valid UTF-8: {}", e),
    })
}
