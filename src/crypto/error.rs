// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Crypto error types for environment variable encryption.
//!
//! Every variant carries the operation or key that failed so messages can be
//! shown to the user unchanged.

use std::fmt;

use crate::storage::StorageError;

#[derive(Debug, Clone)]
pub enum CryptoError {
    /// AES-GCM decryption failed (wrong key, tampered ciphertext or tag)
    DecryptionFailed {
        operation: String,
        reason: String,
    },

    /// AES-GCM encryption failed
    EncryptionFailed {
        operation: String,
        reason: String,
    },

    /// Key has the wrong length or is not a valid curve point
    InvalidKey {
        /// e.g. "processor_public_key", "local_private_key"
        key_type: String,
        reason: String,
    },

    /// ECDH or HKDF failed
    KeyDerivationFailed {
        operation: String,
        reason: String,
    },

    /// Encoded value could not be split into iv, ciphertext and tag
    InvalidPayload {
        field: String,
        reason: String,
    },

    /// Reading or writing the local key store failed
    KeyStore(String),

    Other(String),
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::DecryptionFailed { operation, reason } => {
                write!(f, "Decryption failed during {}: {}", operation, reason)
            }
            CryptoError::EncryptionFailed { operation, reason } => {
                write!(f, "Encryption failed during {}: {}", operation, reason)
            }
            CryptoError::InvalidKey { key_type, reason } => {
                write!(f, "Invalid key ({}): {}", key_type, reason)
            }
            CryptoError::KeyDerivationFailed { operation, reason } => {
                write!(f, "Key derivation failed during {}: {}", operation, reason)
            }
            CryptoError::InvalidPayload { field, reason } => {
                write!(f, "Invalid payload field '{}': {}", field, reason)
            }
            CryptoError::KeyStore(msg) => write!(f, "Key store error: {}", msg),
            CryptoError::Other(msg) => write!(f, "Crypto error: {}", msg),
        }
    }
}

impl std::error::Error for CryptoError {}

impl From<hex::FromHexError> for CryptoError {
    fn from(err: hex::FromHexError) -> Self {
        CryptoError::InvalidPayload {
            field: "hex_field".to_string(),
            reason: format!("hex decode error: {}", err),
        }
    }
}

impl From<StorageError> for CryptoError {
    fn from(err: StorageError) -> Self {
        CryptoError::KeyStore(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_messages() {
        let err = CryptoError::DecryptionFailed {
            operation: "env_var".to_string(),
            reason: "tag mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "Decryption failed during env_var: tag mismatch");

        let err = CryptoError::InvalidKey {
            key_type: "processor_public_key".to_string(),
            reason: "not on curve".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid key (processor_public_key): not on curve"
        );
    }

    #[test]
    fn test_from_hex_error_conversion() {
        let err: CryptoError = hex::decode("zz").unwrap_err().into();
        assert!(matches!(err, CryptoError::InvalidPayload { .. }));
    }
}
