// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Per-processor encryption of deployment environment variables.

use tracing::debug;

use super::aes_gcm::{decrypt_aes_gcm, encrypt_aes_gcm};
use super::ecdh::{derive_shared_key, generate_key_pair, public_key_from_secret, EncKeyCurve};
use super::error::CryptoError;
use crate::blockchain::types::{JobAssignmentInfo, ProcessorEnvironment, PubKey};
use crate::config::EnvVar;
use crate::storage::KeyStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorEncryptionKey {
    /// Hex without `0x`
    pub public_key: String,
    pub curve: EncKeyCurve,
}

/// Pick the key a processor wants environment variables encrypted for.
///
/// Dedicated encryption keys win over the legacy p256 signing key.
pub fn processor_encryption_key(info: &JobAssignmentInfo) -> Option<ProcessorEncryptionKey> {
    let keys = &info.assignment.pub_keys;
    let found = keys
        .iter()
        .find_map(|key| match key {
            PubKey::SECP256r1Encryption(k) => Some((k, EncKeyCurve::P256)),
            _ => None,
        })
        .or_else(|| {
            keys.iter().find_map(|key| match key {
                PubKey::SECP256k1Encryption(k) => Some((k, EncKeyCurve::Secp256k1)),
                _ => None,
            })
        })
        .or_else(|| {
            keys.iter().find_map(|key| match key {
                PubKey::SECP256r1(k) => Some((k, EncKeyCurve::P256)),
                _ => None,
            })
        })?;

    Some(ProcessorEncryptionKey {
        public_key: found.0.trim_start_matches("0x").to_string(),
        curve: found.1,
    })
}

/// Local key pairs backed by the key store, one per curve
pub struct EnvironmentCipher {
    store: KeyStore,
}

impl EnvironmentCipher {
    pub fn new(store: KeyStore) -> Self {
        Self { store }
    }

    /// p256 keys written before curve suffixes existed keep their old ids
    fn key_id(&self, kind: &str, curve: EncKeyCurve) -> Result<String, CryptoError> {
        if curve == EncKeyCurve::P256 && self.store.get(kind)?.is_some() {
            return Ok(kind.to_string());
        }
        Ok(format!("{}_{}", kind, curve.as_str()))
    }

    /// Load the key pair for `curve`, generating and persisting one if missing
    pub fn key_pair(&self, curve: EncKeyCurve) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let private_id = self.key_id("privateKey", curve)?;
        if let Some(private_hex) = self.store.get(&private_id)? {
            let secret = decode_secret(&private_hex)?;
            let public = public_key_from_secret(curve, &secret)?;
            return Ok((secret, public));
        }

        let (secret, public) = generate_key_pair(curve);
        let public_id = self.key_id("publicKey", curve)?;
        self.store.set(&private_id, &hex::encode(&secret))?;
        self.store.set(&public_id, &hex::encode(&public))?;
        debug!("Generated {} encryption key pair", curve.as_str());
        Ok((secret, public))
    }

    /// Stored compressed public key for `curve`, hex encoded
    pub fn public_key(&self, curve: EncKeyCurve) -> Result<Option<String>, CryptoError> {
        let id = self.key_id("publicKey", curve)?;
        Ok(self.store.get(&id)?)
    }

    pub fn shared_key(
        &self,
        processor_key: &ProcessorEncryptionKey,
    ) -> Result<([u8; 32], Vec<u8>), CryptoError> {
        let peer = hex::decode(&processor_key.public_key)?;
        let (secret, public) = self.key_pair(processor_key.curve)?;
        let key = derive_shared_key(processor_key.curve, &secret, &public, &peer)?;
        Ok((key, public))
    }

    /// Encrypt `env_vars` for the processor of `info`.
    ///
    /// Returns `None` while the processor has not published a usable key.
    pub fn encrypt_environment(
        &self,
        info: &JobAssignmentInfo,
        env_vars: &[EnvVar],
    ) -> Result<Option<ProcessorEnvironment>, CryptoError> {
        let Some(processor_key) = processor_encryption_key(info) else {
            return Ok(None);
        };
        let (key, public) = self.shared_key(&processor_key)?;

        let mut variables = Vec::with_capacity(env_vars.len());
        for var in env_vars {
            let value = encrypt_aes_gcm(&var.value, &key)?;
            variables.push((var.key.as_bytes().to_vec(), value));
        }

        Ok(Some(ProcessorEnvironment {
            processor: info.processor.clone(),
            public_key: public,
            variables,
        }))
    }

    pub fn decrypt_value(
        &self,
        processor_key: &ProcessorEncryptionKey,
        encoded: &[u8],
    ) -> Result<String, CryptoError> {
        let (key, _) = self.shared_key(processor_key)?;
        decrypt_aes_gcm(encoded, &key)
    }
}

/// Secrets are stored as hex; shorter values are left padded to 32 bytes
fn decode_secret(private_hex: &str) -> Result<Vec<u8>, CryptoError> {
    let trimmed = private_hex.trim_start_matches("0x");
    let padded = format!("{:0>64}", trimmed);
    let secret = hex::decode(padded)?;
    if secret.len() != 32 {
        return Err(CryptoError::InvalidKey {
            key_type: "local_private_key".to_string(),
            reason: format!("expected 32 bytes, got {}", secret.len()),
        });
    }
    Ok(secret)
}
