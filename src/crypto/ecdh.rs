// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! ECDH Key Exchange
//!
//! Processors publish an encryption key on either secp256r1 (p256) or
//! secp256k1. The CLI keeps one static key pair per curve and derives a
//! per-processor AES key from the ECDH shared secret.
//!
//! ## Key Derivation
//!
//! ```text
//! shared = x-coordinate of (local_secret * processor_public)
//! info   = "ECDH <curve> AES-256-GCM-SIV" || sort(local_pub, processor_pub)
//! key    = HKDF-SHA256(ikm = shared, salt = 16 zero bytes, info) -> 32 bytes
//! ```
//!
//! Public keys are sorted by length first, then bytewise. Both sides use the
//! compressed SEC1 encoding of their own key.

use hkdf::Hkdf;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use sha2::Sha256;

use super::error::CryptoError;

pub const HKDF_SALT: [u8; 16] = [0u8; 16];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncKeyCurve {
    P256,
    Secp256k1,
}

impl EncKeyCurve {
    /// Name used in key store ids, `p256` or `secp256k1`
    pub fn as_str(&self) -> &'static str {
        match self {
            EncKeyCurve::P256 => "p256",
            EncKeyCurve::Secp256k1 => "secp256k1",
        }
    }

    /// Name used in the HKDF info string
    pub fn standard_name(&self) -> &'static str {
        match self {
            EncKeyCurve::P256 => "secp256r1",
            EncKeyCurve::Secp256k1 => "secp256k1",
        }
    }
}

/// Generate a new key pair, returning `(secret, compressed_public)`
pub fn generate_key_pair(curve: EncKeyCurve) -> (Vec<u8>, Vec<u8>) {
    match curve {
        EncKeyCurve::P256 => {
            let secret = p256::SecretKey::random(&mut OsRng);
            let public = secret.public_key().to_encoded_point(true);
            (secret.to_bytes().to_vec(), public.as_bytes().to_vec())
        }
        EncKeyCurve::Secp256k1 => {
            let secret = k256::SecretKey::random(&mut OsRng);
            let public = secret.public_key().to_encoded_point(true);
            (secret.to_bytes().to_vec(), public.as_bytes().to_vec())
        }
    }
}

fn invalid_secret(reason: impl ToString) -> CryptoError {
    CryptoError::InvalidKey {
        key_type: "local_private_key".to_string(),
        reason: reason.to_string(),
    }
}

fn invalid_peer(reason: impl ToString) -> CryptoError {
    CryptoError::InvalidKey {
        key_type: "processor_public_key".to_string(),
        reason: reason.to_string(),
    }
}

/// Compressed public key for a 32-byte secret
pub fn public_key_from_secret(curve: EncKeyCurve, secret: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if secret.len() != 32 {
        return Err(invalid_secret(format!(
            "expected 32 bytes, got {}",
            secret.len()
        )));
    }
    match curve {
        EncKeyCurve::P256 => {
            let secret = p256::SecretKey::from_slice(secret).map_err(invalid_secret)?;
            Ok(secret.public_key().to_encoded_point(true).as_bytes().to_vec())
        }
        EncKeyCurve::Secp256k1 => {
            let secret = k256::SecretKey::from_slice(secret).map_err(invalid_secret)?;
            Ok(secret.public_key().to_encoded_point(true).as_bytes().to_vec())
        }
    }
}

/// Raw ECDH shared secret (the 32-byte x-coordinate)
pub fn shared_secret(
    curve: EncKeyCurve,
    secret: &[u8],
    peer_public: &[u8],
) -> Result<[u8; 32], CryptoError> {
    if peer_public.len() != 33 && peer_public.len() != 65 {
        return Err(invalid_peer(format!(
            "expected 33 or 65 bytes, got {}",
            peer_public.len()
        )));
    }

    let mut out = [0u8; 32];
    match curve {
        EncKeyCurve::P256 => {
            let secret = p256::SecretKey::from_slice(secret).map_err(invalid_secret)?;
            let peer = p256::PublicKey::from_sec1_bytes(peer_public).map_err(invalid_peer)?;
            let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
            out.copy_from_slice(shared.raw_secret_bytes());
        }
        EncKeyCurve::Secp256k1 => {
            let secret = k256::SecretKey::from_slice(secret).map_err(invalid_secret)?;
            let peer = k256::PublicKey::from_sec1_bytes(peer_public).map_err(invalid_peer)?;
            let shared = k256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), peer.as_affine());
            out.copy_from_slice(shared.raw_secret_bytes());
        }
    }
    Ok(out)
}

/// HKDF info: label followed by both public keys in canonical order
pub fn hkdf_info(curve: EncKeyCurve, own_public: &[u8], peer_public: &[u8]) -> Vec<u8> {
    let mut keys = [own_public, peer_public];
    keys.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));

    let mut info = format!("ECDH {} AES-256-GCM-SIV", curve.standard_name()).into_bytes();
    for key in keys {
        info.extend_from_slice(key);
    }
    info
}

/// Derive the 32-byte AES key shared with the holder of `peer_public`
pub fn derive_shared_key(
    curve: EncKeyCurve,
    secret: &[u8],
    own_public: &[u8],
    peer_public: &[u8],
) -> Result<[u8; 32], CryptoError> {
    let shared = shared_secret(curve, secret, peer_public)?;
    let info = hkdf_info(curve, own_public, peer_public);

    let hkdf = Hkdf::<Sha256>::new(Some(&HKDF_SALT), &shared);
    let mut key = [0u8; 32];
    hkdf.expand(&info, &mut key)
        .map_err(|e| CryptoError::KeyDerivationFailed {
            operation: "hkdf_expand".to_string(),
            reason: e.to_string(),
        })?;
    Ok(key)
}
