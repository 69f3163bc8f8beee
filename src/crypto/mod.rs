// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Environment Variable Encryption
//!
//! Environment variables never reach the chain in clear text. For every
//! assigned processor the CLI:
//!
//! 1. Picks the processor's published encryption key (p256 or secp256k1)
//! 2. Performs ECDH with its own static key pair for that curve
//! 3. Derives an AES-256 key with HKDF-SHA256
//! 4. Encrypts each value with AES-256-GCM under a fresh IV
//!
//! The local key pairs live in `.acurast/keys.json` so later updates of the
//! same deployment use the same keys.

pub mod aes_gcm;
pub mod ecdh;
pub mod environment;
pub mod error;

pub use aes_gcm::{decrypt_aes_gcm, encrypt_aes_gcm};
pub use ecdh::{derive_shared_key, EncKeyCurve};
pub use environment::{processor_encryption_key, EnvironmentCipher, ProcessorEncryptionKey};
pub use error::CryptoError;
