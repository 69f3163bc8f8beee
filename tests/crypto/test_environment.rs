// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Environment encryption checked from the processor's side of the exchange

use acurast_cli::blockchain::{JobId, PubKey};
use acurast_cli::config::EnvVar;
use acurast_cli::crypto::ecdh::generate_key_pair;
use acurast_cli::crypto::{
    decrypt_aes_gcm, derive_shared_key, processor_encryption_key, EncKeyCurve, EnvironmentCipher,
};
use acurast_cli::storage::KeyStore;
use tempfile::TempDir;

use crate::common::{assignment, OWNER};

fn env_vars() -> Vec<EnvVar> {
    vec![
        EnvVar {
            key: "API_KEY".to_string(),
            value: "s3cr3t".to_string(),
        },
        EnvVar {
            key: "GREETING".to_string(),
            value: "hello world".to_string(),
        },
    ]
}

fn hex_key(public: &[u8]) -> String {
    format!("0x{}", hex::encode(public))
}

#[test]
fn test_processor_decrypts_environment() {
    for curve in [EncKeyCurve::P256, EncKeyCurve::Secp256k1] {
        let dir = TempDir::new().unwrap();
        let cipher = EnvironmentCipher::new(KeyStore::new(dir.path().join("keys.json")));

        let (processor_secret, processor_public) = generate_key_pair(curve);
        let pub_key = match curve {
            EncKeyCurve::P256 => PubKey::SECP256r1Encryption(hex_key(&processor_public)),
            EncKeyCurve::Secp256k1 => PubKey::SECP256k1Encryption(hex_key(&processor_public)),
        };
        let info = assignment(&JobId::acurast(OWNER, 1), "5Processor", vec![pub_key]);

        let environment = cipher
            .encrypt_environment(&info, &env_vars())
            .unwrap()
            .expect("processor has a key");
        assert_eq!(environment.processor, "5Processor");
        assert_eq!(environment.variables.len(), 2);

        let key = derive_shared_key(
            curve,
            &processor_secret,
            &processor_public,
            &environment.public_key,
        )
        .unwrap();
        for ((name, encrypted), expected) in environment.variables.iter().zip(env_vars()) {
            assert_eq!(name.as_slice(), expected.key.as_bytes());
            assert_ne!(encrypted.as_slice(), expected.value.as_bytes());
            assert_eq!(decrypt_aes_gcm(encrypted, &key).unwrap(), expected.value);
        }
    }
}

#[test]
fn test_local_keys_are_reused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("keys.json");

    let first = EnvironmentCipher::new(KeyStore::new(path.clone()));
    let (_, public) = first.key_pair(EncKeyCurve::P256).unwrap();
    assert_eq!(
        first.public_key(EncKeyCurve::P256).unwrap(),
        Some(hex::encode(&public))
    );

    let second = EnvironmentCipher::new(KeyStore::new(path));
    let (_, reloaded) = second.key_pair(EncKeyCurve::P256).unwrap();
    assert_eq!(reloaded, public);
    assert!(second.public_key(EncKeyCurve::Secp256k1).unwrap().is_none());
}

#[test]
fn test_encryption_key_preference() {
    let id = JobId::acurast(OWNER, 1);
    let (_, signing) = generate_key_pair(EncKeyCurve::P256);
    let (_, k1) = generate_key_pair(EncKeyCurve::Secp256k1);
    let (_, r1) = generate_key_pair(EncKeyCurve::P256);

    let legacy = assignment(&id, "5P", vec![PubKey::SECP256r1(hex_key(&signing))]);
    let key = processor_encryption_key(&legacy).unwrap();
    assert_eq!(key.curve, EncKeyCurve::P256);
    assert_eq!(key.public_key, hex::encode(&signing));

    let both = assignment(
        &id,
        "5P",
        vec![
            PubKey::SECP256r1(hex_key(&signing)),
            PubKey::SECP256k1Encryption(hex_key(&k1)),
            PubKey::SECP256r1Encryption(hex_key(&r1)),
        ],
    );
    let key = processor_encryption_key(&both).unwrap();
    assert_eq!(key.curve, EncKeyCurve::P256);
    assert_eq!(key.public_key, hex::encode(&r1));

    let none = assignment(&id, "5P", vec![PubKey::ED25519("0x00".to_string())]);
    assert!(processor_encryption_key(&none).is_none());

    let dir = TempDir::new().unwrap();
    let cipher = EnvironmentCipher::new(KeyStore::new(dir.path().join("keys.json")));
    assert!(cipher.encrypt_environment(&none, &env_vars()).unwrap().is_none());
}
