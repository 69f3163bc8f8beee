// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use acurast_cli::blockchain::{JobId, MockMarketplace, PubKey};
use acurast_cli::config::EnvVar;
use acurast_cli::crypto::ecdh::generate_key_pair;
use acurast_cli::crypto::{EncKeyCurve, EnvironmentCipher};
use acurast_cli::deployment::{DeployError, EnvVarSetter};
use acurast_cli::storage::KeyStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use crate::common::{assignment, OWNER};

fn setter(dir: &TempDir, market: &Arc<MockMarketplace>, attempts: u32) -> EnvVarSetter {
    let cipher = EnvironmentCipher::new(KeyStore::new(dir.path().join("keys.json")));
    EnvVarSetter::new(market.clone(), cipher).with_retry(Duration::from_millis(10), attempts)
}

fn encryption_key() -> PubKey {
    let (_, public) = generate_key_pair(EncKeyCurve::Secp256k1);
    PubKey::SECP256k1Encryption(format!("0x{}", hex::encode(public)))
}

fn vars() -> Vec<EnvVar> {
    vec![EnvVar {
        key: "A".to_string(),
        value: "1".to_string(),
    }]
}

#[tokio::test]
async fn test_empty_env_vars_skip_chain() {
    let dir = TempDir::new().unwrap();
    let market = Arc::new(MockMarketplace::new(OWNER));
    let id = JobId::acurast(OWNER, 3);

    let hash = setter(&dir, &market, 1).set_env_vars(&id, &[]).await.unwrap();
    assert!(hash.is_none());
    assert!(market.environments().await.is_empty());
}

#[tokio::test]
async fn test_no_keys_after_retries() {
    let dir = TempDir::new().unwrap();
    let market = Arc::new(MockMarketplace::new(OWNER));
    let id = JobId::acurast(OWNER, 3);
    market
        .set_assignments(&id, vec![assignment(&id, "5NoKey", vec![])])
        .await;

    let result = setter(&dir, &market, 2).set_env_vars(&id, &vars()).await;
    assert!(matches!(result, Err(DeployError::NoEncryptionKeys(3))));
    assert!(market.environments().await.is_empty());
}

#[tokio::test]
async fn test_processors_without_key_are_skipped() {
    let dir = TempDir::new().unwrap();
    let market = Arc::new(MockMarketplace::new(OWNER));
    let id = JobId::acurast(OWNER, 3);
    market
        .set_assignments(
            &id,
            vec![
                assignment(&id, "5WithKey", vec![encryption_key()]),
                assignment(&id, "5NoKey", vec![]),
            ],
        )
        .await;

    let hash = setter(&dir, &market, 2).set_env_vars(&id, &vars()).await.unwrap();
    assert!(hash.is_some());

    let environments = market.environments().await;
    assert_eq!(environments.len(), 1);
    let processors: Vec<&str> = environments[0]
        .1
        .iter()
        .map(|env| env.processor.as_str())
        .collect();
    assert_eq!(processors, vec!["5WithKey"]);
}

#[tokio::test]
async fn test_waits_for_late_keys() {
    let dir = TempDir::new().unwrap();
    let market = Arc::new(MockMarketplace::new(OWNER));
    let id = JobId::acurast(OWNER, 3);

    let publisher = {
        let market = market.clone();
        let id = id.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(30)).await;
            market
                .set_assignments(&id, vec![assignment(&id, "5Late", vec![encryption_key()])])
                .await;
        })
    };

    let hash = setter(&dir, &market, 50).set_env_vars(&id, &vars()).await.unwrap();
    publisher.await.unwrap();

    assert!(hash.is_some());
    assert_eq!(market.environments().await[0].1[0].processor, "5Late");
}
