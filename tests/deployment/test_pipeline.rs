// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Full deployment runs against the in-memory marketplace and pinning service

use acurast_cli::blockchain::{ChainError, JobId, JobStatus, MockMarketplace, PubKey};
use acurast_cli::config::EnvVar;
use acurast_cli::crypto::ecdh::generate_key_pair;
use acurast_cli::crypto::{decrypt_aes_gcm, derive_shared_key, EncKeyCurve, EnvironmentCipher};
use acurast_cli::deployment::{
    DeploymentOutcome, DeploymentPipeline, DeploymentStatus, EnvVarSetter, StatusEvent,
};
use acurast_cli::project::{convert_config_to_job, ProjectConfig};
use acurast_cli::storage::{KeyStore, MockPinningService};
use acurast_cli::utils::now_ms;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

use crate::common::{assignment, project_config, project_json, OWNER};

struct Harness {
    _dir: TempDir,
    market: Arc<MockMarketplace>,
    pinning: Arc<MockPinningService>,
    pipeline: DeploymentPipeline,
}

fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let market = Arc::new(MockMarketplace::new(OWNER));
    let pinning = Arc::new(MockPinningService::new());
    let cipher = EnvironmentCipher::new(KeyStore::new(dir.path().join("keys.json")));
    let setter = EnvVarSetter::new(market.clone(), cipher)
        .with_retry(Duration::from_millis(1), 1);
    let pipeline = DeploymentPipeline::new(
        market.clone(),
        pinning.clone(),
        setter,
        dir.path().join("bundles"),
    );
    Harness {
        _dir: dir,
        market,
        pinning,
        pipeline,
    }
}

fn secret_vars() -> Vec<EnvVar> {
    vec![EnvVar {
        key: "TOKEN".to_string(),
        value: "abc123".to_string(),
    }]
}

async fn drain(mut rx: mpsc::Receiver<StatusEvent>) -> Vec<StatusEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

fn json(event: &StatusEvent) -> serde_json::Value {
    serde_json::from_str(&event.to_json()).unwrap()
}

fn statuses(events: &[StatusEvent]) -> Vec<DeploymentStatus> {
    events.iter().map(|event| event.status).collect()
}

async fn deploy(
    h: &Harness,
    config: &ProjectConfig,
    env_vars: &[EnvVar],
    only_upload: bool,
) -> (DeploymentOutcome, Vec<StatusEvent>) {
    let job = convert_config_to_job(config, now_ms()).unwrap();
    let (tx, rx) = mpsc::channel(32);
    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        h.pipeline.create_job(config, job, env_vars, only_upload, tx),
    )
    .await
    .expect("deployment finishes")
    .unwrap();
    (outcome, drain(rx).await)
}

#[tokio::test]
async fn test_full_deployment_with_env_vars() {
    let h = harness();
    let config = project_config("app", "ipfs://QmScript");
    let job_id = JobId::acurast(OWNER, 1);

    let (processor_secret, processor_public) = generate_key_pair(EncKeyCurve::P256);
    h.market
        .set_assignments(
            &job_id,
            vec![assignment(
                &job_id,
                "5Processor",
                vec![PubKey::SECP256r1Encryption(format!(
                    "0x{}",
                    hex::encode(&processor_public)
                ))],
            )],
        )
        .await;
    h.market.push_statuses(vec![Some(JobStatus::Open)]);
    h.market.push_statuses(vec![Some(JobStatus::Matched)]);
    h.market.push_statuses(vec![Some(JobStatus::Assigned(1))]);
    h.market.push_statuses(vec![Some(JobStatus::Assigned(1))]);
    h.market.push_statuses(vec![None]);

    let (outcome, events) = deploy(&h, &config, &secret_vars(), false).await;

    assert_eq!(
        statuses(&events),
        vec![
            DeploymentStatus::Uploaded,
            DeploymentStatus::Prepared,
            DeploymentStatus::Submit,
            DeploymentStatus::WaitingForMatch,
            DeploymentStatus::Matched,
            DeploymentStatus::Acknowledged,
            DeploymentStatus::EnvironmentVariablesSet,
            DeploymentStatus::Finalized,
        ]
    );
    assert_eq!(outcome.ipfs_hash, "ipfs://QmScript");
    assert_eq!(outcome.job_ids, vec![job_id.clone()]);
    assert!(outcome.tx_hash.is_some());
    assert!(outcome.env_hash.is_some());
    assert!(outcome.finalized);

    assert_eq!(json(&events[3])["data"]["jobIds"][0][1], 1);
    assert_eq!(json(&events[5])["data"]["acknowledged"], 1);

    // The script reference went on chain untouched
    let registered = h.market.registered().await;
    assert_eq!(registered[0].1.script, "ipfs://QmScript");
    assert_eq!(h.pinning.pin_count().await, 0);

    // Exactly one environment submission, readable by the processor
    let environments = h.market.environments().await;
    assert_eq!(environments.len(), 1);
    let (env_job, envs) = &environments[0];
    assert_eq!(env_job, &job_id);
    let key = derive_shared_key(
        EncKeyCurve::P256,
        &processor_secret,
        &processor_public,
        &envs[0].public_key,
    )
    .unwrap();
    assert_eq!(decrypt_aes_gcm(&envs[0].variables[0].1, &key).unwrap(), "abc123");
}

#[tokio::test]
async fn test_env_vars_sent_at_deadline_before_all_acknowledged() {
    let h = harness();
    let mut value = project_json("app", "ipfs://QmScript");
    value["numberOfReplicas"] = serde_json::json!(2);
    // Env vars are due one second from now
    value["startAt"] = serde_json::json!({"msFromNow": 121_000});
    let config: ProjectConfig = serde_json::from_value(value).unwrap();

    h.market.set_next_job_number(7).await;
    let job_id = JobId::acurast(OWNER, 7);
    let (_, processor_public) = generate_key_pair(EncKeyCurve::P256);
    h.market
        .set_assignments(
            &job_id,
            vec![assignment(
                &job_id,
                "5Processor",
                vec![PubKey::SECP256r1Encryption(format!(
                    "0x{}",
                    hex::encode(&processor_public)
                ))],
            )],
        )
        .await;
    h.market.push_statuses(vec![Some(JobStatus::Matched)]);
    h.market.push_statuses(vec![Some(JobStatus::Assigned(1))]);

    // The second replica only acknowledges after the variables went out
    let market = h.market.clone();
    let (tx, mut rx) = mpsc::channel::<StatusEvent>(32);
    let follow = async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            if event.status == DeploymentStatus::EnvironmentVariablesSet {
                market.push_statuses(vec![Some(JobStatus::Assigned(2))]);
                market.push_statuses(vec![None]);
            }
            events.push(event);
        }
        events
    };

    let job = convert_config_to_job(&config, now_ms()).unwrap();
    let env_vars = secret_vars();
    let (outcome, events) = tokio::time::timeout(Duration::from_secs(10), async {
        tokio::join!(
            h.pipeline.create_job(&config, job, &env_vars, false, tx),
            follow
        )
    })
    .await
    .expect("deployment finishes");
    let outcome = outcome.unwrap();

    assert_eq!(
        statuses(&events),
        vec![
            DeploymentStatus::Uploaded,
            DeploymentStatus::Prepared,
            DeploymentStatus::Submit,
            DeploymentStatus::WaitingForMatch,
            DeploymentStatus::Matched,
            DeploymentStatus::Acknowledged,
            DeploymentStatus::EnvironmentVariablesSet,
            DeploymentStatus::Acknowledged,
            DeploymentStatus::Finalized,
        ]
    );
    assert_eq!(json(&events[5])["data"]["acknowledged"], 1);
    assert_eq!(json(&events[7])["data"]["acknowledged"], 2);
    assert_eq!(outcome.job_ids, vec![job_id.clone()]);
    assert!(outcome.env_hash.is_some());
    assert!(outcome.finalized);

    // The late acknowledgement does not send the variables again
    let environments = h.market.environments().await;
    assert_eq!(environments.len(), 1);
    assert_eq!(environments[0].0, job_id);
}

#[tokio::test]
async fn test_deployment_without_env_vars() {
    let h = harness();
    let config = project_config("app", "ipfs://QmScript");
    h.market.push_statuses(vec![Some(JobStatus::Assigned(1))]);
    h.market.push_statuses(vec![None]);

    let (outcome, events) = deploy(&h, &config, &[], false).await;

    assert_eq!(
        statuses(&events),
        vec![
            DeploymentStatus::Uploaded,
            DeploymentStatus::Prepared,
            DeploymentStatus::Submit,
            DeploymentStatus::WaitingForMatch,
            DeploymentStatus::Acknowledged,
            DeploymentStatus::EnvironmentVariablesSet,
            DeploymentStatus::Finalized,
        ]
    );
    assert_eq!(json(&events[5])["data"], serde_json::json!({}));
    assert!(outcome.env_hash.is_none());
    assert!(h.market.environments().await.is_empty());
}

#[tokio::test]
async fn test_only_upload_bundles_local_script() {
    let h = harness();
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("index.js");
    std::fs::write(&script, "console.log('hi')").unwrap();
    let config = project_config("app", &script.display().to_string());

    let (outcome, events) = deploy(&h, &config, &[], true).await;

    assert_eq!(
        statuses(&events),
        vec![DeploymentStatus::Uploaded, DeploymentStatus::Prepared]
    );
    assert!(outcome.ipfs_hash.starts_with("ipfs://"));
    assert!(h.pinning.pinned(&outcome.ipfs_hash).await.is_some());

    let prepared = json(&events[1]);
    assert_eq!(prepared["data"]["job"]["script"], outcome.ipfs_hash.as_str());
    assert!(h.market.registered().await.is_empty());
    assert!(outcome.tx_hash.is_none());
}

#[tokio::test]
async fn test_dropped_receiver_stops_pipeline() {
    let h = harness();
    let config = project_config("app", "ipfs://QmScript");
    let job = convert_config_to_job(&config, now_ms()).unwrap();

    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let outcome = h
        .pipeline
        .create_job(&config, job, &[], false, tx)
        .await
        .unwrap();

    assert_eq!(outcome.ipfs_hash, "ipfs://QmScript");
    assert!(outcome.tx_hash.is_none());
    assert!(h.market.registered().await.is_empty());
}

#[tokio::test]
async fn test_registration_failure_is_reported() {
    let h = harness();
    let config = project_config("app", "ipfs://QmScript");
    let job = convert_config_to_job(&config, now_ms()).unwrap();
    h.market
        .inject_error(ChainError::Transaction(
            "insufficient balance".to_string(),
        ))
        .await;

    let (tx, rx) = mpsc::channel(8);
    let result = h.pipeline.create_job(&config, job, &[], false, tx).await;
    assert!(result.is_err());

    let events = drain(rx).await;
    assert_eq!(
        statuses(&events),
        vec![DeploymentStatus::Uploaded, DeploymentStatus::Prepared]
    );
}
