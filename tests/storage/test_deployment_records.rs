// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use acurast_cli::blockchain::JobId;
use acurast_cli::project::convert_config_to_job;
use acurast_cli::storage::{DeploymentStore, RecordStatus};
use tempfile::TempDir;

use crate::common::{project_config, OWNER};

const DEPLOYED_AT: u64 = 1_700_000_000_000;

fn file_names(store: &DeploymentStore) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(store.dir())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_record_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store = DeploymentStore::new(dir.path().join("deployments"));
    let config = project_config("app", "ipfs://QmApp");
    let job = convert_config_to_job(&config, DEPLOYED_AT).unwrap();

    // Prepared: record without deployment id
    let path = store.store(DEPLOYED_AT, &config, &job, None).unwrap();
    assert_eq!(file_names(&store), vec!["app-1700000000000.json"]);
    let record = store.load(&path).unwrap();
    assert_eq!(record.status, RecordStatus::Init);
    assert!(record.deployment_id.is_none());
    assert_eq!(record.registration, job);

    // Repeated call without id leaves the record alone
    assert_eq!(store.store(DEPLOYED_AT, &config, &job, None).unwrap(), path);

    store.set_transaction_id(&path, "0xabc").unwrap();

    // WaitingForMatch: the record moves to a name carrying the job number
    let id = JobId::acurast(OWNER, 42);
    let renamed = store.store(DEPLOYED_AT, &config, &job, Some(&id)).unwrap();
    assert_eq!(file_names(&store), vec!["app-1700000000000-42.json"]);

    let record = store.load(&renamed).unwrap();
    assert_eq!(record.status, RecordStatus::Deployed);
    assert_eq!(record.transaction_id.as_deref(), Some("0xabc"));
    assert_eq!(record.deployment_id, Some(id));

    let (found, _) = store.find_by_job_number(42).unwrap().unwrap();
    assert_eq!(found, renamed);
    assert!(store.find_by_job_number(4).unwrap().is_none());

    store.set_status(&renamed, RecordStatus::Failed).unwrap();
    assert_eq!(store.load(&renamed).unwrap().status, RecordStatus::Failed);

    assert!(store.remove(42).unwrap());
    assert!(!store.remove(42).unwrap());
    assert!(file_names(&store).is_empty());
}

#[test]
fn test_records_of_different_deployments_coexist() {
    let dir = TempDir::new().unwrap();
    let store = DeploymentStore::new(dir.path().to_path_buf());
    let config = project_config("app", "ipfs://QmApp");
    let job = convert_config_to_job(&config, DEPLOYED_AT).unwrap();

    store
        .store(DEPLOYED_AT, &config, &job, Some(&JobId::acurast(OWNER, 1)))
        .unwrap();
    store
        .store(DEPLOYED_AT + 1, &config, &job, Some(&JobId::acurast(OWNER, 11)))
        .unwrap();

    assert_eq!(store.list().unwrap().len(), 2);
    let (_, first) = store.find_by_job_number(1).unwrap().unwrap();
    assert_eq!(first.deployment_id.map(|id| id.number()), Some(1));
    let (_, second) = store.find_by_job_number(11).unwrap().unwrap();
    assert_eq!(second.deployment_id.map(|id| id.number()), Some(11));
}

#[test]
fn test_record_json_shape() {
    let dir = TempDir::new().unwrap();
    let store = DeploymentStore::new(dir.path().to_path_buf());
    let config = project_config("app", "ipfs://QmApp");
    let job = convert_config_to_job(&config, DEPLOYED_AT).unwrap();
    let path = store
        .store(DEPLOYED_AT, &config, &job, Some(&JobId::acurast(OWNER, 7)))
        .unwrap();

    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(value["status"], "deployed");
    assert_eq!(value["deploymentId"][0]["acurast"], OWNER);
    assert_eq!(value["deploymentId"][1], 7);
    assert_eq!(value["config"]["projectName"], "app");
    assert_eq!(value["registration"]["script"], "ipfs://QmApp");
}
