// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Shared fixtures for the integration tests
#![allow(dead_code)]

use acurast_cli::blockchain::types::{
    ExecutionSpecifier, JobAssignment, JobAssignmentInfo, JobId, PubKey, Sla,
};
use acurast_cli::project::ProjectConfig;
use serde_json::{json, Value};

pub const OWNER: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";

/// A complete project entry as it appears in `acurast.json`
pub fn project_json(name: &str, file_url: &str) -> Value {
    json!({
        "projectName": name,
        "fileUrl": file_url,
        "network": "canary",
        "onlyAttestedDevices": true,
        "startAt": {"msFromNow": 3_600_000},
        "assignmentStrategy": {"type": "Single"},
        "execution": {"type": "onetime", "maxExecutionTimeInMs": 10_000},
        "maxAllowedStartDelayInMs": 10_000,
        "usageLimit": {"maxMemory": 0, "maxNetworkRequests": 0, "maxStorage": 0},
        "numberOfReplicas": 1,
        "minProcessorReputation": 0,
        "maxCostPerExecution": 100_000_000_000u64
    })
}

pub fn project_config(name: &str, file_url: &str) -> ProjectConfig {
    serde_json::from_value(project_json(name, file_url)).expect("fixture config is valid")
}

/// Acknowledged assignment whose processor published `pub_keys`
pub fn assignment(job_id: &JobId, processor: &str, pub_keys: Vec<PubKey>) -> JobAssignmentInfo {
    JobAssignmentInfo {
        id: job_id.clone(),
        processor: processor.to_string(),
        assignment: JobAssignment {
            slot: 0,
            start_delay: 0,
            fee_per_execution: 100_000_000_000,
            acknowledged: true,
            sla: Sla::default(),
            pub_keys,
            execution: ExecutionSpecifier::All,
        },
    }
}
