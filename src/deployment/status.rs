// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::blockchain::types::JobId;
use crate::project::JobRegistration;

/// Steps a deployment goes through, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeploymentStatus {
    Uploaded,
    Prepared,
    Submit,
    WaitingForMatch,
    Matched,
    Acknowledged,
    EnvironmentVariablesSet,
    Started,
    ExecutionDone,
    Finalized,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StatusData {
    Uploaded {
        #[serde(rename = "ipfsHash")]
        ipfs_hash: String,
    },
    Prepared {
        job: Box<JobRegistration>,
    },
    Submit {
        #[serde(rename = "txHash")]
        tx_hash: String,
    },
    WaitingForMatch {
        #[serde(rename = "jobIds")]
        job_ids: Vec<JobId>,
    },
    Acknowledged {
        acknowledged: u8,
    },
    EnvironmentVariablesSet {
        #[serde(skip_serializing_if = "Option::is_none")]
        hash: Option<String>,
    },
    Empty {},
}

/// One progress notification, serialized as `{"status": ..., "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusEvent {
    pub status: DeploymentStatus,
    pub data: StatusData,
}

impl StatusEvent {
    pub fn uploaded(ipfs_hash: &str) -> Self {
        Self {
            status: DeploymentStatus::Uploaded,
            data: StatusData::Uploaded {
                ipfs_hash: ipfs_hash.to_string(),
            },
        }
    }

    pub fn prepared(job: &JobRegistration) -> Self {
        Self {
            status: DeploymentStatus::Prepared,
            data: StatusData::Prepared {
                job: Box::new(job.clone()),
            },
        }
    }

    pub fn submit(tx_hash: &str) -> Self {
        Self {
            status: DeploymentStatus::Submit,
            data: StatusData::Submit {
                tx_hash: tx_hash.to_string(),
            },
        }
    }

    pub fn waiting_for_match(job_ids: Vec<JobId>) -> Self {
        Self {
            status: DeploymentStatus::WaitingForMatch,
            data: StatusData::WaitingForMatch { job_ids },
        }
    }

    pub fn acknowledged(acknowledged: u8) -> Self {
        Self {
            status: DeploymentStatus::Acknowledged,
            data: StatusData::Acknowledged { acknowledged },
        }
    }

    pub fn environment_variables_set(hash: Option<String>) -> Self {
        Self {
            status: DeploymentStatus::EnvironmentVariablesSet,
            data: StatusData::EnvironmentVariablesSet { hash },
        }
    }

    /// Event for a status that carries no payload
    pub fn empty(status: DeploymentStatus) -> Self {
        Self {
            status,
            data: StatusData::Empty {},
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| format!("{{\"status\":\"{}\"}}", self.status))
    }
}
