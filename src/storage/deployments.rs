// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Local deployment records under `.acurast/deploy`.
//!
//! A record is created as `<project>-<deployedAtMs>.json` once the job is
//! prepared. When the chain assigns a job id the record is rewritten as
//! `<project>-<deployedAtMs>-<jobNumber>.json`, which is what lookups by job
//! number match on.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::StorageError;
use crate::blockchain::types::JobId;
use crate::project::{JobRegistration, ProjectConfig};
use crate::utils::time::iso_time;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Init,
    Deployed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<JobId>,
    pub deployed_at: String,
    #[serde(default)]
    pub assignments: Vec<serde_json::Value>,
    pub status: RecordStatus,
    pub config: ProjectConfig,
    pub registration: JobRegistration,
}

#[derive(Debug, Clone)]
pub struct DeploymentStore {
    dir: PathBuf,
}

impl DeploymentStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read_record(path: &Path) -> Result<DeploymentRecord, StorageError> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            StorageError::SerializationError(format!("{}: {}", path.display(), e))
        })
    }

    fn write_record(path: &Path, record: &DeploymentRecord) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(record)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn file_names(&self) -> Result<Vec<String>, StorageError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().to_string();
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    /// Create the record for a deployment, or attach the job id to it.
    ///
    /// Calls without a job id on an existing record leave it untouched.
    pub fn store(
        &self,
        deployed_at_ms: u64,
        config: &ProjectConfig,
        job: &JobRegistration,
        job_id: Option<&JobId>,
    ) -> Result<PathBuf, StorageError> {
        match self.find_by_deployment_time(deployed_at_ms)? {
            None => {
                let stem = format!("{}-{}", config.project_name, deployed_at_ms);
                let file_name = match job_id {
                    Some(id) => format!("{}-{}.json", stem, id.number()),
                    None => format!("{}.json", stem),
                };
                let record = DeploymentRecord {
                    transaction_id: None,
                    deployment_id: job_id.cloned(),
                    deployed_at: iso_time(deployed_at_ms),
                    assignments: Vec::new(),
                    status: if job_id.is_some() {
                        RecordStatus::Deployed
                    } else {
                        RecordStatus::Init
                    },
                    config: config.clone(),
                    registration: job.clone(),
                };
                let path = self.dir.join(file_name);
                Self::write_record(&path, &record)?;
                debug!("Stored deployment record {}", path.display());
                Ok(path)
            }
            Some((path, mut record)) => {
                let Some(id) = job_id else {
                    return Ok(path);
                };
                if record.deployment_id.as_ref() == Some(id) {
                    return Ok(path);
                }
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .ok_or_else(|| StorageError::InvalidPath(path.display().to_string()))?;
                let stem = file_name.trim_end_matches(".json");
                let new_path = self.dir.join(format!("{}-{}.json", stem, id.number()));

                record.deployment_id = Some(id.clone());
                record.status = RecordStatus::Deployed;
                Self::write_record(&new_path, &record)?;
                std::fs::remove_file(&path)?;
                info!(
                    "Deployment record renamed to {} for job {}",
                    new_path.display(),
                    id
                );
                Ok(new_path)
            }
        }
    }

    pub fn find_by_deployment_time(
        &self,
        deployed_at_ms: u64,
    ) -> Result<Option<(PathBuf, DeploymentRecord)>, StorageError> {
        let needle = format!("-{}", deployed_at_ms);
        for name in self.file_names()? {
            let stem = name.trim_end_matches(".json");
            if stem.ends_with(&needle) || stem.contains(&format!("{}-", needle)) {
                let path = self.dir.join(&name);
                let record = Self::read_record(&path)?;
                return Ok(Some((path, record)));
            }
        }
        Ok(None)
    }

    pub fn find_by_job_number(
        &self,
        job_number: u128,
    ) -> Result<Option<(PathBuf, DeploymentRecord)>, StorageError> {
        let suffix = format!("-{}.json", job_number);
        for name in self.file_names()? {
            if !name.ends_with(&suffix) {
                continue;
            }
            let path = self.dir.join(&name);
            let record = Self::read_record(&path)?;
            if record.deployment_id.as_ref().map(JobId::number) == Some(job_number) {
                return Ok(Some((path, record)));
            }
        }
        Ok(None)
    }

    pub fn load(&self, path: &Path) -> Result<DeploymentRecord, StorageError> {
        Self::read_record(path)
    }

    pub fn list(&self) -> Result<Vec<(PathBuf, DeploymentRecord)>, StorageError> {
        let mut records = Vec::new();
        for name in self.file_names()? {
            let path = self.dir.join(&name);
            match Self::read_record(&path) {
                Ok(record) => records.push((path, record)),
                Err(e) => debug!("Skipping unreadable record {}: {}", name, e),
            }
        }
        Ok(records)
    }

    pub fn set_transaction_id(&self, path: &Path, tx_hash: &str) -> Result<(), StorageError> {
        let mut record = Self::read_record(path)?;
        record.transaction_id = Some(tx_hash.to_string());
        Self::write_record(path, &record)
    }

    pub fn set_status(&self, path: &Path, status: RecordStatus) -> Result<(), StorageError> {
        let mut record = Self::read_record(path)?;
        record.status = status;
        Self::write_record(path, &record)
    }

    /// Delete the record of `job_number`; returns whether one existed
    pub fn remove(&self, job_number: u128) -> Result<bool, StorageError> {
        match self.find_by_job_number(job_number)? {
            Some((path, _)) => {
                std::fs::remove_file(&path)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
