// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use super::error::ChainError;
use super::types::{JobAssignmentInfo, JobId, JobStatus, ProcessorEnvironment, RegisteredJob};
use crate::project::JobRegistration;

/// Statuses of the watched jobs, one item per new best block.
/// `None` means the job has no status entry (never matched or finalized).
pub type StatusStream =
    Pin<Box<dyn Stream<Item = Result<Vec<Option<JobStatus>>, ChainError>> + Send>>;

/// Outcome of a successful `deploy` extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registered {
    pub tx_hash: String,
    pub job_ids: Vec<JobId>,
}

#[async_trait]
pub trait Marketplace: Send + Sync {
    /// SS58 address of the signing account
    fn account(&self) -> String;

    async fn free_balance(&self, address: &str) -> Result<u128, ChainError>;

    /// Submit the registration and wait until it is included in a block
    async fn register_job(&self, job: &JobRegistration) -> Result<Registered, ChainError>;

    async fn watch_job_statuses(&self, ids: &[JobId]) -> Result<StatusStream, ChainError>;

    async fn assigned_processors(&self, id: &JobId) -> Result<Vec<String>, ChainError>;

    async fn job_assignments(
        &self,
        id: &JobId,
        processors: &[String],
    ) -> Result<Vec<JobAssignmentInfo>, ChainError>;

    async fn set_environments(
        &self,
        id: &JobId,
        environments: &[ProcessorEnvironment],
    ) -> Result<String, ChainError>;

    async fn deregister_job(&self, id: &JobId) -> Result<String, ChainError>;

    /// `script` is the bare IPFS hash
    async fn edit_script(&self, id: &JobId, script: &str) -> Result<String, ChainError>;

    async fn transfer_editor(
        &self,
        id: &JobId,
        new_editor: Option<&str>,
    ) -> Result<String, ChainError>;

    async fn registered_jobs(&self, owner: &str) -> Result<Vec<RegisteredJob>, ChainError>;
}
