// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::DeployError;
use crate::blockchain::types::{JobAssignmentInfo, JobId};
use crate::blockchain::Marketplace;
use crate::config::EnvVar;
use crate::crypto::{processor_encryption_key, EnvironmentCipher};

pub const ENV_KEY_RETRY_DELAY: Duration = Duration::from_secs(30);
pub const ENV_KEY_MAX_ATTEMPTS: u32 = 10;

/// Encrypts environment variables for every assigned processor and submits
/// them in a single `set_environments` call
pub struct EnvVarSetter {
    marketplace: Arc<dyn Marketplace>,
    cipher: EnvironmentCipher,
    retry_delay: Duration,
    max_attempts: u32,
}

impl EnvVarSetter {
    pub fn new(marketplace: Arc<dyn Marketplace>, cipher: EnvironmentCipher) -> Self {
        Self {
            marketplace,
            cipher,
            retry_delay: ENV_KEY_RETRY_DELAY,
            max_attempts: ENV_KEY_MAX_ATTEMPTS,
        }
    }

    pub fn with_retry(mut self, retry_delay: Duration, max_attempts: u32) -> Self {
        self.retry_delay = retry_delay;
        self.max_attempts = max_attempts.max(1);
        self
    }

    async fn fetch_assignments(&self, job_id: &JobId) -> Result<Vec<JobAssignmentInfo>, DeployError> {
        let processors = self.marketplace.assigned_processors(job_id).await?;
        if processors.is_empty() {
            return Ok(Vec::new());
        }
        Ok(self.marketplace.job_assignments(job_id, &processors).await?)
    }

    /// Wait until every assigned processor published an encryption key.
    ///
    /// After the last attempt the assignments are returned as they are and
    /// processors without a key are skipped by the caller.
    async fn assignments_with_keys(
        &self,
        job_id: &JobId,
    ) -> Result<Vec<JobAssignmentInfo>, DeployError> {
        let mut attempt = 1;
        loop {
            let assignments = self.fetch_assignments(job_id).await?;
            let missing = assignments
                .iter()
                .filter(|info| processor_encryption_key(info).is_none())
                .count();

            if !assignments.is_empty() && missing == 0 {
                return Ok(assignments);
            }
            if attempt >= self.max_attempts {
                warn!(
                    "⚠️ Giving up waiting for encryption keys of deployment {} ({} of {} missing)",
                    job_id,
                    missing,
                    assignments.len()
                );
                return Ok(assignments);
            }
            debug!(
                "Waiting for processor keys of deployment {} (attempt {}/{}, {} assignments, {} without key)",
                job_id,
                attempt,
                self.max_attempts,
                assignments.len(),
                missing
            );
            attempt += 1;
            tokio::time::sleep(self.retry_delay).await;
        }
    }

    /// Returns the transaction hash, or `None` when there is nothing to set
    pub async fn set_env_vars(
        &self,
        job_id: &JobId,
        env_vars: &[EnvVar],
    ) -> Result<Option<String>, DeployError> {
        if env_vars.is_empty() {
            info!("No environment variables found for deployment {}", job_id);
            return Ok(None);
        }

        let assignments = self.assignments_with_keys(job_id).await?;
        let mut environments = Vec::with_capacity(assignments.len());
        for info in &assignments {
            match self.cipher.encrypt_environment(info, env_vars)? {
                Some(environment) => environments.push(environment),
                None => warn!("Processor {} has no encryption key, skipping", info.processor),
            }
        }
        if environments.is_empty() {
            return Err(DeployError::NoEncryptionKeys(job_id.number()));
        }

        info!(
            "🔐 Setting {} environment variables for {} processors of deployment {}",
            env_vars.len(),
            environments.len(),
            job_id
        );
        let hash = self
            .marketplace
            .set_environments(job_id, &environments)
            .await?;
        info!("✅ Environment variables set (hash: {})", hash);
        Ok(Some(hash))
    }
}
