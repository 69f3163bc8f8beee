// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! In-memory marketplace for tests and dry runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, RwLock};

use super::error::ChainError;
use super::marketplace::{Marketplace, Registered, StatusStream};
use super::types::{
    JobAssignmentInfo, JobId, JobStatus, ProcessorEnvironment, RegisteredJob,
};
use crate::project::JobRegistration;

type StatusUpdate = Vec<Option<JobStatus>>;

pub struct MockMarketplace {
    account: String,
    next_job_number: Arc<Mutex<u128>>,
    tx_counter: Arc<Mutex<u64>>,
    balances: Arc<RwLock<HashMap<String, u128>>>,
    registered: Arc<RwLock<Vec<(JobId, JobRegistration)>>>,
    status_sender: mpsc::UnboundedSender<StatusUpdate>,
    status_receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<StatusUpdate>>>>,
    assignments: Arc<RwLock<HashMap<JobId, Vec<JobAssignmentInfo>>>>,
    environments: Arc<RwLock<Vec<(JobId, Vec<ProcessorEnvironment>)>>>,
    deregistered: Arc<RwLock<Vec<JobId>>>,
    edited_scripts: Arc<RwLock<Vec<(JobId, String)>>>,
    editors: Arc<RwLock<Vec<(JobId, Option<String>)>>>,
    injected_error: Arc<Mutex<Option<ChainError>>>,
}

impl MockMarketplace {
    pub fn new(account: &str) -> Self {
        let (status_sender, status_receiver) = mpsc::unbounded_channel();
        Self {
            account: account.to_string(),
            next_job_number: Arc::new(Mutex::new(1)),
            tx_counter: Arc::new(Mutex::new(0)),
            balances: Arc::new(RwLock::new(HashMap::new())),
            registered: Arc::new(RwLock::new(Vec::new())),
            status_sender,
            status_receiver: Arc::new(Mutex::new(Some(status_receiver))),
            assignments: Arc::new(RwLock::new(HashMap::new())),
            environments: Arc::new(RwLock::new(Vec::new())),
            deregistered: Arc::new(RwLock::new(Vec::new())),
            edited_scripts: Arc::new(RwLock::new(Vec::new())),
            editors: Arc::new(RwLock::new(Vec::new())),
            injected_error: Arc::new(Mutex::new(None)),
        }
    }

    /// Job number handed out by the next registration
    pub async fn set_next_job_number(&self, number: u128) {
        *self.next_job_number.lock().await = number;
    }

    pub async fn set_balance(&self, address: &str, balance: u128) {
        self.balances
            .write()
            .await
            .insert(address.to_string(), balance);
    }

    /// Deliver one status update to the watcher, as a new best block would
    pub fn push_statuses(&self, update: StatusUpdate) {
        // The watcher may already be gone once the deployment finished
        let _ = self.status_sender.send(update);
    }

    pub async fn set_assignments(&self, id: &JobId, infos: Vec<JobAssignmentInfo>) {
        self.assignments.write().await.insert(id.clone(), infos);
    }

    pub async fn add_registered_job(&self, id: JobId, job: JobRegistration) {
        self.registered.write().await.push((id, job));
    }

    /// Fail the next chain call with `error`
    pub async fn inject_error(&self, error: ChainError) {
        *self.injected_error.lock().await = Some(error);
    }

    pub async fn registered(&self) -> Vec<(JobId, JobRegistration)> {
        self.registered.read().await.clone()
    }

    pub async fn environments(&self) -> Vec<(JobId, Vec<ProcessorEnvironment>)> {
        self.environments.read().await.clone()
    }

    pub async fn deregistered(&self) -> Vec<JobId> {
        self.deregistered.read().await.clone()
    }

    pub async fn edited_scripts(&self) -> Vec<(JobId, String)> {
        self.edited_scripts.read().await.clone()
    }

    pub async fn editors(&self) -> Vec<(JobId, Option<String>)> {
        self.editors.read().await.clone()
    }

    async fn check_injected_error(&self) -> Result<(), ChainError> {
        if let Some(error) = self.injected_error.lock().await.take() {
            return Err(error);
        }
        Ok(())
    }

    async fn next_tx_hash(&self) -> String {
        let mut counter = self.tx_counter.lock().await;
        *counter += 1;
        format!("0x{:064x}", *counter)
    }
}

#[async_trait]
impl Marketplace for MockMarketplace {
    fn account(&self) -> String {
        self.account.clone()
    }

    async fn free_balance(&self, address: &str) -> Result<u128, ChainError> {
        self.check_injected_error().await?;
        Ok(self
            .balances
            .read()
            .await
            .get(address)
            .copied()
            .unwrap_or(0))
    }

    async fn register_job(&self, job: &JobRegistration) -> Result<Registered, ChainError> {
        self.check_injected_error().await?;
        let number = {
            let mut next = self.next_job_number.lock().await;
            let number = *next;
            *next += 1;
            number
        };
        let id = JobId::acurast(&self.account, number);
        self.registered.write().await.push((id.clone(), job.clone()));
        Ok(Registered {
            tx_hash: self.next_tx_hash().await,
            job_ids: vec![id],
        })
    }

    async fn watch_job_statuses(&self, _ids: &[JobId]) -> Result<StatusStream, ChainError> {
        self.check_injected_error().await?;
        let receiver = self
            .status_receiver
            .lock()
            .await
            .take()
            .ok_or_else(|| ChainError::Transaction("status watch already taken".to_string()))?;
        let stream = futures::stream::unfold(receiver, |mut receiver| async move {
            receiver.recv().await.map(|update| (Ok(update), receiver))
        });
        Ok(Box::pin(stream))
    }

    async fn assigned_processors(&self, id: &JobId) -> Result<Vec<String>, ChainError> {
        self.check_injected_error().await?;
        Ok(self
            .assignments
            .read()
            .await
            .get(id)
            .map(|infos| infos.iter().map(|i| i.processor.clone()).collect())
            .unwrap_or_default())
    }

    async fn job_assignments(
        &self,
        id: &JobId,
        processors: &[String],
    ) -> Result<Vec<JobAssignmentInfo>, ChainError> {
        self.check_injected_error().await?;
        Ok(self
            .assignments
            .read()
            .await
            .get(id)
            .map(|infos| {
                infos
                    .iter()
                    .filter(|i| processors.contains(&i.processor))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn set_environments(
        &self,
        id: &JobId,
        environments: &[ProcessorEnvironment],
    ) -> Result<String, ChainError> {
        self.check_injected_error().await?;
        self.environments
            .write()
            .await
            .push((id.clone(), environments.to_vec()));
        Ok(self.next_tx_hash().await)
    }

    async fn deregister_job(&self, id: &JobId) -> Result<String, ChainError> {
        self.check_injected_error().await?;
        self.deregistered.write().await.push(id.clone());
        let refund: u128 = {
            let mut registered = self.registered.write().await;
            let refund = registered
                .iter()
                .filter(|(job_id, _)| job_id == id)
                .map(|(_, job)| {
                    let requirements = &job.extra.requirements;
                    requirements.reward.saturating_mul(requirements.slots as u128)
                })
                .sum();
            registered.retain(|(job_id, _)| job_id != id);
            refund
        };
        // Unspent rewards go back to the job owner
        *self
            .balances
            .write()
            .await
            .entry(self.account.clone())
            .or_insert(0) += refund;
        Ok(self.next_tx_hash().await)
    }

    async fn edit_script(&self, id: &JobId, script: &str) -> Result<String, ChainError> {
        self.check_injected_error().await?;
        self.edited_scripts
            .write()
            .await
            .push((id.clone(), script.to_string()));
        Ok(self.next_tx_hash().await)
    }

    async fn transfer_editor(
        &self,
        id: &JobId,
        new_editor: Option<&str>,
    ) -> Result<String, ChainError> {
        self.check_injected_error().await?;
        self.editors
            .write()
            .await
            .push((id.clone(), new_editor.map(str::to_string)));
        Ok(self.next_tx_hash().await)
    }

    async fn registered_jobs(&self, owner: &str) -> Result<Vec<RegisteredJob>, ChainError> {
        self.check_injected_error().await?;
        Ok(self
            .registered
            .read()
            .await
            .iter()
            .filter(|(id, _)| id.origin().address() == owner)
            .map(|(id, job)| RegisteredJob {
                id: id.clone(),
                script: job.script.clone(),
                schedule: job.schedule,
                slots: job.extra.requirements.slots,
                reward: job.extra.requirements.reward,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_status_stream_delivers_pushed_updates() {
        let market = MockMarketplace::new("5Owner");
        let id = JobId::acurast("5Owner", 1);
        let mut stream = market.watch_job_statuses(&[id]).await.unwrap();

        market.push_statuses(vec![Some(JobStatus::Matched)]);
        market.push_statuses(vec![None]);

        assert_eq!(
            stream.next().await.unwrap().unwrap(),
            vec![Some(JobStatus::Matched)]
        );
        assert_eq!(stream.next().await.unwrap().unwrap(), vec![None]);
        assert!(market.watch_job_statuses(&[]).await.is_err());
    }

    #[tokio::test]
    async fn test_injected_error_applies_once() {
        let market = MockMarketplace::new("5Owner");
        market
            .inject_error(ChainError::Transaction("boom".to_string()))
            .await;
        assert!(market.free_balance("5Owner").await.is_err());
        assert_eq!(market.free_balance("5Owner").await.unwrap(), 0);
    }
}
