// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, field, info, info_span, warn, Instrument, Span};

use super::env_vars::EnvVarSetter;
use super::status::{DeploymentStatus, StatusEvent};
use super::trigger::{EnvVarTrigger, TriggerAction};
use super::DeployError;
use crate::blockchain::types::{JobId, JobStatus};
use crate::blockchain::Marketplace;
use crate::config::EnvVar;
use crate::project::{JobRegistration, ProjectConfig};
use crate::storage::ipfs::IPFS_PREFIX;
use crate::storage::{create_manifest, zip_bundle, PinningService};
use crate::utils::now_ms;

/// What a finished (or upload-only) deployment produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeploymentOutcome {
    pub ipfs_hash: String,
    pub tx_hash: Option<String>,
    pub job_ids: Vec<JobId>,
    pub env_hash: Option<String>,
    pub finalized: bool,
}

pub struct DeploymentPipeline {
    marketplace: Arc<dyn Marketplace>,
    pinning: Arc<dyn PinningService>,
    env_setter: EnvVarSetter,
    bundles_dir: PathBuf,
}

/// Mutable state of the tracking loop
struct Tracker {
    trigger: EnvVarTrigger,
    env_deadline: Option<Instant>,
    last_status: Option<JobStatus>,
    seen_status: bool,
    started: bool,
    execution_done: bool,
}

fn instant_at(timestamp_ms: u64) -> Instant {
    Instant::now() + Duration::from_millis(timestamp_ms.saturating_sub(now_ms()))
}

impl DeploymentPipeline {
    pub fn new(
        marketplace: Arc<dyn Marketplace>,
        pinning: Arc<dyn PinningService>,
        env_setter: EnvVarSetter,
        bundles_dir: PathBuf,
    ) -> Self {
        Self {
            marketplace,
            pinning,
            env_setter,
            bundles_dir,
        }
    }

    /// Bundle and pin the script unless it already is an IPFS reference
    pub async fn upload_script(&self, config: &ProjectConfig) -> Result<String, DeployError> {
        if config.file_url.starts_with(IPFS_PREFIX) {
            debug!("fileUrl is an IPFS reference, using {}", config.file_url);
            return Ok(config.file_url.clone());
        }

        debug!("Bundling {}", config.file_url);
        let manifest = create_manifest(config)?;
        let bundle = zip_bundle(
            Path::new(&config.file_url),
            &self.bundles_dir,
            &manifest,
            &config.project_name,
        )?;
        debug!("Bundle written to {}", bundle.display());

        let hash = self.pinning.pin_file(&bundle).await?;
        info!("📦 Script uploaded: {}", hash);
        Ok(hash)
    }

    /// Run the whole deployment and report progress on `events`.
    ///
    /// Returns once the job is finalized, the status stream ends or the
    /// event receiver is dropped. With `only_upload` it stops after
    /// `Prepared`.
    pub async fn create_job(
        &self,
        config: &ProjectConfig,
        mut job: JobRegistration,
        env_vars: &[EnvVar],
        only_upload: bool,
        events: mpsc::Sender<StatusEvent>,
    ) -> Result<DeploymentOutcome, DeployError> {
        let span = info_span!(
            "deployment",
            project = %config.project_name,
            job = field::Empty
        );
        self.run(config, &mut job, env_vars, only_upload, &events, span.clone())
            .instrument(span)
            .await
    }

    async fn run(
        &self,
        config: &ProjectConfig,
        job: &mut JobRegistration,
        env_vars: &[EnvVar],
        only_upload: bool,
        events: &mpsc::Sender<StatusEvent>,
        span: Span,
    ) -> Result<DeploymentOutcome, DeployError> {
        let mut outcome = DeploymentOutcome::default();

        let ipfs_hash = self.upload_script(config).await?;
        outcome.ipfs_hash = ipfs_hash.clone();
        if !emit(events, StatusEvent::uploaded(&ipfs_hash)).await {
            return Ok(outcome);
        }

        job.script = ipfs_hash;
        if !emit(events, StatusEvent::prepared(job)).await || only_upload {
            return Ok(outcome);
        }

        info!("🚀 Registering job");
        let registered = self.marketplace.register_job(job).await?;
        let job_id = registered
            .job_ids
            .first()
            .cloned()
            .ok_or(DeployError::MissingJobId)?;
        span.record("job", field::display(&job_id));
        info!("✅ Registered deployment {} in {}", job_id, registered.tx_hash);

        outcome.tx_hash = Some(registered.tx_hash.clone());
        outcome.job_ids = registered.job_ids.clone();

        if !emit(events, StatusEvent::submit(&registered.tx_hash)).await
            || !emit(events, StatusEvent::waiting_for_match(registered.job_ids.clone())).await
        {
            return Ok(outcome);
        }

        self.track(config, job, &job_id, &registered.job_ids, env_vars, events, &mut outcome)
            .await?;
        Ok(outcome)
    }

    #[allow(clippy::too_many_arguments)]
    async fn track(
        &self,
        config: &ProjectConfig,
        job: &JobRegistration,
        job_id: &JobId,
        job_ids: &[JobId],
        env_vars: &[EnvVar],
        events: &mpsc::Sender<StatusEvent>,
        outcome: &mut DeploymentOutcome,
    ) -> Result<(), DeployError> {
        let mut statuses = self.marketplace.watch_job_statuses(job_ids).await?;
        let started_at = instant_at(job.schedule.start_time);
        let done_at = instant_at(job.schedule.end_time);

        let mut tracker = Tracker {
            trigger: EnvVarTrigger::new(config.number_of_replicas, job.schedule.start_time),
            env_deadline: None,
            last_status: None,
            seen_status: false,
            started: false,
            execution_done: false,
        };

        loop {
            tokio::select! {
                update = statuses.next() => {
                    let Some(update) = update else {
                        warn!("Status updates ended before deployment {} was finalized", job_id);
                        return Ok(());
                    };
                    let status = update?.into_iter().next().flatten();
                    match status {
                        None if tracker.seen_status => {
                            info!("🏁 Deployment {} finalized", job_id);
                            outcome.finalized = true;
                            emit(events, StatusEvent::empty(DeploymentStatus::Finalized)).await;
                            return Ok(());
                        }
                        None => {}
                        Some(status) => {
                            tracker.seen_status = true;
                            if tracker.last_status != Some(status) {
                                tracker.last_status = Some(status);
                                if !self
                                    .on_status(status, job_id, env_vars, events, &mut tracker, outcome)
                                    .await?
                                {
                                    return Ok(());
                                }
                            }
                        }
                    }
                }
                _ = sleep_until(tracker.env_deadline.unwrap_or(done_at)), if tracker.env_deadline.is_some() => {
                    tracker.env_deadline = None;
                    if tracker.trigger.on_deadline() {
                        debug!("Start is close, setting environment variables without all acknowledgements");
                        if !self.send_env_vars(job_id, env_vars, events, outcome).await? {
                            return Ok(());
                        }
                    }
                }
                _ = sleep_until(started_at), if !tracker.started => {
                    tracker.started = true;
                    if !emit(events, StatusEvent::empty(DeploymentStatus::Started)).await {
                        return Ok(());
                    }
                }
                _ = sleep_until(done_at), if tracker.started && !tracker.execution_done => {
                    tracker.execution_done = true;
                    if !emit(events, StatusEvent::empty(DeploymentStatus::ExecutionDone)).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Returns `false` once nobody listens anymore
    async fn on_status(
        &self,
        status: JobStatus,
        job_id: &JobId,
        env_vars: &[EnvVar],
        events: &mpsc::Sender<StatusEvent>,
        tracker: &mut Tracker,
        outcome: &mut DeploymentOutcome,
    ) -> Result<bool, DeployError> {
        match status {
            JobStatus::Open => Ok(true),
            JobStatus::Matched => {
                info!("Deployment {} matched", job_id);
                Ok(emit(events, StatusEvent::empty(DeploymentStatus::Matched)).await)
            }
            JobStatus::Assigned(count) => {
                info!("Deployment {} acknowledged by {}", job_id, count);
                if !emit(events, StatusEvent::acknowledged(count)).await {
                    return Ok(false);
                }
                match tracker.trigger.on_acknowledged(count, now_ms()) {
                    TriggerAction::None => Ok(true),
                    TriggerAction::FireNow => {
                        tracker.env_deadline = None;
                        self.send_env_vars(job_id, env_vars, events, outcome).await
                    }
                    TriggerAction::Arm { at_ms } => {
                        tracker.env_deadline = Some(instant_at(at_ms));
                        Ok(true)
                    }
                }
            }
        }
    }

    async fn send_env_vars(
        &self,
        job_id: &JobId,
        env_vars: &[EnvVar],
        events: &mpsc::Sender<StatusEvent>,
        outcome: &mut DeploymentOutcome,
    ) -> Result<bool, DeployError> {
        let hash = self
            .env_setter
            .set_env_vars(job_id, env_vars)
            .await
            .map_err(|e| {
                error!("Setting environment variables failed: {}", e);
                e
            })?;
        outcome.env_hash = hash.clone();
        Ok(emit(events, StatusEvent::environment_variables_set(hash)).await)
    }
}

async fn emit(events: &mpsc::Sender<StatusEvent>, event: StatusEvent) -> bool {
    debug!("Status {}", event.status);
    if events.send(event).await.is_err() {
        debug!("Status receiver dropped, stopping");
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_instant_at_past_is_now() {
        let before = Instant::now();
        let at = instant_at(0);
        assert!(at >= before);
        assert!(at <= Instant::now());
    }
}
