// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use super::output::{ConsoleOutput, OutputFormat, StepList};
use super::{connect, load_project, print_notes};
use crate::blockchain::types::JobId;
use crate::config::Settings;
use crate::crypto::EnvironmentCipher;
use crate::deployment::{
    DeploymentPipeline, DeploymentStatus, EnvVarSetter, StatusData, StatusEvent,
};
use crate::fees::{fee_analysis, format_cacu_unsigned, suggest_reward};
use crate::project::{convert_config_to_job, resolve_start_time, JobRegistration, ProjectConfig};
use crate::storage::{DeploymentStore, KeyStore, PinataClient, RecordStatus};
use crate::utils::time::format_local_time;
use crate::utils::{human_time, now_ms, pluralize};

/// Arguments for the deploy command
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Name of the project in acurast.json
    pub project: Option<String>,

    /// Run the deploy step without actually deploying the project
    #[arg(short, long)]
    pub dry_run: bool,

    /// Output a json on each of the steps of the deployment process
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,

    /// Do not wait for the deployment to finish. With environment variables
    /// the CLI waits until they are set
    #[arg(long, alias = "ee")]
    pub exit_early: bool,

    /// Do not ask for any input
    #[arg(short, long)]
    pub non_interactive: bool,

    /// Only upload to IPFS and quit
    #[arg(short = 'u', long)]
    pub only_upload: bool,
}

const STEP_SUBMIT: usize = 0;
const STEP_REGISTERED: usize = 1;
const STEP_MATCHED: usize = 2;
const STEP_ACKNOWLEDGED: usize = 3;
const STEP_ENV_VARS: usize = 4;

const DEPLOYING_TITLE: &str = "Deploying project";

/// Heading above the steps, counting down to the first execution
pub fn deploying_title(start_time_ms: u64, now_ms: u64) -> String {
    if start_time_ms > now_ms {
        format!(
            "{} (first execution scheduled in {}s)",
            DEPLOYING_TITLE,
            (start_time_ms - now_ms) / 1000
        )
    } else {
        DEPLOYING_TITLE.to_string()
    }
}

/// Reacts to status events: persists the record and renders progress
struct DeployProgress {
    output: ConsoleOutput,
    store: DeploymentStore,
    config: ProjectConfig,
    deployed_at_ms: u64,
    exit_early: bool,
    has_env_vars: bool,
    registration: Option<JobRegistration>,
    record: Option<PathBuf>,
    job_id: Option<JobId>,
    steps: Option<StepList>,
    completed: Vec<usize>,
}

impl DeployProgress {
    fn new(
        output: ConsoleOutput,
        store: DeploymentStore,
        config: ProjectConfig,
        deployed_at_ms: u64,
        exit_early: bool,
    ) -> Self {
        let has_env_vars = config.has_environment_variables();
        let steps = (!output.is_json()).then(|| {
            let mut titles = vec![
                "Submit to Acurast".to_string(),
                "Waiting for deployment to be registered".to_string(),
            ];
            if !exit_early || has_env_vars {
                titles.push("Waiting for deployment to be matched with processors".to_string());
                titles.push(format!("Acknowledged by 0/{}", config.number_of_replicas));
            }
            if has_env_vars {
                titles.push("Setting environment variables".to_string());
            }
            StepList::new(DEPLOYING_TITLE, &titles)
        });
        Self {
            output,
            store,
            config,
            deployed_at_ms,
            exit_early,
            has_env_vars,
            registration: None,
            record: None,
            job_id: None,
            steps,
            completed: Vec::new(),
        }
    }

    fn step_enabled(&self, step: usize) -> bool {
        match step {
            STEP_SUBMIT | STEP_REGISTERED => true,
            STEP_MATCHED | STEP_ACKNOWLEDGED => !self.exit_early || self.has_env_vars,
            STEP_ENV_VARS => self.has_env_vars,
            _ => false,
        }
    }

    fn complete(&mut self, step: usize, title: &str) {
        if !self.step_enabled(step) {
            return;
        }
        if let Some(steps) = &self.steps {
            // Disabled steps are not part of the list, shift the index
            let index = (0..step).filter(|s| self.step_enabled(*s)).count();
            steps.complete(index, title);
        }
        if !self.completed.contains(&step) {
            self.completed.push(step);
        }
    }

    fn all_steps_done(&self) -> bool {
        (STEP_SUBMIT..=STEP_ENV_VARS)
            .filter(|s| self.step_enabled(*s))
            .all(|s| self.completed.contains(&s))
    }

    /// Returns `true` once the command can exit
    fn handle(&mut self, event: StatusEvent) -> Result<bool> {
        self.output.json(&event);
        let json = self.output.is_json();

        match event.data {
            StatusData::Uploaded { .. } => {}
            StatusData::Prepared { job } => {
                let path = self
                    .store
                    .store(self.deployed_at_ms, &self.config, &job, None)?;
                self.complete(STEP_SUBMIT, &format!("Submitted to Acurast ({})", job.script));
                self.record = Some(path);
                self.registration = Some(*job);
            }
            StatusData::Submit { tx_hash } => {
                if let Some(path) = &self.record {
                    self.store.set_transaction_id(path, &tx_hash)?;
                }
            }
            StatusData::WaitingForMatch { job_ids } => {
                let registration = self
                    .registration
                    .as_ref()
                    .ok_or_else(|| anyhow::anyhow!("Deployment Registration is null!"))?;
                if let Some(id) = job_ids.first() {
                    self.record = Some(self.store.store(
                        self.deployed_at_ms,
                        &self.config,
                        registration,
                        Some(id),
                    )?);
                    self.job_id = Some(id.clone());
                }
                let ids = job_ids
                    .iter()
                    .map(|id| id.number().to_string())
                    .collect::<Vec<_>>()
                    .join(" | ");
                self.complete(STEP_REGISTERED, &format!("Deployment registered (ID: {})", ids));
                if json && self.exit_early && !self.has_env_vars {
                    return Ok(true);
                }
            }
            StatusData::Acknowledged { acknowledged } => {
                info!(
                    "Acknowledged by {}/{}",
                    acknowledged, self.config.number_of_replicas
                );
                self.complete(
                    STEP_ACKNOWLEDGED,
                    &format!(
                        "Acknowledged by {}/{}",
                        acknowledged, self.config.number_of_replicas
                    ),
                );
            }
            StatusData::EnvironmentVariablesSet { .. } => {
                self.complete(STEP_ENV_VARS, "Environment variables set");
                if json && self.exit_early && self.has_env_vars {
                    return Ok(true);
                }
            }
            StatusData::Empty {} => match event.status {
                DeploymentStatus::Matched => {
                    self.complete(STEP_MATCHED, "Matched");
                }
                DeploymentStatus::Finalized => return Ok(true),
                status => debug!("Status {}", status),
            },
        }

        Ok(!json && self.all_steps_done())
    }

    /// Refresh the countdown once the start time is known
    fn tick(&self, now_ms: u64) {
        if let (Some(steps), Some(job)) = (&self.steps, &self.registration) {
            steps.set_header(&deploying_title(job.schedule.start_time, now_ms));
        }
    }

    fn fail(&mut self, reason: &str) {
        if let Some(path) = &self.record {
            if let Err(e) = self.store.set_status(path, RecordStatus::Failed) {
                error!("Failed to update deployment record: {}", e);
            }
        }
        if let Some(steps) = &self.steps {
            let index = (STEP_SUBMIT..=STEP_ENV_VARS)
                .filter(|s| self.step_enabled(*s))
                .position(|s| !self.completed.contains(&s));
            if let Some(index) = index {
                steps.fail(index, reason);
            }
            steps.set_header(DEPLOYING_TITLE);
            steps.finish();
        }
    }

    fn finish(&self, settings: &Settings) {
        if let Some(steps) = &self.steps {
            steps.set_header(DEPLOYING_TITLE);
            steps.finish();
        }
        if let (false, Some(id)) = (self.output.is_json(), &self.job_id) {
            self.output.log("");
            self.output
                .log("Click here to open the deployment in your browser:");
            self.output.log(
                &settings
                    .network
                    .console_job_link(id.origin().address(), id.number()),
            );
        }
    }
}

pub async fn run(settings: &Settings, args: DeployArgs) -> Result<()> {
    let output = ConsoleOutput::new(args.output);
    let now = now_ms();

    let Some((config, notes)) = load_project(settings, args.project.as_deref(), &output, now)
    else {
        return Ok(());
    };

    if let Err(e) = settings.validate_for_deploy(!config.is_ipfs_script()) {
        error!("Deploy env vars are invalid {}", e);
        output.log(&e.to_string());
        return Ok(());
    }

    let env_vars = match settings.project_env_vars(&config) {
        Ok(vars) => vars,
        Err(e) => {
            error!("Project env vars are invalid {}", e);
            output.log(&e.to_string());
            return Ok(());
        }
    };

    output.log("");
    output.log(&format!("Deploying project \"{}\"", config.project_name));
    output.log("");
    if !notes.is_empty() {
        info!("Project config is valid, but has {} notes", notes.len());
    }
    print_notes(&output, &notes);

    let spinner = output.spinner("Fetching account balance...");
    let marketplace = connect(settings).await?;
    let address = marketplace.account();
    let balance = marketplace.free_balance(&address).await?;
    spinner.finish_and_clear();
    debug!("Balance: {} cACU", format_cacu_unsigned(balance));

    if balance == 0 {
        output.log(&format!(
            "Your balance is 0. Visit {} to get some tokens.",
            output.highlight(&settings.network.faucet_link(&address))
        ));
        output.log("");
        return Ok(());
    } else if balance < settings.network.units(1) {
        output.log(&format!(
            "Your balance is low. Visit {} to get some tokens.",
            output.highlight(&settings.network.faucet_link(&address))
        ));
        output.log("");
    }

    output.log(&format!("The CLI will use the following address: {}", address));
    output.log("");

    let start_time = resolve_start_time(&config, now)?;
    if start_time < now {
        error!("Start time cannot be in the past: {}", start_time);
        output.log("Start time cannot be in the past");
        return Ok(());
    }
    debug!("Start time: {}", start_time);

    output.log(&format!(
        "The deployment will be scheduled to start in {}. ({}) It will run for {}.",
        output.highlight(&human_time(start_time as i64 - now as i64, true)),
        format_local_time(start_time),
        output.highlight(&human_time(config.total_run_time_ms() as i64, true)),
    ));
    output.log("");

    let analysis = fee_analysis(&config, now)?;
    output.log(&format!(
        "There will be {} {} with {} {}. (Total runs: {})",
        output.highlight(&analysis.number_of_executions.to_string()),
        pluralize(analysis.number_of_executions, "execution"),
        output.highlight(&analysis.number_of_replicas.to_string()),
        pluralize(analysis.number_of_replicas, "replica"),
        output.highlight(&analysis.total_runs.to_string()),
    ));
    output.log(&format!(
        "Each replica has a cost of {} cACU, which means each execution will cost {} cACU.",
        output.highlight(&analysis.max_cost_per_execution_cacu),
        output.highlight(&format_cacu_unsigned(
            config
                .max_cost_per_execution
                .saturating_mul(config.number_of_replicas as u128)
        )),
    ));
    output.log(&format!(
        "The total cost will be {} cACU.",
        output.highlight(&analysis.max_total_cost_cacu)
    ));
    output.log("");

    let job = convert_config_to_job(&config, now)?;
    output.log(&format!(
        "The calculated suggested reward for your deployment is {} cACU.",
        output.highlight(&format_cacu_unsigned(suggest_reward(
            job.schedule.duration,
            job.storage
        )))
    ));
    output.log("");

    if args.dry_run {
        debug!("🧪 Dry run, not deploying.");
        output.log("🧪 Dry run, not deploying.");
        return Ok(());
    }

    info!("🚀 Deploying...");
    output.log("🚀 Deploying...");
    output.log("");

    settings.ensure_dirs()?;
    let pinning = Arc::new(PinataClient::new(
        settings.ipfs_url.as_deref().unwrap_or_default(),
        settings.ipfs_api_key.as_deref().unwrap_or_default(),
        settings.base_dir(),
    ));
    let cipher = EnvironmentCipher::new(KeyStore::new(settings.key_store_file()));
    let pipeline = DeploymentPipeline::new(
        marketplace.clone(),
        pinning,
        EnvVarSetter::new(marketplace, cipher),
        settings.bundles_dir(),
    );

    let mut progress = DeployProgress::new(
        output,
        DeploymentStore::new(settings.deployments_dir()),
        config.clone(),
        now_ms(),
        args.exit_early,
    );

    let (events_tx, mut events_rx) = mpsc::channel(32);
    let deployment = pipeline.create_job(&config, job, &env_vars, args.only_upload, events_tx);
    tokio::pin!(deployment);
    let mut pipeline_done = false;
    let mut countdown = tokio::time::interval(Duration::from_secs(1));

    loop {
        tokio::select! {
            _ = countdown.tick() => progress.tick(now_ms()),
            result = &mut deployment, if !pipeline_done => {
                pipeline_done = true;
                if let Err(e) = result {
                    error!("Deployment failed: {}", e);
                    progress.fail(&e.to_string());
                    return Err(e.into());
                }
            }
            event = events_rx.recv() => {
                let Some(event) = event else { break };
                if progress.handle(event)? {
                    break;
                }
            }
        }
    }

    progress.finish(settings);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const OWNER: &str = "5Owner";
    const NOW: u64 = 1_700_000_000_000;

    fn config(with_env_vars: bool) -> ProjectConfig {
        let mut value = json!({
            "projectName": "app",
            "fileUrl": "ipfs://QmScript",
            "network": "canary",
            "onlyAttestedDevices": true,
            "startAt": {"msFromNow": 60_000},
            "assignmentStrategy": {"type": "Single"},
            "execution": {"type": "onetime", "maxExecutionTimeInMs": 10_000},
            "maxAllowedStartDelayInMs": 10_000,
            "usageLimit": {"maxMemory": 0, "maxNetworkRequests": 0, "maxStorage": 0},
            "numberOfReplicas": 1,
            "minProcessorReputation": 0,
            "maxCostPerExecution": 100_000_000_000u64
        });
        if with_env_vars {
            value["includeEnvironmentVariables"] = json!(["API_KEY"]);
        }
        serde_json::from_value(value).unwrap()
    }

    fn progress(
        dir: &TempDir,
        format: OutputFormat,
        with_env_vars: bool,
        exit_early: bool,
    ) -> (DeployProgress, JobRegistration) {
        let config = config(with_env_vars);
        let job = convert_config_to_job(&config, NOW).unwrap();
        let progress = DeployProgress::new(
            ConsoleOutput::new(format),
            DeploymentStore::new(dir.path().to_path_buf()),
            config,
            NOW,
            exit_early,
        );
        (progress, job)
    }

    /// Feeds `events` in order and returns the index of the one that ended the command
    fn exit_index(progress: &mut DeployProgress, events: Vec<StatusEvent>) -> Option<usize> {
        for (index, event) in events.into_iter().enumerate() {
            if progress.handle(event).unwrap() {
                return Some(index);
            }
        }
        None
    }

    fn full_run(job: &JobRegistration) -> Vec<StatusEvent> {
        vec![
            StatusEvent::uploaded("ipfs://QmScript"),
            StatusEvent::prepared(job),
            StatusEvent::submit("0xabc"),
            StatusEvent::waiting_for_match(vec![JobId::acurast(OWNER, 7)]),
            StatusEvent::empty(DeploymentStatus::Matched),
            StatusEvent::acknowledged(1),
            StatusEvent::environment_variables_set(Some("0xdef".to_string())),
            StatusEvent::empty(DeploymentStatus::Finalized),
        ]
    }

    #[test]
    fn test_deploying_title_counts_down() {
        assert_eq!(
            deploying_title(NOW + 42_500, NOW),
            "Deploying project (first execution scheduled in 42s)"
        );
        assert_eq!(deploying_title(NOW, NOW), "Deploying project");
        assert_eq!(deploying_title(NOW - 1, NOW), "Deploying project");
    }

    #[test]
    fn test_json_exit_early_stops_once_registered() {
        let dir = TempDir::new().unwrap();
        let (mut progress, job) = progress(&dir, OutputFormat::Json, false, true);

        assert_eq!(exit_index(&mut progress, full_run(&job)), Some(3));
        let (_, record) = progress.store.find_by_job_number(7).unwrap().unwrap();
        assert_eq!(record.deployment_id, Some(JobId::acurast(OWNER, 7)));
        assert_eq!(record.transaction_id.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_json_exit_early_with_env_vars_waits_for_them() {
        let dir = TempDir::new().unwrap();
        let (mut progress, job) = progress(&dir, OutputFormat::Json, true, true);

        assert_eq!(exit_index(&mut progress, full_run(&job)), Some(6));
    }

    #[test]
    fn test_json_without_exit_early_waits_for_finalized() {
        let dir = TempDir::new().unwrap();
        let (mut progress, job) = progress(&dir, OutputFormat::Json, true, false);

        assert_eq!(exit_index(&mut progress, full_run(&job)), Some(7));
    }

    #[test]
    fn test_text_exits_when_all_steps_are_done() {
        let dir = TempDir::new().unwrap();

        // Without env vars the last step is the acknowledgement
        let (mut progress, job) = progress(&dir, OutputFormat::Text, false, false);
        assert_eq!(exit_index(&mut progress, full_run(&job)), Some(5));

        let dir = TempDir::new().unwrap();
        let (mut progress, job) = self::progress(&dir, OutputFormat::Text, false, true);
        assert_eq!(exit_index(&mut progress, full_run(&job)), Some(3));

        let dir = TempDir::new().unwrap();
        let (mut progress, job) = self::progress(&dir, OutputFormat::Text, true, true);
        assert_eq!(exit_index(&mut progress, full_run(&job)), Some(6));
    }

    #[test]
    fn test_countdown_heading_follows_start_time() {
        let dir = TempDir::new().unwrap();
        let (mut progress, job) = progress(&dir, OutputFormat::Text, false, false);
        let start = job.schedule.start_time;
        let header = |progress: &DeployProgress| progress.steps.as_ref().unwrap().header();

        // Unknown start time before the job is prepared
        progress.tick(start - 5_000);
        assert_eq!(header(&progress), "Deploying project");

        progress.handle(StatusEvent::prepared(&job)).unwrap();
        progress.tick(start - 5_000);
        assert_eq!(
            header(&progress),
            "Deploying project (first execution scheduled in 5s)"
        );
        progress.tick(start + 1);
        assert_eq!(header(&progress), "Deploying project");
    }

    #[test]
    fn test_failure_marks_record() {
        let dir = TempDir::new().unwrap();
        let (mut progress, job) = progress(&dir, OutputFormat::Text, false, false);
        progress.handle(StatusEvent::prepared(&job)).unwrap();
        progress
            .handle(StatusEvent::waiting_for_match(vec![JobId::acurast(OWNER, 7)]))
            .unwrap();

        progress.fail("status stream closed");
        let (_, record) = progress.store.find_by_job_number(7).unwrap().unwrap();
        assert_eq!(record.status, RecordStatus::Failed);
    }
}
