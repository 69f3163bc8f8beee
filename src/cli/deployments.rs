// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, bail, Result};
use clap::Args;
use std::sync::Arc;
use tracing::{info, warn};

use super::connect;
use super::output::{ConsoleOutput, OutputFormat};
use crate::blockchain::types::{JobId, RegisteredJob};
use crate::blockchain::Marketplace;
use crate::config::Settings;
use crate::crypto::EnvironmentCipher;
use crate::deployment::{DeploymentPipeline, EnvVarSetter};
use crate::fees::format_cacu_unsigned;
use crate::project::Schedule;
use crate::storage::ipfs::IPFS_PREFIX;
use crate::storage::{DeploymentRecord, DeploymentStore, KeyStore, PinataClient};
use crate::utils::now_ms;

/// Arguments for the deployments command
#[derive(Args, Debug)]
pub struct DeploymentsArgs {
    /// `ls` / `list`, or a deployment id
    pub arg: Option<String>,

    /// Load the environment variables of a deployment and update them
    #[arg(short = 'e', long)]
    pub update_env_vars: bool,

    /// Remove old, finished deployments and return unused funds
    #[arg(short, long)]
    pub cleanup: bool,

    /// Replace the script of a mutable deployment (local path or ipfs://)
    #[arg(long, value_name = "PATH")]
    pub update_script: Option<String>,

    /// Hand editor rights of a mutable deployment to another account
    #[arg(long, value_name = "ADDRESS")]
    pub transfer_editor: Option<String>,
}

/// Arguments for the deployment command
#[derive(Args, Debug)]
pub struct DeploymentArgs {
    /// Deployment id
    pub id: Option<String>,

    /// Load the environment variables of a deployment and update them
    #[arg(short = 'e', long)]
    pub update_env_vars: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Planned,
    Running,
    Ended,
}

impl Phase {
    pub fn of(schedule: &Schedule, now_ms: u64) -> Self {
        if schedule.start_time > now_ms {
            Phase::Planned
        } else if schedule.end_time < now_ms {
            Phase::Ended
        } else {
            Phase::Running
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planned => "planned",
            Phase::Running => "running",
            Phase::Ended => "ended",
        }
    }
}

/// Accepts `1234` as well as the grouped `1,234`
pub fn parse_deployment_id(input: &str) -> Option<u128> {
    input.replace(',', "").trim().parse().ok().filter(|id| *id > 0)
}

/// A deregistered deployment and the funds it returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedUp {
    pub number: u128,
    pub regained: u128,
}

/// Own jobs, newest first
pub fn sort_newest_first(mut jobs: Vec<RegisteredJob>) -> Vec<RegisteredJob> {
    jobs.sort_by(|a, b| b.id.number().cmp(&a.id.number()));
    jobs
}

/// Own jobs whose schedule ended before `now_ms`, oldest first
pub fn ended_jobs(jobs: &[RegisteredJob], now_ms: u64) -> Vec<RegisteredJob> {
    let mut ended: Vec<RegisteredJob> = jobs
        .iter()
        .filter(|job| Phase::of(&job.schedule, now_ms) == Phase::Ended)
        .cloned()
        .collect();
    ended.sort_by_key(|job| job.id.number());
    ended
}

pub async fn run(settings: &Settings, args: DeploymentsArgs) -> Result<()> {
    let output = ConsoleOutput::new(OutputFormat::Text);

    if matches!(args.arg.as_deref(), Some("ls") | Some("list")) {
        let marketplace = connect(settings).await?;
        return list(&output, marketplace.as_ref()).await;
    }

    let deployment_id = args.arg.as_deref().and_then(parse_deployment_id);

    if args.cleanup {
        let marketplace = connect(settings).await?;
        cleanup(settings, &output, marketplace.as_ref(), deployment_id).await?;
        return Ok(());
    }

    let Some(deployment_id) = deployment_id else {
        output.log("Please provide a deployment ID");
        return Ok(());
    };

    let store = DeploymentStore::new(settings.deployments_dir());
    let Some((_, record)) = store.find_by_job_number(deployment_id)? else {
        output.log("Could not find deployment file.");
        return Ok(());
    };
    let job_id = record
        .deployment_id
        .clone()
        .ok_or_else(|| anyhow!("Deployment record has no deployment id"))?;

    if args.update_env_vars {
        let marketplace = connect(settings).await?;
        return update_env_vars(settings, &output, marketplace, &job_id, &record).await;
    }

    if let Some(script) = &args.update_script {
        let marketplace = connect(settings).await?;
        return update_script(settings, &output, marketplace, &job_id, &record, script).await;
    }

    if let Some(new_editor) = &args.transfer_editor {
        let marketplace = connect(settings).await?;
        return transfer_editor(&output, marketplace.as_ref(), &job_id, new_editor).await;
    }

    show(settings, &output, &job_id, &record)
}

/// `acurast deployment <id>`: details or env var update of one deployment
pub async fn run_single(settings: &Settings, args: DeploymentArgs) -> Result<()> {
    run(
        settings,
        DeploymentsArgs {
            arg: args.id,
            update_env_vars: args.update_env_vars,
            cleanup: false,
            update_script: None,
            transfer_editor: None,
        },
    )
    .await
}

async fn list(output: &ConsoleOutput, marketplace: &dyn Marketplace) -> Result<()> {
    let spinner = output.spinner("Loading deployments...");
    let jobs = marketplace.registered_jobs(&marketplace.account()).await;
    spinner.finish_and_clear();
    let jobs = sort_newest_first(jobs?);

    if jobs.is_empty() {
        output.log("No deployments found");
        return Ok(());
    }

    output.log("You have the following deployments:");
    let now = now_ms();
    for job in &jobs {
        output.log(&format!(
            "{} - {}",
            job.id.number(),
            Phase::of(&job.schedule, now).as_str()
        ));
    }
    Ok(())
}

/// Deregister one deployment, or every ended one, and drop their records
async fn cleanup(
    settings: &Settings,
    output: &ConsoleOutput,
    marketplace: &dyn Marketplace,
    deployment_id: Option<u128>,
) -> Result<Vec<CleanedUp>> {
    let account = marketplace.account();
    let store = DeploymentStore::new(settings.deployments_dir());

    let targets = match deployment_id {
        Some(number) => vec![JobId::acurast(&account, number)],
        None => {
            let spinner = output.spinner("Cleaning up old deployments...");
            let jobs = marketplace.registered_jobs(&account).await;
            spinner.finish_and_clear();
            let ended = ended_jobs(&jobs?, now_ms());
            output.log(&format!("Found {} deployments to clean up", ended.len()));
            ended.into_iter().map(|job| job.id).collect()
        }
    };

    let mut cleaned = Vec::new();
    let mut balance_before = marketplace.free_balance(&account).await?;
    for id in &targets {
        let spinner = output.spinner(&format!("Cleaning up deployment {}...", id.number()));
        let result = marketplace.deregister_job(id).await;
        spinner.finish_and_clear();
        if let Err(e) = result {
            if deployment_id.is_some() {
                return Err(e.into());
            }
            warn!("Failed to clean up deployment {}: {}", id, e);
            output.log(&format!("Failed to clean up deployment {}: {}", id, e));
            continue;
        }
        if store.remove(id.number())? {
            info!("Removed local record of deployment {}", id);
        }

        let balance_new = marketplace.free_balance(&account).await?;
        let regained = balance_new.saturating_sub(balance_before);
        let suffix = if regained > 0 {
            format!(". cACU regained: {}", format_cacu_unsigned(regained))
        } else {
            String::new()
        };
        output.log(&format!("✔ Deployment {} cleaned up{}", id.number(), suffix));
        cleaned.push(CleanedUp {
            number: id.number(),
            regained,
        });
        balance_before = balance_new;
    }
    Ok(cleaned)
}

async fn transfer_editor(
    output: &ConsoleOutput,
    marketplace: &dyn Marketplace,
    job_id: &JobId,
    new_editor: &str,
) -> Result<()> {
    let spinner = output.spinner(&format!(
        "Transferring editor of deployment {} to {}...",
        job_id, new_editor
    ));
    let hash = marketplace.transfer_editor(job_id, Some(new_editor)).await;
    spinner.finish_and_clear();
    output.log(&format!("Editor transferred, tx ID: {}", hash?));
    Ok(())
}

fn env_var_setter(settings: &Settings, marketplace: Arc<dyn Marketplace>) -> EnvVarSetter {
    let cipher = EnvironmentCipher::new(KeyStore::new(settings.key_store_file()));
    EnvVarSetter::new(marketplace, cipher)
}

async fn update_env_vars(
    settings: &Settings,
    output: &ConsoleOutput,
    marketplace: Arc<dyn Marketplace>,
    job_id: &JobId,
    record: &DeploymentRecord,
) -> Result<()> {
    let env_vars = settings.project_env_vars(&record.config)?;
    if env_vars.is_empty() {
        output.log(&format!(
            "No environment variables found for deployment {}",
            job_id
        ));
        return Ok(());
    }

    let spinner = output.spinner(&format!(
        "Setting environment variables for deployment {}...",
        job_id
    ));
    let result = env_var_setter(settings, marketplace)
        .set_env_vars(job_id, &env_vars)
        .await;
    spinner.finish_and_clear();

    let hash = result?;
    output.log(&format!("✔ {} environment variables set", env_vars.len()));
    output.log(&format!(
        "Transaction ID: {}",
        hash.as_deref().unwrap_or("-")
    ));
    Ok(())
}

async fn update_script(
    settings: &Settings,
    output: &ConsoleOutput,
    marketplace: Arc<dyn Marketplace>,
    job_id: &JobId,
    record: &DeploymentRecord,
    script: &str,
) -> Result<()> {
    let mut config = record.config.clone();
    config.file_url = script.to_string();

    if !script.starts_with(IPFS_PREFIX) {
        settings.validate_for_deploy(true)?;
        settings.ensure_dirs()?;
    }
    let pinning = Arc::new(PinataClient::new(
        settings.ipfs_url.as_deref().unwrap_or_default(),
        settings.ipfs_api_key.as_deref().unwrap_or_default(),
        settings.base_dir(),
    ));
    let pipeline = DeploymentPipeline::new(
        marketplace.clone(),
        pinning,
        env_var_setter(settings, marketplace.clone()),
        settings.bundles_dir(),
    );

    let spinner = output.spinner("Uploading script...");
    let uploaded = pipeline.upload_script(&config).await;
    spinner.finish_and_clear();
    let ipfs_hash = uploaded?;

    let Some(hash) = ipfs_hash.strip_prefix(IPFS_PREFIX) else {
        bail!("Script must be an IPFS hash starting with \"{}\"", IPFS_PREFIX);
    };

    let spinner = output.spinner(&format!("Updating script of deployment {}...", job_id));
    let result = marketplace.edit_script(job_id, hash).await;
    spinner.finish_and_clear();
    output.log(&format!("Script updated to {}, tx ID: {}", ipfs_hash, result?));
    Ok(())
}

fn show(
    settings: &Settings,
    output: &ConsoleOutput,
    job_id: &JobId,
    record: &DeploymentRecord,
) -> Result<()> {
    output.log("Click here to open the deployment in your browser:");
    output.log(
        &settings
            .network
            .console_job_link(job_id.origin().address(), job_id.number()),
    );
    output.log("");
    output.log(&format!(
        "Deployment: {}",
        serde_json::to_string_pretty(record)?
    ));
    Ok(())
}
