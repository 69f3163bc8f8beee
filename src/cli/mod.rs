// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod deploy;
pub mod deployments;
pub mod estimate_fee;
pub mod init;
pub mod open;
pub mod output;
pub mod stubs;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{debug, error};

use crate::blockchain::{AcurastClient, Marketplace, Wallet};
use crate::config::Settings;
use crate::project::{load_raw_project, validate_config, Issue, ProjectConfig};
use output::ConsoleOutput;

/// Acurast CLI
#[derive(Parser, Debug)]
#[command(name = "acurast")]
#[command(version)]
#[command(about = "Deploy scripts to the Acurast compute marketplace", long_about = None)]
pub struct Cli {
    /// RPC endpoint of the Acurast chain
    #[arg(long, env = "ACURAST_RPC", global = true)]
    pub rpc: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy the current project to the Acurast platform
    Deploy(deploy::DeployArgs),

    /// Estimate the fees for the specified project deployment
    EstimateFee(estimate_fee::EstimateFeeArgs),

    /// Create an acurast.json file and .env file
    Init(init::InitArgs),

    /// Manage deployments
    Deployments(deployments::DeploymentsArgs),

    /// Show or update a single deployment
    Deployment(deployments::DeploymentArgs),

    /// Open Acurast websites in your browser
    Open(open::OpenArgs),

    /// (v2) Log in to the Acurast CLI with your manager account
    Login,

    /// (v2) Log out of the Acurast CLI
    Logout,

    /// Run the project locally
    Run,

    /// Run the tests of the project
    Test,

    /// Get information about your deployed jobs
    #[command(alias = "job")]
    Jobs {
        /// The ID of the job to get information about
        job_id: String,
    },

    /// Set up live coding environment on a processor
    Live,
}

/// Execute CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let settings = Settings::from_env().with_rpc(cli.rpc);
    debug!("Using RPC {}", settings.rpc_url());

    match cli.command {
        Commands::Deploy(args) => deploy::run(&settings, args).await,
        Commands::EstimateFee(args) => estimate_fee::run(&settings, args),
        Commands::Init(args) => init::run(&settings, args),
        Commands::Deployments(args) => deployments::run(&settings, args).await,
        Commands::Deployment(args) => deployments::run_single(&settings, args).await,
        Commands::Open(args) => open::run(&settings, args),
        Commands::Login => stubs::login(),
        Commands::Logout => stubs::logout(),
        Commands::Run => stubs::run(),
        Commands::Test => stubs::test(),
        Commands::Jobs { job_id } => stubs::jobs(&job_id),
        Commands::Live => stubs::live(),
    }
}

/// Load and validate a project, printing problems to `output`.
///
/// `None` means the command should stop; the reason has been printed.
pub(crate) fn load_project(
    settings: &Settings,
    project: Option<&str>,
    output: &ConsoleOutput,
    now_ms: u64,
) -> Option<(ProjectConfig, Vec<Issue>)> {
    let raw = match load_raw_project(&settings.config_file(), project) {
        Ok(raw) => raw,
        Err(e) => {
            output.log(&e.to_string());
            return None;
        }
    };

    match validate_config(&raw, now_ms).into_result() {
        Ok(valid) => Some(valid),
        Err(e) => {
            error!("Config is invalid {:?}", e.issues);
            output.log("");
            output.log("⚠️ Project config is invalid:");
            output.log("");
            for issue in &e.issues {
                output.log(&format!("- {}", issue));
            }
            None
        }
    }
}

pub(crate) fn print_notes(output: &ConsoleOutput, notes: &[Issue]) {
    if notes.is_empty() {
        return;
    }
    output.log("⚠️ Project config is valid, but here are some notes:");
    for note in notes {
        output.log(&format!("- {}", note.message));
    }
    output.log("");
}

pub(crate) fn wallet(settings: &Settings) -> Result<Wallet> {
    let mnemonic = settings.require_mnemonic()?;
    Ok(Wallet::from_mnemonic(mnemonic)?)
}

/// Open the chain connection signed by the configured account
pub(crate) async fn connect(settings: &Settings) -> Result<Arc<dyn Marketplace>> {
    let wallet = wallet(settings)?;
    let client = AcurastClient::connect(settings.rpc_url(), Some(wallet))
        .await
        .with_context(|| format!("Failed to connect to {}", settings.rpc_url()))?;
    Ok(Arc::new(client))
}
