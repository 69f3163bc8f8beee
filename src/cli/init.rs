// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, bail, Context, Result};
use clap::{Args, ValueEnum};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::info;

use crate::config::Settings;
use crate::project::convert::{DEFAULT_MAX_ALLOWED_START_DELAY_MS, DEFAULT_REWARD};
use crate::project::types::{AssignmentStrategyConfig, Network, UsageLimit};
use crate::project::{project_names, AcurastCliConfig, Execution, ProjectConfig};
use crate::utils::time::parse_duration_ms;

pub const ENV_TEMPLATE: &str = "# ACURAST_MNEMONIC=\n# ACURAST_IPFS_URL=\n# ACURAST_IPFS_API_KEY=\n";
pub const ENV_HELP_LINK: &str = "https://github.com/Acurast/acurast-cli";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExecutionType {
    Onetime,
    Interval,
}

/// Arguments for the init command
#[derive(Args, Debug, Default)]
pub struct InitArgs {
    /// Do not ask for any input, use the flags and defaults
    #[arg(short, long)]
    pub non_interactive: bool,

    /// Name of the project
    #[arg(long)]
    pub name: Option<String>,

    /// Run the app one time or in an interval
    #[arg(long, value_enum)]
    pub execution: Option<ExecutionType>,

    /// Duration of a one time execution (eg. 1s, 5min or 2h)
    #[arg(long)]
    pub duration: Option<String>,

    /// Interval between executions (eg. 30s or 1h)
    #[arg(long)]
    pub interval: Option<String>,

    /// Number of executions for an interval deployment
    #[arg(long)]
    pub executions: Option<u64>,

    /// The bundled javascript file to run
    #[arg(long)]
    pub file_url: Option<String>,
}

/// Line based questions on stdin/stdout
pub struct Prompter<R: BufRead, W: Write> {
    input: R,
    output: W,
    interactive: bool,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W, interactive: bool) -> Self {
        Self {
            input,
            output,
            interactive,
        }
    }

    /// Ask until `parse` accepts the answer. Non-interactive prompts take
    /// the default and fail if there is none.
    pub fn ask<T, F>(&mut self, message: &str, default: Option<&str>, parse: F) -> Result<T>
    where
        F: Fn(&str) -> std::result::Result<T, String>,
    {
        if !self.interactive {
            let value = default.ok_or_else(|| anyhow!("No value given for \"{}\"", message))?;
            return parse(value).map_err(|e| anyhow!(e));
        }
        loop {
            match default {
                Some(default) => write!(self.output, "{} ({}) ", message, default)?,
                None => write!(self.output, "{} ", message)?,
            }
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                bail!("Input ended before \"{}\" was answered", message);
            }
            let answer = match line.trim() {
                "" => default.unwrap_or(""),
                answer => answer,
            };
            match parse(answer) {
                Ok(value) => return Ok(value),
                Err(e) => writeln!(self.output, "{}", e)?,
            }
        }
    }

    pub fn confirm(&mut self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        self.ask(&format!("{} [{}]", message, hint), Some(if default { "y" } else { "n" }), |a| {
            match a.to_lowercase().as_str() {
                "y" | "yes" => Ok(true),
                "n" | "no" => Ok(false),
                _ => Err("Please answer y or n".to_string()),
            }
        })
    }
}

fn non_empty(input: &str) -> std::result::Result<String, String> {
    if input.is_empty() {
        Err("Please enter a valid name".to_string())
    } else {
        Ok(input.to_string())
    }
}

fn duration(input: &str) -> std::result::Result<u64, String> {
    parse_duration_ms(input).ok_or_else(|| "Please enter a valid duration greater than 0".to_string())
}

fn positive(input: &str) -> std::result::Result<u64, String> {
    match input.parse::<u64>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err("Please enter a valid number greater than 0".to_string()),
    }
}

/// Project defaults written by `acurast init`
pub fn new_project_config(name: &str, file_url: &str, execution: Execution) -> ProjectConfig {
    ProjectConfig {
        project_name: name.to_string(),
        file_url: file_url.to_string(),
        entrypoint: None,
        network: Network::Canary,
        only_attested_devices: true,
        start_at: None,
        assignment_strategy: AssignmentStrategyConfig::Single {
            instant_match: None,
        },
        execution,
        max_allowed_start_delay_in_ms: DEFAULT_MAX_ALLOWED_START_DELAY_MS,
        usage_limit: UsageLimit {
            max_memory: 0,
            max_network_requests: 0,
            max_storage: 0,
        },
        number_of_replicas: 1,
        required_modules: Some(Vec::new()),
        min_processor_reputation: 0,
        max_cost_per_execution: DEFAULT_REWARD,
        include_environment_variables: Some(Vec::new()),
        processor_whitelist: Some(Vec::new()),
        min_processor_versions: None,
        restart_policy: None,
        runtime: None,
        mutability: None,
        reuse_keys_from: None,
    }
}

/// Add `config` to the config file at `path`, creating the file if needed
pub fn add_project(path: &Path, config: ProjectConfig) -> Result<()> {
    let mut root = if path.exists() {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        serde_json::from_str::<AcurastCliConfig>(&content)
            .with_context(|| format!("{} is not a valid config file", path.display()))?
    } else {
        AcurastCliConfig {
            projects: BTreeMap::new(),
        }
    };

    if root.projects.contains_key(&config.project_name) {
        bail!("Project \"{}\" already exists", config.project_name);
    }
    root.projects.insert(config.project_name.clone(), config);

    std::fs::write(path, serde_json::to_string_pretty(&root)?)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// `name` and `main` of a `package.json` next to the config, if present
fn package_defaults(root: &Path) -> (Option<String>, Option<String>) {
    let Ok(content) = std::fs::read_to_string(root.join("package.json")) else {
        return (None, None);
    };
    let Ok(package) = serde_json::from_str::<Value>(&content) else {
        return (None, None);
    };
    let field = |key: &str| package.get(key).and_then(Value::as_str).map(str::to_string);
    (field("name"), field("main"))
}

pub fn run(settings: &Settings, args: InitArgs) -> Result<()> {
    let stdin = io::stdin();
    let mut prompter = Prompter::new(stdin.lock(), io::stdout(), !args.non_interactive);
    init_project(settings, args, &mut prompter)
}

pub fn init_project<R: BufRead, W: Write>(
    settings: &Settings,
    args: InitArgs,
    prompter: &mut Prompter<R, W>,
) -> Result<()> {
    println!("Initializing Acurast CLI");

    let config_file = settings.config_file();
    let existing = project_names(&config_file)?;
    if config_file.exists() {
        println!("An acurast.json file already exists");
        if !prompter.confirm("Do you want to add another project?", true)? {
            println!("You can deploy your app using \"acurast deploy\"");
            return Ok(());
        }
    }

    let env_file = settings.env_file();
    if env_file.exists() {
        println!(
            "You already have a .env file. Visit {} to learn more.",
            ENV_HELP_LINK
        );
    } else if prompter.confirm("You don't have a .env file. Do you want to create one?", true)? {
        std::fs::write(&env_file, ENV_TEMPLATE)
            .with_context(|| format!("Failed to write {}", env_file.display()))?;
    }

    let (package_name, package_main) = package_defaults(&settings.root);
    let default_name = args.name.clone().or(package_name);
    let name = prompter.ask(
        "Enter the name of the project:",
        default_name.as_deref(),
        |input| {
            let name = non_empty(input)?;
            if existing.contains(&name) {
                return Err(format!("Project \"{}\" already exists", name));
            }
            Ok(name)
        },
    )?;

    let execution_type = match args.execution {
        Some(execution) => execution,
        None => prompter.ask(
            "Should the app be run one time or in an interval? (onetime/interval)",
            Some("onetime"),
            |input| ExecutionType::from_str(input, true),
        )?,
    };

    let execution = match execution_type {
        ExecutionType::Onetime => Execution::Onetime {
            max_execution_time_in_ms: prompter.ask(
                "Enter the duration (eg. 1s, 5min or 2h):",
                args.duration.as_deref(),
                duration,
            )?,
        },
        ExecutionType::Interval => {
            let executions = args.executions.map(|n| n.to_string());
            let number_of_executions = prompter.ask(
                "How many times should the app run?",
                executions.as_deref(),
                positive,
            )?;
            let interval_in_ms = prompter.ask(
                "What is the interval (eg. 30s, 5min or 1h)?",
                args.interval.as_deref(),
                duration,
            )?;
            Execution::Interval {
                interval_in_ms,
                number_of_executions,
                max_execution_time_in_ms: None,
            }
        }
    };

    let default_file = args.file_url.clone().or(package_main);
    let file_url = prompter.ask(
        "What is the bundled javascript file to run?",
        default_file.as_deref(),
        non_empty,
    )?;

    add_project(&config_file, new_project_config(&name, &file_url, execution))?;
    info!("Created project {} in {}", name, config_file.display());

    println!("🎉 Successfully created \"acurast.json\" and \".env\" files");
    println!("You can deploy your app using 'acurast deploy'");
    Ok(())
}
