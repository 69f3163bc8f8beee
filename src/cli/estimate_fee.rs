// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::Result;
use clap::Args;

use super::load_project;
use super::output::{ConsoleOutput, OutputFormat};
use crate::config::Settings;
use crate::fees::{fee_analysis, format_cacu, format_cacu_unsigned, FeeAnalysis, FeeWarning};
use crate::utils::{now_ms, pluralize};

/// Arguments for the estimate-fee command
#[derive(Args, Debug)]
pub struct EstimateFeeArgs {
    /// Name of the project in acurast.json
    pub project: Option<String>,

    /// Output a json with the estimation or human-readable text
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

pub fn run(settings: &Settings, args: EstimateFeeArgs) -> Result<()> {
    let output = ConsoleOutput::new(args.output);
    let now = now_ms();

    let Some((config, _notes)) = load_project(settings, args.project.as_deref(), &output, now)
    else {
        return Ok(());
    };

    if !output.is_json() {
        output.log("");
        output.log(&format!("Estimating fees for project \"{}\"", config.project_name));
        output.log("");
    }

    let analysis = fee_analysis(&config, now)?;
    if output.is_json() {
        output.json(&analysis);
    } else {
        print_fee_costs(&output, &analysis);
    }
    Ok(())
}

pub fn print_fee_costs(output: &ConsoleOutput, analysis: &FeeAnalysis) {
    let suggested = format!(
        "Suggested fee: {} cACU ({}), your max fee: {} cACU ({}), excess: {} cACU ({})",
        output.highlight(&format_cacu_unsigned(analysis.suggested_cost_per_execution)),
        analysis.suggested_cost_per_execution,
        output.highlight(&analysis.max_cost_per_execution_cacu),
        analysis.max_cost_per_execution,
        output.highlight(&format_cacu(analysis.excess_cost_per_execution)),
        analysis.excess_cost_per_execution,
    );

    match analysis.warning() {
        Some(FeeWarning::BelowSuggested) => {
            output.log(&format!(
                "{}\n{}",
                output.warning("The \"maxCostPerExecution\" you set in acurast.json is below the suggested fee. There is a chance that your deployment will not get matched!"),
                suggested
            ));
            output.log("");
        }
        Some(FeeWarning::Overpaying(percent)) => {
            output.log(&format!(
                "{}\n{}",
                output.warning(&format!("The \"maxCostPerExecution\" you set in acurast.json is {}% above the suggested fee. It is possible that you are overpaying for your deployment!", percent)),
                suggested
            ));
            output.log("");
        }
        None => {}
    }

    output.log(&format!(
        "There will be {} {} with {} {}. (Total runs: {})",
        output.highlight(&analysis.number_of_executions.to_string()),
        pluralize(analysis.number_of_executions, "execution"),
        output.highlight(&analysis.number_of_replicas.to_string()),
        pluralize(analysis.number_of_replicas, "replica"),
        output.highlight(&analysis.total_runs.to_string()),
    ));
    output.log("");
    output.log(&format!(
        "The maximum cost per execution is {} cACU, which means each replica will cost {} cACU.",
        output.highlight(&analysis.max_cost_per_execution_cacu),
        output.highlight(&analysis.max_cost_per_execution_per_replica_cacu),
    ));
    output.log("");
    output.log(&format!(
        "The total cost will be {} cACU.",
        output.highlight(&analysis.max_total_cost_cacu)
    ));
    output.log("");
}
