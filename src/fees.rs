// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Fee suggestion and cost analysis for deployments.
//!
//! Amounts are integers in the smallest unit of cACU (12 decimals).

use serde::Serialize;

use crate::project::{convert_config_to_job, ConvertError, ProjectConfig};

pub const ACURAST_DECIMALS: u32 = 12;
pub const DEFAULT_BASE_FEE: u128 = 2_000_000_000;
pub const DEFAULT_FEE_PER_MILLIS: u128 = 1;
pub const DEFAULT_FEE_PER_BYTE: u128 = 1;
pub const DEFAULT_MATCHER_FEE: u128 = 30_000_000_000;

/// Overpaying threshold relative to the suggested fee
pub const EXCESS_WARNING_RATIO: f64 = 0.1;

const UNIT: u128 = 10u128.pow(ACURAST_DECIMALS);

/// Minimum reward a processor is expected to accept for one execution
pub fn suggest_cost_per_execution(duration_ms: u64, storage_bytes: u32) -> u128 {
    DEFAULT_FEE_PER_MILLIS * duration_ms as u128
        + DEFAULT_FEE_PER_BYTE * storage_bytes as u128
        + DEFAULT_BASE_FEE
        + DEFAULT_MATCHER_FEE
}

/// Reward shown on deploy: twice the base cost without matcher fee
pub fn suggest_reward(duration_ms: u64, storage_bytes: u32) -> u128 {
    (DEFAULT_FEE_PER_MILLIS * duration_ms as u128
        + DEFAULT_FEE_PER_BYTE * storage_bytes as u128
        + DEFAULT_BASE_FEE)
        * 2
}

/// Format an amount as a decimal cACU string without trailing zeros
pub fn format_cacu(amount: i128) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    let whole = abs / UNIT;
    let fraction = abs % UNIT;
    if fraction == 0 {
        return format!("{}{}", sign, whole);
    }
    let digits = format!("{:0width$}", fraction, width = ACURAST_DECIMALS as usize);
    format!("{}{}.{}", sign, whole, digits.trim_end_matches('0'))
}

pub fn format_cacu_unsigned(amount: u128) -> String {
    format_cacu(i128::try_from(amount).unwrap_or(i128::MAX))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeeAnalysis {
    pub project: String,
    pub number_of_executions: u64,
    pub number_of_replicas: u64,
    pub total_runs: u64,
    pub max_cost_per_execution: u128,
    #[serde(rename = "maxCostPerExecutionCACU")]
    pub max_cost_per_execution_cacu: String,
    /// Cost of one replica over all executions
    pub max_cost_per_execution_per_replica: u128,
    #[serde(rename = "maxCostPerExecutionPerReplicaCACU")]
    pub max_cost_per_execution_per_replica_cacu: String,
    pub max_total_cost: u128,
    #[serde(rename = "maxTotalCostCACU")]
    pub max_total_cost_cacu: String,
    pub suggested_cost_per_execution: u128,
    pub excess_cost_per_execution: i128,
    pub excess_cost_per_execution_percentage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeWarning {
    BelowSuggested,
    /// Percentage above the suggested fee, rounded
    Overpaying(u64),
}

impl FeeAnalysis {
    pub fn warning(&self) -> Option<FeeWarning> {
        if self.excess_cost_per_execution < 0 {
            Some(FeeWarning::BelowSuggested)
        } else if self.excess_cost_per_execution_percentage > EXCESS_WARNING_RATIO {
            Some(FeeWarning::Overpaying(
                (self.excess_cost_per_execution_percentage * 100.0).round() as u64,
            ))
        } else {
            None
        }
    }
}

pub fn fee_analysis(config: &ProjectConfig, now_ms: u64) -> Result<FeeAnalysis, ConvertError> {
    let job = convert_config_to_job(config, now_ms)?;

    let suggested = suggest_cost_per_execution(job.schedule.duration, job.storage);
    let max_cost = config.max_cost_per_execution;
    let excess = i128::try_from(max_cost)
        .unwrap_or(i128::MAX)
        .saturating_sub(suggested as i128);
    let percentage = excess as f64 / suggested as f64;

    let executions = config.number_of_executions();
    let replicas = config.number_of_replicas as u64;
    let per_replica = max_cost
        .checked_mul(executions as u128)
        .ok_or(ConvertError::CostOverflow("maxCostPerExecution"))?;
    let total = per_replica
        .checked_mul(replicas as u128)
        .ok_or(ConvertError::CostOverflow("maxCostPerExecution"))?;

    Ok(FeeAnalysis {
        project: config.project_name.clone(),
        number_of_executions: executions,
        number_of_replicas: replicas,
        total_runs: executions.saturating_mul(replicas),
        max_cost_per_execution: max_cost,
        max_cost_per_execution_cacu: format_cacu_unsigned(max_cost),
        max_cost_per_execution_per_replica: per_replica,
        max_cost_per_execution_per_replica_cacu: format_cacu_unsigned(per_replica),
        max_total_cost: total,
        max_total_cost_cacu: format_cacu_unsigned(total),
        suggested_cost_per_execution: suggested,
        excess_cost_per_execution: excess,
        excess_cost_per_execution_percentage: percentage,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggested_cost_values() {
        assert_eq!(suggest_cost_per_execution(1000, 1024), 32_000_002_024);
        assert_eq!(suggest_cost_per_execution(0, 0), 32_000_000_000);
        assert_eq!(suggest_cost_per_execution(3_600_000, 1_048_576), 32_004_648_576);
        assert_eq!(suggest_cost_per_execution(1, 1), 32_000_000_002);
    }

    #[test]
    fn test_suggested_cost_is_linear() {
        let base = suggest_cost_per_execution(0, 0);
        for (d, s) in [(5u64, 7u32), (86_400_000, 0), (0, u32::MAX)] {
            assert_eq!(
                suggest_cost_per_execution(d, s),
                base + d as u128 * DEFAULT_FEE_PER_MILLIS + s as u128 * DEFAULT_FEE_PER_BYTE
            );
        }
    }

    #[test]
    fn test_format_cacu() {
        assert_eq!(format_cacu(32_000_002_024), "0.032000002024");
        assert_eq!(format_cacu(1_000_000_000_000), "1");
        assert_eq!(format_cacu(2_500_000_000_000), "2.5");
        assert_eq!(format_cacu(-30_000_000_000), "-0.03");
        assert_eq!(format_cacu(0), "0");
    }

    #[test]
    fn test_suggest_reward() {
        assert_eq!(format_cacu_unsigned(suggest_reward(5000, 0)), "0.00400001");
    }
}
