// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Project configuration as authored in `acurast.json`.
//!
//! All field names follow the camelCase spelling of the JSON file. The
//! structures are loaded once per invocation and never mutated afterwards.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root of `acurast.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcurastCliConfig {
    pub projects: BTreeMap<String, ProjectConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub project_name: String,
    /// Local file, local folder or an `ipfs://` reference
    pub file_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entrypoint: Option<String>,
    pub network: Network,
    pub only_attested_devices: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_at: Option<StartAt>,
    pub assignment_strategy: AssignmentStrategyConfig,
    pub execution: Execution,
    pub max_allowed_start_delay_in_ms: u64,
    pub usage_limit: UsageLimit,
    pub number_of_replicas: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_modules: Option<Vec<RequiredModule>>,
    pub min_processor_reputation: u128,
    /// Reward per execution in the smallest unit (12 decimals)
    pub max_cost_per_execution: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_environment_variables: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor_whitelist: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_processor_versions: Option<MinProcessorVersions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart_policy: Option<RestartPolicy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime: Option<Runtime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mutability: Option<ScriptMutability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reuse_keys_from: Option<ReuseKeysFrom>,
}

impl ProjectConfig {
    pub fn number_of_executions(&self) -> u64 {
        match self.execution {
            Execution::Onetime { .. } => 1,
            Execution::Interval {
                number_of_executions,
                ..
            } => number_of_executions,
        }
    }

    pub fn has_environment_variables(&self) -> bool {
        self.include_environment_variables
            .as_ref()
            .map(|vars| !vars.is_empty())
            .unwrap_or(false)
    }

    pub fn is_ipfs_script(&self) -> bool {
        self.file_url.starts_with("ipfs://")
    }

    /// Time span covered by all executions, used for the schedule summary
    pub fn total_run_time_ms(&self) -> u64 {
        match self.execution {
            Execution::Onetime {
                max_execution_time_in_ms,
            } => max_execution_time_in_ms,
            Execution::Interval {
                interval_in_ms,
                number_of_executions,
                ..
            } => interval_in_ms.saturating_mul(number_of_executions),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Network {
    #[serde(rename = "canary")]
    Canary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StartAt {
    MsFromNow {
        #[serde(rename = "msFromNow")]
        ms_from_now: u64,
    },
    Timestamp {
        timestamp: TimestampValue,
    },
}

/// Absolute start, either unix milliseconds or an RFC 3339 date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    Millis(u64),
    DateTime(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AssignmentStrategyConfig {
    Single {
        #[serde(
            rename = "instantMatch",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        instant_match: Option<Vec<InstantMatchConfig>>,
    },
    Competing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstantMatchConfig {
    pub processor: String,
    pub max_allowed_start_delay_in_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Execution {
    Onetime {
        #[serde(rename = "maxExecutionTimeInMs")]
        max_execution_time_in_ms: u64,
    },
    Interval {
        #[serde(rename = "intervalInMs")]
        interval_in_ms: u64,
        #[serde(rename = "numberOfExecutions")]
        number_of_executions: u64,
        #[serde(
            rename = "maxExecutionTimeInMs",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        max_execution_time_in_ms: Option<u64>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageLimit {
    pub max_memory: u32,
    pub max_network_requests: u32,
    pub max_storage: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequiredModule {
    DataEncryption,
    #[serde(rename = "LLM")]
    Llm,
}

impl RequiredModule {
    pub const ALL: [&'static str; 2] = ["DataEncryption", "LLM"];
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MinProcessorVersions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<VersionCode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<VersionCode>,
}

/// Build number as written by the user, either `91` or `"91"`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VersionCode {
    Number(u32),
    Text(String),
}

impl VersionCode {
    pub fn build_number(&self) -> Option<u32> {
        match self {
            VersionCode::Number(n) => Some(*n),
            VersionCode::Text(s) => s.trim().parse().ok(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RestartPolicy {
    #[default]
    OnFailure,
    Always,
    Never,
}

impl RestartPolicy {
    pub const ALL: [&'static str; 3] = ["onFailure", "always", "never"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Runtime {
    NodeJS,
    #[default]
    NodeJSWithBundle,
    Shell,
}

impl Runtime {
    pub const ALL: [&'static str; 3] = ["NodeJS", "NodeJSWithBundle", "Shell"];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ScriptMutability {
    #[default]
    Immutable,
    Mutable,
}

impl ScriptMutability {
    pub const ALL: [&'static str; 2] = ["Immutable", "Mutable"];
}

/// Origin chain of a job registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MultiOriginKind {
    Acurast,
    Tezos,
    Ethereum,
    AlephZero,
    Vara,
    Ethereum20,
    Solana,
}

impl MultiOriginKind {
    pub const ALL: [&'static str; 7] = [
        "Acurast",
        "Tezos",
        "Ethereum",
        "AlephZero",
        "Vara",
        "Ethereum20",
        "Solana",
    ];
}

/// `[origin, address, deploymentNumber]` of an earlier deployment whose keys are reused
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReuseKeysFrom(pub MultiOriginKind, pub String, pub u128);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_execution_tagging() {
        let onetime: Execution =
            serde_json::from_value(json!({"type": "onetime", "maxExecutionTimeInMs": 5000}))
                .unwrap();
        assert_eq!(
            onetime,
            Execution::Onetime {
                max_execution_time_in_ms: 5000
            }
        );

        let interval: Execution = serde_json::from_value(
            json!({"type": "interval", "intervalInMs": 60000, "numberOfExecutions": 3}),
        )
        .unwrap();
        assert_eq!(
            interval,
            Execution::Interval {
                interval_in_ms: 60000,
                number_of_executions: 3,
                max_execution_time_in_ms: None
            }
        );
    }

    #[test]
    fn test_start_at_variants() {
        let relative: StartAt = serde_json::from_value(json!({"msFromNow": 1000})).unwrap();
        assert_eq!(relative, StartAt::MsFromNow { ms_from_now: 1000 });

        let absolute: StartAt =
            serde_json::from_value(json!({"timestamp": "2030-01-01T00:00:00Z"})).unwrap();
        assert_eq!(
            absolute,
            StartAt::Timestamp {
                timestamp: TimestampValue::DateTime("2030-01-01T00:00:00Z".to_string())
            }
        );
    }

    #[test]
    fn test_reuse_keys_from_is_a_tuple() {
        let value = ReuseKeysFrom(MultiOriginKind::Acurast, "5Ci".to_string(), 12);
        assert_eq!(
            serde_json::to_value(&value).unwrap(),
            json!(["Acurast", "5Ci", 12])
        );
    }

    #[test]
    fn test_restart_policy_spelling() {
        assert_eq!(
            serde_json::to_value(RestartPolicy::OnFailure).unwrap(),
            json!("onFailure")
        );
        let code = VersionCode::Text("63353".to_string());
        assert_eq!(code.build_number(), Some(63353));
    }
}
