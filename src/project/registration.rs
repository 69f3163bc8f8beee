// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Job registration in the shape the marketplace expects.
//!
//! Produced by [`convert_config_to_job`](super::convert::convert_config_to_job)
//! and persisted verbatim in deployment records. Only `script` changes after
//! construction, once the IPFS reference is known.

use serde::{Deserialize, Serialize};

use super::types::{ReuseKeysFrom, RequiredModule, Runtime, ScriptMutability};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRegistration {
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_sources: Option<Vec<String>>,
    pub allow_only_verified_sources: bool,
    pub schedule: Schedule,
    pub memory: u32,
    pub network_requests: u32,
    pub storage: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_modules: Option<Vec<RequiredModule>>,
    pub mutability: ScriptMutability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reuse_keys_from: Option<ReuseKeysFrom>,
    pub extra: RegistrationExtra,
}

/// All values are milliseconds; start and end are unix timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub duration: u64,
    pub start_time: u64,
    pub end_time: u64,
    pub interval: u64,
    pub max_start_delay: u64,
}

impl Schedule {
    /// Number of execution slots the schedule spans
    pub fn executions(&self) -> u64 {
        if self.interval == 0 {
            return 0;
        }
        (self.end_time.saturating_sub(self.start_time)) / self.interval
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationExtra {
    pub requirements: JobRequirements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRequirements {
    pub assignment_strategy: AssignmentStrategy,
    pub slots: u8,
    pub reward: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reputation: Option<u128>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor_version: Option<ProcessorVersionRequirements>,
    pub runtime: Runtime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "variant")]
pub enum AssignmentStrategy {
    Single {
        #[serde(
            rename = "instantMatch",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        instant_match: Option<Vec<PlannedExecution>>,
    },
    Competing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedExecution {
    /// SS58 address of the processor
    pub source: String,
    pub start_delay: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessorVersionRequirements {
    pub min: Vec<Version>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    /// 0 = android, 1 = ios
    pub platform: u32,
    pub build_number: u32,
}

pub const PLATFORM_ANDROID: u32 = 0;
pub const PLATFORM_IOS: u32 = 1;
