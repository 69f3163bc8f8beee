// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Conversion of a [`ProjectConfig`] into a [`JobRegistration`].
//!
//! The conversion is pure: the current time is passed in, so a fixed `now_ms`
//! always yields the same registration.

use chrono::DateTime;
use thiserror::Error;

use super::registration::{
    AssignmentStrategy, JobRegistration, JobRequirements, PlannedExecution,
    ProcessorVersionRequirements, RegistrationExtra, Schedule, Version, PLATFORM_ANDROID,
    PLATFORM_IOS,
};
use super::types::{
    AssignmentStrategyConfig, Execution, MinProcessorVersions, ProjectConfig, StartAt,
    TimestampValue,
};

pub const SECOND_MS: u64 = 1_000;
pub const MINUTE_MS: u64 = 60 * SECOND_MS;
pub const HOUR_MS: u64 = 60 * MINUTE_MS;
pub const DAY_MS: u64 = 24 * HOUR_MS;

pub const DEFAULT_DURATION_MS: u64 = 10_000;
pub const DEFAULT_REPLICAS: u8 = 1;
pub const DEFAULT_REWARD: u128 = 100_000_000_000;
pub const DEFAULT_MAX_ALLOWED_START_DELAY_MS: u64 = 10_000;
pub const DEFAULT_PROCESSOR_REPUTATION: u128 = 0;
pub const DEFAULT_START_DELAY_MS: u64 = 5 * MINUTE_MS;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("Invalid start timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("Invalid {platform} processor version: {value}")]
    InvalidVersion { platform: String, value: String },
    #[error("Schedule is too long: {0} overflows")]
    ScheduleOverflow(&'static str),
    #[error("Total cost overflows: {0} is too large")]
    CostOverflow(&'static str),
}

fn checked(value: Option<u64>, what: &'static str) -> Result<u64, ConvertError> {
    value.ok_or(ConvertError::ScheduleOverflow(what))
}

/// Resolve the absolute start time in unix milliseconds
pub fn resolve_start_time(config: &ProjectConfig, now_ms: u64) -> Result<u64, ConvertError> {
    match &config.start_at {
        None => checked(now_ms.checked_add(DEFAULT_START_DELAY_MS), "startTime"),
        Some(StartAt::MsFromNow { ms_from_now }) => {
            checked(now_ms.checked_add(*ms_from_now), "startAt.msFromNow")
        }
        Some(StartAt::Timestamp { timestamp }) => timestamp_to_ms(timestamp),
    }
}

pub fn timestamp_to_ms(timestamp: &TimestampValue) -> Result<u64, ConvertError> {
    match timestamp {
        TimestampValue::Millis(ms) => Ok(*ms),
        TimestampValue::DateTime(text) => {
            let parsed = DateTime::parse_from_rfc3339(text)
                .map_err(|e| ConvertError::InvalidTimestamp(format!("{}: {}", text, e)))?;
            u64::try_from(parsed.timestamp_millis())
                .map_err(|_| ConvertError::InvalidTimestamp(text.clone()))
        }
    }
}

pub fn convert_config_to_job(
    config: &ProjectConfig,
    now_ms: u64,
) -> Result<JobRegistration, ConvertError> {
    let start_time = resolve_start_time(config, now_ms)?;

    let (duration, end_time, interval) = match config.execution {
        Execution::Onetime {
            max_execution_time_in_ms,
        } => {
            let duration = if max_execution_time_in_ms == 0 {
                DEFAULT_DURATION_MS
            } else {
                max_execution_time_in_ms
            };
            // end must lie strictly after start + duration
            let end_time = checked(
                start_time
                    .checked_add(duration)
                    .and_then(|end| end.checked_add(1)),
                "execution.maxExecutionTimeInMs",
            )?;
            (duration, end_time, end_time - start_time)
        }
        Execution::Interval {
            interval_in_ms,
            number_of_executions,
            max_execution_time_in_ms,
        } => {
            let end_time = checked(
                interval_in_ms
                    .checked_mul(number_of_executions)
                    .and_then(|span| span.checked_add(start_time))
                    .and_then(|end| end.checked_add(1)),
                "execution.intervalInMs * execution.numberOfExecutions",
            )?;
            let duration =
                max_execution_time_in_ms.unwrap_or_else(|| interval_in_ms.saturating_sub(1));
            (duration, end_time, interval_in_ms)
        }
    };

    let assignment_strategy = match &config.assignment_strategy {
        AssignmentStrategyConfig::Single { instant_match } => AssignmentStrategy::Single {
            instant_match: instant_match.as_ref().map(|matches| {
                matches
                    .iter()
                    .map(|item| PlannedExecution {
                        source: item.processor.clone(),
                        start_delay: item.max_allowed_start_delay_in_ms,
                    })
                    .collect()
            }),
        },
        AssignmentStrategyConfig::Competing => AssignmentStrategy::Competing,
    };

    let allowed_sources = config
        .processor_whitelist
        .as_ref()
        .filter(|whitelist| !whitelist.is_empty())
        .cloned();

    let processor_version = config
        .min_processor_versions
        .as_ref()
        .map(processor_version_requirements)
        .transpose()?;

    let slots = if config.number_of_replicas == 0 {
        DEFAULT_REPLICAS
    } else {
        config.number_of_replicas
    };

    Ok(JobRegistration {
        script: config.file_url.clone(),
        allowed_sources,
        allow_only_verified_sources: config.only_attested_devices,
        schedule: Schedule {
            duration,
            start_time,
            end_time,
            interval,
            max_start_delay: config.max_allowed_start_delay_in_ms,
        },
        memory: config.usage_limit.max_memory,
        network_requests: config.usage_limit.max_network_requests,
        storage: config.usage_limit.max_storage,
        required_modules: config.required_modules.clone(),
        mutability: config.mutability.unwrap_or_default(),
        reuse_keys_from: config.reuse_keys_from.clone(),
        extra: RegistrationExtra {
            requirements: JobRequirements {
                assignment_strategy,
                slots,
                reward: config.max_cost_per_execution,
                min_reputation: Some(config.min_processor_reputation),
                processor_version,
                runtime: config.runtime.unwrap_or_default(),
            },
        },
    })
}

fn processor_version_requirements(
    versions: &MinProcessorVersions,
) -> Result<ProcessorVersionRequirements, ConvertError> {
    let mut min = Vec::new();
    for (platform, name, code) in [
        (PLATFORM_ANDROID, "android", &versions.android),
        (PLATFORM_IOS, "ios", &versions.ios),
    ] {
        if let Some(code) = code {
            let build_number = code.build_number().ok_or_else(|| ConvertError::InvalidVersion {
                platform: name.to_string(),
                value: format!("{:?}", code),
            })?;
            min.push(Version {
                platform,
                build_number,
            });
        }
    }
    Ok(ProcessorVersionRequirements { min })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::types::{
        InstantMatchConfig, MinProcessorVersions, Network, ScriptMutability, UsageLimit,
        VersionCode,
    };

    const NOW: u64 = 1_700_000_000_000;

    fn onetime_config(max_execution_time_in_ms: u64) -> ProjectConfig {
        ProjectConfig {
            project_name: "test".to_string(),
            file_url: "./examples/ip.js".to_string(),
            entrypoint: None,
            network: Network::Canary,
            only_attested_devices: true,
            start_at: None,
            assignment_strategy: AssignmentStrategyConfig::Single {
                instant_match: None,
            },
            execution: Execution::Onetime {
                max_execution_time_in_ms,
            },
            max_allowed_start_delay_in_ms: 0,
            usage_limit: UsageLimit {
                max_memory: 0,
                max_network_requests: 0,
                max_storage: 0,
            },
            number_of_replicas: 1,
            required_modules: None,
            min_processor_reputation: 0,
            max_cost_per_execution: DEFAULT_REWARD,
            include_environment_variables: None,
            processor_whitelist: None,
            min_processor_versions: None,
            restart_policy: None,
            runtime: None,
            mutability: None,
            reuse_keys_from: None,
        }
    }

    #[test]
    fn test_onetime_schedule() {
        let job = convert_config_to_job(&onetime_config(5000), NOW).unwrap();
        assert_eq!(job.schedule.start_time, NOW + 5 * MINUTE_MS);
        assert_eq!(job.schedule.duration, 5000);
        assert_eq!(job.schedule.end_time, job.schedule.start_time + 5001);
        assert_eq!(job.schedule.interval, 5001);
        assert_eq!(job.mutability, ScriptMutability::Immutable);
        assert_eq!(job.extra.requirements.min_reputation, Some(0));
        assert_eq!(job.allowed_sources, None);
    }

    #[test]
    fn test_interval_schedule() {
        let mut config = onetime_config(0);
        config.start_at = Some(StartAt::MsFromNow { ms_from_now: 60_000 });
        config.execution = Execution::Interval {
            interval_in_ms: 10_000,
            number_of_executions: 6,
            max_execution_time_in_ms: None,
        };
        let job = convert_config_to_job(&config, NOW).unwrap();
        assert_eq!(job.schedule.start_time, NOW + 60_000);
        assert_eq!(job.schedule.end_time, NOW + 60_000 + 60_001);
        assert_eq!(job.schedule.interval, 10_000);
        assert_eq!(job.schedule.duration, 9_999);
        assert_eq!(job.schedule.executions(), 6);
    }

    #[test]
    fn test_instant_match_and_versions() {
        let mut config = onetime_config(1000);
        config.assignment_strategy = AssignmentStrategyConfig::Single {
            instant_match: Some(vec![InstantMatchConfig {
                processor: "5Ci".to_string(),
                max_allowed_start_delay_in_ms: 2500,
            }]),
        };
        config.processor_whitelist = Some(vec![]);
        config.min_processor_versions = Some(MinProcessorVersions {
            android: Some(VersionCode::Number(91)),
            ios: Some(VersionCode::Text("63353".to_string())),
        });

        let job = convert_config_to_job(&config, NOW).unwrap();
        assert_eq!(
            job.extra.requirements.assignment_strategy,
            AssignmentStrategy::Single {
                instant_match: Some(vec![PlannedExecution {
                    source: "5Ci".to_string(),
                    start_delay: 2500
                }])
            }
        );
        assert_eq!(job.allowed_sources, None);
        let versions = job.extra.requirements.processor_version.unwrap();
        assert_eq!(
            versions.min,
            vec![
                Version {
                    platform: 0,
                    build_number: 91
                },
                Version {
                    platform: 1,
                    build_number: 63353
                }
            ]
        );
    }

    #[test]
    fn test_timestamp_start() {
        let mut config = onetime_config(1000);
        config.start_at = Some(StartAt::Timestamp {
            timestamp: TimestampValue::DateTime("2030-01-01T00:00:00Z".to_string()),
        });
        assert_eq!(resolve_start_time(&config, NOW).unwrap(), 1_893_456_000_000);

        config.start_at = Some(StartAt::Timestamp {
            timestamp: TimestampValue::DateTime("tomorrow".to_string()),
        });
        assert!(matches!(
            convert_config_to_job(&config, NOW),
            Err(ConvertError::InvalidTimestamp(_))
        ));
    }
}
