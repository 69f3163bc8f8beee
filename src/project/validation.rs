// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Schema validation for project configs.
//!
//! Validation runs on the raw JSON value so that every problem can be reported
//! with its exact path, before the value is deserialised into a
//! [`ProjectConfig`]. Issues use the codes and messages of the JSON schema
//! tooling users already know from the web console (`invalid_type`,
//! `too_small`, ...).
//!
//! Besides hard issues the validator produces *notes*: legal configurations
//! that are likely to lead to a deployment that never runs.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use subxt::utils::AccountId32;
use thiserror::Error;

use super::convert::{timestamp_to_ms, MINUTE_MS};
use super::types::{
    AssignmentStrategyConfig, MultiOriginKind, ProjectConfig, RequiredModule, RestartPolicy,
    Runtime, ScriptMutability, StartAt,
};

pub const MAX_REPLICAS: f64 = 64.0;

const ADDRESS_MESSAGE: &str = "Invalid Acurast address";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    InvalidType,
    TooSmall,
    TooBig,
    InvalidLiteral,
    InvalidEnumValue,
    InvalidUnion,
    UnrecognizedKeys,
    InvalidString,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Issue {
    pub code: IssueCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub received: Option<String>,
    pub path: Vec<PathSegment>,
    pub message: String,
}

impl Issue {
    fn new(code: IssueCode, path: Vec<PathSegment>, message: impl Into<String>) -> Self {
        Self {
            code,
            expected: None,
            received: None,
            path,
            message: message.into(),
        }
    }

    /// Dotted path such as `execution.maxExecutionTimeInMs`
    pub fn path_string(&self) -> String {
        self.path
            .iter()
            .map(|segment| match segment {
                PathSegment::Key(key) => key.clone(),
                PathSegment::Index(index) => index.to_string(),
            })
            .collect::<Vec<_>>()
            .join(".")
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path_string(), self.message)
        }
    }
}

#[derive(Debug, Error)]
#[error("Project config is invalid:\n{}", format_issues(.issues))]
pub struct ValidationError {
    pub issues: Vec<Issue>,
}

fn format_issues(issues: &[Issue]) -> String {
    issues
        .iter()
        .map(|issue| format!("- {}", issue))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    /// Typed config, present only when validation succeeded
    pub data: Option<ProjectConfig>,
    pub issues: Vec<Issue>,
    /// Warnings for a valid config, or a copy of the issues for an invalid one
    pub notes: Vec<Issue>,
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        self.data.is_some()
    }

    pub fn into_result(self) -> Result<(ProjectConfig, Vec<Issue>), ValidationError> {
        match self.data {
            Some(config) => Ok((config, self.notes)),
            None => Err(ValidationError {
                issues: self.issues,
            }),
        }
    }
}

/// Validate a raw project config against the schema and compute notes.
pub fn validate_config(value: &Value, now_ms: u64) -> ValidationOutcome {
    let mut checker = Checker::new(now_ms);
    checker.project(value);

    if !checker.issues.is_empty() {
        let issues = checker.issues;
        return ValidationOutcome {
            data: None,
            notes: issues.clone(),
            issues,
        };
    }

    match serde_json::from_value::<ProjectConfig>(value.clone()) {
        Ok(config) => {
            let notes = config_notes(&config, now_ms);
            ValidationOutcome {
                data: Some(config),
                issues: Vec::new(),
                notes,
            }
        }
        Err(e) => {
            let issues = vec![Issue::new(IssueCode::Custom, Vec::new(), e.to_string())];
            ValidationOutcome {
                data: None,
                notes: issues.clone(),
                issues,
            }
        }
    }
}

/// Risky but legal settings
fn config_notes(config: &ProjectConfig, now_ms: u64) -> Vec<Issue> {
    let mut notes = Vec::new();

    if !config.only_attested_devices {
        notes.push(Issue::new(
            IssueCode::Custom,
            vec!["onlyAttestedDevices".into()],
            "Note: onlyAttestedDevices is set to false. This means that the deployment will run on all devices, including unattested devices. This is not recommended for production deployments.",
        ));
    }

    let instant_match = match &config.assignment_strategy {
        AssignmentStrategyConfig::Single { instant_match } => Some(instant_match.is_some()),
        AssignmentStrategyConfig::Competing => None,
    };

    match (&config.start_at, instant_match) {
        (Some(StartAt::MsFromNow { ms_from_now }), Some(false)) if *ms_from_now < 5 * MINUTE_MS => {
            notes.push(Issue::new(
                IssueCode::Custom,
                vec!["startAt".into(), "msFromNow".into()],
                "The start time is less than 5 minutes from now. This can lead to the deployment not running.",
            ));
        }
        (Some(StartAt::MsFromNow { ms_from_now }), Some(true)) if *ms_from_now < 2 * MINUTE_MS => {
            notes.push(Issue::new(
                IssueCode::Custom,
                vec!["startAt".into(), "msFromNow".into()],
                "The start time is less than 2 minutes from now. Even with an instantMatch provided, this can lead to the deployment not running.",
            ));
        }
        (Some(StartAt::Timestamp { timestamp }), Some(true)) => {
            let too_close = timestamp_to_ms(timestamp)
                .map(|start| (start as i128) - (now_ms as i128) < (2 * MINUTE_MS) as i128)
                .unwrap_or(false);
            if too_close {
                notes.push(Issue::new(
                    IssueCode::Custom,
                    vec!["startAt".into(), "timestamp".into()],
                    "The start time is less than 2 minutes from now. This can lead to the deployment not running.",
                ));
            }
        }
        _ => {}
    }

    notes
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child(path: &[PathSegment], segment: impl Into<PathSegment>) -> Vec<PathSegment> {
    let mut path = path.to_vec();
    path.push(segment.into());
    path
}

fn is_acurast_address(value: &str) -> bool {
    AccountId32::from_str(value).is_ok()
}

struct Checker {
    issues: Vec<Issue>,
    now_ms: u64,
}

impl Checker {
    fn new(now_ms: u64) -> Self {
        Self {
            issues: Vec::new(),
            now_ms,
        }
    }

    fn push(&mut self, code: IssueCode, path: Vec<PathSegment>, message: impl Into<String>) {
        self.issues.push(Issue::new(code, path, message));
    }

    fn invalid_type(&mut self, path: Vec<PathSegment>, expected: &str, value: Option<&Value>) {
        let received = value.map(type_name).unwrap_or("undefined");
        let message = match value {
            None => "Required".to_string(),
            Some(_) => format!("Expected {}, received {}", expected, received),
        };
        self.issues.push(Issue {
            code: IssueCode::InvalidType,
            expected: Some(expected.to_string()),
            received: Some(received.to_string()),
            path,
            message,
        });
    }

    fn object<'a>(
        &mut self,
        value: Option<&'a Value>,
        path: Vec<PathSegment>,
    ) -> Option<&'a Map<String, Value>> {
        match value {
            Some(Value::Object(map)) => Some(map),
            other => {
                self.invalid_type(path, "object", other);
                None
            }
        }
    }

    fn string<'a>(&mut self, value: Option<&'a Value>, path: Vec<PathSegment>) -> Option<&'a str> {
        match value {
            Some(Value::String(s)) => Some(s.as_str()),
            other => {
                self.invalid_type(path, "string", other);
                None
            }
        }
    }

    fn boolean(&mut self, value: Option<&Value>, path: Vec<PathSegment>) -> Option<bool> {
        match value {
            Some(Value::Bool(b)) => Some(*b),
            other => {
                self.invalid_type(path, "boolean", other);
                None
            }
        }
    }

    /// Whole number within `[min, max]`
    fn integer(
        &mut self,
        value: Option<&Value>,
        path: Vec<PathSegment>,
        min: f64,
        max: Option<f64>,
    ) -> Option<f64> {
        let number = match value {
            Some(Value::Number(n)) => n.as_f64()?,
            other => {
                self.invalid_type(path, "number", other);
                return None;
            }
        };
        if number.fract() != 0.0 {
            self.issues.push(Issue {
                code: IssueCode::InvalidType,
                expected: Some("integer".to_string()),
                received: Some("float".to_string()),
                path,
                message: "Expected integer, received float".to_string(),
            });
            return None;
        }
        if number < min {
            self.push(
                IssueCode::TooSmall,
                path,
                format!("Number must be greater than or equal to {}", min),
            );
            return None;
        }
        if let Some(max) = max {
            if number > max {
                self.push(
                    IssueCode::TooBig,
                    path,
                    format!("Number must be less than or equal to {}", max),
                );
                return None;
            }
        }
        Some(number)
    }

    fn enum_value(&mut self, value: Option<&Value>, path: Vec<PathSegment>, options: &[&str]) {
        let Some(text) = self.string(value, path.clone()) else {
            return;
        };
        if !options.contains(&text) {
            let expected = options
                .iter()
                .map(|option| format!("'{}'", option))
                .collect::<Vec<_>>()
                .join(" | ");
            self.push(
                IssueCode::InvalidEnumValue,
                path,
                format!(
                    "Invalid enum value. Expected {}, received '{}'",
                    expected, text
                ),
            );
        }
    }

    fn array<'a>(
        &mut self,
        value: Option<&'a Value>,
        path: Vec<PathSegment>,
    ) -> Option<&'a Vec<Value>> {
        match value {
            Some(Value::Array(items)) => Some(items),
            other => {
                self.invalid_type(path, "array", other);
                None
            }
        }
    }

    fn strict(&mut self, map: &Map<String, Value>, allowed: &[&str], path: &[PathSegment]) {
        let unknown: Vec<String> = map
            .keys()
            .filter(|key| !allowed.contains(&key.as_str()))
            .map(|key| format!("'{}'", key))
            .collect();
        if !unknown.is_empty() {
            self.push(
                IssueCode::UnrecognizedKeys,
                path.to_vec(),
                format!("Unrecognized key(s) in object: {}", unknown.join(", ")),
            );
        }
    }

    fn address(&mut self, value: Option<&Value>, path: Vec<PathSegment>) {
        if let Some(address) = self.string(value, path.clone()) {
            if !is_acurast_address(address) {
                self.push(IssueCode::Custom, path, ADDRESS_MESSAGE);
            }
        }
    }

    fn project(&mut self, value: &Value) {
        let root: Vec<PathSegment> = Vec::new();
        let Some(config) = self.object(Some(value), root.clone()) else {
            return;
        };

        self.string(config.get("projectName"), child(&root, "projectName"));
        self.string(config.get("fileUrl"), child(&root, "fileUrl"));
        if let Some(entrypoint) = config.get("entrypoint") {
            self.string(Some(entrypoint), child(&root, "entrypoint"));
        }
        self.network(config.get("network"));
        self.boolean(
            config.get("onlyAttestedDevices"),
            child(&root, "onlyAttestedDevices"),
        );
        if let Some(start_at) = config.get("startAt") {
            self.start_at(start_at);
        }
        self.assignment_strategy(config.get("assignmentStrategy"));
        self.execution(config.get("execution"));
        self.integer(
            config.get("maxAllowedStartDelayInMs"),
            child(&root, "maxAllowedStartDelayInMs"),
            0.0,
            None,
        );
        self.usage_limit(config.get("usageLimit"));
        self.integer(
            config.get("numberOfReplicas"),
            child(&root, "numberOfReplicas"),
            1.0,
            Some(MAX_REPLICAS),
        );
        if let Some(modules) = config.get("requiredModules") {
            let path = child(&root, "requiredModules");
            if let Some(items) = self.array(Some(modules), path.clone()) {
                for (index, item) in items.iter().enumerate() {
                    self.enum_value(Some(item), child(&path, index), &RequiredModule::ALL);
                }
            }
        }
        self.integer(
            config.get("minProcessorReputation"),
            child(&root, "minProcessorReputation"),
            0.0,
            None,
        );
        self.integer(
            config.get("maxCostPerExecution"),
            child(&root, "maxCostPerExecution"),
            0.0,
            None,
        );
        if let Some(vars) = config.get("includeEnvironmentVariables") {
            let path = child(&root, "includeEnvironmentVariables");
            if let Some(items) = self.array(Some(vars), path.clone()) {
                for (index, item) in items.iter().enumerate() {
                    self.string(Some(item), child(&path, index));
                }
            }
        }
        if let Some(whitelist) = config.get("processorWhitelist") {
            let path = child(&root, "processorWhitelist");
            if let Some(items) = self.array(Some(whitelist), path.clone()) {
                for (index, item) in items.iter().enumerate() {
                    self.address(Some(item), child(&path, index));
                }
            }
        }
        if let Some(versions) = config.get("minProcessorVersions") {
            self.min_processor_versions(versions);
        }
        if let Some(policy) = config.get("restartPolicy") {
            self.enum_value(Some(policy), child(&root, "restartPolicy"), &RestartPolicy::ALL);
        }
        if let Some(runtime) = config.get("runtime") {
            self.enum_value(Some(runtime), child(&root, "runtime"), &Runtime::ALL);
        }
        if let Some(mutability) = config.get("mutability") {
            self.enum_value(
                Some(mutability),
                child(&root, "mutability"),
                &ScriptMutability::ALL,
            );
        }
        if let Some(reuse) = config.get("reuseKeysFrom") {
            self.reuse_keys_from(reuse);
        }
    }

    fn network(&mut self, value: Option<&Value>) {
        let path = vec!["network".into()];
        match value {
            Some(Value::String(network)) if network == "canary" => {}
            None => self.invalid_type(path, "\"canary\"", None),
            Some(_) => self.push(
                IssueCode::InvalidLiteral,
                path,
                "Invalid literal value, expected \"canary\"",
            ),
        }
    }

    fn start_at(&mut self, value: &Value) {
        let path: Vec<PathSegment> = vec!["startAt".into()];
        let Some(start_at) = self.object(Some(value), path.clone()) else {
            return;
        };

        if start_at.contains_key("msFromNow") {
            self.integer(start_at.get("msFromNow"), child(&path, "msFromNow"), 0.0, None);
            return;
        }

        let Some(timestamp) = start_at.get("timestamp") else {
            self.push(IssueCode::InvalidUnion, path, "Invalid input");
            return;
        };
        let path = child(&path, "timestamp");
        match timestamp {
            Value::Number(n) => {
                let Some(ms) = n.as_f64().filter(|ms| ms.is_finite() && *ms >= 0.0) else {
                    self.push(IssueCode::Custom, path, "Invalid timestamp");
                    return;
                };
                if ms < self.now_ms as f64 {
                    self.push(IssueCode::Custom, path, "Timestamp cannot be in the past");
                }
            }
            Value::String(text) => {
                if chrono::DateTime::parse_from_rfc3339(text).is_err() {
                    self.push(IssueCode::InvalidString, path, "Invalid datetime");
                }
            }
            _ => self.push(IssueCode::InvalidUnion, path, "Invalid input"),
        }
    }

    fn assignment_strategy(&mut self, value: Option<&Value>) {
        let path: Vec<PathSegment> = vec!["assignmentStrategy".into()];
        let Some(strategy) = self.object(value, path.clone()) else {
            return;
        };

        match strategy.get("type").and_then(Value::as_str) {
            Some("Single") => {
                let Some(matches) = strategy.get("instantMatch") else {
                    return;
                };
                let path = child(&path, "instantMatch");
                let Some(items) = self.array(Some(matches), path.clone()) else {
                    return;
                };
                for (index, item) in items.iter().enumerate() {
                    let item_path = child(&path, index);
                    if let Some(entry) = self.object(Some(item), item_path.clone()) {
                        self.address(entry.get("processor"), child(&item_path, "processor"));
                        self.integer(
                            entry.get("maxAllowedStartDelayInMs"),
                            child(&item_path, "maxAllowedStartDelayInMs"),
                            0.0,
                            None,
                        );
                    }
                }
            }
            Some("Competing") => {}
            _ => self.push(IssueCode::InvalidUnion, path, "Invalid input"),
        }
    }

    fn execution(&mut self, value: Option<&Value>) {
        let path: Vec<PathSegment> = vec!["execution".into()];
        let Some(execution) = self.object(value, path.clone()) else {
            return;
        };

        match execution.get("type").and_then(Value::as_str) {
            Some("onetime") => {
                self.strict(execution, &["type", "maxExecutionTimeInMs"], &path);
                self.integer(
                    execution.get("maxExecutionTimeInMs"),
                    child(&path, "maxExecutionTimeInMs"),
                    1.0,
                    None,
                );
            }
            Some("interval") => {
                let before = self.issues.len();
                self.strict(
                    execution,
                    &[
                        "type",
                        "intervalInMs",
                        "numberOfExecutions",
                        "maxExecutionTimeInMs",
                    ],
                    &path,
                );
                let interval = self.integer(
                    execution.get("intervalInMs"),
                    child(&path, "intervalInMs"),
                    1.0,
                    None,
                );
                self.integer(
                    execution.get("numberOfExecutions"),
                    child(&path, "numberOfExecutions"),
                    1.0,
                    None,
                );
                let max_execution = execution.get("maxExecutionTimeInMs").and_then(|value| {
                    self.integer(
                        Some(value),
                        child(&path, "maxExecutionTimeInMs"),
                        1.0,
                        None,
                    )
                });
                if self.issues.len() == before {
                    if let (Some(interval), Some(max_execution)) = (interval, max_execution) {
                        if max_execution >= interval {
                            self.push(
                                IssueCode::Custom,
                                child(&path, "maxExecutionTimeInMs"),
                                "maxExecutionTimeInMs must be less than intervalInMs",
                            );
                        }
                    }
                }
            }
            _ => self.push(IssueCode::InvalidUnion, path, "Invalid input"),
        }
    }

    fn usage_limit(&mut self, value: Option<&Value>) {
        let path: Vec<PathSegment> = vec!["usageLimit".into()];
        let Some(limits) = self.object(value, path.clone()) else {
            return;
        };
        for key in ["maxMemory", "maxNetworkRequests", "maxStorage"] {
            self.integer(limits.get(key), child(&path, key), 0.0, Some(u32::MAX as f64));
        }
    }

    fn min_processor_versions(&mut self, value: &Value) {
        let path: Vec<PathSegment> = vec!["minProcessorVersions".into()];
        let Some(versions) = self.object(Some(value), path.clone()) else {
            return;
        };

        let mut present = 0;
        for platform in ["android", "ios"] {
            match versions.get(platform) {
                None => {}
                Some(Value::String(_)) | Some(Value::Number(_)) => present += 1,
                Some(_) => {
                    self.push(IssueCode::InvalidUnion, child(&path, platform), "Invalid input");
                    return;
                }
            }
        }
        if present == 0 {
            self.push(IssueCode::InvalidUnion, path, "Invalid input");
        }
    }

    fn reuse_keys_from(&mut self, value: &Value) {
        let path: Vec<PathSegment> = vec!["reuseKeysFrom".into()];
        let Some(items) = self.array(Some(value), path.clone()) else {
            return;
        };
        if items.len() < 3 {
            self.push(
                IssueCode::TooSmall,
                path,
                "Array must contain at least 3 element(s)",
            );
            return;
        }
        if items.len() > 3 {
            self.push(
                IssueCode::TooBig,
                path,
                "Array must contain at most 3 element(s)",
            );
            return;
        }
        self.enum_value(items.first(), child(&path, 0), &MultiOriginKind::ALL);
        self.string(items.get(1), child(&path, 1));
        self.integer(items.get(2), child(&path, 2), 0.0, None);
    }
}
