// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use super::types::ProjectConfig;

pub const CONFIG_FILE: &str = "acurast.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not found! Run \"acurast init\" first")]
    NotFound(String),
    #[error("Failed to read {path}: {reason}")]
    Io { path: String, reason: String },
    #[error("{path} is not valid JSON: {reason}")]
    Parse { path: String, reason: String },
    #[error("No projects found in {0}")]
    NoProjects(String),
    #[error("Project not specified. Available projects: {}", .0.join(", "))]
    ProjectNotSpecified(Vec<String>),
    #[error("Project \"{0}\" not found in {1}")]
    ProjectNotFound(String, String),
    #[error("Missing environment variables: {}", .0.join(", "))]
    MissingEnv(Vec<String>),
    #[error("Invalid value for {key}: {reason}")]
    InvalidEnv { key: String, reason: String },
    #[error("Project config is invalid: {0}")]
    Invalid(String),
}

/// Read the project section for `project` from the config file at `path`.
///
/// With a single project in the file the name may be omitted. The returned
/// value is untyped so it can be validated before deserialisation.
pub fn load_raw_project(path: &Path, project: Option<&str>) -> Result<Value, ConfigError> {
    let location = path.display().to_string();
    if !path.exists() {
        return Err(ConfigError::NotFound(location));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: location.clone(),
        reason: e.to_string(),
    })?;
    let root: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: location.clone(),
        reason: e.to_string(),
    })?;

    let projects = match root.get("projects").and_then(Value::as_object) {
        Some(projects) if !projects.is_empty() => projects,
        _ => return Err(ConfigError::NoProjects(location)),
    };

    let selected = match project {
        Some(name) => projects
            .get(name)
            .ok_or_else(|| ConfigError::ProjectNotFound(name.to_string(), location.clone()))?,
        None if projects.len() == 1 => projects
            .values()
            .next()
            .ok_or_else(|| ConfigError::NoProjects(location.clone()))?,
        None => {
            return Err(ConfigError::ProjectNotSpecified(
                projects.keys().cloned().collect(),
            ))
        }
    };

    debug!("Loaded project config from {}", location);
    Ok(selected.clone())
}

/// Load and deserialize a project without running the validator
pub fn load_config(path: &Path, project: Option<&str>) -> Result<ProjectConfig, ConfigError> {
    let value = load_raw_project(path, project)?;
    serde_json::from_value(value).map_err(|e| ConfigError::Invalid(e.to_string()))
}

/// Names of all projects in the config file, empty if the file does not exist
pub fn project_names(path: &Path) -> Result<Vec<String>, ConfigError> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let root: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    Ok(root
        .get("projects")
        .and_then(Value::as_object)
        .map(|projects| projects.keys().cloned().collect())
        .unwrap_or_default())
}
