// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
// Bundle manifest read by the processor runtime

use serde::{Deserialize, Serialize};

use super::StorageError;
use crate::project::types::RestartPolicy;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

/// Manifest stored as `manifest.json` at the root of every script bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Deployment (project) name
    pub name: String,

    /// Manifest format version, currently always 1
    pub version: u32,

    /// Path of the script to start, relative to the bundle root
    pub entrypoint: String,

    /// What the processor does when the script exits
    pub restart_policy: RestartPolicy,
}

impl Manifest {
    pub fn new(name: &str, entrypoint: &str, restart_policy: RestartPolicy) -> Self {
        Self {
            name: name.to_string(),
            version: MANIFEST_VERSION,
            entrypoint: entrypoint.to_string(),
            restart_policy,
        }
    }

    pub fn to_json(&self) -> Result<String, StorageError> {
        serde_json::to_string(self).map_err(|e| StorageError::SerializationError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_json() {
        let manifest = Manifest::new("app", "index.js", RestartPolicy::OnFailure);
        assert_eq!(
            manifest.to_json().unwrap(),
            r#"{"name":"app","version":1,"entrypoint":"index.js","restartPolicy":"onFailure"}"#
        );
    }
}
