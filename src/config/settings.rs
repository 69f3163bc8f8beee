// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Runtime settings for one CLI invocation.
//!
//! Everything that used to be read from process-wide globals (paths, RPC
//! endpoint, credentials) lives here and is handed to the components that
//! need it.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::network::NetworkConfig;
use crate::project::{ConfigError, ProjectConfig, CONFIG_FILE};

pub const ENV_MNEMONIC: &str = "ACURAST_MNEMONIC";
pub const ENV_IPFS_URL: &str = "ACURAST_IPFS_URL";
pub const ENV_IPFS_API_KEY: &str = "ACURAST_IPFS_API_KEY";

pub const BASE_DIR: &str = ".acurast";

/// A named environment variable forwarded to the deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct Settings {
    /// Directory holding `acurast.json` and `.env`
    pub root: PathBuf,
    pub network: NetworkConfig,
    pub mnemonic: Option<String>,
    pub ipfs_url: Option<String>,
    pub ipfs_api_key: Option<String>,
}

impl Settings {
    pub fn from_env() -> Self {
        Self::new(PathBuf::from("."))
    }

    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            network: NetworkConfig::canary(),
            mnemonic: read_env(ENV_MNEMONIC),
            ipfs_url: read_env(ENV_IPFS_URL),
            ipfs_api_key: read_env(ENV_IPFS_API_KEY),
        }
    }

    pub fn with_rpc(mut self, rpc: Option<String>) -> Self {
        if let Some(rpc) = rpc {
            self.network.rpc_url = rpc;
        }
        self
    }

    pub fn rpc_url(&self) -> &str {
        &self.network.rpc_url
    }

    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    pub fn env_file(&self) -> PathBuf {
        self.root.join(".env")
    }

    pub fn base_dir(&self) -> PathBuf {
        self.root.join(BASE_DIR)
    }

    pub fn deployments_dir(&self) -> PathBuf {
        self.base_dir().join("deploy")
    }

    pub fn bundles_dir(&self) -> PathBuf {
        self.base_dir().join("bundles")
    }

    pub fn log_file(&self) -> PathBuf {
        self.base_dir().join("acurast.log")
    }

    pub fn key_store_file(&self) -> PathBuf {
        self.base_dir().join("keys.json")
    }

    /// Make sure every variable needed for a deployment is present.
    ///
    /// The IPFS credentials are only required when a local script has to be
    /// uploaded.
    pub fn validate_for_deploy(&self, needs_upload: bool) -> Result<(), ConfigError> {
        let mut missing = Vec::new();
        if self.mnemonic.is_none() {
            missing.push(ENV_MNEMONIC.to_string());
        }
        if needs_upload {
            if self.ipfs_url.is_none() {
                missing.push(ENV_IPFS_URL.to_string());
            }
            if self.ipfs_api_key.is_none() {
                missing.push(ENV_IPFS_API_KEY.to_string());
            }
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        if let Some(ipfs_url) = &self.ipfs_url {
            url::Url::parse(ipfs_url).map_err(|e| ConfigError::InvalidEnv {
                key: ENV_IPFS_URL.to_string(),
                reason: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn require_mnemonic(&self) -> Result<&str, ConfigError> {
        self.mnemonic
            .as_deref()
            .ok_or_else(|| ConfigError::MissingEnv(vec![ENV_MNEMONIC.to_string()]))
    }

    /// Resolve the values of `includeEnvironmentVariables` from the environment
    pub fn project_env_vars(&self, config: &ProjectConfig) -> Result<Vec<EnvVar>, ConfigError> {
        resolve_env_vars(
            config.include_environment_variables.as_deref().unwrap_or(&[]),
            read_env,
        )
    }

    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(self.deployments_dir())?;
        std::fs::create_dir_all(self.bundles_dir())
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.is_empty())
}

pub fn resolve_env_vars<F>(keys: &[String], lookup: F) -> Result<Vec<EnvVar>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut vars = Vec::with_capacity(keys.len());
    let mut missing = Vec::new();
    for key in keys {
        match lookup(key) {
            Some(value) => vars.push(EnvVar {
                key: key.clone(),
                value,
            }),
            None => missing.push(key.clone()),
        }
    }
    if !missing.is_empty() {
        return Err(ConfigError::MissingEnv(missing));
    }
    debug!("Resolved {} environment variables", vars.len());
    Ok(vars)
}

/// Load `.env` from `root` if present
pub fn load_dotenv(root: &Path) {
    let path = root.join(".env");
    if path.exists() {
        dotenv::from_path(&path).ok();
    } else {
        dotenv::dotenv().ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn empty_settings() -> Settings {
        Settings {
            root: PathBuf::from("/tmp/project"),
            network: NetworkConfig::canary(),
            mnemonic: None,
            ipfs_url: None,
            ipfs_api_key: None,
        }
    }

    #[test]
    fn test_paths() {
        let settings = empty_settings();
        assert_eq!(
            settings.deployments_dir(),
            PathBuf::from("/tmp/project/.acurast/deploy")
        );
        assert_eq!(
            settings.key_store_file(),
            PathBuf::from("/tmp/project/.acurast/keys.json")
        );
    }

    #[test]
    fn test_validate_for_deploy_lists_missing() {
        let settings = empty_settings();
        let err = settings.validate_for_deploy(true).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing environment variables: ACURAST_MNEMONIC, ACURAST_IPFS_URL, ACURAST_IPFS_API_KEY"
        );

        let mut settings = empty_settings();
        settings.mnemonic = Some("//Alice".to_string());
        assert!(settings.validate_for_deploy(false).is_ok());

        settings.ipfs_url = Some("not a url".to_string());
        settings.ipfs_api_key = Some("key".to_string());
        assert!(matches!(
            settings.validate_for_deploy(true),
            Err(ConfigError::InvalidEnv { .. })
        ));
    }

    #[test]
    fn test_resolve_env_vars() {
        let env: HashMap<&str, &str> = [("API_KEY", "secret")].into_iter().collect();
        let lookup = |key: &str| env.get(key).map(|v| v.to_string());

        let vars = resolve_env_vars(&["API_KEY".to_string()], lookup).unwrap();
        assert_eq!(
            vars,
            vec![EnvVar {
                key: "API_KEY".to_string(),
                value: "secret".to_string()
            }]
        );

        let err = resolve_env_vars(&["API_KEY".to_string(), "OTHER".to_string()], lookup)
            .unwrap_err();
        assert_eq!(err.to_string(), "Missing environment variables: OTHER");
    }
}
