// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod blockchain;
pub mod cli;
pub mod config;
pub mod crypto;
pub mod deployment;
pub mod fees;
pub mod project;
pub mod storage;
pub mod utils;

// Re-export the types most callers need
pub use blockchain::{AcurastClient, Marketplace, MockMarketplace, Wallet};
pub use config::{EnvVar, NetworkConfig, Settings};
pub use deployment::{DeploymentOutcome, DeploymentPipeline, DeploymentStatus, StatusEvent};
pub use project::{convert_config_to_job, validate_config, JobRegistration, ProjectConfig};
