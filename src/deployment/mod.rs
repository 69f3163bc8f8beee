// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Deployment pipeline: upload, registration and progress tracking.
//!
//! Progress is reported as [`StatusEvent`]s over an `mpsc` channel. The
//! receiving side (the `deploy` command) renders them and persists the
//! deployment record; dropping the receiver ends the pipeline.

pub mod env_vars;
pub mod pipeline;
pub mod status;
pub mod trigger;

use thiserror::Error;

use crate::blockchain::ChainError;
use crate::crypto::CryptoError;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum DeployError {
    #[error(transparent)]
    Chain(#[from] ChainError),
    #[error("Upload failed: {0}")]
    Storage(#[from] StorageError),
    #[error("Encryption failed: {0}")]
    Crypto(#[from] CryptoError),
    #[error("No processor of deployment {0} published an encryption key")]
    NoEncryptionKeys(u128),
    #[error("Registration returned no deployment id")]
    MissingJobId,
}

pub use env_vars::{EnvVarSetter, ENV_KEY_MAX_ATTEMPTS, ENV_KEY_RETRY_DELAY};
pub use pipeline::{DeploymentOutcome, DeploymentPipeline};
pub use status::{DeploymentStatus, StatusData, StatusEvent};
pub use trigger::{EnvVarTrigger, TriggerAction, ENV_VARS_LEAD_TIME};
