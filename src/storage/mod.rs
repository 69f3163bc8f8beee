// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod bundle;
pub mod deployments;
pub mod ipfs;
pub mod key_store;
pub mod manifest;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    NetworkError(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Compression error: {0}")]
    CompressionError(String),
    #[error("Authentication error: {0}")]
    AuthError(String),
    #[error("Server error: {0}")]
    ServerError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub use bundle::{create_manifest, zip_bundle};
pub use deployments::{DeploymentRecord, DeploymentStore, RecordStatus};
pub use ipfs::{MockPinningService, PinataClient, PinningService};
pub use key_store::KeyStore;
pub use manifest::Manifest;
