// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Upload of scripts and bundles to an IPFS pinning service.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use super::StorageError;

pub const IPFS_PREFIX: &str = "ipfs://";
const TEMP_FILE: &str = "temp_script.js";
const UPLOAD_NAME: &str = "script.js";

#[async_trait]
pub trait PinningService: Send + Sync {
    /// Pin the file at `path` and return its `ipfs://<hash>` reference
    async fn pin_file(&self, path: &Path) -> Result<String, StorageError>;
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

/// Pinata compatible `pinFileToIPFS` client
pub struct PinataClient {
    client: Client,
    base_url: String,
    api_key: String,
    /// Directory receiving the temporary upload copy
    temp_dir: PathBuf,
}

impl PinataClient {
    pub fn new(base_url: &str, api_key: &str, temp_dir: PathBuf) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            temp_dir,
        }
    }

    async fn upload(&self, temp_file: &Path) -> Result<String, StorageError> {
        let content = tokio::fs::read(temp_file).await?;
        let part = Part::bytes(content).file_name(UPLOAD_NAME);
        let form = Form::new()
            .part("file", part)
            .text("pinataOptions", r#"{"cidVersion": 0}"#)
            .text("pinataMetadata", r#"{"name": "script.js"}"#);

        let url = format!("{}/pinning/pinFileToIPFS", self.base_url);
        info!("📤 Uploading script to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| StorageError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(StorageError::AuthError(format!(
                "Pinning service rejected the API key ({})",
                status
            )));
        }
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(StorageError::ServerError(format!(
                "{} - {}",
                status, error_text
            )));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        Ok(format!("{}{}", IPFS_PREFIX, pinned.ipfs_hash))
    }
}

#[async_trait]
impl PinningService for PinataClient {
    async fn pin_file(&self, path: &Path) -> Result<String, StorageError> {
        tokio::fs::create_dir_all(&self.temp_dir).await?;
        let temp_file = self.temp_dir.join(TEMP_FILE);
        tokio::fs::copy(path, &temp_file).await?;

        let result = self.upload(&temp_file).await;

        if let Err(e) = tokio::fs::remove_file(&temp_file).await {
            debug!("Failed to remove {}: {}", temp_file.display(), e);
        }
        match &result {
            Ok(hash) => info!("✅ Uploaded {} as {}", path.display(), hash),
            Err(e) => error!("Error uploading script: {}", e),
        }
        result
    }
}

/// In-memory pinning service; hashes are derived from the content
#[derive(Debug, Clone, Default)]
pub struct MockPinningService {
    pinned: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    injected_error: Arc<Mutex<Option<StorageError>>>,
}

impl MockPinningService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn content_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let hash = format!("{:x}", hasher.finalize());
        format!("{}Qm{}", IPFS_PREFIX, &hash[0..44])
    }

    pub async fn inject_error(&self, error: StorageError) {
        *self.injected_error.lock().await = Some(error);
    }

    pub async fn pinned(&self, hash: &str) -> Option<Vec<u8>> {
        self.pinned.lock().await.get(hash).cloned()
    }

    pub async fn pin_count(&self) -> usize {
        self.pinned.lock().await.len()
    }
}

#[async_trait]
impl PinningService for MockPinningService {
    async fn pin_file(&self, path: &Path) -> Result<String, StorageError> {
        if let Some(error) = self.injected_error.lock().await.take() {
            return Err(error);
        }
        let data = tokio::fs::read(path).await?;
        let hash = Self::content_hash(&data);
        self.pinned.lock().await.insert(hash.clone(), data);
        Ok(hash)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mock_hash_is_content_addressed() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.js");
        let b = dir.path().join("b.js");
        std::fs::write(&a, "same").unwrap();
        std::fs::write(&b, "same").unwrap();

        let service = MockPinningService::new();
        let first = service.pin_file(&a).await.unwrap();
        let second = service.pin_file(&b).await.unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("ipfs://Qm"));
        assert_eq!(service.pin_count().await, 1);
    }

    #[tokio::test]
    async fn test_mock_injected_error() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.js");
        std::fs::write(&file, "x").unwrap();

        let service = MockPinningService::new();
        service
            .inject_error(StorageError::AuthError("bad key".to_string()))
            .await;
        assert!(matches!(
            service.pin_file(&file).await,
            Err(StorageError::AuthError(_))
        ));
        assert!(service.pin_file(&file).await.is_ok());
    }

    #[tokio::test]
    async fn test_pinata_removes_temp_file_on_failure() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.js");
        std::fs::write(&file, "x").unwrap();

        // Nothing listens on port 9 locally, so the request fails fast
        let client = PinataClient::new("http://127.0.0.1:9", "key", dir.path().join("tmp"));
        assert!(client.pin_file(&file).await.is_err());
        assert!(!dir.path().join("tmp").join(TEMP_FILE).exists());
    }
}
