// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Flat JSON string map persisted at `.acurast/keys.json`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::StorageError;

#[derive(Debug, Clone)]
pub struct KeyStore {
    path: PathBuf,
}

impl KeyStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&content).map_err(|e| StorageError::SerializationError(e.to_string()))
    }

    fn write(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read()?.remove(key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read()?;
        entries.insert(key.to_string(), value.to_string());
        debug!("Stored key {}", key);
        self.write(&entries)
    }

    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read()?;
        if entries.remove(key).is_some() {
            self.write(&entries)?;
        }
        Ok(())
    }

    pub fn clear(&self) -> Result<(), StorageError> {
        self.write(&BTreeMap::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let store = KeyStore::new(dir.path().join(".acurast").join("keys.json"));

        assert_eq!(store.get("publicKey_p256").unwrap(), None);
        store.set("publicKey_p256", "02ab").unwrap();
        store.set("privateKey_p256", "cd").unwrap();
        assert_eq!(store.get("publicKey_p256").unwrap().as_deref(), Some("02ab"));

        store.remove("publicKey_p256").unwrap();
        assert_eq!(store.get("publicKey_p256").unwrap(), None);
        assert_eq!(store.get("privateKey_p256").unwrap().as_deref(), Some("cd"));

        store.clear().unwrap();
        assert_eq!(store.get("privateKey_p256").unwrap(), None);
    }
}
