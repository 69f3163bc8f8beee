// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Zip packaging of a script file or folder together with its manifest.
//!
//! Every entry carries the DOS epoch (1980-01-01 00:00:00) as modification
//! time and entries are written in sorted order, so the same input always
//! produces the same archive bytes and therefore the same IPFS hash.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::FileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

use super::manifest::{Manifest, MANIFEST_FILE};
use super::StorageError;
use crate::project::ProjectConfig;

/// Manifest for `config`; folders need an explicit entrypoint
pub fn create_manifest(config: &ProjectConfig) -> Result<Manifest, StorageError> {
    let input = Path::new(&config.file_url);
    let entrypoint = match &config.entrypoint {
        Some(entrypoint) => entrypoint.clone(),
        None if input.is_dir() => {
            return Err(StorageError::InvalidPath(format!(
                "\"entrypoint\" is required when \"fileUrl\" is a folder ({})",
                config.file_url
            )))
        }
        None => input
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .ok_or_else(|| StorageError::InvalidPath(config.file_url.clone()))?,
    };

    Ok(Manifest::new(
        &config.project_name,
        &entrypoint,
        config.restart_policy.unwrap_or_default(),
    ))
}

fn entry_options() -> FileOptions {
    FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
}

fn add_file<W: Write + std::io::Seek>(
    zip: &mut ZipWriter<W>,
    name: &str,
    path: &Path,
) -> Result<(), StorageError> {
    let mut content = Vec::new();
    File::open(path)?.read_to_end(&mut content)?;
    zip.start_file(name, entry_options())
        .map_err(|e| StorageError::CompressionError(e.to_string()))?;
    zip.write_all(&content)?;
    Ok(())
}

/// Write `<output_dir>/<name>.zip` containing `manifest.json` and `input`.
///
/// A file is stored under its file name; a folder contributes its contents
/// with paths relative to the folder.
pub fn zip_bundle(
    input: &Path,
    output_dir: &Path,
    manifest: &Manifest,
    name: &str,
) -> Result<PathBuf, StorageError> {
    if !input.exists() {
        return Err(StorageError::NotFound(format!(
            "Input folder {} does not exist",
            input.display()
        )));
    }

    std::fs::create_dir_all(output_dir)?;
    let zip_path = output_dir.join(format!("{}.zip", name));
    let mut zip = ZipWriter::new(File::create(&zip_path)?);

    zip.start_file(MANIFEST_FILE, entry_options())
        .map_err(|e| StorageError::CompressionError(e.to_string()))?;
    zip.write_all(manifest.to_json()?.as_bytes())?;

    if input.is_file() {
        let file_name = input
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| StorageError::InvalidPath(input.display().to_string()))?;
        add_file(&mut zip, &file_name, input)?;
    } else {
        for entry in WalkDir::new(input).sort_by_file_name() {
            let entry = entry.map_err(|e| StorageError::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(input)
                .map_err(|e| StorageError::InvalidPath(e.to_string()))?;
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            add_file(&mut zip, &name, entry.path())?;
        }
    }

    zip.finish()
        .map_err(|e| StorageError::CompressionError(e.to_string()))?;
    debug!("zipPath: {}", zip_path.display());
    Ok(zip_path)
}
