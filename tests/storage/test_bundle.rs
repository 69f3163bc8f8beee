// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use acurast_cli::storage::{create_manifest, zip_bundle, Manifest};
use std::io::Read;
use std::path::Path;
use tempfile::TempDir;
use zip::ZipArchive;

use crate::common::project_config;

fn entries(zip_path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut archive = ZipArchive::new(std::fs::File::open(zip_path).unwrap()).unwrap();
    let mut entries = Vec::new();
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).unwrap();
        let mut content = Vec::new();
        file.read_to_end(&mut content).unwrap();
        entries.push((file.name().to_string(), content));
    }
    entries
}

#[test]
fn test_folder_bundle_with_manifest() {
    let dir = TempDir::new().unwrap();
    let app = dir.path().join("app");
    std::fs::create_dir_all(app.join("lib")).unwrap();
    std::fs::write(app.join("index.js"), "require('./lib/util')").unwrap();
    std::fs::write(app.join("lib/util.js"), "module.exports = 1").unwrap();

    let mut config = project_config("app", &app.display().to_string());
    assert!(create_manifest(&config).is_err());
    config.entrypoint = Some("index.js".to_string());
    let manifest = create_manifest(&config).unwrap();

    let zip_path = zip_bundle(&app, &dir.path().join("bundles"), &manifest, "app").unwrap();
    assert_eq!(zip_path.file_name().unwrap(), "app.zip");

    let entries = entries(&zip_path);
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(names, vec!["manifest.json", "index.js", "lib/util.js"]);

    let stored: Manifest = serde_json::from_slice(&entries[0].1).unwrap();
    assert_eq!(stored, manifest);
    assert_eq!(stored.entrypoint, "index.js");
    assert_eq!(stored.version, 1);
}

#[test]
fn test_bundles_are_reproducible() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("bundle.js");
    std::fs::write(&script, "console.log('hello')").unwrap();

    let config = project_config("app", &script.display().to_string());
    let manifest = create_manifest(&config).unwrap();
    assert_eq!(manifest.entrypoint, "bundle.js");

    let first = zip_bundle(&script, &dir.path().join("a"), &manifest, "app").unwrap();
    std::thread::sleep(std::time::Duration::from_millis(1100));
    let second = zip_bundle(&script, &dir.path().join("b"), &manifest, "app").unwrap();

    assert_eq!(std::fs::read(first).unwrap(), std::fs::read(second).unwrap());
}
