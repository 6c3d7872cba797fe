//! Shared test utilities for content store integration tests
#![allow(dead_code)]

use std::path::Path;

use common::content::ContentStore;
use tempfile::TempDir;

/// Set up a content store rooted in a fresh temporary directory
pub async fn setup_store() -> (ContentStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = ContentStore::open(temp_dir.path().join("uploads"))
        .await
        .unwrap();
    (store, temp_dir)
}

/// Names of the entries directly under `dir`, excluding the staging area
pub fn entries(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .filter(|name| name != common::content::INCOMING_DIR)
        .collect();
    names.sort();
    names
}

/// True when the staging area holds no leftover files
pub fn staging_is_empty(store: &ContentStore) -> bool {
    std::fs::read_dir(store.root().join(common::content::INCOMING_DIR))
        .unwrap()
        .next()
        .is_none()
}
