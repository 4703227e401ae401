//! Manifest discovery

use sonar_core::error::{SonarError, SonarResult};
use sonar_core::types::MANIFEST_FILE;
use sonar_core::utils::is_hidden;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name == "node_modules" || is_hidden(&name)
}

/// Every `package.json` under `folder`, sorted by path.
///
/// `node_modules` and hidden entries are never descended into.
pub fn discover_manifests(folder: &Path) -> SonarResult<Vec<PathBuf>> {
    let mut manifests = Vec::new();

    for entry in WalkDir::new(folder).sort_by_file_name().into_iter().filter_entry(|e| !is_skipped(e)) {
        let entry = entry
            .map_err(|e| SonarError::io(format!("Failed to scan {}", folder.display()), e.into()))?;

        if entry.file_type().is_file() && entry.file_name() == MANIFEST_FILE {
            manifests.push(entry.into_path());
        }
    }

    manifests.sort();
    Ok(manifests)
}
