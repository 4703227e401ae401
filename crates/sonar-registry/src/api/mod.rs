//! npm registry API response types

use serde::{Deserialize, Serialize};
use sonar_core::types::Version;
use std::collections::HashMap;

/// Package document from the registry (abbreviated install metadata)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PackageMetadataResponse {
    /// Package name
    pub name: String,
    /// Tag to version, e.g. `latest`, `next`
    #[serde(rename = "dist-tags", default)]
    pub dist_tags: HashMap<String, String>,
    /// All published versions
    #[serde(default)]
    pub versions: HashMap<String, VersionMetadata>,
    /// Last modification time
    #[serde(default)]
    pub modified: Option<String>,
}

/// Metadata for a specific package version
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VersionMetadata {
    /// Version string
    pub version: String,
}

impl PackageMetadataResponse {
    /// Version behind the `latest` dist-tag
    pub fn latest(&self) -> Option<&str> {
        self.dist_tags.get("latest").map(String::as_str)
    }

    /// Highest published version whose string contains `tag`
    pub fn latest_canary(&self, tag: &str) -> Option<String> {
        self.versions
            .keys()
            .filter(|version| version.contains(tag))
            .filter_map(|version| Some((version.parse::<Version>().ok()?, version)))
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, version)| version.clone())
    }
}
