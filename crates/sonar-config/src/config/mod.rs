//! Run configuration shared by all commands

use crate::ConfigResult;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sonar_core::error::SonarError;

/// Public npm registry
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Registry lookups and file operations in flight at once
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Resolved Sonar configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SonarConfig {
    /// Workspace folder, relative to the working directory
    pub folder: String,

    pub concurrency: usize,

    pub registry: String,

    /// Bearer token for private registries, only ever read from the environment
    #[serde(skip)]
    pub registry_token: Option<String>,

    /// Scopes updated by `update --internal`
    #[serde(alias = "internal-scopes")]
    pub internal_scopes: Vec<String>,

    /// Scopes never updated
    #[serde(alias = "ignore-scopes")]
    pub ignore_scopes: Vec<String>,

    /// Named dependency patterns for `update --group`
    pub groups: IndexMap<String, String>,

    /// Globs for files whose imports are development-only
    #[serde(alias = "dev-patterns")]
    pub dev_patterns: Vec<String>,

    /// Packages skipped by the unused-dependency check
    #[serde(alias = "ignore-unused-in-packages")]
    pub ignore_unused_in_packages: Vec<String>,

    #[serde(alias = "depCheckConfig", alias = "dep-check-config")]
    pub usage: UsageConfig,
}

/// Usage detector settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageConfig {
    /// Dependency names never reported missing or unused
    #[serde(alias = "ignore-matches")]
    pub ignore_matches: Vec<String>,

    /// Path globs never scanned
    #[serde(alias = "ignore-patterns")]
    pub ignore_patterns: Vec<String>,
}

impl Default for SonarConfig {
    fn default() -> Self {
        Self {
            folder: ".".to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            registry: DEFAULT_REGISTRY.to_string(),
            registry_token: None,
            internal_scopes: Vec::new(),
            ignore_scopes: Vec::new(),
            groups: IndexMap::new(),
            dev_patterns: Vec::new(),
            ignore_unused_in_packages: Vec::new(),
            usage: UsageConfig::default(),
        }
    }
}

impl SonarConfig {
    /// Parse the JSON form used by `.sonarrc`, `.sonar.json` and the
    /// `"sonar"` key of `package.json`
    pub fn from_json_value(value: serde_json::Value) -> ConfigResult<Self> {
        let config: SonarConfig =
            serde_json::from_value(value).map_err(|e| SonarError::JsonParse {
                message: format!("Invalid sonar configuration: {}", e),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let value = serde_json::from_str(content).map_err(|e| SonarError::JsonParse {
            message: format!("JSON parsing error: {}", e),
        })?;
        Self::from_json_value(value)
    }

    /// Check field constraints
    pub fn validate(&self) -> ConfigResult<()> {
        if self.concurrency == 0 {
            return Err(SonarError::ConfigValidation {
                field: "concurrency".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        if !(self.registry.starts_with("http://") || self.registry.starts_with("https://")) {
            return Err(SonarError::ConfigValidation {
                field: "registry".to_string(),
                reason: format!("'{}' is not an http(s) URL", self.registry),
            });
        }

        if self.folder.trim().is_empty() {
            return Err(SonarError::ConfigValidation {
                field: "folder".to_string(),
                reason: "must not be empty".to_string(),
            });
        }

        Ok(())
    }

    /// Regex for a named group
    pub fn group(&self, name: &str) -> Option<&str> {
        self.groups.get(name).map(String::as_str)
    }
}
