//! Manifest and configuration parsing for Sonar
//!
//! This crate reads and writes `package.json` manifests with round-trip
//! fidelity, and resolves the run configuration from `.sonarrc`,
//! `.sonar.json`, `sonar.toml` or a `"sonar"` key in `package.json`,
//! layered with environment and CLI overrides.

pub mod config;
pub mod json;
pub mod merge;
pub mod toml;

// Re-export main types
pub use config::{SonarConfig, UsageConfig, DEFAULT_CONCURRENCY, DEFAULT_REGISTRY};
pub use json::PackageJson;
pub use merge::{ConfigLayering, ConfigLoader, ConfigOverrides, ConfigSource};

use sonar_core::error::SonarError;

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, SonarError>;
