//! Error types and result aliases for Sonar operations.
//!
//! Expected absence (no newer version, nothing to change) is never an error;
//! these variants cover I/O, parse, and invalid-input failures only.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for all Sonar operations
#[derive(Error, Debug)]
pub enum SonarError {
    // Manifest errors
    #[error("Failed to read manifest {}", path.display())]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse manifest {}: {message}", path.display())]
    ManifestParse { path: PathBuf, message: String },

    #[error("Failed to write manifest {}", path.display())]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Config errors
    #[error("Failed to parse JSON: {message}")]
    JsonParse { message: String },

    #[error("Failed to parse sonar.toml: {message} at line {line}, column {column}")]
    TomlParse {
        message: String,
        line: usize,
        column: usize,
    },

    #[error("Configuration field '{field}' is invalid: {reason}")]
    ConfigValidation { field: String, reason: String },

    // Registry errors
    #[error("Package '{name}' not found in registry")]
    PackageNotFound { name: String },

    #[error("Network error: {message}")]
    Network {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Input errors
    #[error("Invalid version '{input}'")]
    InvalidVersion { input: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Prompt failed: {message}")]
    Prompt { message: String },

    // IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type alias for Sonar operations
pub type SonarResult<T> = Result<T, SonarError>;

impl SonarError {
    /// Create a network error from any error type
    pub fn network<E>(message: String, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Network {
            message,
            source: Some(Box::new(source)),
        }
    }

    /// Create an IO error from std::io::Error
    pub fn io(message: String, source: std::io::Error) -> Self {
        Self::Io { message, source }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, SonarError::Network { .. } | SonarError::Io { .. })
    }

    /// Get a user-friendly suggestion for fixing this error
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            SonarError::ManifestParse { .. } => {
                Some("Check the package.json for trailing commas or missing quotes")
            },
            SonarError::ManifestRead { .. } => {
                Some("Check the --folder option points at your workspace root")
            },
            SonarError::PackageNotFound { .. } => {
                Some("Check the package name spelling or whether it has been published")
            },
            SonarError::Network { .. } => {
                Some("Check your internet connection or the --registry option and try again")
            },
            SonarError::InvalidPattern { .. } => {
                Some("Patterns are regular expressions, e.g. \"babel|postcss\"")
            },
            SonarError::ConfigValidation { .. } => {
                Some("Check your .sonarrc, sonar.toml or the \"sonar\" key in package.json")
            },
            _ => None,
        }
    }
}
