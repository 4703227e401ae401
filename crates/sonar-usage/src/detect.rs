//! The usage-detection capability

use sonar_core::error::SonarResult;
use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::path::{Path, PathBuf};

/// What a detector needs to know about one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectOptions {
    /// The package's own name; importing yourself is not a dependency
    pub package_name: String,
    /// Path globs never scanned
    pub ignore_patterns: Vec<String>,
    /// Dependency names never reported
    pub ignore_matches: Vec<String>,
    pub dependencies: BTreeSet<String>,
    pub dev_dependencies: BTreeSet<String>,
    pub peer_dependencies: BTreeSet<String>,
}

impl DetectOptions {
    pub fn declares(&self, name: &str) -> bool {
        self.dependencies.contains(name)
            || self.dev_dependencies.contains(name)
            || self.peer_dependencies.contains(name)
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore_matches.iter().any(|ignored| ignored == name)
    }

    /// Same options with extra path globs excluded
    pub fn excluding(&self, patterns: &[String]) -> Self {
        let mut options = self.clone();
        options.ignore_patterns.extend(patterns.iter().cloned());
        options
    }
}

/// Outcome of one detection pass over one package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionResult {
    /// Imported but not declared in any section
    pub missing: BTreeSet<String>,
    /// Declared in `dependencies` but never imported
    pub unused_dependencies: BTreeSet<String>,
    /// Declared in `devDependencies` but never imported
    pub unused_dev_dependencies: BTreeSet<String>,
    /// Every package name imported
    pub using: BTreeSet<String>,
    /// Files that could not be read, relative to the package, with the reason
    pub invalid_files: BTreeMap<PathBuf, String>,
}

/// Detects which dependencies a package's source actually imports
pub trait DetectUsage: Send + Sync {
    fn detect(
        &self,
        package_dir: &Path,
        options: &DetectOptions,
    ) -> impl Future<Output = SonarResult<DetectionResult>> + Send;
}
