//! Regex import scanner
//!
//! An approximation of a static analyser: it finds module specifiers in
//! `import`, `export … from`, `require()` and dynamic `import()` forms and
//! reduces them to package names. Comments and strings that merely look like
//! imports are counted too.

use glob::Pattern;
use regex::Regex;
use sonar_core::error::{SonarError, SonarResult};
use sonar_core::types::{is_valid_name, MANIFEST_FILE};
use sonar_core::utils::{get_extension, is_hidden};
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};
use walkdir::{DirEntry, WalkDir};

use crate::detect::{DetectOptions, DetectUsage, DetectionResult};

const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "mjs", "cjs", "ts", "tsx"];

const NODE_BUILTINS: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "diagnostics_channel", "dns", "domain", "events", "fs", "http", "http2",
    "https", "inspector", "module", "net", "os", "path", "perf_hooks", "process", "punycode",
    "querystring", "readline", "repl", "stream", "string_decoder", "sys", "timers", "tls",
    "trace_events", "tty", "url", "util", "v8", "vm", "wasi", "worker_threads", "zlib",
];

const SPECIFIER_PATTERNS: &[&str] = &[
    // import x from 'a', export { y } from 'a', including multi-line clauses
    r#"\b(?:import|export)\s[^'";]*?\bfrom\s*['"]([^'"\n]+)['"]"#,
    // import 'a'
    r#"\bimport\s*['"]([^'"\n]+)['"]"#,
    // require('a'), import('a')
    r#"\b(?:require|import)\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#,
];

/// Detector that scans a package's source files for imports
#[derive(Debug, Clone)]
pub struct ImportScanner {
    patterns: Vec<Regex>,
}

impl ImportScanner {
    pub fn new() -> SonarResult<Self> {
        let patterns = SPECIFIER_PATTERNS
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| SonarError::InvalidPattern {
                    pattern: pattern.to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<SonarResult<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    /// Package names imported by one source text
    pub fn imports(&self, source: &str) -> BTreeSet<String> {
        self.patterns
            .iter()
            .flat_map(|pattern| pattern.captures_iter(source))
            .filter_map(|captures| captures.get(1))
            .filter_map(|specifier| package_name(specifier.as_str()))
            .collect()
    }

    /// Blocking scan of one package directory
    pub fn scan(&self, package_dir: &Path, options: &DetectOptions) -> SonarResult<DetectionResult> {
        let ignore = compile_globs(&options.ignore_patterns)?;
        let mut result = DetectionResult::default();

        let walker = WalkDir::new(package_dir)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_skipped(entry, package_dir, &ignore));

        for entry in walker {
            let entry = entry.map_err(|e| {
                SonarError::io(format!("Failed to scan {}", package_dir.display()), e.into())
            })?;
            if !entry.file_type().is_file() || !is_source_file(entry.path()) {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(package_dir)
                .unwrap_or(entry.path())
                .to_path_buf();
            match read_source(entry.path()) {
                Ok(source) => {
                    let imports = self.imports(&source);
                    trace!(file = %relative.display(), count = imports.len(), "Scanned file");
                    result.using.extend(imports);
                },
                Err(reason) => {
                    result.invalid_files.insert(relative, reason);
                },
            }
        }

        result
            .using
            .retain(|name| *name != options.package_name && !options.is_ignored(name));
        result.missing = result
            .using
            .iter()
            .filter(|name| !options.declares(name))
            .cloned()
            .collect();
        result.unused_dependencies = unused(&options.dependencies, &result.using, options);
        result.unused_dev_dependencies = unused(&options.dev_dependencies, &result.using, options);

        debug!(
            package = %options.package_name,
            using = result.using.len(),
            missing = result.missing.len(),
            invalid = result.invalid_files.len(),
            "Scanned package"
        );
        Ok(result)
    }
}

impl DetectUsage for ImportScanner {
    async fn detect(&self, package_dir: &Path, options: &DetectOptions) -> SonarResult<DetectionResult> {
        let scanner = self.clone();
        let dir = package_dir.to_path_buf();
        let options = options.clone();

        tokio::task::spawn_blocking(move || scanner.scan(&dir, &options))
            .await
            .map_err(|e| {
                SonarError::io(
                    format!("Usage scan of {} did not complete", package_dir.display()),
                    io::Error::new(io::ErrorKind::Other, e),
                )
            })?
    }
}

/// Reduce a module specifier to the package it names
///
/// Relative and absolute paths, URLs, subpath imports (`#x`) and Node
/// built-ins yield `None`.
pub fn package_name(specifier: &str) -> Option<String> {
    if specifier.starts_with("node:")
        || specifier.starts_with('.')
        || specifier.starts_with('/')
        || specifier.starts_with('#')
        || specifier.contains(':')
    {
        return None;
    }

    let mut segments = specifier.split('/');
    let first = segments.next()?;
    let name = if first.starts_with('@') {
        format!("{first}/{}", segments.next()?)
    } else {
        if NODE_BUILTINS.contains(&first) {
            return None;
        }
        first.to_string()
    };

    is_valid_name(&name).then_some(name)
}

fn compile_globs(patterns: &[String]) -> SonarResult<Vec<Pattern>> {
    patterns
        .iter()
        .map(|pattern| {
            Pattern::new(pattern).map_err(|e| SonarError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

/// Whether `relative` is excluded by any ignore glob.
///
/// A pattern without `/` is tried against each path component; one with
/// `/` against every trailing run of components.
fn is_ignored_path(relative: &Path, ignore: &[Pattern]) -> bool {
    let components: Vec<&str> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect();

    ignore.iter().any(|pattern| {
        if pattern.as_str().contains('/') {
            (0..components.len()).any(|start| pattern.matches(&components[start..].join("/")))
        } else {
            components.iter().any(|component| pattern.matches(component))
        }
    })
}

fn is_skipped(entry: &DirEntry, package_dir: &Path, ignore: &[Pattern]) -> bool {
    if entry.depth() == 0 {
        return false;
    }
    let file_name = entry.file_name().to_string_lossy();
    if file_name == "node_modules" || is_hidden(&file_name) {
        return true;
    }
    // Nested packages are scanned on their own
    if entry.file_type().is_dir() && entry.path().join(MANIFEST_FILE).is_file() {
        return true;
    }
    let relative = entry.path().strip_prefix(package_dir).unwrap_or(entry.path());
    is_ignored_path(relative, ignore)
}

fn is_source_file(path: &Path) -> bool {
    get_extension(path).is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
}

fn read_source(path: &Path) -> Result<String, String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    String::from_utf8(bytes).map_err(|e| e.to_string())
}

fn unused(
    declared: &BTreeSet<String>,
    using: &BTreeSet<String>,
    options: &DetectOptions,
) -> BTreeSet<String> {
    declared
        .iter()
        .filter(|name| !using.contains(*name) && !options.is_ignored(name))
        .cloned()
        .collect()
}
