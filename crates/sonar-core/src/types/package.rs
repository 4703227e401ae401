//! Package identity helpers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::utils::to_slash;

/// Manifest file name every workspace package is discovered by
pub const MANIFEST_FILE: &str = "package.json";

/// Stable identity of a workspace package: its manifest path relative to the
/// workspace folder, always with `/` separators.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Id of the root manifest
    pub fn root() -> Self {
        Self(MANIFEST_FILE.to_string())
    }

    /// Build an id from a path relative to the workspace folder
    pub fn from_relative(path: &Path) -> Self {
        Self(to_slash(path))
    }

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0 == MANIFEST_FILE
    }

    /// Directory holding the manifest, relative to the workspace folder
    pub fn dir(&self) -> &Path {
        Path::new(&self.0).parent().unwrap_or_else(|| Path::new(""))
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scope of a package name: the part before the first `/`.
///
/// Unscoped names are their own scope (`lodash` -> `lodash`).
pub fn scope_of(name: &str) -> &str {
    name.split('/').next().unwrap_or(name)
}

/// Check if this is a plausible npm package name
pub fn is_valid_name(name: &str) -> bool {
    let bare = match name.strip_prefix('@') {
        Some(scoped) => match scoped.split_once('/') {
            Some((scope, rest)) if !scope.is_empty() => rest,
            _ => return false,
        },
        None => name,
    };
    !bare.is_empty()
        && name.len() <= 214
        && !bare.starts_with('.')
        && !bare.starts_with('_')
        && bare
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "-._~".contains(c))
}
