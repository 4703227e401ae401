//! Change records describing what a command did, or would do, to manifests.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Classification of the difference between two concrete versions.
///
/// Declaration order is report order: release bumps first, most severe first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SemVerChange {
    Major,
    Minor,
    Patch,
    Premajor,
    Preminor,
    Prepatch,
    Prerelease,
}

impl SemVerChange {
    pub const ALL: [SemVerChange; 7] = [
        SemVerChange::Major,
        SemVerChange::Minor,
        SemVerChange::Patch,
        SemVerChange::Premajor,
        SemVerChange::Preminor,
        SemVerChange::Prepatch,
        SemVerChange::Prerelease,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SemVerChange::Major => "major",
            SemVerChange::Minor => "minor",
            SemVerChange::Patch => "patch",
            SemVerChange::Premajor => "premajor",
            SemVerChange::Preminor => "preminor",
            SemVerChange::Prepatch => "prepatch",
            SemVerChange::Prerelease => "prerelease",
        }
    }

    /// `premajor`, `preminor` and `prepatch`: a jump onto a canary line
    pub fn is_pre_bump(&self) -> bool {
        matches!(
            self,
            SemVerChange::Premajor | SemVerChange::Preminor | SemVerChange::Prepatch
        )
    }
}

impl fmt::Display for SemVerChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Version component a package bump increments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpKind {
    Major,
    Minor,
    Patch,
}

impl FromStr for BumpKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "major" => Ok(BumpKind::Major),
            "minor" => Ok(BumpKind::Minor),
            "patch" => Ok(BumpKind::Patch),
            other => Err(format!(
                "unknown bump '{other}', expected one of major, minor, patch"
            )),
        }
    }
}

impl fmt::Display for BumpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        SemVerChange::from(*self).fmt(f)
    }
}

impl From<BumpKind> for SemVerChange {
    fn from(kind: BumpKind) -> Self {
        match kind {
            BumpKind::Major => SemVerChange::Major,
            BumpKind::Minor => SemVerChange::Minor,
            BumpKind::Patch => SemVerChange::Patch,
        }
    }
}

/// What happened to a package or dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Bump(SemVerChange),
    Add,
    Remove,
    /// Own version unchanged, but dependencies moved
    Resync,
}

impl ChangeKind {
    /// Upper-case group label used in reports
    pub fn label(&self) -> String {
        match self {
            ChangeKind::Bump(change) => change.as_str().to_ascii_uppercase(),
            ChangeKind::Add => "ADD".to_string(),
            ChangeKind::Remove => "REMOVE".to_string(),
            ChangeKind::Resync => "RESYNC".to_string(),
        }
    }

    /// Whether a later change of this kind replaces an `earlier` one for
    /// the same name.
    ///
    /// An addition and a removal stand side by side so a dependency moved
    /// between packages is reported as both.
    pub fn replaces(&self, earlier: &ChangeKind) -> bool {
        !matches!(
            (self, earlier),
            (ChangeKind::Add, ChangeKind::Remove) | (ChangeKind::Remove, ChangeKind::Add)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeTarget {
    Package,
    Dependency,
}

/// One entry of a change report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Change {
    pub kind: ChangeKind,
    pub name: String,
    pub from_version: Option<String>,
    pub to_version: Option<String>,
    pub target: ChangeTarget,
}

impl Change {
    pub fn dependency(
        kind: ChangeKind,
        name: impl Into<String>,
        from_version: Option<String>,
        to_version: Option<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            from_version,
            to_version,
            target: ChangeTarget::Dependency,
        }
    }

    pub fn package(
        kind: ChangeKind,
        name: impl Into<String>,
        from_version: Option<String>,
        to_version: Option<String>,
    ) -> Self {
        Self {
            kind,
            name: name.into(),
            from_version,
            to_version,
            target: ChangeTarget::Package,
        }
    }

    pub fn is_package(&self) -> bool {
        self.target == ChangeTarget::Package
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.from_version, &self.to_version) {
            (Some(from), Some(to)) if from != to => write!(f, "{} {} -> {}", self.name, from, to),
            (_, Some(to)) => write!(f, "{} {}", self.name, to),
            (Some(from), None) => write!(f, "{} {} (removed)", self.name, from),
            (None, None) => f.write_str(&self.name),
        }
    }
}
