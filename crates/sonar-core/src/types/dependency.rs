//! Dependency kinds and the filters commands select them with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Manifest section a dependency is declared under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DependencyKind {
    /// `dependencies`, needed at runtime
    Normal,
    /// `devDependencies`
    Dev,
    /// `peerDependencies`, must be provided by the consumer
    Peer,
}

impl DependencyKind {
    pub const ALL: [DependencyKind; 3] = [
        DependencyKind::Normal,
        DependencyKind::Dev,
        DependencyKind::Peer,
    ];

    /// Key of the section in `package.json`
    pub fn manifest_key(&self) -> &'static str {
        match self {
            DependencyKind::Normal => "dependencies",
            DependencyKind::Dev => "devDependencies",
            DependencyKind::Peer => "peerDependencies",
        }
    }

    /// Check if this dependency is needed at runtime
    pub fn is_runtime(&self) -> bool {
        matches!(self, DependencyKind::Normal)
    }

    /// Check if this dependency is only for development
    pub fn is_dev_only(&self) -> bool {
        matches!(self, DependencyKind::Dev)
    }

    /// Check if this dependency must be provided by the consumer
    pub fn is_peer(&self) -> bool {
        matches!(self, DependencyKind::Peer)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.manifest_key())
    }
}

/// Which dependency kinds an operation applies to (`{dep, dev, peer}`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KindFilter {
    pub dep: bool,
    pub dev: bool,
    pub peer: bool,
}

impl Default for KindFilter {
    fn default() -> Self {
        Self::all()
    }
}

impl KindFilter {
    pub const fn all() -> Self {
        Self {
            dep: true,
            dev: true,
            peer: true,
        }
    }

    /// `dependencies` and `devDependencies`
    pub const fn non_peer() -> Self {
        Self {
            dep: true,
            dev: true,
            peer: false,
        }
    }

    pub const fn peer_only() -> Self {
        Self {
            dep: false,
            dev: false,
            peer: true,
        }
    }

    pub const fn only(kind: DependencyKind) -> Self {
        Self {
            dep: matches!(kind, DependencyKind::Normal),
            dev: matches!(kind, DependencyKind::Dev),
            peer: matches!(kind, DependencyKind::Peer),
        }
    }

    pub fn includes(&self, kind: DependencyKind) -> bool {
        match kind {
            DependencyKind::Normal => self.dep,
            DependencyKind::Dev => self.dev,
            DependencyKind::Peer => self.peer,
        }
    }

    pub fn set(&mut self, kind: DependencyKind, enabled: bool) {
        match kind {
            DependencyKind::Normal => self.dep = enabled,
            DependencyKind::Dev => self.dev = enabled,
            DependencyKind::Peer => self.peer = enabled,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.dep || self.dev || self.peer)
    }

    /// Selected kinds in manifest order
    pub fn kinds(self) -> impl Iterator<Item = DependencyKind> {
        DependencyKind::ALL
            .into_iter()
            .filter(move |kind| self.includes(*kind))
    }
}
