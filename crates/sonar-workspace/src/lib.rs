//! Workspace graph and version reconciliation for Sonar
//!
//! A [`Workspace`] owns every [`Package`] (one per manifest) and every
//! [`Dependency`] (one per referenced name). Relations between them are
//! plain id lookups: packages are keyed by [`PackageId`], dependencies by
//! name. Range rewriting follows the operator-preserving rules in
//! [`policy`].

pub mod dependency;
pub mod discover;
pub mod package;
pub mod policy;
pub mod workspace;

// Re-export main types
pub use dependency::{Dependency, Latest, RangeRewrite, UsageCounts, VersionUsage};
pub use discover::discover_manifests;
pub use package::Package;
pub use policy::{classify_wildcard, decide, rewrite, Decision, Wildcards};
pub use workspace::Workspace;

pub use sonar_core::types::PackageId;
