//! Core data types for Sonar.
//!
//! This module provides the fundamental types used throughout the workspace:
//! - Version and range types with npm semantics
//! - Change records for reports
//! - Dependency kinds and filters
//! - Package identity

pub mod change;
pub mod dependency;
pub mod package;
pub mod version;

// Re-export all public types
pub use change::{BumpKind, Change, ChangeKind, ChangeTarget, SemVerChange};
pub use dependency::{DependencyKind, KindFilter};
pub use package::{is_valid_name, scope_of, PackageId, MANIFEST_FILE};
pub use version::{Comparator, Op, PartialVersion, Version, VersionError, VersionReq};
