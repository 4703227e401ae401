//! # sonar-core
//!
//! Core types and utilities shared across all Sonar crates.
//!
//! This crate provides:
//! - npm-flavoured `Version` and `VersionReq` types
//! - Change records describing what a command did (or would do) to a manifest
//! - Dependency kinds and the kind filters commands select with
//! - `SonarError` for unified error handling
//!
//! ## Architecture
//!
//! - `types`: Core data types (Version, Change, DependencyKind, PackageId)
//! - `error`: Error types and result aliases
//! - `utils`: Path helpers

pub mod error;
pub mod types;
pub mod utils;

// Re-export commonly used types
pub use error::{SonarError, SonarResult};
pub use types::{
    BumpKind, Change, ChangeKind, ChangeTarget, DependencyKind, KindFilter, PackageId,
    SemVerChange, Version, VersionReq,
};
