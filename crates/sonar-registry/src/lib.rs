//! npm registry lookups for Sonar
//!
//! This crate answers one question: what is the latest published version of
//! a package (optionally restricted to a canary tag)? It provides an HTTP
//! client with retry logic, a per-run cache that de-duplicates concurrent
//! lookups, and the `Resolve` capability the workspace model consumes.

pub mod api;
pub mod cache;
pub mod client;
pub mod resolver;

// Re-export main types
pub use api::{PackageMetadataResponse, VersionMetadata};
pub use cache::{CacheStats, ResolutionCache};
pub use client::{AuthConfig, RegistryClient, RetryConfig};
pub use resolver::{RegistryResolver, Resolve};

use sonar_core::error::SonarError;

/// Result type for registry operations
pub type RegistryResult<T> = Result<T, SonarError>;
