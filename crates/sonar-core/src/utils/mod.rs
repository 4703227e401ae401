//! Utility functions and helpers.
//!
//! Common functionality used across multiple Sonar crates.

pub mod path;

// Re-export commonly used utilities
pub use path::{get_extension, is_hidden, normalize_path, to_slash};
