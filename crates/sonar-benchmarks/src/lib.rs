//! Sonar benchmarking suite
//!
//! Benchmarks for the range policy and the workspace graph.

pub mod common;

pub use common::*;
