//! Common utilities for benchmarks

use criterion::Criterion;
use pprof::criterion::{Output, PProfProfiler};

/// Configure criterion with flamegraph profiling support
pub fn criterion_config() -> Criterion {
    Criterion::default()
        .warm_up_time(std::time::Duration::from_secs(3))
        .measurement_time(std::time::Duration::from_secs(10))
        .sample_size(100)
        .with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)))
}

/// `package.json` of a workspace member declaring `count` dependencies.
///
/// Every other member pins a different minor so ranges disagree.
pub fn member_manifest(index: usize, count: usize) -> String {
    let dependencies: Vec<String> = (0..count)
        .map(|dep| format!("\"dep-{dep}\": \"^1.{}.0\"", index % 2))
        .collect();
    format!(
        "{{\"name\": \"member-{index}\", \"version\": \"1.0.0\", \"dependencies\": {{{}}}}}",
        dependencies.join(", ")
    )
}
