//! Missing and unused dependency reconciliation for Sonar
//!
//! Usage is detected twice per package: once over production files only
//! (dev patterns excluded) and once over everything. Comparing the two
//! tells dev-only usage apart from production usage, so dev tooling can be
//! declared once at the workspace root while each package declares what its
//! production code imports.

pub mod detect;
pub mod reconcile;
pub mod scanner;

// Re-export main types
pub use detect::{DetectOptions, DetectUsage, DetectionResult};
pub use reconcile::{apply, reconcile, PackageUsage, PlannedChange, UsagePlan, UsageReconciler, UsageSummary};
pub use scanner::ImportScanner;
