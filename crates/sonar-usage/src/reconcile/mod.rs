//! Two-phase missing/unused reconciliation
//!
//! [`reconcile`] is a pure fold over per-package detection results and
//! decides what to add and remove. [`UsageReconciler`] runs the detector
//! and applies the resulting plan to a [`Workspace`].

use futures::future::join_all;
use sonar_config::SonarConfig;
use sonar_core::error::{SonarError, SonarResult};
use sonar_core::types::{DependencyKind, PackageId};
use sonar_registry::Resolve;
use sonar_workspace::{Package, Workspace};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::detect::{DetectOptions, DetectUsage, DetectionResult};

/// Both detection views of one package
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageUsage {
    pub id: PackageId,
    /// Declared names and the package's own name
    pub options: DetectOptions,
    /// Dev patterns excluded
    pub production: DetectionResult,
    /// Every source file
    pub base: DetectionResult,
}

impl PackageUsage {
    pub fn name(&self) -> &str {
        &self.options.package_name
    }

    /// Names imported only from dev files
    fn dev_only(&self) -> impl Iterator<Item = &String> {
        self.base
            .using
            .iter()
            .filter(|name| !self.production.using.contains(*name))
    }
}

/// One dependency entry to add or remove
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlannedChange {
    pub package: PackageId,
    pub name: String,
    pub kind: DependencyKind,
}

impl PlannedChange {
    fn new(package: &PackageId, name: &str, kind: DependencyKind) -> Self {
        Self {
            package: package.clone(),
            name: name.to_string(),
            kind,
        }
    }
}

/// What reconciliation wants changed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsagePlan {
    pub missing: Vec<PlannedChange>,
    pub unused: Vec<PlannedChange>,
}

impl UsagePlan {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.unused.is_empty()
    }

    /// Packages touched by the plan, in path order
    pub fn packages(&self) -> BTreeSet<&PackageId> {
        self.missing
            .iter()
            .chain(&self.unused)
            .map(|change| &change.package)
            .collect()
    }
}

/// Counts reported after a reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageSummary {
    pub missing_count: usize,
    pub unused_count: usize,
    pub packages_with_changes: usize,
    /// Unreadable files per package name
    pub invalid_files: BTreeMap<String, BTreeMap<PathBuf, String>>,
}

impl UsageSummary {
    pub fn has_changes(&self) -> bool {
        self.packages_with_changes > 0
    }
}

/// Classify missing and unused dependencies across the workspace.
///
/// Production-missing names go to the importing package's `dependencies`.
/// Names missing only once dev files are included go once to the root's
/// `devDependencies`. Unused production entries are removed from their
/// package; unused dev entries are removed unless some package still
/// imports them. A removed production entry that is imported from dev
/// files somewhere moves to the root's `devDependencies`.
///
/// Workspace package names are never added, and packages listed in
/// `ignore_unused_in` keep every declared entry.
pub fn reconcile(
    usages: &[PackageUsage],
    workspace_names: &BTreeSet<String>,
    ignore_unused_in: &[String],
) -> UsagePlan {
    let root = usages.iter().find(|usage| usage.id.is_root());

    let used_anywhere: BTreeSet<&String> = usages.iter().flat_map(|usage| &usage.base.using).collect();
    let dev_only_anywhere: BTreeSet<&String> = usages.iter().flat_map(|usage| usage.dev_only()).collect();

    let mut plan = UsagePlan::default();
    let mut root_dev_missing = BTreeSet::new();

    for usage in usages {
        for name in &usage.production.missing {
            if workspace_names.contains(name) {
                debug!(package = usage.name(), dependency = %name, "Workspace package import left undeclared");
                continue;
            }
            plan.missing.push(PlannedChange::new(&usage.id, name, DependencyKind::Normal));
        }

        for name in usage.base.missing.difference(&usage.production.missing) {
            if !workspace_names.contains(name) {
                root_dev_missing.insert(name.clone());
            }
        }

        if ignore_unused_in.iter().any(|ignored| ignored == usage.name()) {
            debug!(package = usage.name(), "Skipping unused check");
            continue;
        }

        for name in &usage.production.unused_dependencies {
            plan.unused.push(PlannedChange::new(&usage.id, name, DependencyKind::Normal));
        }
        for name in &usage.base.unused_dev_dependencies {
            if used_anywhere.contains(name) {
                debug!(package = usage.name(), dependency = %name, "Dev dependency used elsewhere, keeping");
                continue;
            }
            plan.unused.push(PlannedChange::new(&usage.id, name, DependencyKind::Dev));
        }
    }

    // Production entries about to go that dev files still import
    for change in &plan.unused {
        if change.kind == DependencyKind::Normal && dev_only_anywhere.contains(&change.name) {
            root_dev_missing.insert(change.name.clone());
        }
    }

    let Some(root) = root else {
        if !root_dev_missing.is_empty() {
            warn!(
                count = root_dev_missing.len(),
                "No root manifest, dev-only dependencies cannot be declared"
            );
        }
        return plan;
    };

    for name in root_dev_missing {
        if !root_keeps(root, &name, &plan.unused) {
            plan.missing.push(PlannedChange::new(&root.id, &name, DependencyKind::Dev));
        }
    }
    plan
}

/// Whether the root still declares `name` once planned removals apply
fn root_keeps(root: &PackageUsage, name: &str, unused: &[PlannedChange]) -> bool {
    let removed = |kind| {
        unused
            .iter()
            .any(|change| change.package == root.id && change.kind == kind && change.name == name)
    };
    (root.options.dependencies.contains(name) && !removed(DependencyKind::Normal))
        || (root.options.dev_dependencies.contains(name) && !removed(DependencyKind::Dev))
        || root.options.peer_dependencies.contains(name)
}

/// Drives detection over a workspace and applies the reconciled plan
#[derive(Debug, Clone)]
pub struct UsageReconciler<D> {
    detector: D,
    dev_patterns: Vec<String>,
    ignore_patterns: Vec<String>,
    ignore_matches: Vec<String>,
    ignore_unused_in_packages: Vec<String>,
    concurrency: usize,
}

impl<D: DetectUsage> UsageReconciler<D> {
    pub fn new(detector: D, config: &SonarConfig) -> Self {
        Self {
            detector,
            dev_patterns: config.dev_patterns.clone(),
            ignore_patterns: config.usage.ignore_patterns.clone(),
            ignore_matches: config.usage.ignore_matches.clone(),
            ignore_unused_in_packages: config.ignore_unused_in_packages.clone(),
            concurrency: config.concurrency.max(1),
        }
    }

    fn options_for(&self, package: &Package) -> DetectOptions {
        let names = |kind| {
            package
                .dependencies(kind)
                .map(|(name, _)| name.to_string())
                .collect::<BTreeSet<_>>()
        };
        DetectOptions {
            package_name: package.name().to_string(),
            ignore_patterns: self.ignore_patterns.clone(),
            ignore_matches: self.ignore_matches.clone(),
            dependencies: names(DependencyKind::Normal),
            dev_dependencies: names(DependencyKind::Dev),
            peer_dependencies: names(DependencyKind::Peer),
        }
    }

    /// Run both detection views for every package, bounded by the
    /// configured concurrency
    pub async fn detect_all(&self, workspace: &Workspace) -> SonarResult<Vec<PackageUsage>> {
        let permits = Arc::new(Semaphore::new(self.concurrency));

        let tasks = workspace.packages().map(|package| {
            let permits = Arc::clone(&permits);
            let dir = workspace.package_dir(package.id());
            let options = self.options_for(package);
            let id = package.id().clone();
            async move {
                let _permit = permits.acquire().await.ok();
                let production_options = options.excluding(&self.dev_patterns);
                let (production, base) = futures::try_join!(
                    self.detector.detect(&dir, &production_options),
                    self.detector.detect(&dir, &options),
                )?;
                Ok::<_, SonarError>(PackageUsage {
                    id,
                    options,
                    production,
                    base,
                })
            }
        });

        join_all(tasks).await.into_iter().collect()
    }

    /// Detect, reconcile and apply; manifests are only changed in memory
    pub async fn run<R: Resolve>(&self, workspace: &mut Workspace, resolver: &R) -> SonarResult<UsageSummary> {
        let usages = self.detect_all(workspace).await?;

        let mut invalid_files = BTreeMap::new();
        for usage in &usages {
            for (file, reason) in &usage.base.invalid_files {
                warn!(package = usage.name(), file = %file.display(), reason = %reason, "Could not parse file");
            }
            if !usage.base.invalid_files.is_empty() {
                invalid_files.insert(usage.name().to_string(), usage.base.invalid_files.clone());
            }
        }

        let workspace_names = workspace.packages().map(|package| package.name().to_string()).collect();
        let plan = reconcile(&usages, &workspace_names, &self.ignore_unused_in_packages);

        let mut summary = apply(&plan, workspace, resolver).await;
        summary.invalid_files = invalid_files;
        Ok(summary)
    }
}

/// Apply a plan: removals first, then additions
pub async fn apply<R: Resolve>(plan: &UsagePlan, workspace: &mut Workspace, resolver: &R) -> UsageSummary {
    let mut summary = UsageSummary::default();
    let mut changed = BTreeSet::new();

    for change in &plan.unused {
        if workspace.remove_dependency(&change.package, &change.name, change.kind) {
            summary.unused_count += 1;
            changed.insert(change.package.clone());
        }
    }
    for change in &plan.missing {
        let added = workspace
            .add_dependency(&change.package, &change.name, None, change.kind, resolver)
            .await;
        if added.is_some() {
            summary.missing_count += 1;
            changed.insert(change.package.clone());
        }
    }

    summary.packages_with_changes = changed.len();
    info!(
        missing = summary.missing_count,
        unused = summary.unused_count,
        packages = summary.packages_with_changes,
        "Reconciled dependency usage"
    );
    summary
}
