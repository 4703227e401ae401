//! A dependency name and every range it is declared under

use indexmap::IndexMap;
use sonar_core::types::{
    scope_of, Change, ChangeKind, DependencyKind, KindFilter, PackageId, SemVerChange, Version,
    VersionReq,
};
use tracing::debug;

use crate::policy;

/// Per-kind usage counters of one range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageCounts {
    pub runtime: usize,
    pub dev: usize,
    pub peer: usize,
}

impl UsageCounts {
    pub fn total(&self) -> usize {
        self.runtime + self.dev + self.peer
    }

    pub fn get(&self, kind: DependencyKind) -> usize {
        match kind {
            DependencyKind::Normal => self.runtime,
            DependencyKind::Dev => self.dev,
            DependencyKind::Peer => self.peer,
        }
    }

    fn slot(&mut self, kind: DependencyKind) -> &mut usize {
        match kind {
            DependencyKind::Normal => &mut self.runtime,
            DependencyKind::Dev => &mut self.dev,
            DependencyKind::Peer => &mut self.peer,
        }
    }

    /// True if any kind selected by `filter` is in use
    pub fn matches(&self, filter: KindFilter) -> bool {
        filter.kinds().any(|kind| self.get(kind) > 0)
    }
}

/// Usage of one range string
#[derive(Debug, Clone, Default)]
struct VersionBucket {
    counts: UsageCounts,
    parents: Vec<(PackageId, DependencyKind)>,
}

/// One entry of [`Dependency::get_versions`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionUsage {
    pub version: String,
    pub count: usize,
    pub counts: UsageCounts,
    pub packages: Vec<PackageId>,
}

/// A range rewrite to apply to one package's manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeRewrite {
    pub package: PackageId,
    pub kinds: KindFilter,
    pub range: String,
}

/// Where the newest version of a dependency comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Latest {
    /// The dependency is a workspace package; its own version is authoritative
    Workspace(Option<String>),
    /// Registry answer, with the change relative to the reference range
    Registry {
        version: Option<String>,
        change: Option<SemVerChange>,
    },
}

impl Latest {
    pub fn version(&self) -> Option<&str> {
        match self {
            Latest::Workspace(version) => version.as_deref(),
            Latest::Registry { version, .. } => version.as_deref(),
        }
    }

    pub fn change(&self) -> Option<SemVerChange> {
        match self {
            Latest::Workspace(_) => None,
            Latest::Registry { change, .. } => *change,
        }
    }
}

/// A dependency name aggregated across the workspace
#[derive(Debug, Clone)]
pub struct Dependency {
    name: String,
    scope: String,
    versions: IndexMap<String, VersionBucket>,
    min_version: Option<String>,
    workspace_package: Option<PackageId>,
    dirty: bool,
    changes: Vec<Change>,
    latest: Option<Option<String>>,
}

impl Dependency {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            scope: scope_of(name).to_string(),
            versions: IndexMap::new(),
            min_version: None,
            workspace_package: None,
            dirty: false,
            changes: Vec::new(),
            latest: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// Reference range: the first registered, unless a later one has a lower floor
    pub fn min_version(&self) -> Option<&str> {
        self.min_version.as_deref()
    }

    pub fn workspace_package(&self) -> Option<&PackageId> {
        self.workspace_package.as_ref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Most recent change recorded against this dependency
    pub fn change(&self) -> Option<&Change> {
        self.changes.last()
    }

    /// Every change still standing, oldest first.
    ///
    /// A removal from one package and an addition to another are both kept.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    fn record(&mut self, change: Change) {
        self.dirty = true;
        self.changes.retain(|earlier| !change.kind.replaces(&earlier.kind));
        self.changes.push(change);
    }

    /// Distinct range strings currently declared
    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Counters of one range, if declared anywhere
    pub fn usage(&self, version: &str) -> Option<UsageCounts> {
        self.versions.get(version).map(|bucket| bucket.counts)
    }

    pub(crate) fn set_workspace_package(&mut self, package: PackageId) {
        self.workspace_package = Some(package);
    }

    fn register_version(&mut self, version: &str, kind: DependencyKind) {
        let bucket = self.versions.entry(version.to_string()).or_default();
        *bucket.counts.slot(kind) += 1;
    }

    /// Record that `parent` declares this dependency as `version` under `kind`
    pub fn register_parent(
        &mut self,
        version: &str,
        kind: DependencyKind,
        parent: PackageId,
        workspace_package: Option<PackageId>,
    ) {
        self.register_version(version, kind);
        if let Some(bucket) = self.versions.get_mut(version) {
            bucket.parents.push((parent, kind));
        }
        self.recompute_min_version();
        if self.workspace_package.is_none() {
            self.workspace_package = workspace_package;
        }
    }

    /// Drop the linkage of `parent` under `kind`, recording a removal.
    ///
    /// `declared` is the range the parent's manifest currently holds.
    pub fn remove_parent(&mut self, parent: &PackageId, kind: DependencyKind, declared: &str) {
        if let Some(bucket) = self.versions.get_mut(declared) {
            if let Some(index) = bucket
                .parents
                .iter()
                .position(|(id, k)| id == parent && *k == kind)
            {
                bucket.parents.remove(index);
                *bucket.counts.slot(kind) -= 1;
            }
            if bucket.parents.is_empty() {
                self.versions.shift_remove(declared);
            }
        }
        self.recompute_min_version();
        self.record(Change::dependency(
            ChangeKind::Remove,
            self.name.clone(),
            Some(declared.to_string()),
            None,
        ));
    }

    /// Ranges in use by the selected kinds, most used first.
    ///
    /// Ties keep registration order; treat the result as approximate
    /// popularity order.
    pub fn get_versions(&self, filter: KindFilter) -> Vec<VersionUsage> {
        let mut usages: Vec<VersionUsage> = self
            .versions
            .iter()
            .filter(|(_, bucket)| bucket.counts.matches(filter))
            .map(|(version, bucket)| {
                let mut packages: Vec<PackageId> = Vec::new();
                for (id, _) in &bucket.parents {
                    if !packages.contains(id) {
                        packages.push(id.clone());
                    }
                }
                VersionUsage {
                    version: version.clone(),
                    count: bucket.counts.total(),
                    counts: bucket.counts,
                    packages,
                }
            })
            .collect();
        usages.sort_by(|a, b| b.count.cmp(&a.count));
        usages
    }

    /// Most used plain semver range, ignoring protocol ranges
    pub fn most_used_version(&self) -> Option<String> {
        self.get_versions(KindFilter::all())
            .into_iter()
            .map(|usage| usage.version)
            .find(|version| VersionReq::parse(version).is_ok())
    }

    /// Cached registry answer, if one was recorded
    pub fn cached_latest(&self) -> Option<Option<&str>> {
        self.latest.as_ref().map(|version| version.as_deref())
    }

    /// Cache the first registry answer and classify it against `min_version`.
    ///
    /// A version that already satisfies the reference range has no change.
    pub fn record_latest(&mut self, resolved: Option<String>) -> Latest {
        if self.latest.is_none() {
            self.latest = Some(resolved);
        }
        let version = self.latest.clone().flatten();

        let change = version.as_deref().and_then(|latest| {
            let min = self.min_version.as_deref().unwrap_or("0.0.0");
            let req = VersionReq::parse(min).ok()?;
            let parsed = latest
                .parse::<Version>()
                .ok()
                .or_else(|| Version::coerce(latest))?;
            if req.matches(&parsed) {
                return None;
            }
            policy::classify_change(min, latest)
        });

        Latest::Registry { version, change }
    }

    /// Rewrite every range selected by `filter` so it admits `target`.
    ///
    /// Linkages that move are re-keyed under their new range, so a repeated
    /// call with the same target finds nothing to do. The returned rewrites
    /// still have to be written into the packages' manifests.
    pub fn update_version(&mut self, target: &str, filter: KindFilter) -> Vec<RangeRewrite> {
        let mut rewrites = Vec::new();

        for usage in self.get_versions(filter) {
            let Some(decision) = policy::decide(&usage.version, target) else {
                continue;
            };
            debug!(
                dependency = %self.name,
                from = %usage.version,
                to = %decision.new_version,
                change = %decision.change,
                "Rewriting range"
            );

            self.record(Change::dependency(
                ChangeKind::Bump(decision.change),
                self.name.clone(),
                Some(usage.version.clone()),
                Some(decision.new_version.clone()),
            ));

            let moved = self.move_linkages(&usage.version, &decision.new_version, filter);
            rewrites.extend(moved.into_iter().map(|(package, kinds)| RangeRewrite {
                package,
                kinds,
                range: decision.new_version.clone(),
            }));
        }

        if !rewrites.is_empty() {
            self.recompute_min_version();
        }
        rewrites
    }

    /// Declare every range selected by `filter` as exactly `range`.
    ///
    /// Unlike [`Dependency::update_version`] no range is kept for admitting
    /// the choice: `^16.0.0` becomes `^16.8.0` when that is the range asked
    /// for, leaving a single declaration behind.
    pub fn set_range(&mut self, range: &str, filter: KindFilter) -> Vec<RangeRewrite> {
        let mut rewrites = Vec::new();

        for usage in self.get_versions(filter) {
            if usage.version == range {
                continue;
            }
            let kind = policy::classify_change(&usage.version, range)
                .map(ChangeKind::Bump)
                .unwrap_or(ChangeKind::Resync);
            debug!(dependency = %self.name, from = %usage.version, to = range, "Setting range");

            self.record(Change::dependency(
                kind,
                self.name.clone(),
                Some(usage.version.clone()),
                Some(range.to_string()),
            ));

            let moved = self.move_linkages(&usage.version, range, filter);
            rewrites.extend(moved.into_iter().map(|(package, kinds)| RangeRewrite {
                package,
                kinds,
                range: range.to_string(),
            }));
        }

        if !rewrites.is_empty() {
            self.recompute_min_version();
        }
        rewrites
    }

    /// Move the linkages of `from` selected by `filter` to the bucket `to`,
    /// grouped per package
    fn move_linkages(
        &mut self,
        from: &str,
        to: &str,
        filter: KindFilter,
    ) -> Vec<(PackageId, KindFilter)> {
        let Some(bucket) = self.versions.get_mut(from) else {
            return Vec::new();
        };
        let (moving, staying): (Vec<_>, Vec<_>) = bucket
            .parents
            .drain(..)
            .partition(|(_, kind)| filter.includes(*kind));
        bucket.parents = staying;
        for (_, kind) in &moving {
            *bucket.counts.slot(*kind) -= 1;
        }
        if bucket.parents.is_empty() {
            self.versions.shift_remove(from);
        }

        let mut grouped: Vec<(PackageId, KindFilter)> = Vec::new();
        for (package, kind) in moving {
            self.register_version(to, kind);
            if let Some(target) = self.versions.get_mut(to) {
                target.parents.push((package.clone(), kind));
            }
            match grouped.iter_mut().find(|(id, _)| *id == package) {
                Some((_, kinds)) => kinds.set(kind, true),
                None => grouped.push((package, KindFilter::only(kind))),
            }
        }
        grouped
    }

    /// Ranges of the other side that do not admit the given version.
    ///
    /// With `peer_version`, the dependency/devDependency ranges that reject
    /// it; with `dep_version`, the peer ranges that reject it. Protocol
    /// ranges are never reported.
    pub fn peer_dependency_errors(
        &self,
        peer_version: Option<&str>,
        dep_version: Option<&str>,
    ) -> Vec<VersionUsage> {
        let (candidate, filter) = match (peer_version, dep_version) {
            (Some(peer), _) => (peer, KindFilter::non_peer()),
            (None, Some(dep)) => (dep, KindFilter::peer_only()),
            (None, None) => return Vec::new(),
        };
        let Some(version) = Version::coerce(candidate) else {
            return Vec::new();
        };

        self.get_versions(filter)
            .into_iter()
            .filter(|usage| match VersionReq::parse(&usage.version) {
                Ok(req) => !req.matches(&version),
                Err(_) => false,
            })
            .collect()
    }

    fn recompute_min_version(&mut self) {
        let mut best: Option<(&String, Option<Version>)> = None;
        for version in self.versions.keys() {
            let floor = VersionReq::parse(version)
                .ok()
                .and_then(|req| req.min_version());
            best = match best {
                None => Some((version, floor)),
                Some((current, current_floor)) => {
                    let lower = match (&floor, &current_floor) {
                        (Some(new), Some(old)) => new < old,
                        (Some(_), None) => true,
                        (None, _) => false,
                    };
                    if lower {
                        Some((version, floor))
                    } else {
                        Some((current, current_floor))
                    }
                },
            };
        }
        self.min_version = best.map(|(version, _)| version.clone());
    }

    pub(crate) fn record_added(&mut self, range: &str) {
        self.record(Change::dependency(
            ChangeKind::Add,
            self.name.clone(),
            None,
            Some(range.to_string()),
        ));
    }

    pub(crate) fn clear_dirty(&mut self) {
        self.dirty = false;
        self.changes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(path: &str) -> PackageId {
        PackageId::new(path)
    }

    fn react() -> Dependency {
        let mut dependency = Dependency::new("react");
        dependency.register_parent("16.0.0", DependencyKind::Normal, id("a/package.json"), None);
        dependency.register_parent("17.0.0", DependencyKind::Normal, id("b/package.json"), None);
        dependency.register_parent("17.0.0", DependencyKind::Dev, id("c/package.json"), None);
        dependency.register_parent("^16.0.0", DependencyKind::Peer, id("d/package.json"), None);
        dependency
    }

    #[test]
    fn test_scope() {
        assert_eq!(Dependency::new("@acme/ui").scope(), "@acme");
        assert_eq!(Dependency::new("lodash").scope(), "lodash");
    }

    #[test]
    fn test_counts_follow_linkages() {
        let dependency = react();
        assert_eq!(
            dependency.usage("17.0.0"),
            Some(UsageCounts { runtime: 1, dev: 1, peer: 0 })
        );
        let total: usize = dependency
            .get_versions(KindFilter::all())
            .iter()
            .map(|usage| usage.count)
            .sum();
        assert_eq!(total, 4);
    }

    #[test]
    fn test_get_versions_most_used_first() {
        let dependency = react();
        let versions: Vec<String> = dependency
            .get_versions(KindFilter::non_peer())
            .into_iter()
            .map(|usage| usage.version)
            .collect();
        assert_eq!(versions, vec!["17.0.0", "16.0.0"]);

        let peers = dependency.get_versions(KindFilter::peer_only());
        assert_eq!(peers.len(), 1);
        assert_eq!(peers[0].packages, vec![id("d/package.json")]);
    }

    #[test]
    fn test_min_version_keeps_first_unless_lower() {
        let mut dependency = Dependency::new("lodash");
        dependency.register_parent("^4.17.0", DependencyKind::Normal, id("a/package.json"), None);
        assert_eq!(dependency.min_version(), Some("^4.17.0"));

        dependency.register_parent("^4.17.21", DependencyKind::Normal, id("b/package.json"), None);
        assert_eq!(dependency.min_version(), Some("^4.17.0"));

        dependency.register_parent("~4.16.0", DependencyKind::Normal, id("c/package.json"), None);
        assert_eq!(dependency.min_version(), Some("~4.16.0"));
    }

    #[test]
    fn test_protocol_range_never_wins_min_version() {
        let mut dependency = Dependency::new("@acme/ui");
        dependency.register_parent("workspace:*", DependencyKind::Normal, id("a/package.json"), None);
        dependency.register_parent("^1.0.0", DependencyKind::Normal, id("b/package.json"), None);
        assert_eq!(dependency.min_version(), Some("^1.0.0"));
        assert_eq!(dependency.most_used_version(), Some("^1.0.0".to_string()));
    }

    #[test]
    fn test_remove_parent_records_removal() {
        let mut dependency = react();
        dependency.remove_parent(&id("a/package.json"), DependencyKind::Normal, "16.0.0");

        assert!(dependency.is_dirty());
        assert_eq!(dependency.usage("16.0.0"), None);
        let change = dependency.change().unwrap();
        assert_eq!(change.kind, ChangeKind::Remove);
        assert_eq!(change.from_version.as_deref(), Some("16.0.0"));
        assert_eq!(change.to_version, None);
    }

    #[test]
    fn test_update_version_moves_linkages() {
        let mut dependency = react();
        let rewrites = dependency.update_version("17.0.0", KindFilter::non_peer());

        assert_eq!(
            rewrites,
            vec![RangeRewrite {
                package: id("a/package.json"),
                kinds: KindFilter::only(DependencyKind::Normal),
                range: "17.0.0".to_string(),
            }]
        );
        assert_eq!(dependency.usage("16.0.0"), None);
        assert_eq!(
            dependency.usage("17.0.0"),
            Some(UsageCounts { runtime: 2, dev: 1, peer: 0 })
        );
        // The peer range is outside the filter
        assert!(dependency.usage("^16.0.0").is_some());
    }

    #[test]
    fn test_update_version_is_idempotent() {
        let mut dependency = Dependency::new("lodash");
        dependency.register_parent("1.1.x", DependencyKind::Normal, id("a/package.json"), None);

        let first = dependency.update_version("1.2.2", KindFilter::all());
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].range, "1.2.x");
        let change = dependency.change().cloned();

        let second = dependency.update_version("1.2.2", KindFilter::all());
        assert!(second.is_empty());
        assert_eq!(dependency.change().cloned(), change);
        assert_eq!(dependency.min_version(), Some("1.2.x"));
    }

    #[test]
    fn test_set_range_replaces_admitting_ranges() {
        let mut dependency = Dependency::new("react");
        dependency.register_parent("^16.0.0", DependencyKind::Normal, id("a/package.json"), None);
        dependency.register_parent("^16.8.0", DependencyKind::Dev, id("b/package.json"), None);
        dependency.register_parent("^15.0.0", DependencyKind::Peer, id("c/package.json"), None);

        let rewrites = dependency.set_range("^16.8.0", KindFilter::non_peer());
        assert_eq!(
            rewrites,
            vec![RangeRewrite {
                package: id("a/package.json"),
                kinds: KindFilter::only(DependencyKind::Normal),
                range: "^16.8.0".to_string(),
            }]
        );
        assert_eq!(dependency.get_versions(KindFilter::non_peer()).len(), 1);
        assert_eq!(
            dependency.usage("^16.8.0"),
            Some(UsageCounts { runtime: 1, dev: 1, peer: 0 })
        );
        assert!(dependency.usage("^15.0.0").is_some());

        let change = dependency.change().unwrap();
        assert_eq!(change.kind, ChangeKind::Bump(SemVerChange::Minor));
        assert_eq!(change.from_version.as_deref(), Some("^16.0.0"));

        assert!(dependency.set_range("^16.8.0", KindFilter::non_peer()).is_empty());
    }

    #[test]
    fn test_removal_survives_later_addition() {
        let mut dependency = react();
        dependency.remove_parent(&id("a/package.json"), DependencyKind::Normal, "16.0.0");
        dependency.record_added("17.0.0");

        let kinds: Vec<ChangeKind> = dependency.changes().iter().map(|change| change.kind).collect();
        assert_eq!(kinds, vec![ChangeKind::Remove, ChangeKind::Add]);
        assert_eq!(dependency.change().unwrap().kind, ChangeKind::Add);

        dependency.clear_dirty();
        assert!(dependency.changes().is_empty());
    }

    #[test]
    fn test_record_latest_against_min_version() {
        let mut dependency = Dependency::new("lodash");
        dependency.register_parent("^1.1.1", DependencyKind::Normal, id("a/package.json"), None);
        assert_eq!(
            dependency.record_latest(Some("1.1.2".to_string())),
            Latest::Registry {
                version: Some("1.1.2".to_string()),
                change: None,
            }
        );

        let mut outdated = Dependency::new("react");
        outdated.register_parent("^16.0.0", DependencyKind::Normal, id("a/package.json"), None);
        let latest = outdated.record_latest(Some("18.2.0".to_string()));
        assert_eq!(latest.change(), Some(SemVerChange::Major));

        // First answer sticks
        let again = outdated.record_latest(Some("19.0.0".to_string()));
        assert_eq!(again.version(), Some("18.2.0"));
    }

    #[test]
    fn test_record_latest_absent() {
        let mut dependency = Dependency::new("ghost");
        dependency.register_parent("^1.0.0", DependencyKind::Normal, id("a/package.json"), None);
        let latest = dependency.record_latest(None);
        assert_eq!(latest.version(), None);
        assert_eq!(latest.change(), None);
        assert_eq!(dependency.cached_latest(), Some(None));
    }

    #[test]
    fn test_peer_dependency_errors() {
        let dependency = react();

        // Peer range ^16.0.0 rejects 17.0.0
        let errors = dependency.peer_dependency_errors(None, Some("17.0.0"));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].version, "^16.0.0");

        // Non-peer ranges that reject 16.4.0
        let errors = dependency.peer_dependency_errors(Some("^16.4.0"), None);
        let versions: Vec<&str> = errors.iter().map(|e| e.version.as_str()).collect();
        assert_eq!(versions, vec!["17.0.0", "16.0.0"]);

        assert!(dependency.peer_dependency_errors(None, None).is_empty());
    }
}
