//! The workspace arena: packages, dependencies and the operations that span them

use futures::future::join_all;
use indexmap::IndexMap;
use sonar_config::{json, PackageJson};
use sonar_core::error::{SonarError, SonarResult};
use sonar_core::types::{BumpKind, Change, DependencyKind, KindFilter, PackageId};
use sonar_registry::Resolve;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::dependency::{Dependency, Latest, RangeRewrite};
use crate::discover::discover_manifests;
use crate::package::Package;

/// Owner of every package and dependency of one run
#[derive(Debug)]
pub struct Workspace {
    folder: PathBuf,
    packages: IndexMap<PackageId, Package>,
    packages_by_name: HashMap<String, PackageId>,
    dependencies: IndexMap<String, Dependency>,
    /// Bound on concurrent manifest reads and writes
    concurrency: usize,
}

impl Workspace {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            packages: IndexMap::new(),
            packages_by_name: HashMap::new(),
            dependencies: IndexMap::new(),
            concurrency: sonar_config::DEFAULT_CONCURRENCY,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Discover every manifest under `folder` and build the graph
    pub async fn load(folder: &Path, concurrency: usize) -> SonarResult<Self> {
        let paths = discover_manifests(folder)?;
        debug!(folder = %folder.display(), manifests = paths.len(), "Discovered manifests");

        let mut workspace = Self::new(folder).with_concurrency(concurrency);
        workspace.init(&paths).await?;
        Ok(workspace)
    }

    /// Read the manifests concurrently, then register them in the given order
    pub async fn init(&mut self, manifest_paths: &[PathBuf]) -> SonarResult<()> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let reads = manifest_paths.iter().map(|path| {
            let permits = Arc::clone(&permits);
            async move {
                let _permit = permits.acquire().await.ok();
                json::load_from_file(path).await
            }
        });
        let manifests = join_all(reads).await;

        for (path, manifest) in manifest_paths.iter().zip(manifests) {
            let id = self.package_id(path);
            self.register_package(id, manifest?);
        }

        info!(
            packages = self.packages.len(),
            dependencies = self.dependencies.len(),
            "Workspace loaded"
        );
        Ok(())
    }

    fn package_id(&self, path: &Path) -> PackageId {
        PackageId::from_relative(path.strip_prefix(&self.folder).unwrap_or(path))
    }

    /// Add a manifest to the graph.
    ///
    /// Links to other workspace packages are made as soon as both sides are
    /// known, whichever was registered first.
    pub fn register_package(&mut self, id: PackageId, manifest: PackageJson) {
        let package = Package::new(id.clone(), manifest);
        let name = package.name().to_string();
        let declared: Vec<(DependencyKind, String, String)> = DependencyKind::ALL
            .into_iter()
            .flat_map(|kind| {
                package
                    .dependencies(kind)
                    .map(move |(dep, range)| (kind, dep.to_string(), range.to_string()))
            })
            .collect();

        if let Some(previous) = self.packages_by_name.insert(name.clone(), id.clone()) {
            warn!(package = %name, first = %previous, second = %id, "Duplicate package name");
        }
        self.packages.insert(id.clone(), package);

        for (kind, dep, range) in declared {
            self.register_dependency(&id, &dep, &range, kind);
        }

        if let Some(dependency) = self.dependencies.get_mut(&name) {
            dependency.set_workspace_package(id.clone());
            if let Some(package) = self.packages.get_mut(&id) {
                package.register_as_dependency(&name);
            }
        }
        debug!(package = %name, id = %id, "Registered package");
    }

    fn register_dependency(&mut self, parent: &PackageId, name: &str, range: &str, kind: DependencyKind) {
        let workspace_package = self.packages_by_name.get(name).cloned();
        self.dependencies
            .entry(name.to_string())
            .or_insert_with(|| Dependency::new(name))
            .register_parent(range, kind, parent.clone(), workspace_package.clone());

        if let Some(linked) = workspace_package.and_then(|id| self.packages.get_mut(&id)) {
            linked.register_as_dependency(name);
        }
        if let Some(package) = self.packages.get_mut(parent) {
            package.register_dependency(name);
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Packages in registration order
    pub fn packages(&self) -> impl Iterator<Item = &Package> {
        self.packages.values()
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.values()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }

    pub fn package(&self, name: &str) -> Option<&Package> {
        self.packages_by_name
            .get(name)
            .and_then(|id| self.packages.get(id))
    }

    pub fn package_by_id(&self, id: &PackageId) -> Option<&Package> {
        self.packages.get(id)
    }

    pub fn dependency(&self, name: &str) -> Option<&Dependency> {
        self.dependencies.get(name)
    }

    pub fn root_package(&self) -> Option<&Package> {
        self.packages.get(&PackageId::root())
    }

    pub fn is_workspace_package(&self, name: &str) -> bool {
        self.packages_by_name.contains_key(name)
    }

    /// On-disk location of a package's manifest
    pub fn manifest_path(&self, id: &PackageId) -> PathBuf {
        self.folder.join(id.as_str())
    }

    /// On-disk directory of a package
    pub fn package_dir(&self, id: &PackageId) -> PathBuf {
        self.folder.join(id.dir())
    }

    /// Rewrite every range of `name` selected by `filter` so it admits
    /// `target`, in the dependency and in every declaring manifest
    pub fn update_dependency_version(&mut self, name: &str, target: &str, filter: KindFilter) -> bool {
        let Some(dependency) = self.dependencies.get_mut(name) else {
            return false;
        };
        let rewrites = dependency.update_version(target, filter);
        self.apply_rewrites(name, &rewrites);
        !rewrites.is_empty()
    }

    /// Declare `name` as exactly `range` wherever `filter` selects it
    pub fn set_dependency_range(&mut self, name: &str, range: &str, filter: KindFilter) -> bool {
        let Some(dependency) = self.dependencies.get_mut(name) else {
            return false;
        };
        let rewrites = dependency.set_range(range, filter);
        self.apply_rewrites(name, &rewrites);
        !rewrites.is_empty()
    }

    fn apply_rewrites(&mut self, name: &str, rewrites: &[RangeRewrite]) {
        for rewrite in rewrites {
            if let Some(package) = self.packages.get_mut(&rewrite.package) {
                package.update_dependency(name, rewrite.kinds, &rewrite.range);
            }
        }
    }

    /// Set a package's own version and re-sync every range that refers to it.
    ///
    /// Consumers are re-synced even when the version itself is unchanged.
    /// `None` is a no-op.
    pub fn update_package_version(&mut self, package_name: &str, version: Option<&str>) -> bool {
        let Some(version) = version else {
            return false;
        };
        let Some(package) = self
            .packages_by_name
            .get(package_name)
            .and_then(|id| self.packages.get_mut(id))
        else {
            return false;
        };

        let changed = package.set_version(version);
        let as_dependency = package.as_dependency().map(str::to_string);
        let propagated = match as_dependency {
            Some(name) => self.update_dependency_version(&name, version, KindFilter::all()),
            None => false,
        };
        changed || propagated
    }

    pub fn bump_package(&mut self, package_name: &str, bump: BumpKind) -> bool {
        let next = self
            .package(package_name)
            .and_then(|package| package.next_version(bump));
        match next {
            Some(version) => self.update_package_version(package_name, Some(&version)),
            None => {
                debug!(package = package_name, "No semver version to bump");
                false
            },
        }
    }

    /// Classify a resolved answer; workspace packages answer for themselves
    fn settle_latest(&mut self, name: &str, resolved: Option<String>) -> Option<Latest> {
        let linked = self.dependencies.get(name)?.workspace_package().cloned();
        if let Some(id) = linked {
            let version = self
                .packages
                .get(&id)
                .and_then(|package| package.version())
                .map(str::to_string);
            return Some(Latest::Workspace(version));
        }
        self.dependencies
            .get_mut(name)
            .map(|dependency| dependency.record_latest(resolved))
    }

    fn needs_lookup(&self, name: &str) -> bool {
        self.dependencies.get(name).is_some_and(|dependency| {
            dependency.workspace_package().is_none() && dependency.cached_latest().is_none()
        })
    }

    /// Newest version of one dependency; `None` if the name is unknown
    pub async fn latest<R: Resolve>(
        &mut self,
        name: &str,
        resolver: &R,
        canary: Option<&str>,
    ) -> Option<Latest> {
        let resolved = if self.needs_lookup(name) {
            resolver.resolve(name, canary).await
        } else {
            None
        };
        self.settle_latest(name, resolved)
    }

    /// Newest versions of many dependencies, looked up concurrently
    pub async fn latest_all<R: Resolve>(
        &mut self,
        names: &[String],
        resolver: &R,
        canary: Option<&str>,
    ) -> IndexMap<String, Latest> {
        let pending: Vec<&String> = names.iter().filter(|name| self.needs_lookup(name)).collect();
        let lookups = pending.iter().map(|name| async move {
            let resolved = resolver.resolve(name, canary).await;
            (name.to_string(), resolved)
        });
        let mut fetched: HashMap<String, Option<String>> = join_all(lookups).await.into_iter().collect();

        names
            .iter()
            .filter_map(|name| {
                let resolved = fetched.remove(name).flatten();
                self.settle_latest(name, resolved)
                    .map(|latest| (name.clone(), latest))
            })
            .collect()
    }

    /// Declare `name` in a package's manifest.
    ///
    /// Without an explicit version the most used range in the workspace is
    /// taken, then the workspace or registry version, then `*`. Returns the
    /// range written, or `None` if the package is unknown or already declares
    /// the name under `kind`.
    pub async fn add_dependency<R: Resolve>(
        &mut self,
        package: &PackageId,
        name: &str,
        version: Option<&str>,
        kind: DependencyKind,
        resolver: &R,
    ) -> Option<String> {
        if self.packages.get(package)?.declared(kind, name).is_some() {
            return None;
        }

        let range = match version {
            Some(version) => version.to_string(),
            None => match self.dependencies.get(name).and_then(Dependency::most_used_version) {
                Some(common) => common,
                None => {
                    let latest = match self.packages_by_name.get(name) {
                        Some(id) => self
                            .packages
                            .get(id)
                            .and_then(|linked| linked.version())
                            .map(str::to_string),
                        None => resolver.resolve(name, None).await,
                    };
                    latest.unwrap_or_else(|| {
                        warn!(dependency = name, "Could not find a version, adding as \"*\"");
                        "*".to_string()
                    })
                },
            },
        };

        if let Some(target) = self.packages.get_mut(package) {
            target.insert_dependency(kind, name, &range);
        }
        self.register_dependency(package, name, &range, kind);
        if let Some(dependency) = self.dependencies.get_mut(name) {
            dependency.record_added(&range);
        }
        debug!(package = %package, dependency = name, range = %range, %kind, "Added dependency");
        Some(range)
    }

    /// Remove `name` from a package's `kind` section; `false` if not declared
    pub fn remove_dependency(&mut self, package: &PackageId, name: &str, kind: DependencyKind) -> bool {
        let Some(declared) = self
            .packages
            .get(package)
            .and_then(|target| target.declared(kind, name))
            .map(str::to_string)
        else {
            return false;
        };

        if let Some(dependency) = self.dependencies.get_mut(name) {
            dependency.remove_parent(package, kind, &declared);
        }
        if let Some(target) = self.packages.get_mut(package) {
            target.remove_dependency_entry(kind, name);
        }
        debug!(package = %package, dependency = name, %kind, "Removed dependency");
        true
    }

    /// Report every pending change and, with `commit`, write the dirty manifests.
    ///
    /// Each dirty package emits its own change followed by the changes of
    /// its dirty dependencies, in package path order. A preview (`commit`
    /// false) leaves all state untouched; a successful write clears the
    /// package's dirty flag.
    pub async fn changes<F>(&mut self, commit: bool, mut on_change: F) -> SonarResult<Vec<Change>>
    where
        F: FnMut(&Change),
    {
        let mut dirty: Vec<&Package> = self.packages.values().filter(|p| p.is_dirty()).collect();
        dirty.sort_by(|a, b| a.id().cmp(b.id()));

        let mut emitted = Vec::new();
        for package in &dirty {
            let change = package.change();
            on_change(&change);
            emitted.push(change);

            for name in package.dependency_names() {
                let changes = self
                    .dependencies
                    .get(name)
                    .filter(|dependency| dependency.is_dirty())
                    .map(Dependency::changes)
                    .unwrap_or_default();
                for change in changes {
                    on_change(change);
                    emitted.push(change.clone());
                }
            }
        }

        if !commit {
            return Ok(emitted);
        }

        let writes: Vec<(PackageId, PathBuf, PackageJson)> = dirty
            .iter()
            .map(|package| {
                (
                    package.id().clone(),
                    self.manifest_path(package.id()),
                    package.manifest().clone(),
                )
            })
            .collect();
        self.write_manifests(writes).await?;
        Ok(emitted)
    }

    async fn write_manifests(&mut self, writes: Vec<(PackageId, PathBuf, PackageJson)>) -> SonarResult<()> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let results = join_all(writes.into_iter().map(|(id, path, manifest)| {
            let permits = Arc::clone(&permits);
            async move {
                let _permit = permits.acquire().await.ok();
                let result = json::write_to_file(&path, &manifest).await;
                (id, result)
            }
        }))
        .await;

        let mut first_error: Option<SonarError> = None;
        for (id, result) in results {
            match result {
                Ok(()) => {
                    debug!(package = %id, "Wrote manifest");
                    if let Some(package) = self.packages.get_mut(&id) {
                        package.mark_written();
                    }
                },
                Err(error) => {
                    warn!(package = %id, error = %error, "Failed to write manifest");
                    first_error.get_or_insert(error);
                },
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => {
                for dependency in self.dependencies.values_mut() {
                    dependency.clear_dirty();
                }
                Ok(())
            },
        }
    }
}
