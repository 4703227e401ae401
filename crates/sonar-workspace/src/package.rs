//! One manifest of the workspace

use sonar_config::PackageJson;
use sonar_core::types::{
    scope_of, BumpKind, Change, ChangeKind, DependencyKind, KindFilter, PackageId, Version,
};

/// A workspace package and its in-memory manifest.
///
/// The manifest is the single source for the three dependency maps, so a
/// rewrite through this type updates the typed map and the raw document
/// together.
#[derive(Debug, Clone)]
pub struct Package {
    id: PackageId,
    name: String,
    /// Own version as read from disk, or as last written
    original_version: Option<String>,
    manifest: PackageJson,
    /// Dependency names this package declares or has declared this run
    dependencies: Vec<String>,
    /// Set when another package depends on this one
    as_dependency: Option<String>,
    dirty: bool,
}

impl Package {
    /// A manifest without a name is known by its path
    pub fn new(id: PackageId, manifest: PackageJson) -> Self {
        let name = manifest.name.clone().unwrap_or_else(|| id.to_string());
        Self {
            id,
            name,
            original_version: manifest.version.clone(),
            manifest,
            dependencies: Vec::new(),
            as_dependency: None,
            dirty: false,
        }
    }

    pub fn id(&self) -> &PackageId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &str {
        scope_of(&self.name)
    }

    pub fn version(&self) -> Option<&str> {
        self.manifest.version.as_deref()
    }

    pub fn manifest(&self) -> &PackageJson {
        &self.manifest
    }

    pub fn is_root(&self) -> bool {
        self.id.is_root()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Name of the dependency entry that refers to this package, if any
    pub fn as_dependency(&self) -> Option<&str> {
        self.as_dependency.as_deref()
    }

    pub fn dependency_names(&self) -> &[String] {
        &self.dependencies
    }

    /// Range this package declares for `name` under `kind`
    pub fn declared(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.manifest.get(kind, name)
    }

    pub fn dependencies(&self, kind: DependencyKind) -> impl Iterator<Item = (&str, &str)> {
        self.manifest
            .dependencies(kind)
            .iter()
            .map(|(name, range)| (name.as_str(), range.as_str()))
    }

    pub(crate) fn register_dependency(&mut self, name: &str) {
        if !self.dependencies.iter().any(|existing| existing == name) {
            self.dependencies.push(name.to_string());
        }
    }

    pub(crate) fn register_as_dependency(&mut self, name: &str) {
        self.as_dependency = Some(name.to_string());
    }

    /// Write `range` for `name` under `kind` if declared there and different
    pub fn update_dependency_type(&mut self, name: &str, kind: DependencyKind, range: &str) -> bool {
        match self.manifest.get(kind, name) {
            Some(current) if current != range => {
                self.manifest.set_dependency(kind, name, range);
                self.dirty = true;
                true
            },
            _ => false,
        }
    }

    pub fn update_dependency(&mut self, name: &str, kinds: KindFilter, range: &str) -> bool {
        kinds.kinds().fold(false, |changed, kind| {
            self.update_dependency_type(name, kind, range) || changed
        })
    }

    /// Set the manifest's own version; `false` when it is already `version`
    pub fn set_version(&mut self, version: &str) -> bool {
        if self.version() == Some(version) {
            return false;
        }
        self.manifest.set_version(version);
        self.dirty = true;
        true
    }

    /// Version after `bump`, or `None` when the current one is not semver
    pub fn next_version(&self, bump: BumpKind) -> Option<String> {
        let current = self.version()?.parse::<Version>().ok()?;
        Some(current.inc(bump).to_string())
    }

    pub(crate) fn insert_dependency(&mut self, kind: DependencyKind, name: &str, range: &str) {
        self.manifest.insert_sorted(kind, name, range);
        self.register_dependency(name);
        self.dirty = true;
    }

    pub(crate) fn remove_dependency_entry(&mut self, kind: DependencyKind, name: &str) -> Option<String> {
        let removed = self.manifest.remove_dependency(kind, name)?;
        self.dirty = true;
        Some(removed)
    }

    /// Package-level change record: own version before and after
    pub fn change(&self) -> Change {
        let kind = match (&self.original_version, self.version()) {
            (Some(from), Some(to)) if from != to => Version::coerce(from)
                .zip(to.parse::<Version>().ok())
                .and_then(|(from, to)| from.diff(&to))
                .map_or(ChangeKind::Resync, ChangeKind::Bump),
            _ => ChangeKind::Resync,
        };
        Change::package(
            kind,
            self.name.clone(),
            self.original_version.clone(),
            self.version().map(str::to_string),
        )
    }

    pub(crate) fn mark_written(&mut self) {
        self.original_version = self.manifest.version.clone();
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonar_config::json::parse_package_json;
    use sonar_core::types::SemVerChange;

    fn package(json: &str) -> Package {
        Package::new(PackageId::new("packages/ui/package.json"), parse_package_json(json).unwrap())
    }

    #[test]
    fn test_name_falls_back_to_path() {
        let unnamed = package(r#"{"private": true}"#);
        assert_eq!(unnamed.name(), "packages/ui/package.json");
        assert_eq!(unnamed.version(), None);

        let named = package(r#"{"name": "@acme/ui", "version": "1.0.0"}"#);
        assert_eq!(named.name(), "@acme/ui");
        assert_eq!(named.scope(), "@acme");
    }

    #[test]
    fn test_update_dependency_type() {
        let mut pkg = package(
            r#"{"name": "ui", "dependencies": {"react": "16.0.0"}, "peerDependencies": {"react": "^16.0.0"}}"#,
        );

        assert!(!pkg.update_dependency_type("react", DependencyKind::Dev, "17.0.0"));
        assert!(!pkg.update_dependency_type("react", DependencyKind::Normal, "16.0.0"));
        assert!(!pkg.is_dirty());

        assert!(pkg.update_dependency("react", KindFilter::non_peer(), "17.0.0"));
        assert!(pkg.is_dirty());
        assert_eq!(pkg.declared(DependencyKind::Normal, "react"), Some("17.0.0"));
        assert_eq!(pkg.declared(DependencyKind::Peer, "react"), Some("^16.0.0"));
        assert_eq!(pkg.manifest().raw()["dependencies"]["react"], "17.0.0");
    }

    #[test]
    fn test_set_version_and_change() {
        let mut pkg = package(r#"{"name": "ui", "version": "1.2.3"}"#);
        assert!(!pkg.set_version("1.2.3"));
        assert!(!pkg.is_dirty());

        let next = pkg.next_version(BumpKind::Minor).unwrap();
        assert_eq!(next, "1.3.0");
        assert!(pkg.set_version(&next));

        let change = pkg.change();
        assert_eq!(change.kind, ChangeKind::Bump(SemVerChange::Minor));
        assert_eq!(change.from_version.as_deref(), Some("1.2.3"));
        assert_eq!(change.to_version.as_deref(), Some("1.3.0"));
        assert!(change.is_package());

        pkg.mark_written();
        assert!(!pkg.is_dirty());
        assert_eq!(pkg.change().kind, ChangeKind::Resync);
    }

    #[test]
    fn test_insert_and_remove_entries() {
        let mut pkg = package(r#"{"name": "ui", "dependencies": {"react": "^18.0.0"}}"#);
        pkg.insert_dependency(DependencyKind::Normal, "classnames", "^2.3.2");

        let names: Vec<&str> = pkg.dependencies(DependencyKind::Normal).map(|(n, _)| n).collect();
        assert_eq!(names, vec!["classnames", "react"]);
        assert_eq!(pkg.dependency_names(), ["classnames".to_string()]);

        assert_eq!(
            pkg.remove_dependency_entry(DependencyKind::Normal, "classnames"),
            Some("^2.3.2".to_string())
        );
        // Kept so the removal still shows up in this package's changes
        assert_eq!(pkg.dependency_names(), ["classnames".to_string()]);
        assert_eq!(pkg.remove_dependency_entry(DependencyKind::Dev, "react"), None);
    }
}
