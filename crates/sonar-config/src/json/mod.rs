//! package.json manifest parsing and serialization
//!
//! The raw JSON document is kept alongside typed dependency maps so unknown
//! fields and key order survive a write. Every mutation goes through a
//! method that updates both.

use crate::ConfigResult;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use sonar_core::error::SonarError;
use sonar_core::types::DependencyKind;
use std::path::Path;

/// A `package.json` document
#[derive(Debug, Clone, PartialEq)]
pub struct PackageJson {
    /// Package name, if declared
    pub name: Option<String>,

    /// Own version, if declared
    pub version: Option<String>,

    dependencies: IndexMap<String, String>,
    dev_dependencies: IndexMap<String, String>,
    peer_dependencies: IndexMap<String, String>,

    /// Full document in file order
    raw: Map<String, Value>,
}

/// Parse JSON string to a PackageJson manifest
pub fn parse_package_json(content: &str) -> ConfigResult<PackageJson> {
    let value: Value = serde_json::from_str(content).map_err(|e| SonarError::JsonParse {
        message: format!("JSON parsing error: {}", e),
    })?;

    let Value::Object(raw) = value else {
        return Err(SonarError::JsonParse {
            message: "package.json must contain a JSON object".to_string(),
        });
    };

    Ok(PackageJson::from_raw(raw))
}

/// Serialize a PackageJson to the on-disk format (two-space indent, trailing newline)
pub fn serialize_package_json(manifest: &PackageJson) -> ConfigResult<String> {
    let mut out = serde_json::to_string_pretty(&manifest.raw).map_err(|e| SonarError::JsonParse {
        message: format!("JSON serialization error: {}", e),
    })?;
    out.push('\n');
    Ok(out)
}

/// Load and parse package.json from file path
pub async fn load_from_file(path: &Path) -> ConfigResult<PackageJson> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| SonarError::ManifestRead {
            path: path.to_path_buf(),
            source: e,
        })?;

    parse_package_json(&content).map_err(|e| match e {
        SonarError::JsonParse { message } => SonarError::ManifestParse {
            path: path.to_path_buf(),
            message,
        },
        other => other,
    })
}

/// Write a manifest back to disk
pub async fn write_to_file(path: &Path, manifest: &PackageJson) -> ConfigResult<()> {
    let content = serialize_package_json(manifest)?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| SonarError::ManifestWrite {
            path: path.to_path_buf(),
            source: e,
        })
}

fn string_map(raw: &Map<String, Value>, key: &str) -> IndexMap<String, String> {
    raw.get(key)
        .and_then(Value::as_object)
        .map(|section| {
            section
                .iter()
                .filter_map(|(name, range)| Some((name.clone(), range.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

impl PackageJson {
    fn from_raw(raw: Map<String, Value>) -> Self {
        let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
        Self {
            name: text("name"),
            version: text("version"),
            dependencies: string_map(&raw, DependencyKind::Normal.manifest_key()),
            dev_dependencies: string_map(&raw, DependencyKind::Dev.manifest_key()),
            peer_dependencies: string_map(&raw, DependencyKind::Peer.manifest_key()),
            raw,
        }
    }

    /// Build a minimal manifest in memory
    pub fn new(name: &str, version: &str) -> Self {
        let mut raw = Map::new();
        raw.insert("name".to_string(), Value::String(name.to_string()));
        raw.insert("version".to_string(), Value::String(version.to_string()));
        Self::from_raw(raw)
    }

    /// The underlying document
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }

    /// Dependency map for one section
    pub fn dependencies(&self, kind: DependencyKind) -> &IndexMap<String, String> {
        match kind {
            DependencyKind::Normal => &self.dependencies,
            DependencyKind::Dev => &self.dev_dependencies,
            DependencyKind::Peer => &self.peer_dependencies,
        }
    }

    fn dependencies_mut(&mut self, kind: DependencyKind) -> &mut IndexMap<String, String> {
        match kind {
            DependencyKind::Normal => &mut self.dependencies,
            DependencyKind::Dev => &mut self.dev_dependencies,
            DependencyKind::Peer => &mut self.peer_dependencies,
        }
    }

    /// Range declared for `name` under `kind`
    pub fn get(&self, kind: DependencyKind, name: &str) -> Option<&str> {
        self.dependencies(kind).get(name).map(String::as_str)
    }

    /// Whether `name` is declared in any section
    pub fn declares(&self, name: &str) -> bool {
        DependencyKind::ALL
            .iter()
            .any(|kind| self.dependencies(*kind).contains_key(name))
    }

    /// Run `f` on the raw section for `kind`, creating it at the end of the
    /// document when absent
    fn edit_raw_section(&mut self, kind: DependencyKind, f: impl FnOnce(&mut Map<String, Value>)) {
        let key = kind.manifest_key();
        let mut section = match self.raw.get_mut(key).map(Value::take) {
            Some(Value::Object(section)) => section,
            _ => Map::new(),
        };
        f(&mut section);
        match self.raw.get_mut(key) {
            Some(slot) => *slot = Value::Object(section),
            None => {
                self.raw.insert(key.to_string(), Value::Object(section));
            },
        }
    }

    /// Rewrite or insert a declared range, keeping the key's position
    pub fn set_dependency(&mut self, kind: DependencyKind, name: &str, range: &str) {
        self.edit_raw_section(kind, |section| {
            section.insert(name.to_string(), Value::String(range.to_string()));
        });
        self.dependencies_mut(kind)
            .insert(name.to_string(), range.to_string());
    }

    /// Insert a range and re-sort the section's keys lexicographically
    pub fn insert_sorted(&mut self, kind: DependencyKind, name: &str, range: &str) {
        self.set_dependency(kind, name, range);

        self.edit_raw_section(kind, |section| {
            let mut entries: Vec<(String, Value)> = std::mem::take(section).into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            section.extend(entries);
        });

        self.dependencies_mut(kind).sort_keys();
    }

    /// Remove a declared range, returning what was declared
    pub fn remove_dependency(&mut self, kind: DependencyKind, name: &str) -> Option<String> {
        if let Some(Value::Object(section)) = self.raw.get_mut(kind.manifest_key()) {
            section.shift_remove(name);
        }
        self.dependencies_mut(kind).shift_remove(name)
    }

    /// Rewrite the manifest's own `version` field
    pub fn set_version(&mut self, version: &str) {
        self.raw
            .insert("version".to_string(), Value::String(version.to_string()));
        self.version = Some(version.to_string());
    }

    /// The `"sonar"` configuration key, if present
    pub fn sonar_section(&self) -> Option<&Value> {
        self.raw.get("sonar")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const MANIFEST: &str = r#"{
  "name": "@acme/ui",
  "version": "1.0.0",
  "private": true,
  "dependencies": {
    "react": "^17.0.0",
    "lodash": "1.1.x"
  },
  "devDependencies": {
    "jest": "^29.0.0"
  },
  "scripts": {
    "test": "jest"
  }
}
"#;

    #[test]
    fn test_parse_minimal_package_json() {
        let manifest = parse_package_json(r#"{"name": "test-package", "version": "1.0.0"}"#).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("test-package"));
        assert_eq!(manifest.version.as_deref(), Some("1.0.0"));
        assert!(manifest.dependencies(DependencyKind::Normal).is_empty());
    }

    #[test]
    fn test_parse_with_dependencies() {
        let manifest = parse_package_json(MANIFEST).unwrap();
        assert_eq!(manifest.dependencies(DependencyKind::Normal).len(), 2);
        assert_eq!(manifest.get(DependencyKind::Dev, "jest"), Some("^29.0.0"));
        assert!(manifest.declares("lodash"));
        assert!(!manifest.declares("vue"));
    }

    #[test]
    fn test_rejects_non_object() {
        assert!(parse_package_json("[1, 2]").is_err());
        assert!(parse_package_json("{ not json").is_err());
    }

    #[test]
    fn test_round_trip_is_byte_identical() {
        let manifest = parse_package_json(MANIFEST).unwrap();
        assert_eq!(serialize_package_json(&manifest).unwrap(), MANIFEST);
    }

    #[test]
    fn test_set_dependency_keeps_key_position() {
        let mut manifest = parse_package_json(MANIFEST).unwrap();
        manifest.set_dependency(DependencyKind::Normal, "react", "17.0.2");

        let out = serialize_package_json(&manifest).unwrap();
        let react = out.find("\"react\"").unwrap();
        let lodash = out.find("\"lodash\"").unwrap();
        assert!(react < lodash);
        assert!(out.contains("\"react\": \"17.0.2\""));
        assert_eq!(manifest.get(DependencyKind::Normal, "react"), Some("17.0.2"));
    }

    #[test]
    fn test_insert_sorted_creates_section() {
        let mut manifest = parse_package_json(MANIFEST).unwrap();
        manifest.insert_sorted(DependencyKind::Peer, "react", "^17.0.0");
        manifest.insert_sorted(DependencyKind::Normal, "axios", "^1.0.0");

        let deps: Vec<_> = manifest
            .dependencies(DependencyKind::Normal)
            .keys()
            .cloned()
            .collect();
        assert_eq!(deps, vec!["axios", "lodash", "react"]);

        let raw_keys: Vec<_> = manifest.raw()["dependencies"]
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect();
        assert_eq!(raw_keys, deps);
        assert_eq!(manifest.get(DependencyKind::Peer, "react"), Some("^17.0.0"));
    }

    #[test]
    fn test_remove_dependency() {
        let mut manifest = parse_package_json(MANIFEST).unwrap();
        assert_eq!(
            manifest.remove_dependency(DependencyKind::Dev, "jest"),
            Some("^29.0.0".to_string())
        );
        assert_eq!(manifest.remove_dependency(DependencyKind::Dev, "jest"), None);
        assert!(manifest.raw()["devDependencies"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_set_version() {
        let mut manifest = parse_package_json(MANIFEST).unwrap();
        manifest.set_version("1.1.0");
        assert_eq!(manifest.version.as_deref(), Some("1.1.0"));
        assert!(serialize_package_json(&manifest)
            .unwrap()
            .contains("\"version\": \"1.1.0\""));
    }

    fn declarations() -> impl Strategy<Value = Vec<(String, String)>> {
        prop::collection::vec(("[a-z][a-z0-9-]{0,8}", "\\^?[0-9]{1,2}\\.[0-9]{1,2}\\.[0-9x]"), 0..12).prop_map(
            |mut entries| {
                let mut seen = std::collections::HashSet::new();
                entries.retain(|(name, _)| seen.insert(name.clone()));
                entries
            },
        )
    }

    proptest! {
        #[test]
        fn rewritten_manifest_keeps_declaration_order(entries in declarations(), pick in any::<prop::sample::Index>()) {
            let section: Map<String, Value> = entries
                .iter()
                .map(|(name, range)| (name.clone(), Value::String(range.clone())))
                .collect();
            let mut raw = Map::new();
            raw.insert("name".to_string(), Value::String("app".to_string()));
            raw.insert("dependencies".to_string(), Value::Object(section));
            let text = serde_json::to_string_pretty(&Value::Object(raw)).unwrap() + "\n";

            let mut manifest = parse_package_json(&text).unwrap();
            prop_assert_eq!(serialize_package_json(&manifest).unwrap(), text);

            let names: Vec<&String> = entries.iter().map(|(name, _)| name).collect();
            if !entries.is_empty() {
                let (name, _) = &entries[pick.index(entries.len())];
                manifest.set_dependency(DependencyKind::Normal, name, "9.9.9");
            }

            let reparsed = parse_package_json(&serialize_package_json(&manifest).unwrap()).unwrap();
            let keys: Vec<&String> = reparsed.dependencies(DependencyKind::Normal).keys().collect();
            prop_assert_eq!(keys, names);
        }
    }

    #[tokio::test]
    async fn test_load_and_write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        tokio::fs::write(&path, MANIFEST).await.unwrap();

        let mut manifest = load_from_file(&path).await.unwrap();
        manifest.set_dependency(DependencyKind::Dev, "jest", "^30.0.0");
        write_to_file(&path, &manifest).await.unwrap();

        let reloaded = load_from_file(&path).await.unwrap();
        assert_eq!(reloaded.get(DependencyKind::Dev, "jest"), Some("^30.0.0"));
    }

    #[tokio::test]
    async fn test_load_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("package.json");
        tokio::fs::write(&path, "{ broken").await.unwrap();

        let err = load_from_file(&path).await.unwrap_err();
        assert!(matches!(err, SonarError::ManifestParse { .. }));

        let missing = load_from_file(&dir.path().join("nope.json")).await.unwrap_err();
        assert!(matches!(missing, SonarError::ManifestRead { .. }));
    }
}
