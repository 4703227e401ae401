//! Change report grouped by change kind.
//!
//! Release bumps come first (major, minor, patch), then prerelease kinds,
//! additions, removals and re-syncs. Bumps outside the semver filter are
//! only counted, under "Excluded Updates".

use super::{listify, Line};
use sonar_core::types::{Change, ChangeKind, SemVerChange};
use std::collections::BTreeMap;

/// Which release bumps a command acts on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SemVerFilter {
    pub major: bool,
    pub minor: bool,
    pub patch: bool,
}

impl SemVerFilter {
    pub fn all() -> Self {
        Self {
            major: true,
            minor: true,
            patch: true,
        }
    }

    /// Prerelease kinds are never filtered here
    pub fn includes(&self, change: SemVerChange) -> bool {
        match change {
            SemVerChange::Major => self.major,
            SemVerChange::Minor => self.minor,
            SemVerChange::Patch => self.patch,
            _ => true,
        }
    }

    /// Names of the included release kinds
    pub fn included(&self) -> Vec<&'static str> {
        [SemVerChange::Major, SemVerChange::Minor, SemVerChange::Patch]
            .into_iter()
            .filter(|change| self.includes(*change))
            .map(|change| change.as_str())
            .collect()
    }
}

#[derive(Debug, Default)]
struct Group {
    dependencies: BTreeMap<String, Change>,
    packages: BTreeMap<String, Change>,
}

impl Group {
    fn entries(&mut self, change: &Change) -> &mut BTreeMap<String, Change> {
        if change.is_package() {
            &mut self.packages
        } else {
            &mut self.dependencies
        }
    }

    fn len(&self) -> usize {
        self.dependencies.len() + self.packages.len()
    }
}

/// Collected changes of one command run
#[derive(Debug)]
pub struct Report {
    filter: SemVerFilter,
    groups: BTreeMap<ChangeKind, Group>,
}

impl Report {
    pub fn new(filter: SemVerFilter) -> Self {
        Self {
            filter,
            groups: BTreeMap::new(),
        }
    }

    /// Record a change; a later change for the same name replaces it,
    /// except that an addition and a removal are both kept
    pub fn save(&mut self, change: &Change) {
        for (kind, group) in self.groups.iter_mut() {
            if change.kind.replaces(kind) {
                group.entries(change).remove(&change.name);
            }
        }
        self.groups.retain(|_, group| group.len() > 0);

        self.groups
            .entry(change.kind)
            .or_default()
            .entries(change)
            .insert(change.name.clone(), change.clone());
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn render(&self) -> Vec<Line> {
        let mut lines = Vec::new();

        for (kind, group) in &self.groups {
            if let ChangeKind::Bump(change) = kind {
                if !self.filter.includes(*change) {
                    continue;
                }
            }
            if !group.dependencies.is_empty() {
                lines.push(Line::Title(format!(
                    "--- {} Dependency Updates ({}) ---",
                    kind.label(),
                    group.dependencies.len()
                )));
                lines.extend(group.dependencies.values().map(|change| Line::Log(format!(" {change}"))));
            }
            if !group.packages.is_empty() {
                lines.push(Line::Title(format!(
                    "--- Workspace Package Updates ({}) ---",
                    group.packages.len()
                )));
                lines.extend(group.packages.values().map(|change| Line::Log(format!(" {change}"))));
            }
        }

        let excluded: Vec<(SemVerChange, usize)> = [SemVerChange::Major, SemVerChange::Minor, SemVerChange::Patch]
            .into_iter()
            .filter(|change| !self.filter.includes(*change))
            .filter_map(|change| {
                self.groups
                    .get(&ChangeKind::Bump(change))
                    .map(|group| (change, group.len()))
            })
            .collect();
        if !excluded.is_empty() {
            let names: Vec<&str> = excluded.iter().map(|(change, _)| change.as_str()).collect();
            lines.push(Line::Title(format!("--- Excluded Updates: {} ---", listify(&names))));
            for (change, count) in excluded {
                lines.push(Line::Log(format!(
                    "To include {count} '{change}' updates, run with: --{change} [--fix]"
                )));
            }
        }

        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bump(change: SemVerChange, name: &str, from: &str, to: &str) -> Change {
        Change::dependency(
            ChangeKind::Bump(change),
            name,
            Some(from.to_string()),
            Some(to.to_string()),
        )
    }

    fn titles(lines: &[Line]) -> Vec<&str> {
        lines
            .iter()
            .filter_map(|line| match line {
                Line::Title(text) => Some(text.as_str()),
                Line::Log(_) => None,
            })
            .collect()
    }

    #[test]
    fn test_groups_in_report_order() {
        let mut report = Report::new(SemVerFilter::all());
        report.save(&Change::dependency(ChangeKind::Add, "chai", None, Some("4.3.10".to_string())));
        report.save(&bump(SemVerChange::Patch, "react", "^18.2.0", "^18.2.1"));
        report.save(&bump(SemVerChange::Major, "webpack", "^4.0.0", "^5.0.0"));
        report.save(&bump(SemVerChange::Major, "babel", "^6.0.0", "^7.0.0"));
        report.save(&Change::package(
            ChangeKind::Bump(SemVerChange::Minor),
            "@acme/ui",
            Some("1.0.0".to_string()),
            Some("1.1.0".to_string()),
        ));

        let lines = report.render();
        assert_eq!(
            titles(&lines),
            vec![
                "--- MAJOR Dependency Updates (2) ---",
                "--- Workspace Package Updates (1) ---",
                "--- PATCH Dependency Updates (1) ---",
                "--- ADD Dependency Updates (1) ---",
            ]
        );
        assert_eq!(lines[1], Line::Log(" babel ^6.0.0 -> ^7.0.0".to_string()));
        assert_eq!(lines[2], Line::Log(" webpack ^4.0.0 -> ^5.0.0".to_string()));
        assert_eq!(lines[4], Line::Log(" @acme/ui 1.0.0 -> 1.1.0".to_string()));
    }

    #[test]
    fn test_excluded_updates() {
        let mut report = Report::new(SemVerFilter {
            major: false,
            minor: true,
            patch: true,
        });
        report.save(&bump(SemVerChange::Major, "webpack", "^4.0.0", "^5.0.0"));
        report.save(&bump(SemVerChange::Minor, "lodash", "1.1.x", "1.2.x"));

        let lines = report.render();
        assert_eq!(
            lines,
            vec![
                Line::Title("--- MINOR Dependency Updates (1) ---".to_string()),
                Line::Log(" lodash 1.1.x -> 1.2.x".to_string()),
                Line::Title("--- Excluded Updates: major ---".to_string()),
                Line::Log("To include 1 'major' updates, run with: --major [--fix]".to_string()),
            ]
        );
    }

    #[test]
    fn test_later_change_replaces_earlier() {
        let mut report = Report::new(SemVerFilter::all());
        report.save(&bump(SemVerChange::Minor, "lodash", "^1.0.0", "^1.2.0"));
        report.save(&bump(SemVerChange::Major, "lodash", "^1.0.0", "^2.0.0"));

        let lines = report.render();
        assert_eq!(titles(&lines), vec!["--- MAJOR Dependency Updates (1) ---"]);
        assert!(!report.is_empty());
    }

    #[test]
    fn test_moved_dependency_reports_removal_and_addition() {
        let mut report = Report::new(SemVerFilter::all());
        report.save(&Change::dependency(ChangeKind::Remove, "jest", Some("^29.0.0".to_string()), None));
        report.save(&Change::dependency(ChangeKind::Add, "jest", None, Some("^29.0.0".to_string())));

        let lines = report.render();
        assert_eq!(
            lines,
            vec![
                Line::Title("--- ADD Dependency Updates (1) ---".to_string()),
                Line::Log(" jest ^29.0.0".to_string()),
                Line::Title("--- REMOVE Dependency Updates (1) ---".to_string()),
                Line::Log(" jest ^29.0.0 (removed)".to_string()),
            ]
        );
    }

    #[test]
    fn test_filter() {
        let filter = SemVerFilter {
            major: false,
            minor: true,
            patch: false,
        };
        assert_eq!(filter.included(), vec!["minor"]);
        assert!(filter.includes(SemVerChange::Prerelease));
        assert!(!filter.includes(SemVerChange::Patch));
    }
}
