//! Operator-preserving range rewriting
//!
//! A declared range keeps its shape when it moves: `~1.1.1` stays a tilde
//! range, `1.1.x` stays an x-range, a pinned version stays pinned. Drift
//! the operator already tolerates is not rewritten at all.

use sonar_core::types::{SemVerChange, Version, VersionReq};

/// Which components a range lets float
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Wildcards {
    /// `^` or an `x` in the minor position
    pub wild_minor: bool,
    /// `~` or an `x` in the patch position
    pub wild_patch: bool,
}

impl Wildcards {
    pub fn is_pinned(&self) -> bool {
        !self.wild_minor && !self.wild_patch
    }
}

/// Outcome of [`decide`] when a rewrite is warranted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub new_version: String,
    pub change: SemVerChange,
}

fn is_wildcard(part: &str) -> bool {
    matches!(part, "x" | "X" | "*")
}

/// Dot-separated components of the range's release part.
///
/// Prerelease and build suffixes are dropped, so the `x` in
/// `1.0.0-next.1` or `18.0.0-canary-xyz` never reads as a wildcard.
fn release_parts(range: &str) -> Vec<&str> {
    let core = range.split(['-', '+']).next().unwrap_or(range);
    core.split('.').map(str::trim).collect()
}

/// Index of the first wildcard component, if the range has one
fn wildcard_slot(range: &str) -> Option<usize> {
    release_parts(range).iter().position(|part| is_wildcard(part))
}

pub fn classify_wildcard(range: &str) -> Wildcards {
    let parts = release_parts(range);
    let wild_at = |index: usize| parts.get(index).is_some_and(|part| is_wildcard(part));
    Wildcards {
        wild_minor: wild_at(1) || range.contains('^'),
        wild_patch: wild_at(2) || range.contains('~'),
    }
}

/// Rewrite `range` so it admits `target`, keeping the operator style.
///
/// Tilde ranges absorb patch changes, caret ranges absorb minor and patch
/// changes; both are returned unchanged in that case.
pub fn rewrite(range: &str, target: &str, change: Option<SemVerChange>) -> String {
    if range.contains('~') {
        if change == Some(SemVerChange::Patch) {
            range.to_string()
        } else {
            format!("~{}", target)
        }
    } else if range.contains('^') {
        if matches!(change, Some(SemVerChange::Patch | SemVerChange::Minor)) {
            range.to_string()
        } else {
            format!("^{}", target)
        }
    } else if wildcard_slot(range).is_some() {
        splice_wildcard(range, target)
    } else {
        target.to_string()
    }
}

/// Put the target's leading components in front of the range's `x` slot.
///
/// `1.1.x` with `1.2.2` gives `1.2.x`; `1.x.x` with `2.0.1` gives `2.x.x`.
fn splice_wildcard(range: &str, target: &str) -> String {
    let range_parts = release_parts(range);
    let Some(slot) = wildcard_slot(range) else {
        return target.to_string();
    };

    let core = target.split(['-', '+']).next().unwrap_or(target);
    let mut parts: Vec<&str> = core.split('.').take(slot).collect();
    parts.push("x");
    parts.extend(
        range_parts[slot + 1..]
            .iter()
            .take_while(|part| is_wildcard(part))
            .map(|_| "x"),
    );
    parts.join(".")
}

/// Semantic difference between a range's floor and a concrete target.
///
/// The range is coerced (`^1.2` is `1.2.0`); the target keeps its
/// prerelease so canary targets classify as `pre*` changes.
pub fn classify_change(range: &str, target: &str) -> Option<SemVerChange> {
    let floor = Version::coerce(range)?;
    floor.diff(&parse_target(target)?)
}

fn parse_target(target: &str) -> Option<Version> {
    target
        .parse::<Version>()
        .ok()
        .or_else(|| Version::coerce(target))
}

/// Decide whether `range` must be rewritten to accommodate `target`.
///
/// `None` means nothing to do: the target already satisfies the range, the
/// operator tolerates the drift, or either side is not a plain semver string
/// (`workspace:*`, `file:..`, git URLs).
pub fn decide(range: &str, target: &str) -> Option<Decision> {
    if range.contains("workspace") || target.contains("workspace") {
        return None;
    }
    let req = VersionReq::parse(range).ok()?;
    let target_version = parse_target(target)?;
    if req.matches(&target_version) {
        return None;
    }

    let change = classify_change(range, target)?;
    let new_version = rewrite(range, &target_version.to_string(), Some(change));
    if new_version == range {
        return None;
    }
    Some(Decision {
        new_version,
        change,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_wildcard() {
        assert_eq!(
            classify_wildcard("~1.1.1"),
            Wildcards { wild_minor: false, wild_patch: true }
        );
        assert_eq!(
            classify_wildcard("1.1.x"),
            Wildcards { wild_minor: false, wild_patch: true }
        );
        assert_eq!(
            classify_wildcard("^1.1.1"),
            Wildcards { wild_minor: true, wild_patch: false }
        );
        assert_eq!(
            classify_wildcard("1.x"),
            Wildcards { wild_minor: true, wild_patch: false }
        );
        assert_eq!(
            classify_wildcard("1.x.x"),
            Wildcards { wild_minor: true, wild_patch: true }
        );
        assert!(classify_wildcard("1.2.3").is_pinned());
        assert_eq!(
            classify_wildcard("1.X.*"),
            Wildcards { wild_minor: true, wild_patch: true }
        );
    }

    #[test]
    fn test_classify_wildcard_ignores_prerelease_letters() {
        assert!(classify_wildcard("1.0.0-next.1").is_pinned());
        assert!(classify_wildcard("18.0.0-canary-xyz").is_pinned());
        assert!(classify_wildcard("2.0.0+build.x").is_pinned());
    }

    #[test]
    fn test_decide_pinned_prerelease_stays_pinned() {
        assert_eq!(
            decide("1.0.0-next.1", "2.0.0").map(|d| d.new_version),
            Some("2.0.0".to_string())
        );
        assert_eq!(
            decide("18.0.0-canary-xyz", "18.2.0").map(|d| d.new_version),
            Some("18.2.0".to_string())
        );
        assert_eq!(rewrite("1.0.0-next.1", "2.0.0", Some(SemVerChange::Major)), "2.0.0");
    }

    #[test]
    fn test_rewrite_keeps_operator() {
        assert_eq!(rewrite("~1.1.1", "1.1.5", Some(SemVerChange::Patch)), "~1.1.1");
        assert_eq!(rewrite("~1.1.1", "1.2.0", Some(SemVerChange::Minor)), "~1.2.0");
        assert_eq!(rewrite("^1.1.1", "1.4.0", Some(SemVerChange::Minor)), "^1.1.1");
        assert_eq!(rewrite("^1.1.1", "2.0.0", Some(SemVerChange::Major)), "^2.0.0");
        assert_eq!(rewrite("1.2.3", "1.2.4", Some(SemVerChange::Patch)), "1.2.4");
    }

    #[test]
    fn test_rewrite_x_ranges() {
        assert_eq!(rewrite("1.1.x", "1.2.2", Some(SemVerChange::Minor)), "1.2.x");
        assert_eq!(rewrite("1.x", "2.0.1", Some(SemVerChange::Major)), "2.x");
        assert_eq!(rewrite("1.x.x", "2.0.1", Some(SemVerChange::Major)), "2.x.x");
        assert_eq!(rewrite("1.10.x", "2.0.0", Some(SemVerChange::Major)), "2.0.x");
    }

    #[test]
    fn test_decide_wild_minor_tolerates_patch() {
        assert_eq!(decide("^1.1.1", "1.1.2"), None);
        assert_eq!(classify_change("^1.1.1", "1.1.2"), Some(SemVerChange::Patch));
    }

    #[test]
    fn test_decide_x_range_moves() {
        assert_eq!(
            decide("1.1.x", "1.2.2"),
            Some(Decision {
                new_version: "1.2.x".to_string(),
                change: SemVerChange::Minor,
            })
        );
    }

    #[test]
    fn test_decide_same_version_is_no_change() {
        assert_eq!(decide("1.2.3", "1.2.3"), None);
        assert_eq!(decide("~1.2.3", "1.2.3"), None);
        assert_eq!(decide(">1.2.3", "1.2.3"), None);
    }

    #[test]
    fn test_decide_prerelease_targets() {
        assert_eq!(
            decide("^1.2.3", "2.0.0-canary.1"),
            Some(Decision {
                new_version: "^2.0.0-canary.1".to_string(),
                change: SemVerChange::Premajor,
            })
        );
        assert_eq!(
            decide("1.2.3", "1.2.4-beta.0").map(|d| d.change),
            Some(SemVerChange::Prepatch)
        );
    }

    #[test]
    fn test_decide_skips_protocol_ranges() {
        assert_eq!(decide("workspace:*", "1.0.0"), None);
        assert_eq!(decide("^1.0.0", "workspace:1.0.0"), None);
        assert_eq!(decide("file:../local", "1.0.0"), None);
        assert_eq!(decide("latest", "1.0.0"), None);
    }

    fn release() -> impl Strategy<Value = (u64, u64, u64)> {
        (1u64..20, 0u64..20, 0u64..20)
    }

    fn non_pinned_range() -> impl Strategy<Value = String> {
        (release(), 0usize..5).prop_map(|((major, minor, patch), shape)| match shape {
            0 => format!("~{}.{}.{}", major, minor, patch),
            1 => format!("^{}.{}.{}", major, minor, patch),
            2 => format!("{}.{}.x", major, minor),
            3 => format!("{}.x", major),
            _ => format!("{}.x.x", major),
        })
    }

    proptest! {
        #[test]
        fn pinned_ranges_rewrite_to_target(from in release(), to in release()) {
            prop_assume!(from != to);
            let range = format!("{}.{}.{}", from.0, from.1, from.2);
            let target = format!("{}.{}.{}", to.0, to.1, to.2);
            let decision = decide(&range, &target);
            prop_assert_eq!(decision.map(|d| d.new_version), Some(target));
        }

        #[test]
        fn wild_patch_tolerates_patch_drift(
            (major, minor, patch) in release(),
            other_patch in 0u64..20,
            tilde in any::<bool>(),
        ) {
            let range = if tilde {
                format!("~{}.{}.{}", major, minor, patch)
            } else {
                format!("{}.{}.x", major, minor)
            };
            let target = format!("{}.{}.{}", major, minor, other_patch);
            prop_assert_eq!(decide(&range, &target), None);
        }

        #[test]
        fn wild_minor_tolerates_minor_drift(
            (major, minor, patch) in release(),
            (other_minor, other_patch) in (0u64..20, 0u64..20),
            shape in 0usize..3,
        ) {
            let range = match shape {
                0 => format!("^{}.{}.{}", major, minor, patch),
                1 => format!("{}.x", major),
                _ => format!("{}.x.x", major),
            };
            let target = format!("{}.{}.{}", major, other_minor, other_patch);
            prop_assert_eq!(decide(&range, &target), None);
        }

        #[test]
        fn rewrite_preserves_wildcard_shape(range in non_pinned_range(), to in release()) {
            let target = format!("{}.{}.{}", to.0, to.1, to.2);
            let change = classify_change(&range, &target);
            let rewritten = rewrite(&range, &target, change);
            prop_assert_eq!(classify_wildcard(&rewritten), classify_wildcard(&range));
        }
    }
}
