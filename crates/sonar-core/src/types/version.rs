//! npm-flavoured semantic versions and version ranges.
//!
//! `Version` follows semver precedence. `VersionReq` accepts the range
//! grammar found in `package.json` files and desugars every form (caret,
//! tilde, x-ranges, hyphen ranges) into primitive comparators so matching
//! and minimum-version computation only deal with `= > >= < <=`.

use super::change::{BumpKind, SemVerChange};
use crate::error::SonarError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Largest numeric component accepted, matching what npm can represent
const MAX_COMPONENT: u64 = 9_007_199_254_740_991;

/// Semantic version (major.minor.patch-prerelease+build)
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Version {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub build: Option<String>,
}

/// Version range as a disjunction of comparator sets (`a b || c`).
///
/// An empty comparator set matches any release version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionReq {
    pub sets: Vec<Vec<Comparator>>,
}

/// Primitive version comparator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comparator {
    pub op: Op,
    pub version: Version,
}

/// Comparison operator after desugaring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exact,     // =1.0.0
    Greater,   // >1.0.0
    GreaterEq, // >=1.0.0
    Less,      // <1.0.0
    LessEq,    // <=1.0.0
}

/// Partial version as written in a range (`1`, `1.2`, `1.x`, `*`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialVersion {
    pub major: Option<u64>,
    pub minor: Option<u64>,
    pub patch: Option<u64>,
    pub prerelease: Option<String>,
}

/// Range operators as written, before desugaring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RangeOp {
    Caret,
    Tilde,
    Greater,
    GreaterEq,
    Less,
    LessEq,
    Exact,
    Plain,
}

/// Version parsing and validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version format: {input}")]
    InvalidFormat { input: String },

    #[error("Invalid number '{component}' in {input}")]
    InvalidNumber { input: String, component: String },

    #[error("Invalid prerelease identifier in {input}")]
    InvalidPrerelease { input: String },

    #[error("Invalid range: {input}")]
    InvalidRange { input: String },
}

impl VersionError {
    /// The text that failed to parse
    pub fn input(&self) -> &str {
        match self {
            VersionError::InvalidFormat { input }
            | VersionError::InvalidNumber { input, .. }
            | VersionError::InvalidPrerelease { input }
            | VersionError::InvalidRange { input } => input,
        }
    }
}

impl From<VersionError> for SonarError {
    fn from(err: VersionError) -> Self {
        SonarError::InvalidVersion {
            input: err.input().to_string(),
        }
    }
}

impl Version {
    /// Create a new version
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: None,
            build: None,
        }
    }

    fn with_prerelease(major: u64, minor: u64, patch: u64, prerelease: Option<String>) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease,
            build: None,
        }
    }

    /// Check if this version satisfies a version requirement
    pub fn satisfies(&self, req: &VersionReq) -> bool {
        req.matches(self)
    }

    /// Check if this is a prerelease version
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// Coerce arbitrary text into a version.
    ///
    /// Takes the first run of up to three dot-separated numbers; missing
    /// components become zero and any prerelease is dropped. `^1.2` gives
    /// `1.2.0`, `1.1.x` gives `1.1.0`, `workspace:*` gives `None`.
    pub fn coerce(input: &str) -> Option<Version> {
        let start = input.find(|c: char| c.is_ascii_digit())?;
        let mut rest = &input[start..];
        let mut parts = [0u64; 3];

        for (index, slot) in parts.iter_mut().enumerate() {
            if index > 0 {
                match rest.strip_prefix('.') {
                    Some(tail) if tail.starts_with(|c: char| c.is_ascii_digit()) => rest = tail,
                    _ => break,
                }
            }
            let len = rest
                .find(|c: char| !c.is_ascii_digit())
                .unwrap_or(rest.len());
            *slot = rest[..len].parse::<u64>().ok().filter(|n| *n <= MAX_COMPONENT)?;
            rest = &rest[len..];
        }

        Some(Version::new(parts[0], parts[1], parts[2]))
    }

    /// Classify the difference between two versions.
    ///
    /// Returns `None` when both have the same precedence. Going from a
    /// prerelease to a release of the same core reports the component that
    /// the release "lands" on; going to a prerelease adds the `pre` prefix.
    pub fn diff(&self, other: &Version) -> Option<SemVerChange> {
        let (high, low) = match self.cmp(other) {
            Ordering::Equal => return None,
            Ordering::Greater => (self, other),
            Ordering::Less => (other, self),
        };

        if low.is_prerelease() && !high.is_prerelease() {
            if low.minor == 0 && low.patch == 0 {
                return Some(SemVerChange::Major);
            }
            if low.core() == high.core() {
                if low.minor != 0 && low.patch == 0 {
                    return Some(SemVerChange::Minor);
                }
                return Some(SemVerChange::Patch);
            }
        }

        let pre = high.is_prerelease();
        let change = if self.major != other.major {
            if pre {
                SemVerChange::Premajor
            } else {
                SemVerChange::Major
            }
        } else if self.minor != other.minor {
            if pre {
                SemVerChange::Preminor
            } else {
                SemVerChange::Minor
            }
        } else if self.patch != other.patch {
            if pre {
                SemVerChange::Prepatch
            } else {
                SemVerChange::Patch
            }
        } else {
            SemVerChange::Prerelease
        };
        Some(change)
    }

    /// Compute the next version for a bump.
    ///
    /// A prerelease is released rather than skipped: `1.2.3-beta` bumped by
    /// `patch` is `1.2.3`, `2.0.0-rc.1` bumped by `major` is `2.0.0`.
    pub fn inc(&self, kind: BumpKind) -> Version {
        let mut next = Version::new(self.major, self.minor, self.patch);
        match kind {
            BumpKind::Major => {
                if self.minor != 0 || self.patch != 0 || !self.is_prerelease() {
                    next.major = next.major.saturating_add(1);
                }
                next.minor = 0;
                next.patch = 0;
            },
            BumpKind::Minor => {
                if self.patch != 0 || !self.is_prerelease() {
                    next.minor = next.minor.saturating_add(1);
                }
                next.patch = 0;
            },
            BumpKind::Patch => {
                if !self.is_prerelease() {
                    next.patch = next.patch.saturating_add(1);
                }
            },
        }
        next
    }

    fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }

    /// Get the precedence for comparison (ignores build metadata)
    fn precedence_cmp(&self, other: &Self) -> Ordering {
        match self.core().cmp(&other.core()) {
            Ordering::Equal => match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => compare_prerelease(a, b),
            },
            other => other,
        }
    }
}

/// Compare dot-separated prerelease identifiers.
///
/// Numeric identifiers compare numerically and sort below alphanumeric ones;
/// a shorter list that is a prefix of a longer one sorts first.
fn compare_prerelease(a: &str, b: &str) -> Ordering {
    let mut left = a.split('.');
    let mut right = b.split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(x), Ok(y)) => x.cmp(&y),
                    (Ok(_), Err(_)) => Ordering::Less,
                    (Err(_), Ok(_)) => Ordering::Greater,
                    (Err(_), Err(_)) => x.cmp(y),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            },
        }
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        let build = input.split_once('+').map(|(_, b)| b.to_string());
        let partial = PartialVersion::parse(input)?;

        match (partial.major, partial.minor, partial.patch) {
            (Some(major), Some(minor), Some(patch)) => Ok(Version {
                major,
                minor,
                patch,
                prerelease: partial.prerelease,
                build,
            }),
            _ => Err(VersionError::InvalidFormat {
                input: input.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for Version {
    type Error = VersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Version> for String {
    fn from(version: Version) -> Self {
        version.to_string()
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(ref pre) = self.prerelease {
            write!(f, "-{}", pre)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.precedence_cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.precedence_cmp(other)
    }
}

impl PartialVersion {
    /// Parse a partial version, accepting a leading `v` or `=` and
    /// `x`/`X`/`*` or missing components as wildcards.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim().trim_start_matches(['v', '=']);
        let without_build = match trimmed.split_once('+') {
            Some((v, _)) => v,
            None => trimmed,
        };
        let (core, prerelease) = match without_build.split_once('-') {
            Some((c, p)) => (c, Some(p)),
            None => (without_build, None),
        };

        let pieces: Vec<&str> = core.split('.').collect();
        if core.is_empty() || pieces.len() > 3 {
            return Err(VersionError::InvalidFormat {
                input: input.to_string(),
            });
        }

        let mut parts: [Option<u64>; 3] = [None; 3];
        let mut wild = false;
        for (slot, piece) in parts.iter_mut().zip(pieces.iter()) {
            if wild || matches!(*piece, "x" | "X" | "*") {
                wild = true;
                continue;
            }
            if piece.is_empty() || !piece.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VersionError::InvalidNumber {
                    input: input.to_string(),
                    component: piece.to_string(),
                });
            }
            let number = piece
                .parse::<u64>()
                .ok()
                .filter(|n| *n <= MAX_COMPONENT)
                .ok_or_else(|| VersionError::InvalidNumber {
                    input: input.to_string(),
                    component: piece.to_string(),
                })?;
            *slot = Some(number);
        }

        if let Some(pre) = prerelease {
            let valid = !pre.is_empty()
                && parts[2].is_some()
                && pre
                    .split('.')
                    .all(|id| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
            if !valid {
                return Err(VersionError::InvalidPrerelease {
                    input: input.to_string(),
                });
            }
        }

        Ok(PartialVersion {
            major: parts[0],
            minor: parts[1],
            patch: parts[2],
            prerelease: prerelease.map(str::to_string),
        })
    }

    /// Fill missing parts with zero
    pub fn to_version(&self) -> Version {
        Version::with_prerelease(
            self.major.unwrap_or(0),
            self.minor.unwrap_or(0),
            self.patch.unwrap_or(0),
            self.prerelease.clone(),
        )
    }
}

impl Comparator {
    fn new(op: Op, version: Version) -> Self {
        Self { op, version }
    }

    fn at_least(major: u64, minor: u64, patch: u64, prerelease: Option<String>) -> Self {
        Self::new(
            Op::GreaterEq,
            Version::with_prerelease(major, minor, patch, prerelease),
        )
    }

    /// `<M.m.p-0`, which excludes prereleases of the upper bound
    fn below(major: u64, minor: u64, patch: u64) -> Self {
        Self::new(
            Op::Less,
            Version::with_prerelease(major, minor, patch, Some("0".to_string())),
        )
    }

    /// Check if a version matches this comparator
    pub fn matches(&self, version: &Version) -> bool {
        let ord = version.cmp(&self.version);
        match self.op {
            Op::Exact => ord == Ordering::Equal,
            Op::Greater => ord == Ordering::Greater,
            Op::GreaterEq => ord != Ordering::Less,
            Op::Less => ord == Ordering::Less,
            Op::LessEq => ord != Ordering::Greater,
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.op {
            Op::Exact => "",
            Op::Greater => ">",
            Op::GreaterEq => ">=",
            Op::Less => "<",
            Op::LessEq => "<=",
        };
        write!(f, "{}{}", op, self.version)
    }
}

impl VersionReq {
    /// Parse an npm version range.
    ///
    /// Protocol specifiers (`workspace:*`, `file:`, git URLs, dist-tags like
    /// `latest`) are not ranges and fail to parse.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let sets = input
            .split("||")
            .map(parse_set)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(VersionReq { sets })
    }

    /// Check if a version matches this requirement
    pub fn matches(&self, version: &Version) -> bool {
        self.sets.iter().any(|set| set_matches(set, version))
    }

    /// Lowest version that satisfies the range
    pub fn min_version(&self) -> Option<Version> {
        let zero = Version::new(0, 0, 0);
        if self.matches(&zero) {
            return Some(zero);
        }
        let zero_pre = Version::with_prerelease(0, 0, 0, Some("0".to_string()));
        if self.matches(&zero_pre) {
            return Some(zero_pre);
        }

        let mut lowest: Option<Version> = None;
        for set in &self.sets {
            let mut set_min: Option<Version> = None;
            for comparator in set {
                let candidate = match comparator.op {
                    Op::Greater => {
                        let mut next = comparator.version.clone();
                        match next.prerelease.as_mut() {
                            Some(pre) => pre.push_str(".0"),
                            None => next.patch += 1,
                        }
                        next
                    },
                    Op::Exact | Op::GreaterEq => comparator.version.clone(),
                    Op::Less | Op::LessEq => continue,
                };
                if set_min.as_ref().map_or(true, |min| candidate > *min) {
                    set_min = Some(candidate);
                }
            }
            if let Some(candidate) = set_min {
                if lowest.as_ref().map_or(true, |min| *min > candidate) {
                    lowest = Some(candidate);
                }
            }
        }

        lowest.filter(|min| self.matches(min))
    }
}

impl FromStr for VersionReq {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionReq::parse(s)
    }
}

/// A prerelease only matches a set that names a prerelease on the same
/// `major.minor.patch`.
fn set_matches(set: &[Comparator], version: &Version) -> bool {
    if !set.iter().all(|c| c.matches(version)) {
        return false;
    }
    if version.is_prerelease() {
        return set
            .iter()
            .any(|c| c.version.is_prerelease() && c.version.core() == version.core());
    }
    true
}

fn parse_set(input: &str) -> Result<Vec<Comparator>, VersionError> {
    // Glue dangling operators onto the following token (`>= 1.2.3`)
    let mut tokens: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;
    for raw in input.split_whitespace() {
        if raw.chars().all(|c| matches!(c, '<' | '>' | '=' | '~' | '^')) {
            pending.get_or_insert_with(String::new).push_str(raw);
            continue;
        }
        match pending.take() {
            Some(op) => tokens.push(format!("{op}{raw}")),
            None => tokens.push(raw.to_string()),
        }
    }
    if pending.is_some() {
        return Err(VersionError::InvalidRange {
            input: input.trim().to_string(),
        });
    }

    if tokens.len() == 3 && tokens[1] == "-" {
        return hyphen_range(&tokens[0], &tokens[2]);
    }

    let mut comparators = Vec::new();
    for token in &tokens {
        comparators.extend(desugar(token)?);
    }
    Ok(comparators)
}

fn split_op(token: &str) -> (RangeOp, &str) {
    const PREFIXES: [(&str, RangeOp); 8] = [
        ("~>", RangeOp::Tilde),
        (">=", RangeOp::GreaterEq),
        ("<=", RangeOp::LessEq),
        ("^", RangeOp::Caret),
        ("~", RangeOp::Tilde),
        (">", RangeOp::Greater),
        ("<", RangeOp::Less),
        ("=", RangeOp::Exact),
    ];
    for (prefix, op) in PREFIXES {
        if let Some(rest) = token.strip_prefix(prefix) {
            return (op, rest);
        }
    }
    (RangeOp::Plain, token)
}

fn desugar(token: &str) -> Result<Vec<Comparator>, VersionError> {
    let (op, rest) = split_op(token);
    let partial = PartialVersion::parse(rest).map_err(|_| VersionError::InvalidRange {
        input: token.to_string(),
    })?;
    Ok(match op {
        RangeOp::Tilde => tilde(partial),
        RangeOp::Caret => caret(partial),
        other => x_range(other, partial),
    })
}

/// `~1.2.3` := `>=1.2.3 <1.3.0-0`, `~1` := `>=1.0.0 <2.0.0-0`
fn tilde(p: PartialVersion) -> Vec<Comparator> {
    match (p.major, p.minor, p.patch) {
        (None, _, _) => Vec::new(),
        (Some(major), None, _) => vec![
            Comparator::at_least(major, 0, 0, None),
            Comparator::below(major + 1, 0, 0),
        ],
        (Some(major), Some(minor), None) => vec![
            Comparator::at_least(major, minor, 0, None),
            Comparator::below(major, minor + 1, 0),
        ],
        (Some(major), Some(minor), Some(patch)) => vec![
            Comparator::at_least(major, minor, patch, p.prerelease),
            Comparator::below(major, minor + 1, 0),
        ],
    }
}

/// `^1.2.3` := `>=1.2.3 <2.0.0-0`, with the leftmost non-zero component
/// pinned for `0.x` versions
fn caret(p: PartialVersion) -> Vec<Comparator> {
    match (p.major, p.minor, p.patch) {
        (None, _, _) => Vec::new(),
        (Some(major), None, _) => vec![
            Comparator::at_least(major, 0, 0, None),
            Comparator::below(major + 1, 0, 0),
        ],
        (Some(major), Some(minor), None) => {
            let upper = if major == 0 {
                Comparator::below(0, minor + 1, 0)
            } else {
                Comparator::below(major + 1, 0, 0)
            };
            vec![Comparator::at_least(major, minor, 0, None), upper]
        },
        (Some(major), Some(minor), Some(patch)) => {
            let upper = match (major, minor) {
                (0, 0) => Comparator::below(0, 0, patch + 1),
                (0, _) => Comparator::below(0, minor + 1, 0),
                _ => Comparator::below(major + 1, 0, 0),
            };
            vec![Comparator::at_least(major, minor, patch, p.prerelease), upper]
        },
    }
}

fn x_range(op: RangeOp, p: PartialVersion) -> Vec<Comparator> {
    // Wildcards cascade, so a missing patch means some component is wild
    let any_wild = p.patch.is_none();
    let op = if op == RangeOp::Exact && any_wild {
        RangeOp::Plain
    } else {
        op
    };

    let Some(major) = p.major else {
        return match op {
            // `>*` and `<*` match nothing
            RangeOp::Greater | RangeOp::Less => vec![Comparator::below(0, 0, 0)],
            _ => Vec::new(),
        };
    };

    if op != RangeOp::Plain && any_wild {
        let (mut major, mut minor) = (major, p.minor.unwrap_or(0));
        let op = match op {
            RangeOp::Greater => {
                if p.minor.is_none() {
                    major += 1;
                    minor = 0;
                } else {
                    minor += 1;
                }
                Op::GreaterEq
            },
            RangeOp::LessEq => {
                if p.minor.is_none() {
                    major += 1;
                } else {
                    minor += 1;
                }
                Op::Less
            },
            RangeOp::Less => Op::Less,
            _ => Op::GreaterEq,
        };
        let prerelease = (op == Op::Less).then(|| "0".to_string());
        return vec![Comparator::new(
            op,
            Version::with_prerelease(major, minor, 0, prerelease),
        )];
    }

    match (p.minor, p.patch) {
        (None, _) => vec![
            Comparator::at_least(major, 0, 0, None),
            Comparator::below(major + 1, 0, 0),
        ],
        (Some(minor), None) => vec![
            Comparator::at_least(major, minor, 0, None),
            Comparator::below(major, minor + 1, 0),
        ],
        (Some(minor), Some(patch)) => {
            let op = match op {
                RangeOp::Greater => Op::Greater,
                RangeOp::GreaterEq => Op::GreaterEq,
                RangeOp::Less => Op::Less,
                RangeOp::LessEq => Op::LessEq,
                _ => Op::Exact,
            };
            vec![Comparator::new(
                op,
                Version::with_prerelease(major, minor, patch, p.prerelease),
            )]
        },
    }
}

/// `1.2 - 2.3.4` := `>=1.2.0 <=2.3.4`, `1.2.3 - 2` := `>=1.2.3 <3.0.0-0`
fn hyphen_range(from: &str, to: &str) -> Result<Vec<Comparator>, VersionError> {
    let from = PartialVersion::parse(from)?;
    let to = PartialVersion::parse(to)?;
    let mut comparators = Vec::with_capacity(2);

    match (from.major, from.minor, from.patch) {
        (None, _, _) => {},
        (Some(major), None, _) => comparators.push(Comparator::at_least(major, 0, 0, None)),
        (Some(major), Some(minor), None) => {
            comparators.push(Comparator::at_least(major, minor, 0, None))
        },
        (Some(major), Some(minor), Some(patch)) => {
            comparators.push(Comparator::at_least(major, minor, patch, from.prerelease))
        },
    }

    match (to.major, to.minor, to.patch) {
        (None, _, _) => {},
        (Some(major), None, _) => comparators.push(Comparator::below(major + 1, 0, 0)),
        (Some(major), Some(minor), None) => comparators.push(Comparator::below(major, minor + 1, 0)),
        (Some(major), Some(minor), Some(patch)) => comparators.push(Comparator::new(
            Op::LessEq,
            Version::with_prerelease(major, minor, patch, to.prerelease),
        )),
    }

    Ok(comparators)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> Version {
        s.parse().unwrap()
    }

    fn req(s: &str) -> VersionReq {
        VersionReq::parse(s).unwrap()
    }

    #[test]
    fn test_version_parsing() {
        let v = Version::from_str("1.2.3").unwrap();
        assert_eq!(v.major, 1);
        assert_eq!(v.minor, 2);
        assert_eq!(v.patch, 3);
        assert_eq!(v.prerelease, None);
        assert_eq!(v.build, None);
    }

    #[test]
    fn test_version_with_prerelease_and_build() {
        let v = Version::from_str("v1.2.3-alpha.1+build.5").unwrap();
        assert_eq!(v.prerelease, Some("alpha.1".to_string()));
        assert_eq!(v.build, Some("build.5".to_string()));
        assert_eq!(v.to_string(), "1.2.3-alpha.1+build.5");
    }

    #[test]
    fn test_version_rejects_partial_and_garbage() {
        assert!(Version::from_str("1.2").is_err());
        assert!(Version::from_str("1.2.x").is_err());
        assert!(Version::from_str("latest").is_err());
        assert!(Version::from_str("1.2.3-").is_err());
    }

    #[test]
    fn test_oversized_components_are_rejected() {
        assert!(Version::from_str("9007199254740991.0.0").is_ok());
        assert!(matches!(
            Version::from_str("9007199254740992.0.0"),
            Err(VersionError::InvalidNumber { .. })
        ));
        assert!(Version::from_str("1.18446744073709551615.0").is_err());
        assert!(VersionReq::parse("^18446744073709551615.0.0").is_err());
        assert!(VersionReq::parse("~1.18446744073709551615").is_err());
        assert!(VersionReq::parse("1.2.18446744073709551615 - 2").is_err());
        assert_eq!(Version::coerce("18446744073709551615.1.1"), None);
    }

    #[test]
    fn test_inc_saturates_at_u64_max() {
        let top = Version::new(u64::MAX, 0, 0);
        assert_eq!(top.inc(BumpKind::Major).major, u64::MAX);
    }

    #[test]
    fn test_prerelease_precedence() {
        assert!(v("1.0.0-alpha") < v("1.0.0-alpha.1"));
        assert!(v("1.0.0-alpha.1") < v("1.0.0-alpha.beta"));
        assert!(v("1.0.0-beta.2") < v("1.0.0-beta.11"));
        assert!(v("1.0.0-rc.1") < v("1.0.0"));
        assert_eq!(v("1.0.0+a"), v("1.0.0+b"));
    }

    #[test]
    fn test_coerce() {
        assert_eq!(Version::coerce("^1.2"), Some(v("1.2.0")));
        assert_eq!(Version::coerce("1.1.x"), Some(v("1.1.0")));
        assert_eq!(Version::coerce("v2"), Some(v("2.0.0")));
        assert_eq!(Version::coerce(">=3.4.5 <4"), Some(v("3.4.5")));
        assert_eq!(Version::coerce("1.2.3-beta.1"), Some(v("1.2.3")));
        assert_eq!(Version::coerce("workspace:*"), None);
        assert_eq!(Version::coerce("latest"), None);
    }

    #[test]
    fn test_diff() {
        assert_eq!(v("1.0.0").diff(&v("1.0.0")), None);
        assert_eq!(v("1.1.1").diff(&v("1.1.2")), Some(SemVerChange::Patch));
        assert_eq!(v("1.1.0").diff(&v("1.2.2")), Some(SemVerChange::Minor));
        assert_eq!(v("2.0.0").diff(&v("1.9.9")), Some(SemVerChange::Major));
        assert_eq!(
            v("1.0.0").diff(&v("2.0.0-beta.1")),
            Some(SemVerChange::Premajor)
        );
        assert_eq!(
            v("1.0.0").diff(&v("1.1.0-canary.3")),
            Some(SemVerChange::Preminor)
        );
        assert_eq!(
            v("1.0.0").diff(&v("1.0.1-next.0")),
            Some(SemVerChange::Prepatch)
        );
        assert_eq!(
            v("1.0.0-beta.1").diff(&v("1.0.0-beta.2")),
            Some(SemVerChange::Prerelease)
        );
    }

    #[test]
    fn test_diff_prerelease_to_release() {
        assert_eq!(v("1.0.0-1").diff(&v("1.0.0")), Some(SemVerChange::Major));
        assert_eq!(v("1.0.0-1").diff(&v("1.1.1")), Some(SemVerChange::Major));
        assert_eq!(v("1.1.0-1").diff(&v("1.1.0")), Some(SemVerChange::Minor));
        assert_eq!(v("1.1.1-1").diff(&v("1.1.1")), Some(SemVerChange::Patch));
        assert_eq!(v("1.1.1-1").diff(&v("1.2.0")), Some(SemVerChange::Minor));
    }

    #[test]
    fn test_inc() {
        assert_eq!(v("1.2.3").inc(BumpKind::Patch), v("1.2.4"));
        assert_eq!(v("1.2.3").inc(BumpKind::Minor), v("1.3.0"));
        assert_eq!(v("1.2.3").inc(BumpKind::Major), v("2.0.0"));
        assert_eq!(v("1.2.3-beta").inc(BumpKind::Patch), v("1.2.3"));
        assert_eq!(v("1.3.0-rc.1").inc(BumpKind::Minor), v("1.3.0"));
        assert_eq!(v("2.0.0-rc.1").inc(BumpKind::Major), v("2.0.0"));
        assert_eq!(v("1.2.3-beta").inc(BumpKind::Major), v("2.0.0"));
    }

    #[test]
    fn test_version_req_exact() {
        let req = req("1.2.3");
        assert!(req.matches(&v("1.2.3")));
        assert!(!req.matches(&v("1.2.4")));
    }

    #[test]
    fn test_version_req_wildcard() {
        for any in ["*", "", "x", "X"] {
            let req = VersionReq::parse(any).unwrap();
            assert!(req.matches(&v("1.2.3")));
            assert!(req.matches(&v("999.999.999")));
            assert!(!req.matches(&v("1.0.0-beta")));
        }
    }

    #[test]
    fn test_version_req_caret() {
        let req = req("^1.2.3");
        assert!(req.matches(&v("1.2.3")));
        assert!(req.matches(&v("1.3.0")));
        assert!(!req.matches(&v("2.0.0")));
        assert!(!req.matches(&v("2.0.0-0")));
        assert!(!req.matches(&v("1.2.2")));

        let zero = VersionReq::parse("^0.2.3").unwrap();
        assert!(zero.matches(&v("0.2.9")));
        assert!(!zero.matches(&v("0.3.0")));

        let zero_zero = VersionReq::parse("^0.0.3").unwrap();
        assert!(zero_zero.matches(&v("0.0.3")));
        assert!(!zero_zero.matches(&v("0.0.4")));
    }

    #[test]
    fn test_version_req_tilde() {
        let req = req("~1.2.3");
        assert!(req.matches(&v("1.2.9")));
        assert!(!req.matches(&v("1.3.0")));

        let major_only = VersionReq::parse("~1").unwrap();
        assert!(major_only.matches(&v("1.9.0")));
        assert!(!major_only.matches(&v("2.0.0")));
    }

    #[test]
    fn test_version_req_x_ranges() {
        let patch_wild = req("1.1.x");
        assert!(patch_wild.matches(&v("1.1.7")));
        assert!(!patch_wild.matches(&v("1.2.0")));

        let minor_wild = req("1.x");
        assert!(minor_wild.matches(&v("1.9.9")));
        assert!(!minor_wild.matches(&v("2.0.0")));

        assert!(req(">1.x").matches(&v("2.0.0")));
        assert!(!req(">1.x").matches(&v("1.9.0")));
        assert!(req("<=1.2").matches(&v("1.2.9")));
        assert!(!req("<=1.2").matches(&v("1.3.0")));
    }

    #[test]
    fn test_version_req_operators() {
        assert!(!req(">1.2.3").matches(&v("1.2.3")));
        assert!(req(">1.2.3").matches(&v("1.2.4")));
        assert!(req(">= 1.2.3").matches(&v("1.2.3")));
        assert!(req("<1.2.4").matches(&v("1.2.3")));
        assert!(!req("<1.2.4").matches(&v("1.2.4")));
        assert!(req(">=1.0.0 <2.0.0").matches(&v("1.5.0")));
        assert!(!req(">=1.0.0 <2.0.0").matches(&v("2.0.0")));
    }

    #[test]
    fn test_version_req_alternatives_and_hyphen() {
        let either = req("^1.0.0 || ^3.0.0");
        assert!(either.matches(&v("1.4.0")));
        assert!(either.matches(&v("3.1.0")));
        assert!(!either.matches(&v("2.0.0")));

        let hyphen = req("1.2 - 2.3.4");
        assert!(hyphen.matches(&v("1.2.0")));
        assert!(hyphen.matches(&v("2.3.4")));
        assert!(!hyphen.matches(&v("2.3.5")));

        let open_end = req("1.2.3 - 2");
        assert!(open_end.matches(&v("2.9.9")));
        assert!(!open_end.matches(&v("3.0.0")));
    }

    #[test]
    fn test_prerelease_rule() {
        let req = req("^1.0.0-beta.1");
        assert!(req.matches(&v("1.0.0-beta.2")));
        assert!(req.matches(&v("1.0.0")));
        assert!(!req.matches(&v("1.1.0-beta.1")));
    }

    #[test]
    fn test_protocol_ranges_do_not_parse() {
        for protocol in [
            "workspace:*",
            "workspace:^1.0.0",
            "file:../shared",
            "git+https://github.com/a/b.git",
            "latest",
            "npm:other@1.0.0",
        ] {
            assert!(VersionReq::parse(protocol).is_err(), "{protocol}");
        }
    }

    #[test]
    fn test_min_version() {
        assert_eq!(req("^1.2.3").min_version(), Some(v("1.2.3")));
        assert_eq!(req("~1.1.x").min_version(), Some(v("1.1.0")));
        assert_eq!(req(">1.2.3").min_version(), Some(v("1.2.4")));
        assert_eq!(req("*").min_version(), Some(v("0.0.0")));
        assert_eq!(req("^2.0.0 || ^1.0.0").min_version(), Some(v("1.0.0")));
        assert_eq!(req(">1.0.0-beta").min_version(), Some(v("1.0.0-beta.0")));
        assert_eq!(req("<0.0.0-0").min_version(), None);
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn version_round_trip(
            major in 0u64..1000,
            minor in 0u64..1000,
            patch in 0u64..1000,
            prerelease in prop::option::of("[a-z][a-z0-9]{0,6}(\\.[0-9]{1,3})?"),
            build in prop::option::of("[a-zA-Z0-9]{1,8}")
        ) {
            let original = Version {
                major,
                minor,
                patch,
                prerelease: prerelease.clone(),
                build: build.clone(),
            };

            let parsed = Version::from_str(&original.to_string()).unwrap();
            prop_assert_eq!(parsed.major, original.major);
            prop_assert_eq!(parsed.minor, original.minor);
            prop_assert_eq!(parsed.patch, original.patch);
            prop_assert_eq!(parsed.prerelease, original.prerelease);
            prop_assert_eq!(parsed.build, original.build);
        }
    }

    proptest! {
        #[test]
        fn caret_range_contains_its_minimum(
            major in 0u64..50,
            minor in 0u64..50,
            patch in 0u64..50,
        ) {
            let base = Version::new(major, minor, patch);
            let req = VersionReq::parse(&format!("^{base}")).unwrap();
            prop_assert!(req.matches(&base));
            prop_assert_eq!(req.min_version(), Some(base));
        }
    }

    proptest! {
        #[test]
        fn diff_is_symmetric(
            a in (0u64..20, 0u64..20, 0u64..20),
            b in (0u64..20, 0u64..20, 0u64..20),
        ) {
            let a = Version::new(a.0, a.1, a.2);
            let b = Version::new(b.0, b.1, b.2);
            prop_assert_eq!(a.diff(&b), b.diff(&a));
            prop_assert_eq!(a.diff(&b).is_none(), a == b);
        }
    }
}
