//! Package version model and ordering
//!
//! A [`Version`] is parsed once from its raw string and then compared under a
//! total order:
//!
//! ```text
//! epoch ─▶ release segments ─▶ release letter ─▶ pre ─▶ post ─▶ dev ─▶ local
//! ```
//!
//! Missing release segments count as zero, so `1.0` and `1.0.0` are equal
//! (and hash identically). A pre-release sorts before its final release, a
//! post-release after it, and a dev release before the release it precedes.
//!
//! # Modules
//!
//! - [`parse`]: tokenizer turning raw strings into [`Version`] values

pub mod parse;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::error::ParseError;

/// Pre-release phase, in release-cycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreReleaseKind {
    Alpha,
    Beta,
    ReleaseCandidate,
}

impl PreReleaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreReleaseKind::Alpha => "a",
            PreReleaseKind::Beta => "b",
            PreReleaseKind::ReleaseCandidate => "rc",
        }
    }
}

/// Pre-release tag such as `a1`, `b2` or `rc1`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PreRelease {
    pub kind: PreReleaseKind,
    pub number: u64,
}

/// One dot-separated piece of a local version label (`+ubuntu.1`) or of a
/// free-form suffix (`1.0.foo1`)
///
/// Numeric segments sort after alphanumeric ones, matching PEP 440.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    Text(String),
    Number(u64),
}

impl PartialOrd for Segment {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Segment {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Segment::Number(a), Segment::Number(b)) => a.cmp(b),
            (Segment::Text(a), Segment::Text(b)) => a.cmp(b),
            (Segment::Number(_), Segment::Text(_)) => Ordering::Greater,
            (Segment::Text(_), Segment::Number(_)) => Ordering::Less,
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Text(s) => f.write_str(s),
            Segment::Number(n) => write!(f, "{}", n),
        }
    }
}

/// A parsed package version
///
/// Values are immutable once parsed. Equality, hashing and ordering all
/// ignore trailing zero release segments.
#[derive(Debug, Clone)]
pub struct Version {
    epoch: u64,
    release: Vec<u64>,
    letter: Option<String>,
    letter_number: Option<u64>,
    pre: Option<PreRelease>,
    post: Option<u64>,
    dev: Option<u64>,
    suffix: Vec<Segment>,
    local: Option<Vec<Segment>>,
}

/// Ordering slot of the pre-release component
///
/// A dev release with no pre or post tag precedes every pre-release of the
/// same release (`1.0.dev1 < 1.0a1`).
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum PreKey {
    DevOnly,
    Pre(PreRelease),
    Final,
}

impl Version {
    /// Build a plain release version such as `[3, 9, 1]`
    pub fn from_release(release: Vec<u64>) -> Self {
        Self {
            epoch: 0,
            release,
            letter: None,
            letter_number: None,
            pre: None,
            post: None,
            dev: None,
            suffix: Vec::new(),
            local: None,
        }
    }

    /// Parse a raw version string
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        parse::parse_version(raw)
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn release(&self) -> &[u64] {
        &self.release
    }

    /// Letter run glued to the release (`1.1.1g` → `g`, `9.0p1` → `p`)
    pub fn letter(&self) -> Option<&str> {
        self.letter.as_deref()
    }

    /// Number following the release letter (`9.0p1` → `1`)
    pub fn letter_number(&self) -> Option<u64> {
        self.letter_number
    }

    pub fn pre(&self) -> Option<PreRelease> {
        self.pre
    }

    pub fn post(&self) -> Option<u64> {
        self.post
    }

    pub fn dev(&self) -> Option<u64> {
        self.dev
    }

    /// Segments that fit no known tag, in input order (`1.0.foo1` → `foo`, `1`)
    pub fn suffix(&self) -> &[Segment] {
        &self.suffix
    }

    pub fn local(&self) -> Option<&[Segment]> {
        self.local.as_deref()
    }

    pub fn is_prerelease(&self) -> bool {
        self.pre.is_some() || self.dev.is_some()
    }

    /// True when anything beyond epoch and release segments is present
    pub fn has_modifiers(&self) -> bool {
        self.letter.is_some()
            || self.pre.is_some()
            || self.post.is_some()
            || self.dev.is_some()
            || !self.suffix.is_empty()
    }

    /// Release segment at `idx`, zero when absent
    pub fn segment(&self, idx: usize) -> u64 {
        self.release.get(idx).copied().unwrap_or(0)
    }

    /// Compare two versions ignoring both local labels
    pub fn cmp_public(&self, other: &Self) -> Ordering {
        self.cmp_without_local(other)
    }

    /// Fuzzy ("startswith") match against a version prefix
    ///
    /// The leading release segments must equal the prefix's segments and any
    /// further segments on `self` are permitted, so `3.9.1` starts with `3.9`
    /// and `1.10` does not start with `1.1`. A prefix carrying pre/post/dev,
    /// letter or suffix modifiers only matches the exact same public version.
    /// A prefix with a local label also requires that exact label.
    pub fn starts_with(&self, prefix: &Version) -> bool {
        if prefix.local.is_some() && self.local != prefix.local {
            return false;
        }
        if prefix.has_modifiers() {
            return self.cmp_without_local(prefix) == Ordering::Equal;
        }
        self.epoch == prefix.epoch && self.release_starts_with(&prefix.release)
    }

    /// Compatible-release match (`~=`): `self >= base` and every release
    /// segment of `base` but the last is equal
    pub fn is_compatible_with(&self, base: &Version) -> bool {
        let fixed = &base.release[..base.release.len().saturating_sub(1)];
        self.cmp_without_local(base) != Ordering::Less
            && self.epoch == base.epoch
            && self.release_starts_with(fixed)
    }

    fn release_starts_with(&self, prefix: &[u64]) -> bool {
        prefix
            .iter()
            .enumerate()
            .all(|(idx, segment)| self.segment(idx) == *segment)
    }

    fn trimmed_release(&self) -> &[u64] {
        let len = self
            .release
            .iter()
            .rposition(|segment| *segment != 0)
            .map_or(0, |idx| idx + 1);
        &self.release[..len]
    }

    fn letter_key(&self) -> Option<(usize, &str, Option<u64>)> {
        self.letter.as_deref().map(|l| (l.len(), l, self.letter_number))
    }

    fn pre_key(&self) -> PreKey {
        match (self.pre, self.post, self.dev) {
            (Some(pre), _, _) => PreKey::Pre(pre),
            (None, None, Some(_)) => PreKey::DevOnly,
            _ => PreKey::Final,
        }
    }

    fn dev_key(&self) -> (u8, u64) {
        match self.dev {
            Some(n) => (0, n),
            None => (1, 0),
        }
    }

    fn cmp_without_local(&self, other: &Self) -> Ordering {
        let width = self.release.len().max(other.release.len());
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| {
                (0..width)
                    .map(|idx| self.segment(idx).cmp(&other.segment(idx)))
                    .find(|ord| *ord != Ordering::Equal)
                    .unwrap_or(Ordering::Equal)
            })
            .then_with(|| self.letter_key().cmp(&other.letter_key()))
            .then_with(|| self.pre_key().cmp(&other.pre_key()))
            .then_with(|| self.post.cmp(&other.post))
            .then_with(|| self.dev_key().cmp(&other.dev_key()))
            .then_with(|| self.suffix.cmp(&other.suffix))
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        // Absent local label sorts lowest
        self.cmp_without_local(other)
            .then_with(|| self.local.cmp(&other.local))
    }
}

impl Hash for Version {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        self.trimmed_release().hash(state);
        self.letter.hash(state);
        self.letter_number.hash(state);
        self.pre.hash(state);
        self.post.hash(state);
        self.dev.hash(state);
        self.suffix.hash(state);
        self.local.hash(state);
    }
}

impl FromStr for Version {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse::parse_version(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch != 0 {
            write!(f, "{}!", self.epoch)?;
        }
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        f.write_str(&release.join("."))?;
        if let Some(letter) = &self.letter {
            f.write_str(letter)?;
            if let Some(n) = self.letter_number {
                write!(f, "{}", n)?;
            }
        }
        if let Some(pre) = self.pre {
            if self.letter.is_some() {
                f.write_str(".")?;
            }
            write!(f, "{}{}", pre.kind.as_str(), pre.number)?;
        }
        if let Some(post) = self.post {
            write!(f, ".post{}", post)?;
        }
        if let Some(dev) = self.dev {
            write!(f, ".dev{}", dev)?;
        }
        for segment in &self.suffix {
            write!(f, ".{}", segment)?;
        }
        if let Some(local) = &self.local {
            let local: Vec<String> = local.iter().map(|s| s.to_string()).collect();
            write!(f, "+{}", local.join("."))?;
        }
        Ok(())
    }
}

/// Glob match of a version against a prefix pattern such as `1.1.*`
///
/// Comparison is segment-wise: `1.10` does not match `1.1.*` while `1.1.5`
/// does. A pattern without a trailing wildcard is treated as a plain prefix.
/// Unparsable patterns match nothing.
pub fn matches_glob(version: &Version, prefix_pattern: &str) -> bool {
    let prefix = strip_wildcard(prefix_pattern);
    if prefix.is_empty() {
        return true;
    }
    Version::parse(prefix)
        .map(|prefix| version.starts_with(&prefix))
        .unwrap_or(false)
}

/// Remove a trailing `.*` or `*` from a version pattern
pub(crate) fn strip_wildcard(pattern: &str) -> &str {
    let pattern = pattern.trim();
    pattern
        .strip_suffix(".*")
        .or_else(|| pattern.strip_suffix('*'))
        .unwrap_or(pattern)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashSet;

    fn v(s: &str) -> Version {
        Version::parse(s).unwrap()
    }

    #[rstest]
    #[case("1.0", "1.0.0")]
    #[case("1", "1.0.0.0")]
    #[case("1.0a1", "1.0.0a1")]
    #[case("v2.1", "2.1")]
    #[case("1.21_5", "1.21.5")]
    #[case("1.0-1", "1.0.post1")]
    #[case("1.0RC1", "1.0rc1")]
    #[case("1.0.alpha", "1.0a0")]
    #[case("0!1.2", "1.2")]
    fn equal_versions(#[case] a: &str, #[case] b: &str) {
        assert_eq!(v(a), v(b));
        assert_eq!(v(a).cmp(&v(b)), Ordering::Equal);
    }

    #[rstest]
    #[case("1.0.dev1", "1.0a1")]
    #[case("1.0a1", "1.0a2")]
    #[case("1.0a2", "1.0b1")]
    #[case("1.0b1", "1.0rc1")]
    #[case("1.0rc1.dev1", "1.0rc1")]
    #[case("1.0rc1", "1.0")]
    #[case("1.0", "1.0+local")]
    #[case("1.0+abc", "1.0+5")]
    #[case("1.0+local", "1.0.post1.dev1")]
    #[case("1.0.post1.dev1", "1.0.post1")]
    #[case("1.0.post1", "1.0.post2")]
    #[case("1.0.post2", "1.1")]
    #[case("1.1.1", "1.1.1g")]
    #[case("1.1.1g", "1.1.1h")]
    #[case("1.1.1z", "1.1.1za")]
    #[case("1.1.1za", "1.1.2")]
    #[case("9.0", "9.0p1")]
    #[case("9.0p1", "9.0p2")]
    #[case("9.0p2", "9.1")]
    #[case("1.0", "1.0.foo")]
    #[case("1.0.foo", "1.0.foo.1")]
    #[case("1.2.3.4b5", "1.2.3.4b5.6")]
    #[case("1.2.3.4b5.6", "1.2.3.4")]
    #[case("1.9", "1.10")]
    #[case("3.9.1", "3.10.0")]
    #[case("2.0", "1!1.0")]
    fn strictly_ordered(#[case] lower: &str, #[case] higher: &str) {
        assert!(v(lower) < v(higher), "{} < {}", lower, higher);
        assert!(v(higher) > v(lower), "{} > {}", higher, lower);
    }

    #[test]
    fn ordering_is_total_over_a_sample() {
        let sample = [
            "0.1", "1.0.dev0", "1.0a1", "1.0", "1.0.0", "1.0.post1", "1.0+1", "1.1.1g",
            "1.1.1", "2!0.1", "1.10", "1.9.9", "3.9.1rc2", "3.9.1", "3.9",
        ];
        let versions: Vec<Version> = sample.iter().map(|s| v(s)).collect();

        for a in &versions {
            assert_eq!(a.cmp(a), Ordering::Equal);
            for b in &versions {
                assert_eq!(a.cmp(b), b.cmp(a).reverse(), "antisymmetry {} {}", a, b);
                for c in &versions {
                    if a <= b && b <= c {
                        assert!(a <= c, "transitivity {} {} {}", a, b, c);
                    }
                }
            }
        }
    }

    #[test]
    fn openssl_letter_series_is_monotonic() {
        let series = ["1.1.1", "1.1.1a", "1.1.1b", "1.1.1c", "1.1.1g", "1.1.1r", "1.1.1w", "1.1.2"];
        let mut shuffled: Vec<Version> = series.iter().rev().map(|s| v(s)).collect();
        shuffled.sort();

        let sorted: Vec<String> = shuffled.iter().map(|v| v.to_string()).collect();
        assert_eq!(sorted, series);
    }

    #[test]
    fn equal_versions_hash_identically() {
        let set: HashSet<Version> = ["1.0", "1.0.0", "1", "1.0.0.0"].iter().map(|s| v(s)).collect();
        assert_eq!(set.len(), 1);
    }

    #[rstest]
    #[case("1.1.5", "1.1.*", true)]
    #[case("1.10", "1.1.*", false)]
    #[case("1.1", "1.1.*", true)]
    #[case("1.1.0rc1", "1.1.*", true)]
    #[case("2.1", "1.*", false)]
    #[case("2.1", "*", true)]
    #[case("2.1", "not a version.*", false)]
    fn glob_is_segment_wise(#[case] version: &str, #[case] pattern: &str, #[case] expected: bool) {
        assert_eq!(matches_glob(&v(version), pattern), expected);
    }

    #[rstest]
    #[case("3.9.1", "3.9", true)]
    #[case("3.9", "3.9", true)]
    #[case("3", "3.0", true)]
    #[case("3.9.1", "3.9.2", false)]
    #[case("3.10", "3.1", false)]
    #[case("1!3.9", "3.9", false)]
    #[case("1.0a1", "1.0a1", true)]
    #[case("1.0", "1.0a1", false)]
    #[case("1.0+abc", "1.0+abc", true)]
    #[case("1.0+xyz", "1.0+abc", false)]
    #[case("1.0", "1.0+abc", false)]
    #[case("1.0.1+abc", "1.0+abc", true)]
    #[case("1.0+abc", "1.0", true)]
    #[case("9.0p1", "9.0", true)]
    #[case("9.0p1", "9.0p1", true)]
    #[case("9.0p2", "9.0p1", false)]
    fn starts_with_prefix(#[case] version: &str, #[case] prefix: &str, #[case] expected: bool) {
        assert_eq!(v(version).starts_with(&v(prefix)), expected);
    }

    #[rstest]
    #[case("1.4.5", "1.4.2", true)]
    #[case("1.4.2", "1.4.2", true)]
    #[case("1.4.1", "1.4.2", false)]
    #[case("1.5.0", "1.4.2", false)]
    #[case("1.9", "1.4", true)]
    #[case("2.0", "1.4", false)]
    fn compatible_release(#[case] version: &str, #[case] base: &str, #[case] expected: bool) {
        assert_eq!(v(version).is_compatible_with(&v(base)), expected);
    }

    #[rstest]
    #[case("1.0.0", "1.0.0")]
    #[case("V1.2RC3", "1.2rc3")]
    #[case("1!2.0.post3.dev4+Ubuntu-1", "1!2.0.post3.dev4+ubuntu.1")]
    #[case("1.1.1g", "1.1.1g")]
    #[case("9.0P1", "9.0p1")]
    #[case("1.0.Foo_2", "1.0.foo.2")]
    fn display_normalizes(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(v(raw).to_string(), expected);
    }
}
