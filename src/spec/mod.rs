//! Package specifiers
//!
//! A specifier such as `conda-forge::python>=3.9,<3.10[build=*_cpython]` is
//! parsed once into an immutable [`MatchSpec`] that can be shared across
//! threads and evaluated against any number of candidates.
//!
//! # Modules
//!
//! - [`constraint`]: version constraint expressions (`>=3.9,<3.10`)
//! - [`parser`]: specifier grammar
//! - [`pattern`]: name/build string matchers and build-number constraints

pub mod constraint;
pub mod parser;
pub mod pattern;

use std::fmt;
use std::str::FromStr;

pub use constraint::{Operator, VersionConstraint, VersionSpec};
pub use pattern::{BuildNumberOperator, BuildNumberSpec, StringMatcher};

use crate::error::ParseError;

/// Parsed package specifier
///
/// Every field except `name` is optional; an absent field matches anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchSpec {
    pub name: StringMatcher,
    pub version: Option<VersionSpec>,
    pub build: Option<StringMatcher>,
    pub build_number: Option<BuildNumberSpec>,
    pub channel: Option<String>,
    pub subdir: Option<String>,
    /// Recorded for round-tripping; not used when matching
    pub namespace: Option<String>,
    pub md5: Option<String>,
    pub sha256: Option<String>,
    pub license: Option<String>,
}

impl MatchSpec {
    /// Specifier that only constrains the package name
    pub fn new(name: StringMatcher) -> Self {
        Self {
            name,
            version: None,
            build: None,
            build_number: None,
            channel: None,
            subdir: None,
            namespace: None,
            md5: None,
            sha256: None,
            license: None,
        }
    }

    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        parser::parse_match_spec(raw)
    }
}

impl FromStr for MatchSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parser::parse_match_spec(s)
    }
}

/// Parse several specifiers, stopping at the first invalid one
pub fn parse_spec_list<S: AsRef<str>>(specs: &[S]) -> Result<Vec<MatchSpec>, ParseError> {
    specs.iter().map(|s| MatchSpec::parse(s.as_ref())).collect()
}

fn ends_in_known_subdir(channel: &str) -> bool {
    channel
        .rsplit_once('/')
        .is_some_and(|(_, last)| parser::KNOWN_SUBDIRS.contains(&last))
}

/// Canonical text form; parsing it yields an equal [`MatchSpec`]
impl fmt::Display for MatchSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `chan/linux-64::pkg` would re-parse as channel `chan` plus a subdir
        let prefix_channel = self
            .channel
            .as_deref()
            .filter(|channel| !ends_in_known_subdir(channel));
        if let Some(channel) = prefix_channel {
            match &self.namespace {
                Some(namespace) => write!(f, "{}:{}:", channel, namespace)?,
                None => write!(f, "{}::", channel)?,
            }
        }
        write!(f, "{}", self.name)?;
        if let Some(version) = &self.version {
            write!(f, " {}", version)?;
        }

        let mut pairs: Vec<(&str, String)> = Vec::new();
        if prefix_channel.is_none() {
            if let Some(channel) = &self.channel {
                pairs.push(("channel", channel.clone()));
            }
        }
        if let Some(build) = &self.build {
            pairs.push(("build", build.to_string()));
        }
        if let Some(build_number) = &self.build_number {
            pairs.push(("build_number", build_number.to_string()));
        }
        if let Some(subdir) = &self.subdir {
            pairs.push(("subdir", subdir.clone()));
        }
        if prefix_channel.is_none() {
            if let Some(namespace) = &self.namespace {
                pairs.push(("namespace", namespace.clone()));
            }
        }
        for (key, value) in [("md5", &self.md5), ("sha256", &self.sha256), ("license", &self.license)] {
            if let Some(value) = value {
                pairs.push((key, value.clone()));
            }
        }

        if pairs.is_empty() {
            return Ok(());
        }
        f.write_str("[")?;
        for (idx, (key, value)) in pairs.iter().enumerate() {
            if idx > 0 {
                f.write_str(", ")?;
            }
            let quote = if value.contains('\'') { '"' } else { '\'' };
            write!(f, "{}={}{}{}", key, quote, value, quote)?;
        }
        f.write_str("]")
    }
}
