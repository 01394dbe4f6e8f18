//! Match engine
//!
//! Decides whether a single [`Candidate`] satisfies a [`MatchSpec`]. Checks
//! run from cheapest to most expensive and stop at the first mismatch:
//!
//! - name
//! - channel and subdir
//! - build number, build string
//! - md5, sha256, license
//! - version

use crate::candidate::Candidate;
use crate::error::ParseError;
use crate::spec::MatchSpec;

/// Predicate implemented by every specifier component
pub trait Matcher<T: ?Sized> {
    fn matches(&self, other: &T) -> bool;
}

/// Check whether `candidate` satisfies every constraint of `spec`
///
/// A candidate that carries no channel is accepted by a channel constraint,
/// since most catalog records do not record where they came from. A spec
/// with a version never matches a candidate whose version is absent or
/// unparsable.
pub fn is_match(spec: &MatchSpec, candidate: &Candidate) -> bool {
    if !spec.name.matches(candidate.name.as_str()) {
        return false;
    }

    if let (Some(channel), Some(candidate_channel)) = (&spec.channel, &candidate.channel) {
        if !same_channel(channel, candidate_channel) {
            return false;
        }
    }

    if let Some(subdir) = &spec.subdir {
        if candidate.subdir.as_deref() != Some(subdir.as_str()) {
            return false;
        }
    }

    if let Some(build_number) = &spec.build_number {
        if !build_number.matches(&candidate.build_number) {
            return false;
        }
    }

    if let Some(build) = &spec.build {
        match &candidate.build {
            Some(candidate_build) if build.matches(candidate_build.as_str()) => {}
            _ => return false,
        }
    }

    let exact_fields = [
        (&spec.md5, &candidate.md5),
        (&spec.sha256, &candidate.sha256),
        (&spec.license, &candidate.license),
    ];
    for (expected, actual) in exact_fields {
        if expected.is_some() && expected != actual {
            return false;
        }
    }

    match &spec.version {
        None => true,
        Some(version_spec) => candidate
            .parsed_version()
            .is_some_and(|version| version_spec.matches(version)),
    }
}

/// Channels compare by their last path component so `conda-forge` equals
/// `https://conda.anaconda.org/conda-forge`
fn same_channel(expected: &str, actual: &str) -> bool {
    fn short(channel: &str) -> &str {
        let trimmed = channel.trim_end_matches('/');
        trimmed.rsplit('/').next().unwrap_or(trimmed)
    }
    expected == actual || short(expected) == short(actual)
}

impl Matcher<Candidate> for MatchSpec {
    fn matches(&self, candidate: &Candidate) -> bool {
        is_match(self, candidate)
    }
}

/// Parse `spec` and match it against a bare name and version
pub fn match_against_matchspec(spec: &str, name: &str, version: &str) -> Result<bool, ParseError> {
    let spec = MatchSpec::parse(spec)?;
    Ok(is_match(&spec, &Candidate::new(name, version)))
}
