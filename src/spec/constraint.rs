//! Version constraint expressions
//!
//! Supports the specifier version syntax:
//! - `1.2.3`, `=1.2.3` - fuzzy match (`1.2.3.4` matches, `1.2.30` does not)
//! - `1.2.*`, `==1.2.*` - glob on the release prefix, `!=1.2.*` negates it
//! - `==`, `!=`, `<`, `<=`, `>`, `>=` - ordering comparisons
//! - `~=1.4.2` - compatible release (`>=1.4.2` and `==1.4.*`)
//! - `*` - any version
//!
//! Clauses separated by `,` must all hold; inside a clause, alternatives
//! separated by `|` need only one to hold. `,` is split first, so
//! `>=1,<2|>3` reads as `>=1 AND (<2 OR >3)`.

use std::cmp::Ordering;
use std::fmt::{self, Display};

use tracing::debug;

use crate::error::{ParseError, ParseErrorKind};
use crate::matcher::Matcher;
use crate::version::{Version, strip_wildcard};

/// Comparison applied by a single [`VersionConstraint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    /// `~=`
    Compatible,
    /// Bare version or `=`
    StartsWith,
    /// Trailing `.*`
    Glob,
    /// `!=` with a trailing `.*`
    NotGlob,
}

impl Operator {
    fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "==",
            Operator::NotEqual => "!=",
            Operator::Less => "<",
            Operator::LessEqual => "<=",
            Operator::Greater => ">",
            Operator::GreaterEqual => ">=",
            Operator::Compatible => "~=",
            Operator::StartsWith | Operator::Glob => "=",
            Operator::NotGlob => "!=",
        }
    }
}

/// One atomic comparison such as `>=3.9`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionConstraint {
    pub operator: Operator,
    pub version: Version,
}

impl VersionConstraint {
    pub fn new(operator: Operator, version: Version) -> Self {
        Self { operator, version }
    }

    /// Order the candidate against the constraint version; the candidate's
    /// local label only counts when the constraint names one
    fn compare(&self, candidate: &Version) -> Ordering {
        if self.version.local().is_some() {
            candidate.cmp(&self.version)
        } else {
            candidate.cmp_public(&self.version)
        }
    }

    /// Parse a single operator-and-version token. `offset` is the byte
    /// position of `token` inside the enclosing string, used for errors.
    fn parse(token: &str, offset: usize) -> Result<VersionSpec, ParseError> {
        let leading = token.len() - token.trim_start().len();
        let token = token.trim();
        let offset = offset + leading;
        if token.is_empty() {
            return Err(ParseError::new(ParseErrorKind::EmptyConstraint, "", offset));
        }

        let (op, rest) = split_operator(token)
            .ok_or_else(|| ParseError::new(ParseErrorKind::UnknownOperator, operator_run(token), offset))?;
        let rest_offset = offset + (token.len() - rest.len());
        let rest_trimmed = rest.trim_start();
        let rest_offset = rest_offset + (rest.len() - rest_trimmed.len());
        let rest = rest_trimmed.trim_end();

        if rest.is_empty() {
            return Err(ParseError::new(ParseErrorKind::EmptyConstraint, token, offset));
        }
        if rest.starts_with(['<', '>', '=', '!', '~']) {
            let run = operator_run(token);
            return Err(ParseError::new(ParseErrorKind::UnknownOperator, run, offset));
        }

        let prefix = strip_wildcard(rest);
        let wildcard = prefix.len() != rest.len();
        if let Some(star) = prefix.find('*') {
            return Err(ParseError::new(
                ParseErrorKind::UnsupportedWildcard,
                rest,
                rest_offset + star,
            ));
        }

        if prefix.is_empty() {
            return match op {
                None | Some("=") | Some("==") => Ok(VersionSpec::Any),
                _ => Err(ParseError::new(ParseErrorKind::UnsupportedWildcard, token, offset)),
            };
        }

        let version = Version::parse(prefix).map_err(|e| e.offset(rest_offset))?;

        let operator = match (op, wildcard) {
            (None | Some("=") | Some("=="), true) => Operator::Glob,
            (Some("!="), true) => Operator::NotGlob,
            (Some("~="), true) => {
                return Err(ParseError::new(ParseErrorKind::UnsupportedWildcard, token, offset));
            }
            (Some(ordering), true) => {
                debug!("ignoring trailing wildcard in ordered constraint '{}'", token);
                ordering_operator(ordering)
            }
            (None | Some("="), false) => Operator::StartsWith,
            (Some(other), false) => ordering_operator(other),
        };

        if operator == Operator::Compatible && version.release().len() < 2 {
            return Err(ParseError::new(
                ParseErrorKind::CompatibleReleaseTooShort,
                token,
                offset,
            ));
        }

        Ok(VersionSpec::Constraint(VersionConstraint::new(operator, version)))
    }
}

/// Operators, longest first so `>=` wins over `>`
const OPERATORS: [&str; 8] = ["==", "!=", "<=", ">=", "~=", "<", ">", "="];

/// Split a leading operator off `token`. `Some((None, token))` means no
/// operator; `None` means an unrecognised operator such as `===` or `!`.
fn split_operator(token: &str) -> Option<(Option<&'static str>, &str)> {
    if token.starts_with("===") {
        return None;
    }
    for op in OPERATORS {
        if let Some(rest) = token.strip_prefix(op) {
            return Some((Some(op), rest));
        }
    }
    if token.starts_with(['!', '~']) {
        return None;
    }
    Some((None, token))
}

fn operator_run(token: &str) -> &str {
    let end = token
        .find(|c: char| !matches!(c, '<' | '>' | '=' | '!' | '~'))
        .unwrap_or(token.len());
    &token[..end.max(1).min(token.len())]
}

fn ordering_operator(op: &str) -> Operator {
    match op {
        "==" => Operator::Equal,
        "!=" => Operator::NotEqual,
        "<" => Operator::Less,
        "<=" => Operator::LessEqual,
        ">" => Operator::Greater,
        ">=" => Operator::GreaterEqual,
        "~=" => Operator::Compatible,
        _ => Operator::StartsWith,
    }
}

impl Matcher<Version> for VersionConstraint {
    fn matches(&self, candidate: &Version) -> bool {
        match self.operator {
            Operator::Equal => self.compare(candidate) == Ordering::Equal,
            Operator::NotEqual => self.compare(candidate) != Ordering::Equal,
            Operator::Less => self.compare(candidate) == Ordering::Less,
            Operator::LessEqual => self.compare(candidate) != Ordering::Greater,
            Operator::Greater => self.compare(candidate) == Ordering::Greater,
            Operator::GreaterEqual => self.compare(candidate) != Ordering::Less,
            Operator::Compatible => candidate.is_compatible_with(&self.version),
            Operator::StartsWith | Operator::Glob => candidate.starts_with(&self.version),
            Operator::NotGlob => !candidate.starts_with(&self.version),
        }
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operator {
            Operator::Glob | Operator::NotGlob => {
                write!(f, "{}{}.*", self.operator.as_str(), self.version)
            }
            _ => write!(f, "{}{}", self.operator.as_str(), self.version),
        }
    }
}

/// Boolean expression over version constraints
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpec {
    /// `*`: every version matches
    Any,
    Constraint(VersionConstraint),
    /// Every child must match (`,`)
    And(Vec<VersionSpec>),
    /// At least one child must match (`|`)
    Or(Vec<VersionSpec>),
}

impl VersionSpec {
    /// Parse a version expression such as `>=3.9,<3.10` or `2.7.*|>=3.6`
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        if raw.trim().is_empty() {
            return Err(ParseError::new(ParseErrorKind::EmptyConstraint, raw, 0));
        }

        let mut clauses = Vec::new();
        for (clause_offset, clause) in split_with_offsets(raw, ',') {
            let mut alternatives = Vec::new();
            for (alt_offset, alternative) in split_with_offsets(clause, '|') {
                alternatives.push(VersionConstraint::parse(
                    alternative,
                    clause_offset + alt_offset,
                )?);
            }
            clauses.push(collapse(alternatives, VersionSpec::Or));
        }
        Ok(collapse(clauses, VersionSpec::And))
    }

    /// The single constraint, when the expression is just one
    pub fn as_constraint(&self) -> Option<&VersionConstraint> {
        match self {
            VersionSpec::Constraint(c) => Some(c),
            _ => None,
        }
    }
}

fn collapse(mut children: Vec<VersionSpec>, wrap: fn(Vec<VersionSpec>) -> VersionSpec) -> VersionSpec {
    if children.len() == 1 {
        children.remove(0)
    } else {
        wrap(children)
    }
}

/// Split on `sep`, yielding each piece with its byte offset in `s`
pub(crate) fn split_with_offsets(s: &str, sep: char) -> impl Iterator<Item = (usize, &str)> {
    let mut offset = 0;
    s.split(sep).map(move |piece| {
        let start = offset;
        offset += piece.len() + sep.len_utf8();
        (start, piece)
    })
}

impl Matcher<Version> for VersionSpec {
    fn matches(&self, candidate: &Version) -> bool {
        match self {
            VersionSpec::Any => true,
            VersionSpec::Constraint(c) => c.matches(candidate),
            VersionSpec::And(children) => children.iter().all(|c| c.matches(candidate)),
            VersionSpec::Or(children) => children.iter().any(|c| c.matches(candidate)),
        }
    }
}

impl std::str::FromStr for VersionSpec {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for VersionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpec::Any => f.write_str("*"),
            VersionSpec::Constraint(c) => c.fmt(f),
            VersionSpec::And(children) => write_joined(f, children, ","),
            VersionSpec::Or(children) => write_joined(f, children, "|"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[VersionSpec], sep: &str) -> fmt::Result {
    for (idx, child) in children.iter().enumerate() {
        if idx > 0 {
            f.write_str(sep)?;
        }
        child.fmt(f)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matches(spec: &str, version: &str) -> bool {
        let spec = VersionSpec::parse(spec).unwrap();
        spec.matches(&Version::parse(version).unwrap())
    }

    #[rstest]
    #[case(">=2.28.0", "2.32.0", true)]
    #[case(">=2.28.0", "2.27.0", false)]
    #[case("<=2.0.0", "2.0", true)]
    #[case("<=2.0.0", "2.0.1", false)]
    #[case(">1.0.0", "1.0.0", false)]
    #[case(">1.0.0", "1.0.1", true)]
    #[case("<2.0.0", "1.9.0", true)]
    #[case("<2.0.0", "2.0.0", false)]
    #[case("==2.0.0", "2.0", true)]
    #[case("==2.0.0", "2.0.1", false)]
    #[case("==2.0.0", "2.0.0+build.1", true)]
    #[case("==2.0.0+build.1", "2.0.0", false)]
    #[case("!=2.0.0", "2.0.1", true)]
    #[case("!=2.0.0", "2.0.0", false)]
    #[case("<=2.0", "2.0+local", true)]
    fn ordering_operators(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(matches(spec, version), expected);
    }

    #[rstest]
    #[case("3.9", "3.9.1", true)]
    #[case("3.9.2", "3.9.1", false)]
    #[case("=3.9", "3.9.7", true)]
    #[case("3.1", "3.10", false)]
    #[case("1.1.*", "1.1.5", true)]
    #[case("1.1.*", "1.10", false)]
    #[case("==2.9.*", "2.9.3", true)]
    #[case("=2.9.*", "2.10.0", false)]
    #[case("!=1.1.*", "1.2", true)]
    #[case("!=1.1.*", "1.1.2", false)]
    #[case(">=1.8.*", "1.8.0", true)]
    #[case("*", "0.0.1", true)]
    fn fuzzy_and_glob(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(matches(spec, version), expected);
    }

    #[rstest]
    #[case("~=1.4.2", "1.4.5", true)]
    #[case("~=1.4.2", "1.5.0", false)]
    #[case("~=1.4", "1.9.0", true)]
    #[case("~=1.4", "2.0.0", false)]
    #[case("~=1.4", "1.3.9", false)]
    fn compatible_release(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(matches(spec, version), expected);
    }

    #[rstest]
    #[case(">=3.9,<3.10", "3.9.1", true)]
    #[case(">=3.9,<3.10", "3.10.0", false)]
    #[case(">=4.0|<3.0", "3.9.1", false)]
    #[case(">=4.0|<3.0", "2.7", true)]
    #[case(">=1,<2|>3", "3.5", true)]
    #[case(">=1,<2|>3", "1.5", true)]
    #[case(">=2,<3|<1", "0.5", false)]
    #[case(">=2,<3|<1", "2.5", true)]
    #[case(">=1.0, !=1.5.0", "1.5.0", false)]
    #[case("2.7.*|>=3.6,!=3.7.*", "3.7.2", false)]
    #[case("2.7.*|>=3.6,!=3.7.*", "2.7.18", true)]
    fn and_or_expressions(#[case] spec: &str, #[case] version: &str, #[case] expected: bool) {
        assert_eq!(matches(spec, version), expected);
    }

    #[test]
    fn comma_binds_looser_than_pipe() {
        let spec = VersionSpec::parse(">=1,<2|>3").unwrap();
        let VersionSpec::And(children) = &spec else {
            panic!("expected AND at the root, got {:?}", spec);
        };
        assert_eq!(children.len(), 2);
        assert!(matches!(children[1], VersionSpec::Or(_)));
    }

    #[test]
    fn single_constraint_is_not_wrapped() {
        let spec = VersionSpec::parse(">=3.9").unwrap();
        assert_eq!(
            spec.as_constraint(),
            Some(&VersionConstraint::new(
                Operator::GreaterEqual,
                Version::parse("3.9").unwrap()
            ))
        );
    }

    #[rstest]
    #[case("~=1", ParseErrorKind::CompatibleReleaseTooShort, 0)]
    #[case(">=", ParseErrorKind::EmptyConstraint, 0)]
    #[case(">=1.0,", ParseErrorKind::EmptyConstraint, 6)]
    #[case("=>1.0", ParseErrorKind::UnknownOperator, 0)]
    #[case("===1.0", ParseErrorKind::UnknownOperator, 0)]
    #[case("!1.0", ParseErrorKind::UnknownOperator, 0)]
    #[case("1.*.3", ParseErrorKind::UnsupportedWildcard, 2)]
    #[case("~=1.4.*", ParseErrorKind::UnsupportedWildcard, 0)]
    #[case(">=1.0,<wrong", ParseErrorKind::InvalidVersion, 7)]
    #[case(">=1.0|<2..0", ParseErrorKind::EmptySegment, 8)]
    fn rejects_malformed_expressions(
        #[case] raw: &str,
        #[case] kind: ParseErrorKind,
        #[case] position: usize,
    ) {
        let err = VersionSpec::parse(raw).unwrap_err();
        assert_eq!(err.kind, kind, "{}", raw);
        assert_eq!(err.position, position, "{}", raw);
    }

    #[rstest]
    #[case(">=3.9,<3.10")]
    #[case("2.7.*|>=3.6")]
    #[case(">=1,<2|>3")]
    #[case("=3.9")]
    #[case("!=1.1.*")]
    #[case("~=1.4.2")]
    #[case("*")]
    fn display_reparses_to_same_expression(#[case] raw: &str) {
        let spec = VersionSpec::parse(raw).unwrap();
        assert_eq!(VersionSpec::parse(&spec.to_string()).unwrap(), spec);
    }
}
