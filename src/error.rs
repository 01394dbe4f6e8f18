//! Error types for specifier parsing and candidate construction

use thiserror::Error;

/// What went wrong while parsing a version or a specifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseErrorKind {
    #[error("empty input")]
    Empty,

    #[error("empty package name")]
    EmptyName,

    #[error("invalid character")]
    InvalidCharacter,

    #[error("empty version segment")]
    EmptySegment,

    #[error("invalid version")]
    InvalidVersion,

    #[error("unknown operator")]
    UnknownOperator,

    #[error("empty version constraint")]
    EmptyConstraint,

    #[error("compatible release requires at least two release segments")]
    CompatibleReleaseTooShort,

    #[error("unsupported wildcard position")]
    UnsupportedWildcard,

    #[error("unbalanced brackets")]
    UnbalancedBrackets,

    #[error("unbalanced quotes")]
    UnbalancedQuotes,

    #[error("malformed key-value pair")]
    MalformedKeyValue,

    #[error("unknown bracket key")]
    UnknownKey,

    #[error("invalid build number")]
    InvalidBuildNumber,

    #[error("invalid build pattern")]
    InvalidPattern,

    #[error("unexpected trailing input")]
    TrailingInput,

    #[error("invalid channel prefix")]
    InvalidChannel,
}

/// Error raised when a version string or specifier cannot be parsed
///
/// `position` is a byte offset into the string handed to the failing
/// `parse` call and `fragment` is the offending piece of that string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} at position {position}: '{fragment}'")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub fragment: String,
    pub position: usize,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, fragment: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            fragment: fragment.into(),
            position,
        }
    }

    /// Re-base the error onto an enclosing string in which the parsed
    /// fragment started at byte `offset`
    pub fn offset(mut self, offset: usize) -> Self {
        self.position += offset;
        self
    }
}

/// Error raised when a key-value record cannot be turned into a candidate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CandidateError {
    /// A required key is absent
    #[error("missing required key '{0}'")]
    MissingKey(&'static str),

    /// A key is present but its value has the wrong shape
    #[error("invalid value for '{key}': {reason}")]
    InvalidField { key: String, reason: String },

    /// The record is not a key-value mapping at all
    #[error("record is not a mapping")]
    NotAMapping,
}
