//! String and build-number matchers used by specifier fields

use std::fmt;

use regex::Regex;

use crate::error::{ParseError, ParseErrorKind};
use crate::matcher::Matcher;

/// Matcher for package names and build strings
///
/// - `py39h*_0` - shell-style glob, `*` matches any run of characters
/// - `^py3[89].*$` - regular expression when wrapped in `^...$`
/// - `*` - anything
/// - anything else - exact comparison
#[derive(Debug, Clone)]
pub enum StringMatcher {
    Any,
    Exact(String),
    Glob { pattern: String, regex: Regex },
    Regex(Regex),
}

impl StringMatcher {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        if raw == "*" {
            return Ok(StringMatcher::Any);
        }

        if raw.len() >= 2 && raw.starts_with('^') && raw.ends_with('$') {
            return Regex::new(raw)
                .map(StringMatcher::Regex)
                .map_err(|_| ParseError::new(ParseErrorKind::InvalidPattern, raw, 0));
        }

        if raw.contains('*') {
            let body: Vec<String> = raw.split('*').map(regex::escape).collect();
            let regex = Regex::new(&format!("^{}$", body.join(".*")))
                .map_err(|_| ParseError::new(ParseErrorKind::InvalidPattern, raw, 0))?;
            return Ok(StringMatcher::Glob {
                pattern: raw.to_string(),
                regex,
            });
        }

        Ok(StringMatcher::Exact(raw.to_string()))
    }

    /// The text the matcher was built from
    pub fn as_str(&self) -> &str {
        match self {
            StringMatcher::Any => "*",
            StringMatcher::Exact(s) => s,
            StringMatcher::Glob { pattern, .. } => pattern,
            StringMatcher::Regex(regex) => regex.as_str(),
        }
    }

    /// True for the catch-all `*`
    pub fn is_wildcard(&self) -> bool {
        matches!(self, StringMatcher::Any)
    }
}

impl Matcher<str> for StringMatcher {
    fn matches(&self, other: &str) -> bool {
        match self {
            StringMatcher::Any => true,
            StringMatcher::Exact(s) => s == other,
            StringMatcher::Glob { regex, .. } | StringMatcher::Regex(regex) => regex.is_match(other),
        }
    }
}

impl PartialEq for StringMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Eq for StringMatcher {}

impl fmt::Display for StringMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison used by a [`BuildNumberSpec`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildNumberOperator {
    Equal,
    NotEqual,
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
}

/// Constraint on a candidate's build number, e.g. `3` or `>=2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BuildNumberSpec {
    pub operator: BuildNumberOperator,
    pub value: u64,
}

impl BuildNumberSpec {
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let trimmed = raw.trim();
        let (operator, rest) = [
            (">=", BuildNumberOperator::GreaterEqual),
            ("<=", BuildNumberOperator::LessEqual),
            ("==", BuildNumberOperator::Equal),
            ("!=", BuildNumberOperator::NotEqual),
            (">", BuildNumberOperator::Greater),
            ("<", BuildNumberOperator::Less),
            ("=", BuildNumberOperator::Equal),
        ]
        .into_iter()
        .find_map(|(prefix, op)| trimmed.strip_prefix(prefix).map(|rest| (op, rest)))
        .unwrap_or((BuildNumberOperator::Equal, trimmed));

        let value = rest
            .trim()
            .parse::<u64>()
            .map_err(|_| ParseError::new(ParseErrorKind::InvalidBuildNumber, raw, 0))?;

        Ok(Self { operator, value })
    }
}

impl Matcher<u64> for BuildNumberSpec {
    fn matches(&self, build_number: &u64) -> bool {
        let n = *build_number;
        match self.operator {
            BuildNumberOperator::Equal => n == self.value,
            BuildNumberOperator::NotEqual => n != self.value,
            BuildNumberOperator::Less => n < self.value,
            BuildNumberOperator::LessEqual => n <= self.value,
            BuildNumberOperator::Greater => n > self.value,
            BuildNumberOperator::GreaterEqual => n >= self.value,
        }
    }
}

impl fmt::Display for BuildNumberSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let op = match self.operator {
            BuildNumberOperator::Equal => "",
            BuildNumberOperator::NotEqual => "!=",
            BuildNumberOperator::Less => "<",
            BuildNumberOperator::LessEqual => "<=",
            BuildNumberOperator::Greater => ">",
            BuildNumberOperator::GreaterEqual => ">=",
        };
        write!(f, "{}{}", op, self.value)
    }
}
