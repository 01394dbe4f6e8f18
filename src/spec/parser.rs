//! Specifier grammar
//!
//! ```text
//! [channel[/subdir]:[namespace]:]name[version[ build]][\[key=value, ...\]]
//! ```
//!
//! Examples:
//! - `python>=3.9.1`
//! - `tensorflow 2.9.1 mkl_py39hb9fcb14_0`
//! - `conda-forge/linux-64::numpy >=1.20,<2[build=py39*]`
//! - `openssl[version='>=1.1.1g,<3', build_number='>=2']`
//!
//! Whitespace next to operators, `,` and `|` is ignored, so
//! `python >= 3.9, < 3.10` equals `python>=3.9,<3.10`. Values given in the
//! bracket section take precedence over the positional ones.

use tracing::debug;

use crate::error::{ParseError, ParseErrorKind};
use crate::spec::constraint::{VersionSpec, split_with_offsets};
use crate::spec::pattern::{BuildNumberSpec, StringMatcher};
use crate::spec::MatchSpec;

/// Platform subdirectories recognised at the end of a channel prefix
pub const KNOWN_SUBDIRS: &[&str] = &[
    "noarch",
    "linux-32",
    "linux-64",
    "linux-aarch64",
    "linux-armv6l",
    "linux-armv7l",
    "linux-ppc64",
    "linux-ppc64le",
    "linux-riscv64",
    "linux-s390x",
    "osx-64",
    "osx-arm64",
    "win-32",
    "win-64",
    "win-arm64",
    "emscripten-wasm32",
    "wasi-wasm32",
    "zos-z",
];

fn is_version_operator(c: char) -> bool {
    matches!(c, ',' | '|' | '<' | '>' | '=' | '!' | '~')
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '*')
}

pub(crate) fn parse_match_spec(raw: &str) -> Result<MatchSpec, ParseError> {
    if raw.trim().is_empty() {
        return Err(ParseError::new(ParseErrorKind::Empty, raw, 0));
    }

    let (head_end, brackets) = split_brackets(raw)?;
    let head = &raw[..head_end];

    let prefix = parse_prefix(head)?;
    let body = &head[prefix.name_start..];
    let name_offset = prefix.name_start + (body.len() - body.trim_start().len());
    let body = body.trim_start();

    let name_len = body
        .find(|c: char| c.is_whitespace() || is_version_operator(c))
        .unwrap_or(body.len());
    let name = &body[..name_len];
    if name.is_empty() {
        let fragment = body.split_whitespace().next().unwrap_or(body);
        return Err(ParseError::new(ParseErrorKind::EmptyName, fragment, name_offset));
    }
    if let Some((idx, c)) = name.char_indices().find(|(_, c)| !is_name_char(*c)) {
        return Err(ParseError::new(
            ParseErrorKind::InvalidCharacter,
            c.to_string(),
            name_offset + idx,
        ));
    }

    let mut spec = MatchSpec::new(StringMatcher::parse(name).map_err(|e| e.offset(name_offset))?);
    spec.channel = prefix.channel;
    spec.subdir = prefix.subdir;
    spec.namespace = prefix.namespace;

    let rest = Normalized::new(&body[name_len..], name_offset + name_len);
    if !rest.text.is_empty() {
        let pieces: Vec<(usize, &str)> = split_with_offsets(&rest.text, ' ').collect();
        if let Some((idx, extra)) = pieces.get(2) {
            return Err(ParseError::new(
                ParseErrorKind::TrailingInput,
                *extra,
                rest.original(*idx),
            ));
        }
        let (version_idx, version) = pieces[0];
        spec.version = Some(
            VersionSpec::parse(version).map_err(|e| rest.rebase(e, version_idx))?,
        );
        if let Some((build_idx, build)) = pieces.get(1) {
            spec.build = Some(StringMatcher::parse(build).map_err(|e| rest.rebase(e, *build_idx))?);
        }
    }

    if let Some((offset, content)) = brackets {
        apply_brackets(&mut spec, content, offset)?;
    }

    debug!("parsed match spec '{}'", raw);
    Ok(spec)
}

/// Locate the bracket section. Returns where the head ends and, when
/// present, the bracket content with its byte offset.
fn split_brackets(raw: &str) -> Result<(usize, Option<(usize, &str)>), ParseError> {
    let first_close = raw.find(']');
    let Some(open) = raw.find('[') else {
        return match first_close {
            Some(close) => Err(ParseError::new(ParseErrorKind::UnbalancedBrackets, "]", close)),
            None => Ok((raw.len(), None)),
        };
    };
    if let Some(close) = first_close.filter(|close| *close < open) {
        return Err(ParseError::new(ParseErrorKind::UnbalancedBrackets, "]", close));
    }

    let mut quote: Option<char> = None;
    let mut close = None;
    for (idx, c) in raw[open + 1..].char_indices() {
        let idx = open + 1 + idx;
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '[') => {
                return Err(ParseError::new(ParseErrorKind::UnbalancedBrackets, "[", idx));
            }
            (None, ']') => {
                close = Some(idx);
                break;
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err(ParseError::new(ParseErrorKind::UnbalancedQuotes, &raw[open..], open));
    }
    let Some(close) = close else {
        return Err(ParseError::new(ParseErrorKind::UnbalancedBrackets, &raw[open..], open));
    };

    let trailing = &raw[close + 1..];
    if !trailing.trim().is_empty() {
        let leading = trailing.len() - trailing.trim_start().len();
        return Err(ParseError::new(
            ParseErrorKind::TrailingInput,
            trailing.trim(),
            close + 1 + leading,
        ));
    }

    Ok((open, Some((open + 1, &raw[open + 1..close]))))
}

struct Prefix {
    channel: Option<String>,
    subdir: Option<String>,
    namespace: Option<String>,
    name_start: usize,
}

/// Parse `channel[/subdir]::` or `channel[/subdir]:namespace:`
fn parse_prefix(head: &str) -> Result<Prefix, ParseError> {
    let search_end = head
        .find(|c: char| c.is_whitespace() || is_version_operator(c))
        .unwrap_or(head.len());
    let Some(colon) = head[..search_end].rfind(':') else {
        return Ok(Prefix {
            channel: None,
            subdir: None,
            namespace: None,
            name_start: 0,
        });
    };

    let invalid = || ParseError::new(ParseErrorKind::InvalidChannel, &head[..=colon], 0);
    let before = &head[..colon];
    let (channel_part, namespace) = match before.strip_suffix(':') {
        Some(channel) => (channel, None),
        None => {
            let (channel, namespace) = before.rsplit_once(':').ok_or_else(invalid)?;
            let valid = namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
            if !valid {
                return Err(invalid());
            }
            (channel, Some(namespace).filter(|ns| !ns.is_empty()))
        }
    };

    let (channel, subdir) = match channel_part.rsplit_once('/') {
        Some((channel, subdir)) if KNOWN_SUBDIRS.contains(&subdir) => (channel, Some(subdir)),
        _ => (channel_part, None),
    };
    if channel.is_empty() {
        return Err(invalid());
    }

    Ok(Prefix {
        channel: Some(channel.to_string()),
        subdir: subdir.map(str::to_string),
        namespace: namespace.map(str::to_string),
        name_start: colon + 1,
    })
}

/// The version/build tail with insignificant whitespace removed, keeping a
/// byte map back to the original specifier for error positions
struct Normalized {
    text: String,
    positions: Vec<usize>,
}

impl Normalized {
    fn new(s: &str, base: usize) -> Self {
        let chars: Vec<(usize, char)> = s.char_indices().collect();
        let mut text = String::with_capacity(s.len());
        let mut positions = Vec::with_capacity(s.len());

        let mut i = 0;
        while i < chars.len() {
            let (idx, c) = chars[i];
            if !c.is_whitespace() {
                text.push(c);
                positions.extend(std::iter::repeat_n(base + idx, c.len_utf8()));
                i += 1;
                continue;
            }

            let mut j = i;
            while j < chars.len() && chars[j].1.is_whitespace() {
                j += 1;
            }
            let prev = text.chars().last();
            let next = chars.get(j).map(|(_, c)| *c);
            let significant = matches!((prev, next), (Some(p), Some(n)) if !is_version_operator(p) && !is_version_operator(n));
            if significant {
                text.push(' ');
                positions.push(base + idx);
            }
            i = j;
        }

        Self { text, positions }
    }

    fn original(&self, idx: usize) -> usize {
        self.positions
            .get(idx)
            .copied()
            .or_else(|| self.positions.last().map(|p| p + 1))
            .unwrap_or(0)
    }

    /// Move an error raised on a piece starting at `piece_idx` back onto the
    /// original specifier
    fn rebase(&self, mut err: ParseError, piece_idx: usize) -> ParseError {
        err.position = self.original(piece_idx + err.position);
        err
    }
}

/// Split bracket content on commas that are not inside quotes
fn split_pairs(content: &str) -> Vec<(usize, &str)> {
    let mut pairs = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (idx, c) in content.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, ',') => {
                pairs.push((start, &content[start..idx]));
                start = idx + 1;
            }
            _ => {}
        }
    }
    pairs.push((start, &content[start..]));
    pairs
}

fn apply_brackets(spec: &mut MatchSpec, content: &str, offset: usize) -> Result<(), ParseError> {
    if content.trim().is_empty() {
        return Ok(());
    }

    for (pair_idx, pair) in split_pairs(content) {
        let pair_offset = offset + pair_idx;
        let (key, value, value_offset) = parse_pair(pair, pair_offset)?;
        let at = |e: ParseError| e.offset(value_offset);

        match key {
            "version" => {
                if spec.version.is_some() {
                    debug!("bracket version overrides positional version");
                }
                spec.version = Some(VersionSpec::parse(value).map_err(at)?);
            }
            "build" | "build_string" => {
                spec.build = Some(StringMatcher::parse(value).map_err(at)?);
            }
            "build_number" => {
                spec.build_number = Some(BuildNumberSpec::parse(value).map_err(at)?);
            }
            "channel" => spec.channel = Some(value.to_string()),
            "subdir" => spec.subdir = Some(value.to_string()),
            "namespace" => spec.namespace = Some(value.to_string()),
            "md5" => spec.md5 = Some(value.to_string()),
            "sha256" => spec.sha256 = Some(value.to_string()),
            "license" => spec.license = Some(value.to_string()),
            _ => {
                let key_offset = pair_offset + (pair.len() - pair.trim_start().len());
                return Err(ParseError::new(ParseErrorKind::UnknownKey, key, key_offset));
            }
        }
    }
    Ok(())
}

/// Split `key=value`, unquoting the value. Returns the value's offset.
fn parse_pair(pair: &str, offset: usize) -> Result<(&str, &str, usize), ParseError> {
    let leading = pair.len() - pair.trim_start().len();
    let malformed = || ParseError::new(ParseErrorKind::MalformedKeyValue, pair.trim(), offset + leading);

    let eq = pair.find('=').ok_or_else(malformed)?;
    let key = pair[..eq].trim();
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(malformed());
    }

    let raw_value = &pair[eq + 1..];
    let mut value_offset = offset + eq + 1 + (raw_value.len() - raw_value.trim_start().len());
    let mut value = raw_value.trim();

    if let Some(quote) = value.chars().next().filter(|c| matches!(c, '\'' | '"')) {
        if value.len() < 2 || !value.ends_with(quote) {
            return Err(ParseError::new(ParseErrorKind::UnbalancedQuotes, value, value_offset));
        }
        value = &value[1..value.len() - 1];
        value_offset += 1;
    }

    if value.trim().is_empty() {
        return Err(malformed());
    }
    Ok((key, value, value_offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::constraint::{Operator, VersionConstraint};
    use crate::spec::pattern::BuildNumberOperator;
    use crate::version::Version;
    use rstest::rstest;

    fn constraint(op: Operator, version: &str) -> Option<VersionSpec> {
        Some(VersionSpec::Constraint(VersionConstraint::new(
            op,
            Version::parse(version).unwrap(),
        )))
    }

    #[test]
    fn package_only() {
        let spec = parse_match_spec("tensorflow").unwrap();

        assert_eq!(spec.name.as_str(), "tensorflow");
        assert_eq!(spec.version, None);
        assert_eq!(spec.build, None);
        assert_eq!(spec.channel, None);
        assert_eq!(spec.subdir, None);
    }

    #[rstest]
    #[case("tensorflow>=2.9.1", Operator::GreaterEqual, "2.9.1")]
    #[case("tensorflow >=2.9.1", Operator::GreaterEqual, "2.9.1")]
    #[case("tensorflow >= 2.9.1", Operator::GreaterEqual, "2.9.1")]
    #[case("openssl>1.1.1a", Operator::Greater, "1.1.1a")]
    #[case("vs2017_win-64==19.16.27032.1", Operator::Equal, "19.16.27032.1")]
    #[case("python 3.9", Operator::StartsWith, "3.9")]
    #[case("python=3.9", Operator::StartsWith, "3.9")]
    #[case("python 2.7.*", Operator::Glob, "2.7")]
    #[case("pip~=21.0", Operator::Compatible, "21.0")]
    fn name_and_single_constraint(#[case] raw: &str, #[case] op: Operator, #[case] version: &str) {
        let spec = parse_match_spec(raw).unwrap();
        assert_eq!(spec.version, constraint(op, version), "{}", raw);
    }

    #[test]
    fn explicit_and_implicit_forms_are_equal() {
        let explicit = parse_match_spec("tensorflow=2.9.1[build=\"mkl_py39hb9fcb14_0\"]").unwrap();
        let implicit = parse_match_spec("tensorflow 2.9.1 mkl_py39hb9fcb14_0").unwrap();

        assert_eq!(explicit, implicit);
        assert_eq!(
            implicit.build,
            Some(StringMatcher::Exact("mkl_py39hb9fcb14_0".to_string()))
        );
    }

    #[test]
    fn whitespace_around_operators_is_ignored() {
        assert_eq!(
            parse_match_spec("python >= 3.9 , < 3.10").unwrap(),
            parse_match_spec("python>=3.9,<3.10").unwrap()
        );
    }

    #[rstest]
    #[case("conda-forge::tensorflow >=2.9.1", Some("conda-forge"), None, None)]
    #[case("main/linux-64::pytorch>1.10.2", Some("main"), Some("linux-64"), None)]
    #[case("conda-forge/linux-64:UNUSED:tensorflow", Some("conda-forge"), Some("linux-64"), Some("UNUSED"))]
    #[case("https://conda.anaconda.org/conda-forge::numpy", Some("https://conda.anaconda.org/conda-forge"), None, None)]
    #[case("pkgs/main::zlib", Some("pkgs/main"), None, None)]
    fn channel_prefix(
        #[case] raw: &str,
        #[case] channel: Option<&str>,
        #[case] subdir: Option<&str>,
        #[case] namespace: Option<&str>,
    ) {
        let spec = parse_match_spec(raw).unwrap();
        assert_eq!(spec.channel.as_deref(), channel);
        assert_eq!(spec.subdir.as_deref(), subdir);
        assert_eq!(spec.namespace.as_deref(), namespace);
    }

    #[test]
    fn bracket_qualifiers() {
        let spec = parse_match_spec(
            "numpy[version='>=1.20,<2', build=py39*, build_number='>=3', subdir=linux-64, channel=\"conda-forge\", md5=abc, license=BSD-3-Clause]",
        )
        .unwrap();

        assert_eq!(spec.version, Some(VersionSpec::parse(">=1.20,<2").unwrap()));
        assert_eq!(spec.build.as_ref().map(|b| b.as_str()), Some("py39*"));
        assert_eq!(
            spec.build_number,
            Some(BuildNumberSpec {
                operator: BuildNumberOperator::GreaterEqual,
                value: 3
            })
        );
        assert_eq!(spec.subdir.as_deref(), Some("linux-64"));
        assert_eq!(spec.channel.as_deref(), Some("conda-forge"));
        assert_eq!(spec.md5.as_deref(), Some("abc"));
        assert_eq!(spec.license.as_deref(), Some("BSD-3-Clause"));
    }

    #[test]
    fn bracket_version_overrides_positional() {
        let spec = parse_match_spec("python>=3.8[version='>=3.9']").unwrap();
        assert_eq!(spec.version, constraint(Operator::GreaterEqual, "3.9"));
    }

    #[test]
    fn empty_brackets_are_allowed() {
        assert_eq!(
            parse_match_spec("python[]").unwrap(),
            parse_match_spec("python").unwrap()
        );
    }

    #[test]
    fn name_globs() {
        assert!(parse_match_spec("*").unwrap().name.is_wildcard());
        assert_eq!(parse_match_spec("tensor*-gpu >=2").unwrap().name.as_str(), "tensor*-gpu");
    }

    #[rstest]
    #[case("", ParseErrorKind::Empty, 0)]
    #[case(">=3.9", ParseErrorKind::EmptyName, 0)]
    #[case("python[build=py39", ParseErrorKind::UnbalancedBrackets, 6)]
    #[case("python]", ParseErrorKind::UnbalancedBrackets, 6)]
    #[case("python[build=[x]]", ParseErrorKind::UnbalancedBrackets, 13)]
    #[case("python[build='py39]", ParseErrorKind::UnbalancedQuotes, 6)]
    #[case("python[license=GPL] extra", ParseErrorKind::TrailingInput, 20)]
    #[case("python[foo=bar]", ParseErrorKind::UnknownKey, 7)]
    #[case("python[subdir]", ParseErrorKind::MalformedKeyValue, 7)]
    #[case("python[subdir=linux-64,]", ParseErrorKind::MalformedKeyValue, 23)]
    #[case("python===3.9", ParseErrorKind::UnknownOperator, 6)]
    #[case("python=>3.9", ParseErrorKind::UnknownOperator, 6)]
    #[case("python=wrong", ParseErrorKind::InvalidVersion, 7)]
    #[case("python >=3.9, <3..10", ParseErrorKind::EmptySegment, 16)]
    #[case("python 3.9 py39_0 extra", ParseErrorKind::TrailingInput, 18)]
    #[case("python[version='~=3']", ParseErrorKind::CompatibleReleaseTooShort, 16)]
    #[case("python[build_number=abc]", ParseErrorKind::InvalidBuildNumber, 20)]
    #[case("conda-forge:python", ParseErrorKind::InvalidChannel, 0)]
    #[case("::python", ParseErrorKind::InvalidChannel, 0)]
    #[case("pyth@n", ParseErrorKind::InvalidCharacter, 4)]
    fn rejects_malformed_specifiers(
        #[case] raw: &str,
        #[case] kind: ParseErrorKind,
        #[case] position: usize,
    ) {
        let err = parse_match_spec(raw).unwrap_err();
        assert_eq!(err.kind, kind, "{}: {}", raw, err);
        assert_eq!(err.position, position, "{}: {}", raw, err);
    }

    #[rstest]
    #[case("python")]
    #[case("python>=3.9,<3.10")]
    #[case("conda-forge::python 3.9.* *_cpython")]
    #[case("main/linux-64::pytorch>1.10.2")]
    #[case("chan:ns:pkg")]
    #[case("numpy[version='>=1.20,<2', build='^py3[89].*$', build_number='>=3', md5=abc]")]
    #[case("python *")]
    #[case("python[channel=conda-forge/linux-64]")]
    #[case("python[channel='main/osx-arm64', subdir=osx-arm64, namespace=ns]")]
    #[case("main/linux-64::python[channel=conda-forge/noarch]")]
    fn display_round_trips(#[case] raw: &str) {
        let spec = parse_match_spec(raw).unwrap();
        let reparsed = parse_match_spec(&spec.to_string()).unwrap();
        assert_eq!(reparsed, spec, "{} -> {}", raw, spec);
    }

    #[test]
    fn channel_ending_in_a_subdir_stays_in_brackets() {
        let spec = parse_match_spec("python[channel=conda-forge/linux-64]").unwrap();
        assert_eq!(spec.channel.as_deref(), Some("conda-forge/linux-64"));
        assert_eq!(spec.subdir, None);
        assert_eq!(spec.to_string(), "python[channel='conda-forge/linux-64']");
    }
}
