//! Version string tokenizer
//!
//! Accepted shape (case-insensitive):
//!
//! ```text
//! [v][N!]N(.N)*[letter[N]][{sep}(a|b|rc|…)[{sep}]N][{sep}post[{sep}]N][{sep}dev[{sep}]N][{sep}other…][+local]
//! ```
//!
//! `.` and `_` separate release segments, `.`, `-` and `_` separate the
//! modifiers, and a bare `-N` after the release is an implicit post-release.
//! A single letter glued to the release with no number (`1.1.1c`) is a
//! release letter, not a pre-release tag. Alphanumeric runs that fit no tag
//! are kept as ordered suffix segments.

use crate::error::{ParseError, ParseErrorKind};
use crate::version::{PreRelease, PreReleaseKind, Segment, Version};

pub(crate) fn parse_version(raw: &str) -> Result<Version, ParseError> {
    let leading = raw.len() - raw.trim_start().len();
    let input = raw.trim();
    if input.is_empty() {
        return Err(ParseError::new(ParseErrorKind::Empty, raw, 0));
    }

    if let Some((pos, c)) = input
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+' | '!')))
    {
        return Err(ParseError::new(
            ParseErrorKind::InvalidCharacter,
            c.to_string(),
            leading + pos,
        ));
    }

    let lower = input.to_ascii_lowercase();
    Scanner::new(&lower, leading)
        .version()
        .map_err(|e| restore_fragment(e, input, leading))
}

/// Errors are raised against the lowercased copy; point them back at the
/// caller's original spelling
fn restore_fragment(mut err: ParseError, input: &str, leading: usize) -> ParseError {
    let start = err.position - leading;
    if let Some(original) = input.get(start..start + err.fragment.len()) {
        err.fragment = original.to_string();
    }
    err
}

fn is_separator(b: u8) -> bool {
    matches!(b, b'.' | b'-' | b'_')
}

enum Tag {
    Pre(PreReleaseKind),
    Post,
    Dev,
}

impl Tag {
    fn from_word(word: &str) -> Option<Self> {
        match word {
            "a" | "alpha" => Some(Tag::Pre(PreReleaseKind::Alpha)),
            "b" | "beta" => Some(Tag::Pre(PreReleaseKind::Beta)),
            "c" | "rc" | "pre" | "preview" => Some(Tag::Pre(PreReleaseKind::ReleaseCandidate)),
            "post" | "rev" | "r" => Some(Tag::Post),
            "dev" => Some(Tag::Dev),
            _ => None,
        }
    }
}

struct Scanner<'a> {
    src: &'a str,
    bytes: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str, base: usize) -> Self {
        Self {
            src,
            bytes: src.as_bytes(),
            pos: 0,
            base,
        }
    }

    fn error(&self, kind: ParseErrorKind, start: usize, end: usize) -> ParseError {
        let end = end.max(start + 1).min(self.src.len());
        let start = start.min(end);
        ParseError::new(kind, &self.src[start..end], self.base + start)
    }

    fn peek_at(&self, idx: usize, end: usize) -> Option<u8> {
        if idx < end { self.bytes.get(idx).copied() } else { None }
    }

    fn take_while(&mut self, end: usize, pred: impl Fn(u8) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek_at(self.pos, end).is_some_and(&pred) {
            self.pos += 1;
        }
        &self.src[start..self.pos]
    }

    fn number(&mut self, end: usize) -> Result<Option<u64>, ParseError> {
        let start = self.pos;
        let digits = self.take_while(end, |b| b.is_ascii_digit());
        if digits.is_empty() {
            return Ok(None);
        }
        digits
            .parse::<u64>()
            .map(Some)
            .map_err(|_| self.error(ParseErrorKind::InvalidVersion, start, self.pos))
    }

    fn version(mut self) -> Result<Version, ParseError> {
        if self.bytes.first() == Some(&b'v') && self.bytes.get(1).is_some_and(u8::is_ascii_digit) {
            self.pos = 1;
        }

        let epoch = match self.src.find('!') {
            Some(bang) => {
                let start = self.pos;
                let digits = &self.src[start..bang];
                if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(self.error(ParseErrorKind::InvalidVersion, start, bang + 1));
                }
                self.pos = bang + 1;
                digits
                    .parse::<u64>()
                    .map_err(|_| self.error(ParseErrorKind::InvalidVersion, start, bang))?
            }
            None => 0,
        };

        let (end, local) = match self.src.find('+') {
            Some(plus) => (plus, Some(self.local(plus + 1)?)),
            None => (self.src.len(), None),
        };

        let release = self.release(end)?;
        let mut version = Version {
            epoch,
            release,
            letter: None,
            letter_number: None,
            pre: None,
            post: None,
            dev: None,
            suffix: Vec::new(),
            local,
        };
        self.modifiers(&mut version, end)?;
        Ok(version)
    }

    fn release(&mut self, end: usize) -> Result<Vec<u64>, ParseError> {
        let mut release = Vec::new();
        loop {
            let start = self.pos;
            let Some(segment) = self.number(end)? else {
                let kind = if self.peek_at(start, end).is_some_and(is_separator) {
                    ParseErrorKind::EmptySegment
                } else {
                    ParseErrorKind::InvalidVersion
                };
                return Err(self.error(kind, start, end));
            };
            release.push(segment);

            match self.peek_at(self.pos, end) {
                Some(b'.' | b'_') if self.peek_at(self.pos + 1, end).is_some_and(|b| b.is_ascii_digit()) => {
                    self.pos += 1;
                }
                _ => return Ok(release),
            }
        }
    }

    fn modifiers(&mut self, version: &mut Version, end: usize) -> Result<(), ParseError> {
        let mut first = true;
        while self.pos < end {
            let start = self.pos;
            let sep = self.peek_at(self.pos, end).filter(|b| is_separator(*b));
            if sep.is_some() {
                self.pos += 1;
                if self.peek_at(self.pos, end).is_none_or(is_separator) {
                    return Err(self.error(ParseErrorKind::EmptySegment, start, self.pos + 1));
                }
            }

            let word_start = self.pos;
            let word = self.take_while(end, |b| b.is_ascii_alphabetic());
            let mut number = self.number(end)?;
            if word.is_empty() && number.is_none() {
                return Err(self.error(ParseErrorKind::InvalidVersion, word_start, word_start + 1));
            }

            let bare_letter = first && sep.is_none() && number.is_none() && word.len() == 1;
            let tag = if bare_letter { None } else { Tag::from_word(word) };
            if tag.is_some() && number.is_none() {
                // `1.0rc.1`, `1.0-beta.1`
                number = self.separated_number(end)?;
            }

            match tag {
                Some(Tag::Pre(kind))
                    if version.pre.is_none() && version.post.is_none() && version.dev.is_none() =>
                {
                    version.pre = Some(PreRelease {
                        kind,
                        number: number.unwrap_or(0),
                    });
                }
                Some(Tag::Post) if version.post.is_none() && version.dev.is_none() => {
                    version.post = Some(number.unwrap_or(0));
                }
                Some(Tag::Dev) if version.dev.is_none() => {
                    version.dev = Some(number.unwrap_or(0));
                }
                None if word.is_empty()
                    && sep == Some(b'-')
                    && version.post.is_none()
                    && version.dev.is_none()
                    && version.suffix.is_empty() =>
                {
                    // `1.0-1` is shorthand for `1.0.post1`
                    version.post = number;
                }
                None if first && sep.is_none() => {
                    version.letter = Some(word.to_string());
                    version.letter_number = number;
                }
                _ => {
                    if !word.is_empty() {
                        version.suffix.push(Segment::Text(word.to_string()));
                    }
                    if let Some(n) = number {
                        version.suffix.push(Segment::Number(n));
                    }
                }
            }
            first = false;
        }
        Ok(())
    }

    /// Number behind a single separator, consumed only when present
    fn separated_number(&mut self, end: usize) -> Result<Option<u64>, ParseError> {
        let separated = self.peek_at(self.pos, end).is_some_and(is_separator)
            && self.peek_at(self.pos + 1, end).is_some_and(|b| b.is_ascii_digit());
        if !separated {
            return Ok(None);
        }
        self.pos += 1;
        self.number(end)
    }

    fn local(&self, start: usize) -> Result<Vec<Segment>, ParseError> {
        let label = &self.src[start..];
        if label.is_empty() {
            return Err(self.error(ParseErrorKind::EmptySegment, start - 1, start));
        }

        let mut segments = Vec::new();
        let mut offset = start;
        for part in label.split(['.', '-', '_']) {
            if part.is_empty() {
                return Err(self.error(ParseErrorKind::EmptySegment, offset.saturating_sub(1), offset));
            }
            if let Some(bad) = part.find(|c: char| !c.is_ascii_alphanumeric()) {
                return Err(self.error(ParseErrorKind::InvalidCharacter, offset + bad, offset + bad + 1));
            }
            let segment = match part.parse::<u64>() {
                Ok(n) if part.bytes().all(|b| b.is_ascii_digit()) => Segment::Number(n),
                _ => Segment::Text(part.to_string()),
            };
            segments.push(segment);
            offset += part.len() + 1;
        }
        Ok(segments)
    }
}
