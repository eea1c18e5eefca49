use crate::errors::Result;
use regex::{NoExpand, Regex, RegexBuilder};
use serde::Serialize;
use std::borrow::Cow;

/// A single match located inside a file's text content.
///
/// `offset` and `length` are byte positions into the same string that was
/// searched, so they line up with `str` slicing and with the preview builder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MatchSpan {
    pub offset: usize,
    pub length: usize,
}

impl MatchSpan {
    /// The exclusive end offset of the match.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

/// A compiled find pattern, literal or regular expression.
///
/// Literal text is escaped before compilation so both modes share one engine.
/// That keeps case-insensitive literal matching and replacement on the same
/// code path as regex matching.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    regex: Regex,
    is_regex: bool,
}

impl PatternMatcher {
    /// Compiles `pattern`. Fails only when `is_regex` is set and the pattern
    /// is not a valid regular expression.
    pub fn new(pattern: &str, case_sensitive: bool, is_regex: bool) -> Result<Self> {
        let source = if is_regex {
            Cow::Borrowed(pattern)
        } else {
            Cow::Owned(regex::escape(pattern))
        };

        let regex = RegexBuilder::new(&source)
            .case_insensitive(!case_sensitive)
            .build()?;

        Ok(Self { regex, is_regex })
    }

    /// Finds all non-overlapping matches, left to right.
    pub fn find_all(&self, content: &str) -> Vec<MatchSpan> {
        self.regex
            .find_iter(content)
            .map(|m| MatchSpan {
                offset: m.start(),
                length: m.len(),
            })
            .collect()
    }

    /// Replaces every match found by `find_all` with `replacement`.
    ///
    /// In regex mode `$1`/`${name}` capture references are expanded; literal
    /// mode inserts the replacement text verbatim.
    pub fn replace_all<'a>(&self, content: &'a str, replacement: &str) -> Cow<'a, str> {
        if self.is_regex {
            self.regex.replace_all(content, replacement)
        } else {
            self.regex.replace_all(content, NoExpand(replacement))
        }
    }
}

/// One-shot helper: compile the pattern and return every match in `content`.
pub fn find_all(
    content: &str,
    pattern: &str,
    case_sensitive: bool,
    is_regex: bool,
) -> Result<Vec<MatchSpan>> {
    Ok(PatternMatcher::new(pattern, case_sensitive, is_regex)?.find_all(content))
}
