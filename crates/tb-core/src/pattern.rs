//! Needle patterns
//!
//! The first scriptlet argument selects which intervals to adjust by
//! testing the callback's source text. An empty needle matches every
//! callback, `/body/flags` is a regular expression, and anything else is
//! matched as a literal substring.
//!
//! Regex needles are written for JavaScript, so they are compiled with
//! `fancy_regex`, which understands lookaround and backreferences.

use fancy_regex::Regex;

bitflags::bitflags! {
    /// Flags accepted after the closing slash of a `/regex/` needle.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PatternFlags: u8 {
        /// `g` - global; no effect on a single test
        const GLOBAL = 1 << 0;
        /// `i` - case-insensitive
        const IGNORE_CASE = 1 << 1;
        /// `m` - `^`/`$` match at line boundaries
        const MULTI_LINE = 1 << 2;
        /// `s` - `.` matches newlines
        const DOT_ALL = 1 << 3;
        /// `u` - unicode; always on
        const UNICODE = 1 << 4;
    }
}

impl PatternFlags {
    /// Parse a flag suffix. Returns `None` for any character outside `gimsu`.
    pub fn parse(s: &str) -> Option<Self> {
        let mut flags = Self::empty();
        for c in s.chars() {
            flags |= match c {
                'g' => Self::GLOBAL,
                'i' => Self::IGNORE_CASE,
                'm' => Self::MULTI_LINE,
                's' => Self::DOT_ALL,
                'u' => Self::UNICODE,
                _ => return None,
            };
        }
        Some(flags)
    }

    /// Inline group (`(?ims)`) for the flags that change matching.
    fn inline_group(self) -> String {
        let mut group = String::new();
        for (flag, c) in [
            (Self::IGNORE_CASE, 'i'),
            (Self::MULTI_LINE, 'm'),
            (Self::DOT_ALL, 's'),
        ] {
            if self.contains(flag) {
                group.push(c);
            }
        }
        if group.is_empty() {
            group
        } else {
            format!("(?{group})")
        }
    }
}

/// Parsed needle pattern.
#[derive(Debug, Clone)]
pub enum NeedlePattern {
    /// Empty needle, or a regex that failed to compile
    MatchAll,
    /// Literal needle, matched as a substring
    Literal(String),
    /// `/body/flags` needle
    Regex { source: String, re: Regex },
}

impl NeedlePattern {
    /// Parse a needle argument. Never fails: a regex that does not compile
    /// degrades to `MatchAll`, the way generated scriptlets fall back to
    /// `/^/`.
    pub fn parse(needle: &str) -> Self {
        if needle.is_empty() {
            return Self::MatchAll;
        }

        let Some((body, flags)) = split_regex_literal(needle) else {
            return Self::Literal(needle.to_string());
        };

        match build_regex(body, flags) {
            Ok(re) => Self::Regex {
                source: needle.to_string(),
                re,
            },
            Err(e) => {
                log::warn!("invalid needle regex {needle:?}, matching everything: {e}");
                Self::MatchAll
            }
        }
    }

    /// Test a callback's source text against the needle.
    ///
    /// A regex that gives up while backtracking counts as no match.
    #[inline]
    pub fn is_match(&self, haystack: &str) -> bool {
        match self {
            Self::MatchAll => true,
            Self::Literal(literal) => haystack.contains(literal.as_str()),
            Self::Regex { re, .. } => re.is_match(haystack).unwrap_or(false),
        }
    }

    /// The needle as written, empty for `MatchAll`.
    pub fn source(&self) -> &str {
        match self {
            Self::MatchAll => "",
            Self::Literal(source) | Self::Regex { source, .. } => source,
        }
    }

    pub fn is_regex(&self) -> bool {
        matches!(self, Self::Regex { .. })
    }
}

impl PartialEq for NeedlePattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::MatchAll, Self::MatchAll) => true,
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Regex { source: a, .. }, Self::Regex { source: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// Split `/body/flags` into body and flags. The body must be non-empty and
/// the flags limited to `gimsu`.
fn split_regex_literal(s: &str) -> Option<(&str, PatternFlags)> {
    let rest = s.strip_prefix('/')?;
    let close = rest.rfind('/')?;
    let body = &rest[..close];
    if body.is_empty() {
        return None;
    }
    let flags = PatternFlags::parse(&rest[close + 1..])?;
    Some((body, flags))
}

fn build_regex(body: &str, flags: PatternFlags) -> Result<Regex, fancy_regex::Error> {
    Regex::new(&format!("{}{body}", flags.inline_group()))
}
