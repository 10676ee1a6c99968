//! REGEX: string matching with a hard length guard against ReDoS.

use super::coerce::{coerce_scalar, Coerce};
use crate::scalar::Context;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegexMode {
    Search,
    Match,
    Fullmatch,
}

impl RegexMode {
    pub fn parse(raw: Option<&str>) -> Option<RegexMode> {
        match raw.unwrap_or("search") {
            "search" => Some(RegexMode::Search),
            "match" => Some(RegexMode::Match),
            "fullmatch" => Some(RegexMode::Fullmatch),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RegexMode::Search => "search",
            RegexMode::Match => "match",
            RegexMode::Fullmatch => "fullmatch",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RegexMatcherDef {
    pub field: String,
    pub compiled: Regex,
    /// Original pattern source, pre-flag-embedding, kept for export.
    pub raw_pattern: String,
    pub flags: Option<String>,
    pub mode: RegexMode,
    pub coerce: Coerce,
    pub max_len: usize,
}

impl PartialEq for RegexMatcherDef {
    fn eq(&self, other: &Self) -> bool {
        self.field == other.field
            && self.raw_pattern == other.raw_pattern
            && self.flags == other.flags
            && self.mode == other.mode
            && self.coerce == other.coerce
            && self.max_len == other.max_len
    }
}
impl Eq for RegexMatcherDef {}

impl RegexMatcherDef {
    pub fn evaluate(&self, ctx: &Context) -> bool {
        let Some(raw) = ctx.lookup(&self.field) else {
            return false;
        };
        // REGEX always works on strings; coerce is purely a field-read
        // shaping step (e.g. lower-str to make the regex case-blind
        // without embedding a flag).
        let Some(subject) = coerce_scalar(raw, self.coerce).map(|c| match c {
            super::coerce::CoercedValue::Str(s) => s,
            super::coerce::CoercedValue::Int(i) => i.to_string(),
        }) else {
            return false;
        };

        // ReDoS guard: never hand the engine more than max_len characters,
        // and never even attempt the match if the subject is longer.
        if subject.chars().count() > self.max_len {
            return false;
        }

        match self.mode {
            RegexMode::Search => self.compiled.is_match(&subject),
            RegexMode::Match => self
                .compiled
                .find(&subject)
                .map(|m| m.start() == 0)
                .unwrap_or(false),
            // The engine itself is anchored start-to-end for this mode
            // (see `build_pattern`), so a plain `is_match` already forces
            // it to consider every alternative that spans the whole
            // string rather than stopping at leftmost-first's first
            // successful branch.
            RegexMode::Fullmatch => self.compiled.is_match(&subject),
        }
    }
}

/// Build the final pattern string handed to the regex engine, embedding
/// `flags` (currently only `i` for case-insensitive) as an inline group.
pub fn apply_flags(pattern: &str, flags: Option<&str>) -> String {
    match flags {
        Some(f) if f.contains('i') => format!("(?i){}", pattern),
        _ => pattern.to_string(),
    }
}

/// Build the pattern actually handed to the regex engine: flags embedded,
/// then anchored start-to-end for `fullmatch`. Anchoring the pattern itself
/// (rather than post-checking an unanchored `find()`'s span) is required
/// for alternations like `a|ab` against `"ab"`: the engine's leftmost-first
/// disambiguation would otherwise return the `a` branch's short match and
/// never consider the `ab` branch that actually spans the string.
pub fn build_pattern(pattern: &str, flags: Option<&str>, mode: RegexMode) -> String {
    let flagged = apply_flags(pattern, flags);
    match mode {
        RegexMode::Fullmatch => format!("^(?:{})$", flagged),
        _ => flagged,
    }
}
