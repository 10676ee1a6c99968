//! The matcher tree: a compiled, immutable boolean predicate over a
//! request context.
//!
//! Generalizes the teacher's `policy::tree` decision-tree interpreter
//! (`Expression`/`TreeNode` in `policy/tree/types.rs` and `interpreter.rs`)
//! from a two-branch if/else tree walking a fixed numeric context into a
//! closed set of leaf predicates (`VALUE_IN`, `REGEX`, `AMOUNT_RANGE`,
//! `TIME_WINDOW`) composed with boolean connectives (`ALL`/`ANY`/`NONE`),
//! evaluated directly to `bool` rather than walked node-by-node to an
//! action. Children are owned by their parent (a pure tree, no sharing),
//! same as the teacher's `Box<TreeNode>` fields.

pub mod amount_range;
pub mod coerce;
pub mod debug;
pub mod regex_matcher;
pub mod time_window;
pub mod value_in;

use crate::scalar::Context;
use amount_range::AmountRangeMatcher;
use chrono::{DateTime, Utc};
use debug::{traced, DebugSinkHandle};
use regex_matcher::RegexMatcherDef;
use time_window::TimeWindowMatcher;
use value_in::ValueInMatcher;

/// One matcher node: its evaluated kind plus the JSON-pointer-like path it
/// was compiled from (used for debug traces and compile-error reporting).
#[derive(Clone)]
pub struct Matcher {
    pub path: String,
    pub kind: MatcherKind,
}

#[derive(Clone)]
pub enum MatcherKind {
    ValueIn(ValueInMatcher),
    Regex(RegexMatcherDef),
    AmountRange(AmountRangeMatcher),
    TimeWindow(TimeWindowMatcher),
    All(Vec<Matcher>),
    Any(Vec<Matcher>),
    None(Vec<Matcher>),
    /// Decorates `inner`, reporting every evaluation to `sink`. Only ever
    /// constructed by the rule compiler when `CompileOptions::debug_sink`
    /// is set — so this variant, and the dynamic dispatch it carries,
    /// simply does not exist in a tree compiled without it.
    Debug(Box<Matcher>, DebugSinkHandle),
}

impl Matcher {
    pub fn new(path: impl Into<String>, kind: MatcherKind) -> Self {
        Self { path: path.into(), kind }
    }

    /// Evaluate this matcher (and, recursively, its children) against
    /// `ctx`. `now` is the wall-clock fallback for TIME_WINDOW matchers
    /// whose `ctx` carries no explicit `now` field.
    pub fn evaluate(&self, ctx: &Context, now: DateTime<Utc>) -> bool {
        match &self.kind {
            MatcherKind::ValueIn(m) => m.evaluate(ctx),
            MatcherKind::Regex(m) => m.evaluate(ctx),
            MatcherKind::AmountRange(m) => m.evaluate(ctx),
            MatcherKind::TimeWindow(m) => m.evaluate(ctx, now),
            // Short-circuit AND: `Iterator::all` stops at the first
            // `false`, so no lower-priority-within-tree child matcher
            // after a failing one is ever invoked.
            MatcherKind::All(children) => children.iter().all(|c| c.evaluate(ctx, now)),
            // Short-circuit OR.
            MatcherKind::Any(children) => children.iter().any(|c| c.evaluate(ctx, now)),
            // True iff every child is false; short-circuits on the first
            // child that matches.
            MatcherKind::None(children) => children.iter().all(|c| !c.evaluate(ctx, now)),
            MatcherKind::Debug(inner, sink) => {
                traced(sink, &inner.path, inner.kind_name(), || inner.evaluate(ctx, now))
            }
        }
    }

    fn kind_name(&self) -> &'static str {
        match &self.kind {
            MatcherKind::ValueIn(_) => "VALUE_IN",
            MatcherKind::Regex(_) => "REGEX",
            MatcherKind::AmountRange(_) => "AMOUNT_RANGE",
            MatcherKind::TimeWindow(_) => "TIME_WINDOW",
            MatcherKind::All(_) => "ALL",
            MatcherKind::Any(_) => "ANY",
            MatcherKind::None(_) => "NONE",
            MatcherKind::Debug(inner, _) => inner.kind_name(),
        }
    }
}

/// `PartialEq`/`Eq`/`Debug` are hand-written rather than derived because
/// `DebugSinkHandle` (an `Arc<dyn DebugSink>`) implements neither: the
/// debug wrapper is an operational decoration, not part of a matcher's
/// logical content, so it is compared and printed transparently through
/// to its inner matcher. This also keeps `Snapshot::fingerprint()` (which
/// formats matchers with `{:?}`) identical whether or not a snapshot was
/// compiled with debug wrapping enabled.
impl PartialEq for Matcher {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.kind == other.kind
    }
}
impl Eq for Matcher {}

impl PartialEq for MatcherKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MatcherKind::ValueIn(a), MatcherKind::ValueIn(b)) => a == b,
            (MatcherKind::Regex(a), MatcherKind::Regex(b)) => a == b,
            (MatcherKind::AmountRange(a), MatcherKind::AmountRange(b)) => a == b,
            (MatcherKind::TimeWindow(a), MatcherKind::TimeWindow(b)) => a == b,
            (MatcherKind::All(a), MatcherKind::All(b)) => a == b,
            (MatcherKind::Any(a), MatcherKind::Any(b)) => a == b,
            (MatcherKind::None(a), MatcherKind::None(b)) => a == b,
            (MatcherKind::Debug(a, _), MatcherKind::Debug(b, _)) => a == b,
            (MatcherKind::Debug(a, _), b) => &a.kind == b,
            (a, MatcherKind::Debug(b, _)) => a == &b.kind,
            _ => false,
        }
    }
}
impl Eq for MatcherKind {}

impl std::fmt::Debug for Matcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            MatcherKind::Debug(inner, _) => inner.fmt(f),
            _ => f.debug_struct("Matcher").field("path", &self.path).field("kind", &self.kind).finish(),
        }
    }
}

impl std::fmt::Debug for MatcherKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatcherKind::ValueIn(m) => f.debug_tuple("ValueIn").field(m).finish(),
            MatcherKind::Regex(m) => f.debug_tuple("Regex").field(m).finish(),
            MatcherKind::AmountRange(m) => f.debug_tuple("AmountRange").field(m).finish(),
            MatcherKind::TimeWindow(m) => f.debug_tuple("TimeWindow").field(m).finish(),
            MatcherKind::All(c) => f.debug_tuple("All").field(c).finish(),
            MatcherKind::Any(c) => f.debug_tuple("Any").field(c).finish(),
            MatcherKind::None(c) => f.debug_tuple("None").field(c).finish(),
            MatcherKind::Debug(inner, _) => inner.kind.fmt(f),
        }
    }
}
