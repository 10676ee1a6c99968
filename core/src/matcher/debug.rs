//! Opt-in per-matcher telemetry, baked into the compiled tree only when
//! `compile_ruleset(wire, cfg, &CompileOptions { debug_sink: Some(sink) })`
//! is used.
//!
//! Mirrors the teacher's event-log pattern (`models/event.rs`): a plain
//! struct describing what happened, handed to a caller-supplied sink. When
//! `debug_sink` is `None` (the default), `compile_ruleset` never builds a
//! [`super::MatcherKind::Debug`] wrapper at all, so the matcher tree is the
//! bare compiled tree — zero overhead on the hot path.

use super::Matcher;
use std::sync::Arc;
use std::time::Instant;

/// One matcher's outcome, recorded only in debug mode.
#[derive(Debug, Clone)]
pub struct MatcherTrace {
    pub path: String,
    pub matcher_kind: &'static str,
    pub result: bool,
    pub elapsed_ns: u64,
}

/// Receives a [`MatcherTrace`] for every matcher evaluated while debug mode
/// is active. Transport (where traces end up) is a caller concern, same as
/// the `on_decision` hook.
pub trait DebugSink: Send + Sync {
    fn record(&self, trace: MatcherTrace);
}

pub type DebugSinkHandle = Arc<dyn DebugSink>;

/// Times a single matcher evaluation and forwards the result to `sink`.
pub fn traced<F: FnOnce() -> bool>(
    sink: &DebugSinkHandle,
    path: &str,
    matcher_kind: &'static str,
    eval: F,
) -> bool {
    let start = Instant::now();
    let result = eval();
    let elapsed_ns = start.elapsed().as_nanos() as u64;
    tracing::trace!(path, matcher_kind, result, elapsed_ns, "matcher evaluated");
    sink.record(MatcherTrace {
        path: path.to_string(),
        matcher_kind,
        result,
        elapsed_ns,
    });
    result
}

/// Wrap `matcher` in a [`super::MatcherKind::Debug`] decorator reporting
/// every evaluation of it (and, since the compiler wraps bottom-up, of
/// every one of its already-wrapped children) to `sink`.
pub fn wrap(matcher: Matcher, sink: DebugSinkHandle) -> Matcher {
    let path = matcher.path.clone();
    Matcher::new(path, super::MatcherKind::Debug(Box::new(matcher), sink))
}
