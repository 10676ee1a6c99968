//! Non-PII observability event emitted once per selection.
//!
//! Mirrors the teacher's event model (`models/event.rs`): a plain data
//! struct, handed to a caller-supplied hook. Transport (log line, metrics
//! counter, message bus) is entirely the caller's concern.

/// The kind of outcome a selection produced, without the payload (gateway
/// name, reason code) that [`crate::selector::Decision`] carries — kept
/// separate so a decision event can be built cheaply even when the caller
/// only wants the shape of the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionKind {
    Routed,
    Denied,
    Defaulted,
    NoMatch,
}

/// One selection's outcome, safe to log or forward to a metrics sink.
/// Never carries raw `pix_key`/`api_user_id` — only stable fingerprints of
/// whichever field stickiness hashed on, when applicable.
#[derive(Debug, Clone)]
pub struct DecisionEvent {
    pub ruleset_id: i64,
    pub version: i64,
    pub rule_id: Option<i64>,
    pub decision_kind: DecisionKind,
    pub latency_ns: u64,
    pub ctx_key_fingerprint: Option<String>,
}

/// Caller-registered hook invoked once per selection. `Send + Sync` so it
/// can be shared across the same threads the registry is shared across.
pub trait OnDecision: Send + Sync {
    fn call(&self, event: DecisionEvent);
}

impl<F> OnDecision for F
where
    F: Fn(DecisionEvent) + Send + Sync,
{
    fn call(&self, event: DecisionEvent) {
        self(event)
    }
}
