//! Evaluates a snapshot against a request context: the hot path.
//!
//! No suspension points, no I/O, no locks — just matcher evaluation,
//! arithmetic and, at most, one hash or RNG draw. Mirrors the teacher's
//! `policy::engine::evaluate` loop (priority-ordered rule walk with
//! first-match-wins) generalized to the richer action set this engine
//! supports.

use crate::action::CompiledAction;
use crate::config::SelectorConfig;
use crate::decision_event::{DecisionEvent, DecisionKind, OnDecision};
use crate::error::SelectionError;
use crate::hash::{fingerprint_ctx_key, stable_hash};
use crate::rng::SeededRng;
use crate::ruleset::Snapshot;
use crate::scalar::Context;
use chrono::{DateTime, Utc};
use std::cell::RefCell;
use std::sync::Arc;
use std::time::Instant;

/// The outcome of one selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Routed { gateway: String, rule_id: Option<i64> },
    Denied { reason_code: String, rule_id: i64 },
    Defaulted { gateway: String },
    NoMatch,
}

/// Per-call knobs: wall-clock override, an injectable seeded RNG (for
/// deterministic tests of non-sticky WEIGHTED selection), and the
/// decision-event hook. Matcher debug tracing is a compile-time choice
/// (see [`crate::ruleset::CompileOptions`]), not a per-call one.
#[derive(Default)]
pub struct SelectOptions {
    pub now: Option<DateTime<Utc>>,
    /// Interior mutability: the same `SelectOptions` can be reused across
    /// many `select()` calls (as property tests do), each draw advancing
    /// the shared RNG's state.
    pub rng: Option<RefCell<SeededRng>>,
    pub on_decision: Option<Arc<dyn OnDecision>>,
}

/// Evaluates one [`Snapshot`] against contexts. Stateless beyond the
/// borrowed snapshot and config — safe to share across threads (`Snapshot`
/// is immutable, `SelectorConfig` is `Copy`).
pub struct Selector<'a> {
    snapshot: &'a Snapshot,
    cfg: SelectorConfig,
}

impl<'a> Selector<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self::with_config(snapshot, SelectorConfig::default())
    }

    pub fn with_config(snapshot: &'a Snapshot, cfg: SelectorConfig) -> Self {
        Self { snapshot, cfg }
    }

    /// Evaluate `ctx` against the snapshot: first matching rule (ascending
    /// priority, short-circuit) wins; otherwise fall back to
    /// `default_gateway` or `NoMatch`.
    pub fn select(&self, ctx: &Context, opts: &SelectOptions) -> Decision {
        let start = Instant::now();
        let now = opts.now.unwrap_or_else(Utc::now);

        let mut matched_rule_id: Option<i64> = None;
        let mut ctx_key_fingerprint: Option<String> = None;
        let mut decision = Decision::NoMatch;
        let mut kind = DecisionKind::NoMatch;

        for rule in &self.snapshot.rules {
            if !rule.matcher.evaluate(ctx, now) {
                continue;
            }
            matched_rule_id = Some(rule.id);
            match &rule.action {
                CompiledAction::Fixed { gateway } => {
                    kind = DecisionKind::Routed;
                    decision = Decision::Routed {
                        gateway: gateway.clone(),
                        rule_id: Some(rule.id),
                    };
                }
                CompiledAction::Weighted { entries, total, sticky_by } => {
                    let (gateway, fingerprint) = self.resolve_weighted(ctx, entries, *total, sticky_by.as_deref(), opts);
                    ctx_key_fingerprint = fingerprint;
                    kind = DecisionKind::Routed;
                    decision = Decision::Routed {
                        gateway,
                        rule_id: Some(rule.id),
                    };
                }
                CompiledAction::Deny { reason_code } => {
                    kind = DecisionKind::Denied;
                    decision = Decision::Denied {
                        reason_code: reason_code.clone(),
                        rule_id: rule.id,
                    };
                }
            }
            break;
        }

        if matched_rule_id.is_none() {
            decision = match &self.snapshot.default_gateway {
                Some(gateway) => {
                    kind = DecisionKind::Defaulted;
                    Decision::Defaulted { gateway: gateway.clone() }
                }
                None => {
                    kind = DecisionKind::NoMatch;
                    Decision::NoMatch
                }
            };
        }

        if let Some(hook) = &opts.on_decision {
            hook.call(DecisionEvent {
                ruleset_id: self.snapshot.id,
                version: self.snapshot.version,
                rule_id: matched_rule_id,
                decision_kind: kind,
                latency_ns: start.elapsed().as_nanos() as u64,
                ctx_key_fingerprint,
            });
        }

        decision
    }

    /// Resolve a WEIGHTED action's gateway. Returns the gateway and, when a
    /// sticky field was actually used, its fingerprint for the decision
    /// event.
    fn resolve_weighted(
        &self,
        ctx: &Context,
        entries: &[crate::action::WeightedEntry],
        total: u32,
        sticky_by: Option<&str>,
        opts: &SelectOptions,
    ) -> (String, Option<String>) {
        let sticky_value = sticky_by.and_then(|field| ctx.lookup(field)).map(|s| s.to_display_string());

        let (draw, fingerprint) = match sticky_value {
            Some(key) => {
                let h = stable_hash(self.cfg.hash_domain, &key);
                ((h % total as u64) as u32, Some(fingerprint_ctx_key(&key)))
            }
            // sticky_by absent, or the field is missing from ctx: fall
            // back to uniform random (spec open question, resolved as (a)).
            None => {
                let draw = match &opts.rng {
                    Some(rng) => rng.borrow_mut().gen_range(total),
                    None => SeededRng::new(non_deterministic_seed()).gen_range(total),
                };
                (draw, None)
            }
        };

        (CompiledAction::resolve_weighted_bucket(entries, draw).to_string(), fingerprint)
    }
}

fn non_deterministic_seed() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(1)
}

/// Select against whatever snapshot is currently installed in `registry`,
/// surfacing [`SelectionError::NoActiveSnapshot`] if none has been.
pub fn select_from_registry(
    registry: &crate::registry::SnapshotRegistry,
    ctx: &Context,
    opts: &SelectOptions,
) -> Result<Decision, SelectionError> {
    let snapshot = registry.current().ok_or(SelectionError::NoActiveSnapshot)?;
    Ok(Selector::new(&snapshot).select(ctx, opts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SelectorConfig;
    use crate::ruleset::compiler::compile_ruleset;
    use crate::ruleset::wire::RulesetWire;
    use crate::scalar::Scalar;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn compile(json: &str) -> Snapshot {
        let wire: RulesetWire = serde_json::from_str(json).unwrap();
        compile_ruleset(&wire, &SelectorConfig::default(), &crate::ruleset::CompileOptions::default()).unwrap()
    }

    #[test]
    fn s1_deny_a_user() {
        let snapshot = compile(
            r#"{"id":1,"version":1,"default_gateway":"CELCOIN","gateways":["CELCOIN"],
                "rules":[{"id":1,"priority":1,"enabled":true,"condition_type":"USER","condition_value":999,
                    "action":{"route":"DENY","reason_code":"blocked"}}]}"#,
        );
        let selector = Selector::new(&snapshot);
        let opts = SelectOptions::default();

        let mut blocked = Context::new();
        blocked.insert("api_user_id", Scalar::Int(999));
        assert_eq!(
            selector.select(&blocked, &opts),
            Decision::Denied { reason_code: "blocked".to_string(), rule_id: 1 }
        );

        let mut allowed = Context::new();
        allowed.insert("api_user_id", Scalar::Int(1));
        assert_eq!(
            selector.select(&allowed, &opts),
            Decision::Defaulted { gateway: "CELCOIN".to_string() }
        );
    }

    #[test]
    fn s2_fixed_routing_by_pix_key() {
        let snapshot = compile(
            r#"{"id":1,"version":1,"gateways":["E2E"],
                "rules":[
                    {"id":1,"priority":1,"enabled":true,"condition_type":"USER","condition_value":999,
                     "action":{"route":"DENY","reason_code":"blocked"}},
                    {"id":2,"priority":2,"enabled":true,"condition_type":"PIX_KEY","condition_value":"x@y.io",
                     "action":{"route":"FIXED","gateway":"E2E"}}
                ]}"#,
        );
        let selector = Selector::new(&snapshot);
        let mut ctx = Context::new();
        ctx.insert("api_user_id", Scalar::Int(1));
        ctx.insert("pix_key", Scalar::Str("x@y.io".to_string()));
        assert_eq!(
            selector.select(&ctx, &SelectOptions::default()),
            Decision::Routed { gateway: "E2E".to_string(), rule_id: Some(2) }
        );
    }

    #[test]
    fn s3_weighted_with_stickiness() {
        let snapshot = compile(
            r#"{"id":1,"version":1,"gateways":["CELCOIN","E2E"],
                "rules":[{"id":3,"priority":3,"enabled":true,"condition_type":"ADVANCED",
                    "condition_json": {"all": [
                        {"type":"VALUE_IN","field":"pix_key_type","values":["EVP"]},
                        {"type":"AMOUNT_RANGE","field":"amount","coerce":"int","scale":2,"min":"0.00","max":"1000.00"}
                    ]},
                    "action":{"route":"WEIGHTED","weights":{"CELCOIN":70,"E2E":30},"sticky_by":"api_user_id"}}]}"#,
        );
        let selector = Selector::new(&snapshot);
        let mut ctx = Context::new();
        ctx.insert("api_user_id", Scalar::Int(42));
        ctx.insert("pix_key_type", Scalar::Str("EVP".to_string()));
        ctx.insert("amount", Scalar::Int(50_000));

        let opts = SelectOptions::default();
        let first = selector.select(&ctx, &opts);
        let second = selector.select(&ctx, &opts);
        assert_eq!(first, second);
        assert!(matches!(first, Decision::Routed { rule_id: Some(3), .. }));

        let mut over_limit = ctx.clone();
        over_limit.insert("amount", Scalar::Int(100_001));
        assert_eq!(selector.select(&over_limit, &opts), Decision::NoMatch);
    }

    #[test]
    fn s4_duplicate_priority_rejected_at_compile() {
        let wire: RulesetWire = serde_json::from_str(
            r#"{"id":1,"version":1,"gateways":["CELCOIN"],
                "rules":[
                    {"id":1,"priority":1,"enabled":true,"condition_type":"USER","condition_value":1,
                     "action":{"route":"DENY","reason_code":"a"}},
                    {"id":2,"priority":1,"enabled":true,"condition_type":"USER","condition_value":2,
                     "action":{"route":"DENY","reason_code":"b"}}
                ]}"#,
        )
        .unwrap();
        assert!(compile_ruleset(&wire, &SelectorConfig::default(), &crate::ruleset::CompileOptions::default()).is_err());
    }

    #[test]
    fn s5_midnight_window() {
        let snapshot = compile(
            r#"{"id":1,"version":1,"gateways":["E2E"],
                "rules":[{"id":1,"priority":1,"enabled":true,"condition_type":"ADVANCED",
                    "condition_json": {"type":"TIME_WINDOW","tz":"America/Sao_Paulo","start":"22:00","end":"06:00"},
                    "action":{"route":"FIXED","gateway":"E2E"}}]}"#,
        );
        let selector = Selector::new(&snapshot);
        let mut opts = SelectOptions::default();

        // 2024-01-01T23:30:00-03:00
        opts.now = Some(Utc.with_ymd_and_hms(2024, 1, 2, 2, 30, 0).unwrap());
        assert!(matches!(selector.select(&Context::new(), &opts), Decision::Routed { .. }));

        // 2024-01-01T12:00:00-03:00
        opts.now = Some(Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap());
        assert_eq!(selector.select(&Context::new(), &opts), Decision::NoMatch);
    }

    #[test]
    fn non_sticky_weighted_uses_injected_rng() {
        let snapshot = compile(
            r#"{"id":1,"version":1,"gateways":["A","B"],
                "rules":[{"id":1,"priority":1,"enabled":true,"condition_type":"ADVANCED",
                    "condition_json": {"type":"VALUE_IN","field":"x","values":[1]},
                    "action":{"route":"WEIGHTED","weights":{"A":50,"B":50}}}]}"#,
        );
        let selector = Selector::new(&snapshot);
        let mut ctx = Context::new();
        ctx.insert("x", Scalar::Int(1));

        let opts_a = SelectOptions { rng: Some(RefCell::new(SeededRng::new(1))), ..Default::default() };
        let opts_b = SelectOptions { rng: Some(RefCell::new(SeededRng::new(1))), ..Default::default() };
        assert_eq!(selector.select(&ctx, &opts_a), selector.select(&ctx, &opts_b));
    }

    #[test]
    fn decision_event_hook_is_called_exactly_once() {
        let snapshot = compile(
            r#"{"id":7,"version":2,"default_gateway":"CELCOIN","gateways":["CELCOIN"],"rules":[]}"#,
        );
        let selector = Selector::new(&snapshot);

        struct Collector(Mutex<Vec<DecisionEvent>>);
        impl OnDecision for Collector {
            fn call(&self, event: DecisionEvent) {
                self.0.lock().unwrap().push(event);
            }
        }
        let collector = Arc::new(Collector(Mutex::new(Vec::new())));
        let opts = SelectOptions { on_decision: Some(collector.clone()), ..Default::default() };

        selector.select(&Context::new(), &opts);
        let events = collector.0.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ruleset_id, 7);
        assert_eq!(events[0].version, 2);
        assert_eq!(events[0].decision_kind, DecisionKind::Defaulted);
    }

    #[test]
    fn selecting_before_any_install_surfaces_no_active_snapshot() {
        let registry = crate::registry::SnapshotRegistry::new();
        let err = select_from_registry(&registry, &Context::new(), &SelectOptions::default()).unwrap_err();
        assert_eq!(err, SelectionError::NoActiveSnapshot);
    }
}
