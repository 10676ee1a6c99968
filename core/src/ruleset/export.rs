//! Reconstructs wire-compatible JSON from a compiled [`Snapshot`].
//!
//! Every exported rule is emitted as `ADVANCED` with an explicit
//! `condition_json` tree — alias information (`USER`/`PIX_KEY`/
//! `PIX_KEY_TYPE`) is not preserved, only the matcher semantics it compiled
//! to, which is what testable property 9 (round-trip) actually requires:
//! `compile_ruleset(export(snapshot))` must produce the same decisions as
//! `snapshot`, not byte-identical source JSON.

use super::snapshot::Snapshot;
use crate::action::CompiledAction;
use crate::matcher::coerce::coerced_to_json;
use crate::matcher::time_window::{format_time_of_day, format_weekday};
use crate::matcher::{Matcher, MatcherKind};
use serde_json::{json, Value as JsonValue};

/// Render `snapshot` back to the ruleset JSON wire format (spec §6).
pub fn export_snapshot(snapshot: &Snapshot) -> JsonValue {
    let mut gateways: Vec<&String> = snapshot.known_gateways.iter().collect();
    gateways.sort();

    let rules: Vec<JsonValue> = snapshot
        .rules
        .iter()
        .map(|rule| {
            json!({
                "id": rule.id,
                "priority": rule.priority,
                "enabled": true,
                "condition_type": "ADVANCED",
                "condition_json": matcher_to_json(&rule.matcher),
                "action": action_to_json(&rule.action),
            })
        })
        .collect();

    json!({
        "id": snapshot.id,
        "version": snapshot.version,
        "default_gateway": snapshot.default_gateway,
        "gateways": gateways,
        "rules": rules,
    })
}

fn matcher_to_json(matcher: &Matcher) -> JsonValue {
    match &matcher.kind {
        MatcherKind::ValueIn(m) => json!({
            "type": "VALUE_IN",
            "field": m.field,
            "values": m.values.iter().map(coerced_to_json).collect::<Vec<_>>(),
            "coerce": coerce_name(m.coerce),
        }),
        MatcherKind::Regex(m) => json!({
            "type": "REGEX",
            "field": m.field,
            "pattern": m.raw_pattern,
            "mode": m.mode.as_str(),
            "flags": m.flags,
            "coerce": coerce_name(m.coerce),
            "max_len": m.max_len,
        }),
        MatcherKind::AmountRange(m) => json!({
            "type": "AMOUNT_RANGE",
            "field": m.field,
            "coerce": m.coerce.as_str(),
            "scale": m.scale,
            "min": m.min.map(|d| d.to_string()),
            "max": m.max.map(|d| d.to_string()),
            "min_inclusive": m.min_inclusive,
            "max_inclusive": m.max_inclusive,
        }),
        MatcherKind::TimeWindow(m) => json!({
            "type": "TIME_WINDOW",
            "tz": m.tz_name,
            "start": format_time_of_day(&m.start),
            "end": format_time_of_day(&m.end),
            "days_of_week": m.days_of_week.as_ref().map(|days| {
                let mut names: Vec<&'static str> = days.iter().map(|d| format_weekday(*d)).collect();
                names.sort();
                names
            }),
        }),
        MatcherKind::All(children) => json!({ "all": children.iter().map(matcher_to_json).collect::<Vec<_>>() }),
        MatcherKind::Any(children) => json!({ "any": children.iter().map(matcher_to_json).collect::<Vec<_>>() }),
        MatcherKind::None(children) => json!({ "none": children.iter().map(matcher_to_json).collect::<Vec<_>>() }),
        // Debug wrapping is a compile-time instrumentation choice, not part
        // of a matcher's exported logical content: export its inner matcher.
        MatcherKind::Debug(inner, _) => matcher_to_json(inner),
    }
}

fn coerce_name(coerce: crate::matcher::coerce::Coerce) -> &'static str {
    use crate::matcher::coerce::Coerce;
    match coerce {
        Coerce::Int => "int",
        Coerce::Str => "str",
        Coerce::LowerStr => "lower-str",
        Coerce::Null => "null",
    }
}

fn action_to_json(action: &CompiledAction) -> JsonValue {
    match action {
        CompiledAction::Fixed { gateway } => json!({ "route": "FIXED", "gateway": gateway }),
        CompiledAction::Weighted { entries, sticky_by, .. } => {
            let mut weights = serde_json::Map::new();
            let mut previous_cumulative = 0u32;
            for entry in entries {
                let weight = entry.cumulative - previous_cumulative;
                previous_cumulative = entry.cumulative;
                weights.insert(entry.gateway.clone(), json!(weight));
            }
            json!({ "route": "WEIGHTED", "weights": weights, "sticky_by": sticky_by })
        }
        CompiledAction::Deny { reason_code } => json!({ "route": "DENY", "reason_code": reason_code }),
    }
}
