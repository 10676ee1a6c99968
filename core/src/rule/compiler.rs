//! Compiles one rule's declared condition and action into their runtime
//! forms, expanding `USER`/`PIX_KEY`/`PIX_KEY_TYPE` aliases into the
//! equivalent `VALUE_IN` matcher before tree compilation.

use super::wire::{ActionWire, ConditionType, LeafMatcherWire, MatcherWire, RuleWire};
use crate::action::{normalize_weights, CompiledAction};
use crate::config::SelectorConfig;
use crate::error::{CompileErrorEntry, CompileErrorKind};
use crate::matcher::amount_range::{AmountCoerce, AmountRangeMatcher};
use crate::matcher::coerce::{coerce_json_literal, Coerce};
use crate::matcher::debug::DebugSinkHandle;
use crate::matcher::regex_matcher::{build_pattern, RegexMatcherDef, RegexMode};
use crate::matcher::time_window::{parse_time_of_day, parse_weekday};
use crate::matcher::value_in::ValueInMatcher;
use crate::matcher::{Matcher, MatcherKind};
use regex::Regex;
use std::collections::HashSet;

/// Wrap `matcher` in the compile-time debug decorator when the caller
/// registered a sink; otherwise return it untouched.
fn finish(matcher: Matcher, debug_sink: Option<&DebugSinkHandle>) -> Matcher {
    match debug_sink {
        Some(sink) => crate::matcher::debug::wrap(matcher, sink.clone()),
        None => matcher,
    }
}

const PIX_KEY_TYPES: &[&str] = &[
    "QRCODE_STATIC",
    "QRCODE_DYNAMIC",
    "EMAIL",
    "PHONE",
    "CPF",
    "CNPJ",
    "EVP",
];

/// One rule compiled to its runtime form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledRule {
    pub id: i64,
    pub priority: i64,
    pub matcher: Matcher,
    pub action: CompiledAction,
}

/// Compile `rule` against `known_gateways`, pushing every problem found onto
/// `errors` with a path rooted at `path_prefix` (e.g. `rules[3]`). Returns
/// `None` if compilation failed for this rule; the caller keeps going to
/// surface every rule's errors in one pass.
pub fn compile_rule(
    rule: &RuleWire,
    known_gateways: &HashSet<String>,
    cfg: &SelectorConfig,
    path_prefix: &str,
    debug_sink: Option<&DebugSinkHandle>,
    errors: &mut Vec<CompileErrorEntry>,
) -> Option<CompiledRule> {
    let matcher = compile_condition(rule, cfg, path_prefix, debug_sink, errors);
    let action = compile_action(&rule.action, known_gateways, cfg, &format!("{}.action", path_prefix), errors);

    match (matcher, action) {
        (Some(matcher), Some(action)) => {
            tracing::debug!(rule_id = rule.id, priority = rule.priority, "compiled rule");
            Some(CompiledRule {
                id: rule.id,
                priority: rule.priority,
                matcher,
                action,
            })
        }
        _ => None,
    }
}

fn compile_condition(
    rule: &RuleWire,
    cfg: &SelectorConfig,
    path_prefix: &str,
    debug_sink: Option<&DebugSinkHandle>,
    errors: &mut Vec<CompileErrorEntry>,
) -> Option<Matcher> {
    match rule.condition_type {
        ConditionType::User => compile_alias(
            rule,
            "api_user_id",
            Coerce::Int,
            path_prefix,
            None,
            debug_sink,
            errors,
        ),
        ConditionType::PixKey => compile_alias(
            rule,
            "pix_key",
            Coerce::Str,
            path_prefix,
            None,
            debug_sink,
            errors,
        ),
        ConditionType::PixKeyType => compile_alias(
            rule,
            "pix_key_type",
            Coerce::Str,
            path_prefix,
            Some(PIX_KEY_TYPES),
            debug_sink,
            errors,
        ),
        ConditionType::Advanced => {
            let Some(condition_json) = &rule.condition_json else {
                errors.push(CompileErrorEntry::new(
                    format!("{}.condition_json", path_prefix),
                    CompileErrorKind::MissingCondition,
                    "ADVANCED rules must declare condition_json",
                ));
                return None;
            };
            compile_matcher_tree(
                condition_json,
                cfg,
                &format!("{}.condition_json", path_prefix),
                0,
                debug_sink,
                errors,
            )
        }
    }
}

/// Expand a `USER`/`PIX_KEY`/`PIX_KEY_TYPE` alias into a single-value
/// `VALUE_IN` matcher. `closed_set`, when given, restricts the coerced value
/// to a fixed vocabulary (used only by `PIX_KEY_TYPE`).
fn compile_alias(
    rule: &RuleWire,
    field: &str,
    coerce: Coerce,
    path_prefix: &str,
    closed_set: Option<&[&str]>,
    debug_sink: Option<&DebugSinkHandle>,
    errors: &mut Vec<CompileErrorEntry>,
) -> Option<Matcher> {
    let path = format!("{}.condition_value", path_prefix);
    let Some(condition_value) = &rule.condition_value else {
        errors.push(CompileErrorEntry::new(
            path,
            CompileErrorKind::MissingCondition,
            format!("{:?} rules must declare condition_value", rule.condition_type),
        ));
        return None;
    };

    let Some(coerced) = coerce_json_literal(condition_value, coerce) else {
        errors.push(CompileErrorEntry::new(
            path,
            CompileErrorKind::BadType,
            "condition_value could not be coerced to the alias's expected type",
        ));
        return None;
    };

    if let Some(allowed) = closed_set {
        let crate::matcher::coerce::CoercedValue::Str(s) = &coerced else {
            errors.push(CompileErrorEntry::new(
                path,
                CompileErrorKind::InvalidPixKeyType,
                "PIX_KEY_TYPE value must be a string",
            ));
            return None;
        };
        if !allowed.contains(&s.as_str()) {
            errors.push(CompileErrorEntry::new(
                path,
                CompileErrorKind::InvalidPixKeyType,
                format!("'{}' is not a recognized pix key type", s),
            ));
            return None;
        }
    }

    let mut values = HashSet::new();
    values.insert(coerced);

    Some(finish(
        Matcher::new(
            path_prefix,
            MatcherKind::ValueIn(ValueInMatcher {
                field: field.to_string(),
                values,
                coerce,
            }),
        ),
        debug_sink,
    ))
}

/// Recursively compile a `MatcherWire` tree into a runtime [`Matcher`],
/// enforcing `cfg.max_tree_depth` the way the teacher's `validate_tree`
/// enforces `MAX_TREE_DEPTH`.
fn compile_matcher_tree(
    node: &MatcherWire,
    cfg: &SelectorConfig,
    path: &str,
    depth: usize,
    debug_sink: Option<&DebugSinkHandle>,
    errors: &mut Vec<CompileErrorEntry>,
) -> Option<Matcher> {
    if depth > cfg.max_tree_depth {
        errors.push(CompileErrorEntry::new(
            path,
            CompileErrorKind::ExcessiveDepth,
            format!("matcher tree exceeds max depth of {}", cfg.max_tree_depth),
        ));
        return None;
    }

    match node {
        MatcherWire::Leaf(leaf) => compile_leaf(leaf, cfg, path, debug_sink, errors),
        MatcherWire::All { all } => {
            let children = compile_children(all, cfg, path, "all", depth, debug_sink, errors);
            children.map(|c| finish(Matcher::new(path, MatcherKind::All(c)), debug_sink))
        }
        MatcherWire::Any { any } => {
            let children = compile_children(any, cfg, path, "any", depth, debug_sink, errors);
            children.map(|c| finish(Matcher::new(path, MatcherKind::Any(c)), debug_sink))
        }
        MatcherWire::None { none } => {
            let children = compile_children(none, cfg, path, "none", depth, debug_sink, errors);
            children.map(|c| finish(Matcher::new(path, MatcherKind::None(c)), debug_sink))
        }
    }
}

fn compile_children(
    nodes: &[MatcherWire],
    cfg: &SelectorConfig,
    path: &str,
    key: &str,
    depth: usize,
    debug_sink: Option<&DebugSinkHandle>,
    errors: &mut Vec<CompileErrorEntry>,
) -> Option<Vec<Matcher>> {
    let mut out = Vec::with_capacity(nodes.len());
    let mut ok = true;
    for (i, child) in nodes.iter().enumerate() {
        let child_path = format!("{}.{}[{}]", path, key, i);
        match compile_matcher_tree(child, cfg, &child_path, depth + 1, debug_sink, errors) {
            Some(m) => out.push(m),
            None => ok = false,
        }
    }
    ok.then_some(out)
}

fn compile_leaf(
    leaf: &LeafMatcherWire,
    cfg: &SelectorConfig,
    path: &str,
    debug_sink: Option<&DebugSinkHandle>,
    errors: &mut Vec<CompileErrorEntry>,
) -> Option<Matcher> {
    match leaf {
        LeafMatcherWire::ValueIn { field, values, coerce } => {
            let coerce = match Coerce::parse(coerce.as_deref()) {
                Some(c) => c,
                None => {
                    errors.push(CompileErrorEntry::new(
                        format!("{}.coerce", path),
                        CompileErrorKind::BadType,
                        format!("unrecognized coerce mode '{}'", coerce.as_deref().unwrap_or("")),
                    ));
                    return None;
                }
            };
            if values.is_empty() {
                errors.push(CompileErrorEntry::new(
                    format!("{}.values", path),
                    CompileErrorKind::EmptyValues,
                    "VALUE_IN.values must be non-empty",
                ));
                return None;
            }
            let mut coerced = HashSet::with_capacity(values.len());
            for (i, v) in values.iter().enumerate() {
                match coerce_json_literal(v, coerce) {
                    Some(c) => {
                        coerced.insert(c);
                    }
                    None => errors.push(CompileErrorEntry::new(
                        format!("{}.values[{}]", path, i),
                        CompileErrorKind::BadType,
                        "value could not be coerced",
                    )),
                }
            }
            if coerced.is_empty() {
                return None;
            }
            Some(finish(
                Matcher::new(
                    path,
                    MatcherKind::ValueIn(ValueInMatcher {
                        field: field.clone(),
                        values: coerced,
                        coerce,
                    }),
                ),
                debug_sink,
            ))
        }
        LeafMatcherWire::Regex { field, pattern, mode, flags, coerce, max_len } => {
            let coerce = match Coerce::parse(coerce.as_deref()) {
                Some(c) => c,
                None => {
                    errors.push(CompileErrorEntry::new(
                        format!("{}.coerce", path),
                        CompileErrorKind::BadType,
                        format!("unrecognized coerce mode '{}'", coerce.as_deref().unwrap_or("")),
                    ));
                    return None;
                }
            };
            let mode = match RegexMode::parse(mode.as_deref()) {
                Some(m) => m,
                None => {
                    errors.push(CompileErrorEntry::new(
                        format!("{}.mode", path),
                        CompileErrorKind::BadType,
                        format!("unrecognized regex mode '{}'", mode.as_deref().unwrap_or("")),
                    ));
                    return None;
                }
            };
            let requested_max_len = max_len.unwrap_or(cfg.max_regex_len_ceiling);
            let effective_max_len = requested_max_len.min(cfg.max_regex_len_ceiling);
            if effective_max_len == 0 {
                errors.push(CompileErrorEntry::new(
                    format!("{}.max_len", path),
                    CompileErrorKind::InvalidRegex,
                    "max_len must be at least 1",
                ));
                return None;
            }
            let final_pattern = build_pattern(pattern, flags.as_deref(), mode);
            let compiled = match Regex::new(&final_pattern) {
                Ok(r) => r,
                Err(e) => {
                    errors.push(CompileErrorEntry::new(
                        format!("{}.pattern", path),
                        CompileErrorKind::InvalidRegex,
                        format!("failed to compile pattern: {}", e),
                    ));
                    return None;
                }
            };
            Some(finish(
                Matcher::new(
                    path,
                    MatcherKind::Regex(RegexMatcherDef {
                        field: field.clone(),
                        compiled,
                        raw_pattern: pattern.clone(),
                        flags: flags.clone(),
                        mode,
                        coerce,
                        max_len: effective_max_len,
                    }),
                ),
                debug_sink,
            ))
        }
        LeafMatcherWire::AmountRange { field, coerce, scale, min, max, min_inclusive, max_inclusive } => {
            let coerce_raw = coerce.as_deref().unwrap_or("int");
            let coerce = match AmountCoerce::parse(coerce_raw) {
                Some(c) => c,
                None => {
                    errors.push(CompileErrorEntry::new(
                        format!("{}.coerce", path),
                        CompileErrorKind::BadType,
                        format!("unrecognized amount coerce '{}'", coerce_raw),
                    ));
                    return None;
                }
            };
            let scale = scale.unwrap_or(0);
            let min_decimal = match parse_optional_decimal(min, &format!("{}.min", path), errors) {
                Ok(d) => d,
                Err(()) => return None,
            };
            let max_decimal = match parse_optional_decimal(max, &format!("{}.max", path), errors) {
                Ok(d) => d,
                Err(()) => return None,
            };
            if let (Some(lo), Some(hi)) = (min_decimal, max_decimal) {
                if lo > hi {
                    errors.push(CompileErrorEntry::new(
                        path,
                        CompileErrorKind::BadDecimal,
                        "min must be less than or equal to max",
                    ));
                    return None;
                }
            }
            Some(finish(
                Matcher::new(
                    path,
                    MatcherKind::AmountRange(AmountRangeMatcher {
                        field: field.clone(),
                        coerce,
                        scale,
                        min: min_decimal,
                        max: max_decimal,
                        min_inclusive: *min_inclusive,
                        max_inclusive: *max_inclusive,
                    }),
                ),
                debug_sink,
            ))
        }
        LeafMatcherWire::TimeWindow { tz, start, end, days_of_week } => {
            let parsed_tz: Result<chrono_tz::Tz, _> = tz.parse();
            let Ok(parsed_tz) = parsed_tz else {
                errors.push(CompileErrorEntry::new(
                    format!("{}.tz", path),
                    CompileErrorKind::InvalidTimezone,
                    format!("'{}' is not a recognized IANA timezone", tz),
                ));
                return None;
            };
            let Some(start_time) = parse_time_of_day(start) else {
                errors.push(CompileErrorEntry::new(
                    format!("{}.start", path),
                    CompileErrorKind::InvalidTimeFormat,
                    format!("'{}' is not a valid HH:MM[:SS] time", start),
                ));
                return None;
            };
            let Some(end_time) = parse_time_of_day(end) else {
                errors.push(CompileErrorEntry::new(
                    format!("{}.end", path),
                    CompileErrorKind::InvalidTimeFormat,
                    format!("'{}' is not a valid HH:MM[:SS] time", end),
                ));
                return None;
            };
            let days = match days_of_week {
                None => None,
                Some(raw_days) => {
                    let mut set = HashSet::with_capacity(raw_days.len());
                    let mut ok = true;
                    for (i, d) in raw_days.iter().enumerate() {
                        match parse_weekday(d) {
                            Some(w) => {
                                set.insert(w);
                            }
                            None => {
                                errors.push(CompileErrorEntry::new(
                                    format!("{}.days_of_week[{}]", path, i),
                                    CompileErrorKind::BadType,
                                    format!("'{}' is not a recognized weekday", d),
                                ));
                                ok = false;
                            }
                        }
                    }
                    if !ok {
                        return None;
                    }
                    Some(set)
                }
            };
            Some(finish(
                Matcher::new(
                    path,
                    MatcherKind::TimeWindow(crate::matcher::time_window::TimeWindowMatcher {
                        tz_name: tz.clone(),
                        tz: parsed_tz,
                        start: start_time,
                        end: end_time,
                        days_of_week: days,
                    }),
                ),
                debug_sink,
            ))
        }
    }
}

fn parse_optional_decimal(
    value: &Option<serde_json::Value>,
    path: &str,
    errors: &mut Vec<CompileErrorEntry>,
) -> Result<Option<rust_decimal::Decimal>, ()> {
    let Some(value) = value else {
        return Ok(None);
    };
    let as_str = match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => {
            errors.push(CompileErrorEntry::new(
                path,
                CompileErrorKind::BadDecimal,
                "bound must be a number or decimal string",
            ));
            return Err(());
        }
    };
    match as_str.parse::<rust_decimal::Decimal>() {
        Ok(d) => Ok(Some(d)),
        Err(_) => {
            errors.push(CompileErrorEntry::new(
                path,
                CompileErrorKind::BadDecimal,
                format!("'{}' is not a valid decimal", as_str),
            ));
            Err(())
        }
    }
}

fn compile_action(
    action: &ActionWire,
    known_gateways: &HashSet<String>,
    cfg: &SelectorConfig,
    path: &str,
    errors: &mut Vec<CompileErrorEntry>,
) -> Option<CompiledAction> {
    match action {
        ActionWire::Fixed { gateway } => {
            if !known_gateways.contains(gateway) {
                errors.push(CompileErrorEntry::new(
                    format!("{}.gateway", path),
                    CompileErrorKind::UnknownGateway,
                    format!("'{}' is not among the ruleset's declared gateways", gateway),
                ));
                return None;
            }
            Some(CompiledAction::Fixed { gateway: gateway.clone() })
        }
        ActionWire::Weighted { weights, sticky_by } => {
            let mut ok = true;
            for gateway in weights.keys() {
                if !known_gateways.contains(gateway) {
                    errors.push(CompileErrorEntry::new(
                        format!("{}.weights.{}", path, gateway),
                        CompileErrorKind::UnknownGateway,
                        format!("'{}' is not among the ruleset's declared gateways", gateway),
                    ));
                    ok = false;
                }
            }
            if !ok {
                return None;
            }
            match normalize_weights(weights, cfg.weighted_total) {
                Ok((entries, total)) => Some(CompiledAction::Weighted {
                    entries,
                    total,
                    sticky_by: sticky_by.clone(),
                }),
                Err((kind, message)) => {
                    errors.push(CompileErrorEntry::new(format!("{}.weights", path), kind, message));
                    None
                }
            }
        }
        ActionWire::Deny { reason_code } => {
            if reason_code.trim().is_empty() {
                errors.push(CompileErrorEntry::new(
                    format!("{}.reason_code", path),
                    CompileErrorKind::BadType,
                    "reason_code must be a non-empty string",
                ));
                return None;
            }
            Some(CompiledAction::Deny { reason_code: reason_code.clone() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rule::wire::RuleWire;

    fn gateways(names: &[&str]) -> HashSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn user_alias_expands_to_value_in_on_api_user_id() {
        let rule: RuleWire = serde_json::from_str(
            r#"{"id":1,"priority":1,"enabled":true,"condition_type":"USER","condition_value":999,
                "action":{"route":"DENY","reason_code":"blocked"}}"#,
        )
        .unwrap();
        let cfg = SelectorConfig::default();
        let mut errors = Vec::new();
        let compiled = compile_rule(&rule, &gateways(&["CELCOIN"]), &cfg, "rules[0]", None, &mut errors).unwrap();
        assert!(errors.is_empty());
        match compiled.matcher.kind {
            MatcherKind::ValueIn(v) => assert_eq!(v.field, "api_user_id"),
            _ => panic!("expected VALUE_IN"),
        }
    }

    #[test]
    fn pix_key_type_alias_rejects_unknown_value() {
        let rule: RuleWire = serde_json::from_str(
            r#"{"id":1,"priority":1,"enabled":true,"condition_type":"PIX_KEY_TYPE","condition_value":"BOGUS",
                "action":{"route":"DENY","reason_code":"x"}}"#,
        )
        .unwrap();
        let cfg = SelectorConfig::default();
        let mut errors = Vec::new();
        let compiled = compile_rule(&rule, &gateways(&["CELCOIN"]), &cfg, "rules[0]", None, &mut errors);
        assert!(compiled.is_none());
        assert_eq!(errors[0].kind, CompileErrorKind::InvalidPixKeyType);
    }

    #[test]
    fn advanced_rule_compiles_all_node_with_two_leaves() {
        let rule: RuleWire = serde_json::from_str(
            r#"{"id":3,"priority":3,"enabled":true,"condition_type":"ADVANCED",
                "condition_json": {"all": [
                    {"type":"VALUE_IN","field":"pix_key_type","values":["EVP"]},
                    {"type":"AMOUNT_RANGE","field":"amount","coerce":"int","scale":2,"min":"0.00","max":"1000.00"}
                ]},
                "action":{"route":"WEIGHTED","weights":{"CELCOIN":70,"E2E":30},"sticky_by":"api_user_id"}}"#,
        )
        .unwrap();
        let cfg = SelectorConfig::default();
        let mut errors = Vec::new();
        let compiled = compile_rule(&rule, &gateways(&["CELCOIN", "E2E"]), &cfg, "rules[0]", None, &mut errors).unwrap();
        assert!(errors.is_empty());
        match compiled.matcher.kind {
            MatcherKind::All(children) => assert_eq!(children.len(), 2),
            _ => panic!("expected ALL"),
        }
        assert!(matches!(compiled.action, CompiledAction::Weighted { .. }));
    }

    #[test]
    fn fixed_action_rejects_unknown_gateway() {
        let rule: RuleWire = serde_json::from_str(
            r#"{"id":1,"priority":1,"enabled":true,"condition_type":"USER","condition_value":1,
                "action":{"route":"FIXED","gateway":"GHOST"}}"#,
        )
        .unwrap();
        let cfg = SelectorConfig::default();
        let mut errors = Vec::new();
        let compiled = compile_rule(&rule, &gateways(&["CELCOIN"]), &cfg, "rules[0]", None, &mut errors);
        assert!(compiled.is_none());
        assert_eq!(errors[0].kind, CompileErrorKind::UnknownGateway);
    }

    #[test]
    fn amount_range_min_greater_than_max_is_rejected() {
        let rule: RuleWire = serde_json::from_str(
            r#"{"id":1,"priority":1,"enabled":true,"condition_type":"ADVANCED",
                "condition_json": {"type":"AMOUNT_RANGE","field":"amount","coerce":"decimal","min":"100","max":"1"},
                "action":{"route":"DENY","reason_code":"x"}}"#,
        )
        .unwrap();
        let cfg = SelectorConfig::default();
        let mut errors = Vec::new();
        let compiled = compile_rule(&rule, &gateways(&["CELCOIN"]), &cfg, "rules[0]", None, &mut errors);
        assert!(compiled.is_none());
        assert_eq!(errors[0].kind, CompileErrorKind::BadDecimal);
    }

    #[test]
    fn excessive_tree_depth_is_rejected() {
        let mut json = serde_json::json!({"type": "VALUE_IN", "field": "x", "values": [1]});
        for _ in 0..100 {
            json = serde_json::json!({"all": [json]});
        }
        let rule_json = serde_json::json!({
            "id": 1, "priority": 1, "enabled": true, "condition_type": "ADVANCED",
            "condition_json": json,
            "action": {"route": "DENY", "reason_code": "x"},
        });
        let rule: RuleWire = serde_json::from_value(rule_json).unwrap();
        let cfg = SelectorConfig::default();
        let mut errors = Vec::new();
        let compiled = compile_rule(&rule, &gateways(&["CELCOIN"]), &cfg, "rules[0]", None, &mut errors);
        assert!(compiled.is_none());
        assert!(errors.iter().any(|e| e.kind == CompileErrorKind::ExcessiveDepth));
    }
}
