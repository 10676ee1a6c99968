//! Compiles a whole ruleset document into an immutable [`Snapshot`].
//!
//! Mirrors the teacher's `validate_tree`/`compile_policy` pipeline
//! (`policy/validation.rs`, `policy/compiler.rs`): validate top-level
//! shape, compile every surviving rule while accumulating errors, and
//! only emit a snapshot if the whole batch is clean.

use super::snapshot::Snapshot;
use super::wire::RulesetWire;
use crate::config::SelectorConfig;
use crate::error::{CompileError, CompileErrorEntry, CompileErrorKind};
use crate::matcher::debug::DebugSinkHandle;
use crate::rule::compile_rule;
use chrono::Utc;
use std::collections::HashSet;

/// Compile-time knobs for [`compile_ruleset`]. `debug_sink`, when set, bakes
/// a `MatcherKind::Debug` wrapper around every compiled matcher node,
/// reporting each evaluation to the sink. Left `None` (the default), the
/// compiled tree carries no wrapper at all — zero cost on the hot path.
#[derive(Clone, Default)]
pub struct CompileOptions {
    pub debug_sink: Option<DebugSinkHandle>,
}

/// Compile `wire` into an immutable, ready-to-install [`Snapshot`].
///
/// Steps (spec §4.3): validate top level, drop disabled rules, compile
/// every surviving rule (accumulating errors across the whole ruleset),
/// reject duplicate priorities, sort ascending by priority, stamp
/// `compiled_at`. Any error anywhere aborts the whole compile — a
/// `Snapshot` is never partially valid.
pub fn compile_ruleset(
    wire: &RulesetWire,
    cfg: &SelectorConfig,
    opts: &CompileOptions,
) -> Result<Snapshot, CompileError> {
    let mut errors = Vec::new();

    if wire.gateways.is_empty() {
        errors.push(CompileErrorEntry::new(
            "gateways",
            CompileErrorKind::EmptyValues,
            "ruleset must declare at least one gateway",
        ));
    }

    let known_gateways: HashSet<String> = wire.gateways.iter().cloned().collect();

    if let Some(default_gateway) = &wire.default_gateway {
        if !known_gateways.contains(default_gateway) {
            errors.push(CompileErrorEntry::new(
                "default_gateway",
                CompileErrorKind::UnknownGateway,
                format!("'{}' is not among the declared gateways", default_gateway),
            ));
        }
    }

    if !errors.is_empty() {
        tracing::error!(ruleset_id = wire.id, error_count = errors.len(), "ruleset rejected at top-level validation");
        return Err(CompileError(errors));
    }

    let enabled_rules: Vec<_> = wire.rules.iter().filter(|r| r.enabled).collect();

    let mut compiled_rules = Vec::with_capacity(enabled_rules.len());
    for (i, rule) in enabled_rules.iter().enumerate() {
        let path = format!("rules[{}]", i);
        match compile_rule(rule, &known_gateways, cfg, &path, opts.debug_sink.as_ref(), &mut errors) {
            Some(compiled) => compiled_rules.push(compiled),
            None => {}
        }
    }

    if !errors.is_empty() {
        tracing::error!(ruleset_id = wire.id, error_count = errors.len(), "ruleset rejected: rule compile errors");
        return Err(CompileError(errors));
    }

    let mut seen_priorities = HashSet::with_capacity(compiled_rules.len());
    for rule in &compiled_rules {
        if !seen_priorities.insert(rule.priority) {
            errors.push(CompileErrorEntry::new(
                format!("rules[id={}]", rule.id),
                CompileErrorKind::DuplicatePriority,
                format!("priority {} is used by more than one enabled rule", rule.priority),
            ));
        }
    }

    if !errors.is_empty() {
        tracing::error!(ruleset_id = wire.id, error_count = errors.len(), "ruleset rejected: duplicate priorities");
        return Err(CompileError(errors));
    }

    compiled_rules.sort_by_key(|r| r.priority);

    tracing::info!(ruleset_id = wire.id, version = wire.version, rule_count = compiled_rules.len(), "ruleset compiled");

    Ok(Snapshot {
        id: wire.id,
        version: wire.version,
        default_gateway: wire.default_gateway.clone(),
        known_gateways,
        rules: compiled_rules,
        compiled_at: Utc::now(),
    })
}
