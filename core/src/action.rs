//! Compiled, pre-validated routing actions.
//!
//! `CompiledAction` is the normalized form of a rule's declared action: by
//! the time the ruleset compiler is done, every gateway name has been
//! checked against `known_gateways` and every WEIGHTED action has been
//! reduced to a deterministic cumulative-distribution array, so the
//! selector's hot path never revalidates anything.

use crate::error::CompileErrorKind;
use std::collections::HashMap;

/// One gateway's slot in a WEIGHTED action's cumulative distribution.
/// `cumulative` is the running total *through* this entry (inclusive), so
/// gateways are found by the first entry whose `cumulative` exceeds the
/// drawn value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeightedEntry {
    pub gateway: String,
    pub cumulative: u32,
}

/// A rule's normalized action, ready for direct use on the selection hot
/// path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompiledAction {
    Fixed {
        gateway: String,
    },
    Weighted {
        /// Sorted ascending by gateway name, cumulative weights strictly
        /// increasing. Deterministic gateway ordering is what makes sticky
        /// hashing stable across recompiles of the same logical rule.
        entries: Vec<WeightedEntry>,
        total: u32,
        sticky_by: Option<String>,
    },
    Deny {
        reason_code: String,
    },
}

impl CompiledAction {
    /// Binary-search the cumulative array for the bucket containing `draw`
    /// (`draw` must be in `[0, total)`). O(log n) as required by the spec.
    pub fn resolve_weighted_bucket(entries: &[WeightedEntry], draw: u32) -> &str {
        let idx = entries.partition_point(|e| e.cumulative <= draw);
        let idx = idx.min(entries.len() - 1);
        &entries[idx].gateway
    }
}

/// Normalize a declared weight map into a cumulative-distribution array
/// summing exactly to `target_total`.
///
/// Algorithm (spec §4.2): scale each weight to `weight * target_total /
/// sum`, floor it, then distribute the `target_total - sum(floors)`
/// leftover buckets one at a time to the entries with the largest
/// fractional remainder, breaking ties by ascending gateway name. Entries
/// are then sorted by gateway name (already the tie-break order) before
/// building the cumulative array, so two compiles of the same weight map
/// always produce the same array — required for stable sticky hashing.
pub fn normalize_weights(
    weights: &HashMap<String, i64>,
    target_total: u32,
) -> Result<(Vec<WeightedEntry>, u32), (CompileErrorKind, String)> {
    let mut names: Vec<&String> = weights.keys().collect();
    names.sort();

    let mut sum: i128 = 0;
    for name in &names {
        let w = weights[*name];
        if w < 0 {
            return Err((
                CompileErrorKind::BadType,
                format!("weight for gateway '{}' must be non-negative, got {}", name, w),
            ));
        }
        sum += w as i128;
    }
    if sum == 0 {
        return Err((
            CompileErrorKind::WeightsSumZero,
            "WEIGHTED action must have at least one entry with weight > 0".to_string(),
        ));
    }

    let target = target_total as i128;
    let mut base = Vec::with_capacity(names.len());
    let mut remainders: Vec<(usize, i128)> = Vec::with_capacity(names.len());
    let mut allocated: i128 = 0;

    for (i, name) in names.iter().enumerate() {
        let w = weights[*name] as i128;
        let raw = w * target;
        let floor = raw / sum;
        let remainder = raw % sum;
        base.push(floor as u32);
        remainders.push((i, remainder));
        allocated += floor;
    }

    let mut leftover = target - allocated;
    debug_assert!(leftover >= 0);

    // Largest fractional remainder first; ties broken by ascending gateway
    // name, which is already `names`' order since `remainders` preserves
    // index order and we stable-sort only by remainder descending.
    remainders.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (idx, _) in remainders {
        if leftover == 0 {
            break;
        }
        base[idx] += 1;
        leftover -= 1;
    }

    let mut cumulative = 0u32;
    let mut entries = Vec::with_capacity(names.len());
    for (i, name) in names.iter().enumerate() {
        if base[i] == 0 {
            continue;
        }
        cumulative += base[i];
        entries.push(WeightedEntry {
            gateway: (*name).clone(),
            cumulative,
        });
    }

    Ok((entries, cumulative))
}
