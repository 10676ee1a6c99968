//! Operator-tunable knobs that live outside any one ruleset document.
//!
//! Mirrors the teacher's `OrchestratorConfig`/`PolicyConfig` split between
//! "what a scenario file describes" and "what the process is configured
//! with once". A ruleset's JSON never carries these; they are set per
//! deployment and apply uniformly to every ruleset compiled in that process.

use serde::{Deserialize, Serialize};

/// Process-wide compiler/selector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Fixed total that WEIGHTED actions are normalized to (spec default
    /// 10_000 cumulative buckets).
    pub weighted_total: u32,

    /// Maximum nesting depth of a matcher tree (ALL/ANY/NONE composition),
    /// mirroring the teacher's `MAX_TREE_DEPTH` guard in `validation.rs`.
    pub max_tree_depth: usize,

    /// Hard ceiling on `REGEX.max_len`, regardless of what a rule requests.
    /// This bounds the ReDoS guard even if an operator mistakenly
    /// configures a huge `max_len` in the ruleset JSON.
    pub max_regex_len_ceiling: usize,

    /// Domain-separation constant mixed into the stable hash used for
    /// sticky weighted routing. Frozen for the lifetime of a deployment:
    /// changing it reshuffles every sticky assignment.
    pub hash_domain: u64,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            weighted_total: 10_000,
            max_tree_depth: 64,
            max_regex_len_ceiling: 4_096,
            hash_domain: 0x9E37_79B9_7F4A_7C15,
        }
    }
}
