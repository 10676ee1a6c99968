//! JSON wire format for one rule and its condition/action payloads.
//!
//! Shapes exactly the `rules[]` entries of spec.md §6, generalizing the
//! teacher's `TreeNode`/`Expression` deserialization
//! (`policy/tree/types.rs`) from a two-branch if/else tree to the
//! `ALL`/`ANY`/`NONE`-composed matcher tree this engine evaluates.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ConditionType {
    #[serde(rename = "USER")]
    User,
    #[serde(rename = "PIX_KEY")]
    PixKey,
    #[serde(rename = "PIX_KEY_TYPE")]
    PixKeyType,
    #[serde(rename = "ADVANCED")]
    Advanced,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RuleWire {
    pub id: i64,
    pub priority: i64,
    pub enabled: bool,
    pub condition_type: ConditionType,
    #[serde(default)]
    pub condition_value: Option<JsonValue>,
    #[serde(default)]
    pub condition_json: Option<MatcherWire>,
    pub action: ActionWire,
}

/// A matcher-tree JSON node: either a leaf (tagged by `type`) or one of
/// the three boolean connectives (tagged by which single key is present).
/// `#[serde(untagged)]` tries each variant in declaration order, which is
/// why leaves are listed before connectives — a leaf's `type` field would
/// also (accidentally) satisfy neither connective shape, so order here
/// only matters for good error messages, not correctness.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum MatcherWire {
    Leaf(LeafMatcherWire),
    All { all: Vec<MatcherWire> },
    Any { any: Vec<MatcherWire> },
    None { none: Vec<MatcherWire> },
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum LeafMatcherWire {
    #[serde(rename = "VALUE_IN")]
    ValueIn {
        field: String,
        values: Vec<JsonValue>,
        #[serde(default)]
        coerce: Option<String>,
    },
    #[serde(rename = "REGEX")]
    Regex {
        field: String,
        pattern: String,
        #[serde(default)]
        mode: Option<String>,
        #[serde(default)]
        flags: Option<String>,
        #[serde(default)]
        coerce: Option<String>,
        #[serde(default)]
        max_len: Option<usize>,
    },
    #[serde(rename = "AMOUNT_RANGE")]
    AmountRange {
        field: String,
        #[serde(default)]
        coerce: Option<String>,
        #[serde(default)]
        scale: Option<u32>,
        #[serde(default)]
        min: Option<JsonValue>,
        #[serde(default)]
        max: Option<JsonValue>,
        #[serde(default = "default_true")]
        min_inclusive: bool,
        #[serde(default = "default_true")]
        max_inclusive: bool,
    },
    #[serde(rename = "TIME_WINDOW")]
    TimeWindow {
        tz: String,
        start: String,
        end: String,
        #[serde(default)]
        days_of_week: Option<Vec<String>>,
    },
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(tag = "route")]
pub enum ActionWire {
    #[serde(rename = "FIXED")]
    Fixed { gateway: String },
    #[serde(rename = "WEIGHTED")]
    Weighted {
        weights: std::collections::HashMap<String, i64>,
        #[serde(default)]
        sticky_by: Option<String>,
    },
    #[serde(rename = "DENY")]
    Deny { reason_code: String },
}
