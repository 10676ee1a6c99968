//! JSON wire format for a whole ruleset document (spec.md §6).

use crate::rule::wire::RuleWire;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RulesetWire {
    pub id: i64,
    pub version: i64,
    #[serde(default)]
    pub default_gateway: Option<String>,
    pub gateways: Vec<String>,
    pub rules: Vec<RuleWire>,
}
