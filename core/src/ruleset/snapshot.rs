//! The compiled, immutable snapshot a [`crate::registry::SnapshotRegistry`]
//! holds and a [`crate::selector::Selector`] evaluates against.

use crate::rule::CompiledRule;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// A fully compiled, validated ruleset. Immutable: once built, nothing
/// about a `Snapshot` ever changes. Replacing a ruleset always means
/// installing a brand new `Snapshot`, never mutating this one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub id: i64,
    pub version: i64,
    pub default_gateway: Option<String>,
    pub known_gateways: HashSet<String>,
    /// Sorted ascending by priority.
    pub rules: Vec<CompiledRule>,
    pub compiled_at: DateTime<Utc>,
}

impl Snapshot {
    /// A content fingerprint covering everything that affects selection
    /// outcomes (rule order, matchers, actions) but not `compiled_at`, so
    /// two compiles of byte-identical ruleset JSON at different instants
    /// fingerprint identically. Grounded on the teacher's `config_hash` in
    /// `orchestrator/checkpoint.rs`, which hashes configuration content the
    /// same way for change detection.
    pub fn fingerprint(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.id.to_le_bytes());
        hasher.update(self.version.to_le_bytes());
        if let Some(g) = &self.default_gateway {
            hasher.update(g.as_bytes());
        }
        let mut gateways: Vec<&String> = self.known_gateways.iter().collect();
        gateways.sort();
        for g in gateways {
            hasher.update(g.as_bytes());
        }
        for rule in &self.rules {
            hasher.update(rule.id.to_le_bytes());
            hasher.update(rule.priority.to_le_bytes());
            hasher.update(format!("{:?}", rule.matcher).as_bytes());
            hasher.update(format!("{:?}", rule.action).as_bytes());
        }
        hasher.finalize().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_snapshot(id: i64) -> Snapshot {
        Snapshot {
            id,
            version: 1,
            default_gateway: None,
            known_gateways: HashSet::new(),
            rules: Vec::new(),
            compiled_at: Utc::now(),
        }
    }

    #[test]
    fn fingerprint_ignores_compiled_at() {
        let mut a = empty_snapshot(1);
        let mut b = empty_snapshot(1);
        a.compiled_at = DateTime::from_timestamp(0, 0).unwrap();
        b.compiled_at = DateTime::from_timestamp(1_000_000, 0).unwrap();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_differs_on_id() {
        let a = empty_snapshot(1);
        let b = empty_snapshot(2);
        assert_ne!(a.fingerprint(), b.fingerprint());
    }
}
