//! Lock-free, wait-free holder of the single active [`Snapshot`].
//!
//! Readers (selections) never block writers (installs) and vice versa:
//! `current()` is a single atomic load, `install()` a single atomic swap.
//! Grounded on `arc_swap::ArcSwapOption`, the same shape the teacher reaches
//! for with plain `Arc<Mutex<_>>` state elsewhere in `orchestrator/`, but
//! without the mutex — a selection must never wait on a lock held by a
//! concurrent rule activation.

use crate::ruleset::Snapshot;
use arc_swap::ArcSwapOption;
use std::sync::Arc;

/// A borrowed handle to the snapshot active at the moment `current()` was
/// called. Holding this keeps that exact snapshot alive for the duration
/// of one selection, even if a concurrent `install()` swaps in a newer one.
pub type SnapshotRef = Arc<Snapshot>;

/// Holds the currently active snapshot, if any. Exactly one snapshot is
/// installed at any time after the first successful `install`.
#[derive(Default)]
pub struct SnapshotRegistry {
    current: ArcSwapOption<Snapshot>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self {
            current: ArcSwapOption::from(None),
        }
    }

    /// Borrow the active snapshot, if one has been installed. The returned
    /// handle is independent of any later `install()` call.
    pub fn current(&self) -> Option<SnapshotRef> {
        self.current.load_full()
    }

    /// Atomically replace the active snapshot, returning whatever was
    /// previously installed (or `None` on first install) so the caller can
    /// decide when to drop it.
    pub fn install(&self, snapshot: Snapshot) -> Option<SnapshotRef> {
        let (new_id, new_version) = (snapshot.id, snapshot.version);
        let prior = self.current.swap(Some(Arc::new(snapshot)));
        match &prior {
            Some(old) => tracing::info!(
                ruleset_id = new_id,
                from_version = old.version,
                to_version = new_version,
                "ruleset version bumped"
            ),
            None => tracing::info!(ruleset_id = new_id, version = new_version, "ruleset installed"),
        }
        prior
    }

    /// `(id, version)` of the active snapshot, for observability.
    pub fn active_id(&self) -> Option<(i64, i64)> {
        self.current.load().as_ref().map(|s| (s.id, s.version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn snapshot(id: i64) -> Snapshot {
        Snapshot {
            id,
            version: 1,
            default_gateway: None,
            known_gateways: HashSet::new(),
            rules: Vec::new(),
            compiled_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn current_is_none_before_first_install() {
        let registry = SnapshotRegistry::new();
        assert!(registry.current().is_none());
        assert!(registry.active_id().is_none());
    }

    #[test]
    fn install_returns_prior_snapshot() {
        let registry = SnapshotRegistry::new();
        assert!(registry.install(snapshot(1)).is_none());
        let prior = registry.install(snapshot(2));
        assert_eq!(prior.unwrap().id, 1);
        assert_eq!(registry.active_id(), Some((2, 1)));
    }

    #[test]
    fn reader_holding_old_handle_is_unaffected_by_later_install() {
        let registry = SnapshotRegistry::new();
        registry.install(snapshot(1));
        let handle = registry.current().unwrap();
        registry.install(snapshot(2));
        assert_eq!(handle.id, 1);
        assert_eq!(registry.current().unwrap().id, 2);
    }
}
