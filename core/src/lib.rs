//! A dynamic payment-gateway selector: compiles an operator-maintained
//! ruleset into an immutable, pre-validated snapshot, then evaluates that
//! snapshot against request contexts on the hot path.
//!
//! Module layout follows the data flow, leaves first:
//!
//! - [`scalar`] / [`config`] / [`hash`] / [`rng`] — shared primitives.
//! - [`matcher`] — the compiled boolean predicate tree (`VALUE_IN`,
//!   `REGEX`, `AMOUNT_RANGE`, `TIME_WINDOW`, `ALL`/`ANY`/`NONE`).
//! - [`action`] — normalized routing payloads (`FIXED`/`WEIGHTED`/`DENY`).
//! - [`rule`] — one rule's wire format and compiler (alias expansion +
//!   matcher-tree + action compilation).
//! - [`ruleset`] — the whole-document compiler, the immutable [`ruleset::Snapshot`]
//!   it produces, and the exporter that renders one back to wire JSON.
//! - [`registry`] — lock-free hot-swappable holder of the active snapshot.
//! - [`selector`] — the evaluation loop: priority order, short-circuit
//!   matching, action resolution, default fallback.
//! - [`decision_event`] — the non-PII observability event emitted once per
//!   selection.
//! - [`error`] — compile-time and selection-time error types.

pub mod action;
pub mod config;
pub mod decision_event;
pub mod error;
pub mod hash;
pub mod matcher;
pub mod registry;
pub mod rng;
pub mod rule;
pub mod ruleset;
pub mod scalar;
pub mod selector;

pub use config::SelectorConfig;
pub use decision_event::{DecisionEvent, DecisionKind, OnDecision};
pub use error::{CompileError, CompileErrorEntry, CompileErrorKind, SelectionError};
pub use registry::{SnapshotRef, SnapshotRegistry};
pub use matcher::debug::{DebugSink, DebugSinkHandle, MatcherTrace};
pub use ruleset::{compile_ruleset, export_snapshot, CompileOptions, RulesetWire, Snapshot};
pub use scalar::{Context, Scalar};
pub use selector::{select_from_registry, Decision, SelectOptions, Selector};
