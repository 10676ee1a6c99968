//! The whole-ruleset pipeline: wire format in, compiled [`Snapshot`] out,
//! and back out again through [`export::export_snapshot`].

pub mod compiler;
pub mod export;
pub mod snapshot;
pub mod wire;

pub use compiler::{compile_ruleset, CompileOptions};
pub use export::export_snapshot;
pub use snapshot::Snapshot;
pub use wire::RulesetWire;
