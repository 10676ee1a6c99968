//! One rule: its wire format and the compiler that turns it into a
//! runtime [`compiler::CompiledRule`].

pub mod compiler;
pub mod wire;

pub use compiler::{compile_rule, CompiledRule};
