//! Compile-time and selection-time error types.
//!
//! Mirrors the teacher's per-subsystem `thiserror` enums
//! (`AgentError`, `ContextError`, `ValidationError`, `EvalError`): each
//! fallible stage of the pipeline gets its own small enum, and the
//! ruleset compiler accumulates a `Vec` of entries rather than bailing out
//! on the first problem, so the operator sees every mistake in one pass.

use thiserror::Error;

/// The kind of problem found while compiling a rule or ruleset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    UnknownField,
    BadType,
    UnknownGateway,
    DuplicatePriority,
    EmptyValues,
    InvalidRegex,
    InvalidTimezone,
    InvalidTimeFormat,
    BadDecimal,
    WeightsSumZero,
    InvalidPixKeyType,
    ExcessiveDepth,
    MissingCondition,
}

impl CompileErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompileErrorKind::UnknownField => "unknown_field",
            CompileErrorKind::BadType => "bad_type",
            CompileErrorKind::UnknownGateway => "unknown_gateway",
            CompileErrorKind::DuplicatePriority => "duplicate_priority",
            CompileErrorKind::EmptyValues => "empty_values",
            CompileErrorKind::InvalidRegex => "invalid_regex",
            CompileErrorKind::InvalidTimezone => "invalid_timezone",
            CompileErrorKind::InvalidTimeFormat => "invalid_time_format",
            CompileErrorKind::BadDecimal => "bad_decimal",
            CompileErrorKind::WeightsSumZero => "weights_sum_zero",
            CompileErrorKind::InvalidPixKeyType => "invalid_pix_key_type",
            CompileErrorKind::ExcessiveDepth => "excessive_depth",
            CompileErrorKind::MissingCondition => "missing_condition",
        }
    }
}

/// One compile error, tagged with a JSON-pointer-like path to the offending
/// node, e.g. `rules[3].condition_json.all[1].pattern`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileErrorEntry {
    pub path: String,
    pub kind: CompileErrorKind,
    pub message: String,
}

impl CompileErrorEntry {
    pub fn new(path: impl Into<String>, kind: CompileErrorKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for CompileErrorEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {} ({})", self.path, self.message, self.kind.as_str())
    }
}

/// All errors found while compiling one ruleset. Never partially
/// installed: any non-empty `CompileError` aborts activation and the
/// previously active snapshot (if any) is left untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileError(pub Vec<CompileErrorEntry>);

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ruleset failed to compile with {} error(s): ", self.0.len())?;
        let rendered: Vec<String> = self.0.iter().map(|e| e.to_string()).collect();
        write!(f, "{}", rendered.join("; "))
    }
}

impl std::error::Error for CompileError {}

impl CompileError {
    pub fn single(path: impl Into<String>, kind: CompileErrorKind, message: impl Into<String>) -> Self {
        CompileError(vec![CompileErrorEntry::new(path, kind, message)])
    }

    pub fn entries(&self) -> &[CompileErrorEntry] {
        &self.0
    }
}

/// Errors the selector itself (not the compiler) can raise. Evaluation-time
/// anomalies (missing fields, coercion failures, non-matching regexes) are
/// absorbed as `false` on the offending matcher and never reach here — the
/// selector is total over any well-formed ruleset/context pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("no snapshot has been installed in the registry")]
    NoActiveSnapshot,
}
