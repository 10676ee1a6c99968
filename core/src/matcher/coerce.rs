//! Shared field-coercion rules used by VALUE_IN and REGEX matchers.

use crate::scalar::Scalar;
use serde_json::Value as JsonValue;

/// How a raw context field (or a rule-declared literal) is normalized
/// before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coerce {
    Int,
    Str,
    LowerStr,
    /// Use the raw value's natural representation, neither parsed nor
    /// case-folded.
    Null,
}

impl Coerce {
    pub fn parse(raw: Option<&str>) -> Option<Coerce> {
        match raw {
            None => Some(Coerce::Null),
            Some("int") => Some(Coerce::Int),
            Some("str") => Some(Coerce::Str),
            Some("lower-str") => Some(Coerce::LowerStr),
            Some("null") => Some(Coerce::Null),
            Some(_) => None,
        }
    }
}

/// A coerced value, hashable so VALUE_IN's `values` set can do O(1)
/// membership tests.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CoercedValue {
    Int(i64),
    Str(String),
}

/// Coerce a context scalar per `coerce`. Returns `None` on coercion
/// failure (absorbed by the caller as a non-match, never an error).
pub fn coerce_scalar(scalar: &Scalar, coerce: Coerce) -> Option<CoercedValue> {
    match coerce {
        Coerce::Int => scalar.to_int().map(CoercedValue::Int),
        Coerce::Str => Some(CoercedValue::Str(scalar.to_display_string())),
        Coerce::LowerStr => Some(CoercedValue::Str(scalar.to_display_string().to_lowercase())),
        Coerce::Null => Some(raw_coerced(scalar)),
    }
}

fn raw_coerced(scalar: &Scalar) -> CoercedValue {
    match scalar {
        Scalar::Int(i) => CoercedValue::Int(*i),
        other => CoercedValue::Str(other.to_display_string()),
    }
}

/// Coerce a rule-declared JSON literal (one entry of VALUE_IN's `values`)
/// the same way a context scalar would be coerced, so both sides of the
/// membership test land in the same representation.
pub fn coerce_json_literal(literal: &JsonValue, coerce: Coerce) -> Option<CoercedValue> {
    match coerce {
        Coerce::Int => {
            if let Some(i) = literal.as_i64() {
                Some(CoercedValue::Int(i))
            } else if let Some(s) = literal.as_str() {
                s.trim().parse::<i64>().ok().map(CoercedValue::Int)
            } else {
                None
            }
        }
        Coerce::Str => Some(CoercedValue::Str(json_literal_to_string(literal))),
        Coerce::LowerStr => Some(CoercedValue::Str(json_literal_to_string(literal).to_lowercase())),
        Coerce::Null => {
            if let Some(i) = literal.as_i64() {
                Some(CoercedValue::Int(i))
            } else {
                Some(CoercedValue::Str(json_literal_to_string(literal)))
            }
        }
    }
}

fn json_literal_to_string(literal: &JsonValue) -> String {
    match literal {
        JsonValue::String(s) => s.clone(),
        JsonValue::Number(n) => n.to_string(),
        JsonValue::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

/// Render a coerced value back to a JSON literal, used by the snapshot
/// exporter to reconstruct a wire-compatible `values` array.
pub fn coerced_to_json(value: &CoercedValue) -> JsonValue {
    match value {
        CoercedValue::Int(i) => JsonValue::from(*i),
        CoercedValue::Str(s) => JsonValue::from(s.clone()),
    }
}
