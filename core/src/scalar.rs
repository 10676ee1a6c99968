//! Typed request-context values and dotted-path field lookup.
//!
//! The request context (`ctx` in the spec) is a read-only mapping from
//! dotted-path field names to scalars. Unlike the teacher's `EvalContext`
//! (which flattens everything to `f64` for arithmetic), matchers here need
//! to distinguish integers, strings, exact decimals, timestamps and
//! booleans, so each stored value carries its own tag.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// A single typed value read out of a request context.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Int(i64),
    Str(String),
    Decimal(Decimal),
    Timestamp(DateTime<Utc>),
    Bool(bool),
}

impl Scalar {
    /// Render the scalar as a string, the way `coerce=str`/`lower-str`
    /// matchers do. Timestamps render as RFC 3339.
    pub fn to_display_string(&self) -> String {
        match self {
            Scalar::Int(i) => i.to_string(),
            Scalar::Str(s) => s.clone(),
            Scalar::Decimal(d) => d.to_string(),
            Scalar::Timestamp(t) => t.to_rfc3339(),
            Scalar::Bool(b) => b.to_string(),
        }
    }

    /// Attempt to read the scalar as an integer, the way `coerce=int` does:
    /// a string is parsed, a decimal must be exactly representable.
    pub fn to_int(&self) -> Option<i64> {
        match self {
            Scalar::Int(i) => Some(*i),
            Scalar::Str(s) => s.trim().parse::<i64>().ok(),
            Scalar::Decimal(d) => {
                if d.fract().is_zero() {
                    d.to_string().parse::<i64>().ok()
                } else {
                    None
                }
            }
            Scalar::Bool(b) => Some(if *b { 1 } else { 0 }),
            Scalar::Timestamp(_) => None,
        }
    }

    /// Attempt to read the scalar as an exact decimal.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            Scalar::Decimal(d) => Some(*d),
            Scalar::Int(i) => Some(Decimal::from(*i)),
            Scalar::Str(s) => s.trim().parse::<Decimal>().ok(),
            Scalar::Bool(_) | Scalar::Timestamp(_) => None,
        }
    }
}

impl From<i64> for Scalar {
    fn from(v: i64) -> Self {
        Scalar::Int(v)
    }
}

impl From<&str> for Scalar {
    fn from(v: &str) -> Self {
        Scalar::Str(v.to_string())
    }
}

impl From<String> for Scalar {
    fn from(v: String) -> Self {
        Scalar::Str(v)
    }
}

impl From<bool> for Scalar {
    fn from(v: bool) -> Self {
        Scalar::Bool(v)
    }
}

impl From<Decimal> for Scalar {
    fn from(v: Decimal) -> Self {
        Scalar::Decimal(v)
    }
}

impl From<DateTime<Utc>> for Scalar {
    fn from(v: DateTime<Utc>) -> Self {
        Scalar::Timestamp(v)
    }
}

/// Read-only request-context snapshot, produced by the caller and consumed
/// once per selection.
///
/// Field names are already dotted paths as they arrive from upstream
/// (`"api_user_id"`, `"pix_key"`, ...); this is a flat map rather than a
/// nested tree, since the wire format never nests context values.
#[derive(Debug, Clone, Default)]
pub struct Context {
    fields: HashMap<String, Scalar>,
}

impl Context {
    pub fn new() -> Self {
        Self {
            fields: HashMap::new(),
        }
    }

    pub fn insert(&mut self, path: impl Into<String>, value: impl Into<Scalar>) -> &mut Self {
        self.fields.insert(path.into(), value.into());
        self
    }

    /// Look up a field by dotted path. Absent fields are `None`, never an
    /// error — unknown paths read as absent per the spec's error policy.
    pub fn lookup(&self, path: &str) -> Option<&Scalar> {
        self.fields.get(path)
    }

    /// The distinguished `now` field, if the caller supplied one.
    pub fn now(&self) -> Option<DateTime<Utc>> {
        match self.fields.get("now") {
            Some(Scalar::Timestamp(t)) => Some(*t),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_absent_field_is_none() {
        let ctx = Context::new();
        assert!(ctx.lookup("api_user_id").is_none());
    }

    #[test]
    fn int_coercion_from_string() {
        let s = Scalar::Str("42".to_string());
        assert_eq!(s.to_int(), Some(42));
    }

    #[test]
    fn int_coercion_rejects_non_numeric_string() {
        let s = Scalar::Str("not-a-number".to_string());
        assert_eq!(s.to_int(), None);
    }

    #[test]
    fn decimal_coercion_from_int() {
        let s = Scalar::Int(500);
        assert_eq!(s.to_decimal(), Some(Decimal::from(500)));
    }
}
