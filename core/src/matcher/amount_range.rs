//! AMOUNT_RANGE: exact-decimal comparison against an optional [min, max]
//! bound, with integer-minor-units or decimal-string input.

use crate::scalar::{Context, Scalar};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountCoerce {
    /// Raw value is minor units (e.g. cents); divided by 10^scale.
    Int,
    /// Raw value is a decimal string, parsed directly.
    Decimal,
}

impl AmountCoerce {
    pub fn parse(raw: &str) -> Option<AmountCoerce> {
        match raw {
            "int" => Some(AmountCoerce::Int),
            "decimal" => Some(AmountCoerce::Decimal),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AmountCoerce::Int => "int",
            AmountCoerce::Decimal => "decimal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountRangeMatcher {
    pub field: String,
    pub coerce: AmountCoerce,
    pub scale: u32,
    pub min: Option<Decimal>,
    pub max: Option<Decimal>,
    pub min_inclusive: bool,
    pub max_inclusive: bool,
}

impl AmountRangeMatcher {
    pub fn evaluate(&self, ctx: &Context) -> bool {
        let Some(raw) = ctx.lookup(&self.field) else {
            return false;
        };
        let Some(amount) = self.to_decimal_amount(raw) else {
            return false;
        };

        if let Some(min) = self.min {
            let ok = if self.min_inclusive { amount >= min } else { amount > min };
            if !ok {
                return false;
            }
        }
        if let Some(max) = self.max {
            let ok = if self.max_inclusive { amount <= max } else { amount < max };
            if !ok {
                return false;
            }
        }
        true
    }

    fn to_decimal_amount(&self, raw: &Scalar) -> Option<Decimal> {
        match self.coerce {
            AmountCoerce::Int => {
                let minor = raw.to_int()?;
                let divisor = Decimal::from(10i64.checked_pow(self.scale)?);
                Some(Decimal::from(minor) / divisor)
            }
            AmountCoerce::Decimal => raw.to_decimal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher() -> AmountRangeMatcher {
        AmountRangeMatcher {
            field: "amount".to_string(),
            coerce: AmountCoerce::Int,
            scale: 2,
            min: Some(Decimal::new(0, 0)),
            max: Some(Decimal::new(100000, 2)), // 1000.00
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    #[test]
    fn within_range_matches() {
        let mut ctx = Context::new();
        ctx.insert("amount", Scalar::Int(50_000)); // 500.00
        assert!(matcher().evaluate(&ctx));
    }

    #[test]
    fn above_max_exclusive_by_one_cent_does_not_match() {
        let mut ctx = Context::new();
        ctx.insert("amount", Scalar::Int(100_001)); // 1000.01
        assert!(!matcher().evaluate(&ctx));
    }

    #[test]
    fn exact_boundary_is_inclusive() {
        let mut ctx = Context::new();
        ctx.insert("amount", Scalar::Int(100_000)); // 1000.00
        assert!(matcher().evaluate(&ctx));
    }

    #[test]
    fn decimal_coerce_parses_string_directly() {
        let m = AmountRangeMatcher {
            field: "amount".to_string(),
            coerce: AmountCoerce::Decimal,
            scale: 0,
            min: Some(Decimal::new(0, 0)),
            max: None,
            min_inclusive: true,
            max_inclusive: true,
        };
        let mut ctx = Context::new();
        ctx.insert("amount", Scalar::Str("123.45".to_string()));
        assert!(m.evaluate(&ctx));
    }

    #[test]
    fn unbounded_side_allows_any_value() {
        let m = AmountRangeMatcher {
            field: "amount".to_string(),
            coerce: AmountCoerce::Int,
            scale: 2,
            min: None,
            max: None,
            min_inclusive: true,
            max_inclusive: true,
        };
        let mut ctx = Context::new();
        ctx.insert("amount", Scalar::Int(i64::MAX));
        assert!(m.evaluate(&ctx));
    }

    #[test]
    fn non_numeric_field_does_not_match() {
        let mut ctx = Context::new();
        ctx.insert("amount", Scalar::Str("not-a-number".to_string()));
        assert!(!matcher().evaluate(&ctx));
    }
}
