//! Value coercion shared by the item normalizer and the validator.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

/// Outcome of coercing a raw value to a decimal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Numeric {
    /// Missing, `null` or blank text.
    Absent,
    Value(Decimal),
    /// Present but not convertible; carries the reason.
    Invalid(&'static str),
}

impl Numeric {
    pub(crate) fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => Numeric::Absent,
            Some(Value::Number(n)) => match parse_decimal(&n.to_string()) {
                Some(d) => Numeric::Value(d),
                None => Numeric::Invalid("number out of range"),
            },
            Some(Value::String(s)) if s.trim().is_empty() => Numeric::Absent,
            Some(Value::String(s)) => match parse_decimal(s.trim()) {
                Some(d) => Numeric::Value(d),
                None => Numeric::Invalid("not a number"),
            },
            Some(Value::Bool(_)) => Numeric::Invalid("expected a number, got a boolean"),
            Some(Value::Array(_)) => Numeric::Invalid("expected a number, got a list"),
            Some(Value::Object(_)) => Numeric::Invalid("expected a number, got an object"),
        }
    }
}

/// Parse plain or scientific decimal notation.
pub(crate) fn parse_decimal(s: &str) -> Option<Decimal> {
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .ok()
}

/// Coerce a raw value to text: strings pass, scalars are rendered.
pub(crate) fn text(value: Option<&Value>) -> Option<String> {
    match value {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    }
}

/// Render a decimal as a JSON number.
pub(crate) fn decimal_value(d: Decimal) -> Value {
    serde_json::Number::from_str(&d.normalize().to_string())
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
