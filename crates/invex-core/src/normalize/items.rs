//! Line item normalization.

use rust_decimal::Decimal;
use serde_json::{Map, Value};

use crate::error::CoercionError;
use crate::models::invoice::{InvoiceItem, UNKNOWN_DESCRIPTION};

use super::coerce::{self, Numeric};

/// Decimal places of a derived tax amount.
const TAX_AMOUNT_SCALE: u32 = 2;

/// Coerce one raw line item into a typed [`InvoiceItem`].
///
/// `path` prefixes field names in errors, e.g. `items[3]`. Numeric fields that
/// are absent, null or blank take their defaults before anything is derived.
/// Explicit `net_amount` and `tax_amount` values win over derived ones.
pub fn normalize_item(
    raw: &Value,
    path: &str,
    default_currency: &str,
) -> Result<InvoiceItem, CoercionError> {
    let Value::Object(fields) = raw else {
        return Err(CoercionError::new(path, raw, "expected an object"));
    };

    let quantity = decimal(fields, path, "quantity")?.unwrap_or(Decimal::ONE);
    let unit_price = decimal(fields, path, "unit_price")?.unwrap_or(Decimal::ZERO);
    let net_amount = match decimal(fields, path, "net_amount")? {
        Some(amount) => amount,
        None => quantity
            .checked_mul(unit_price)
            .ok_or_else(|| out_of_range(raw, path, "net_amount"))?,
    };
    let tax_rate = decimal(fields, path, "tax_rate")?;
    let tax_amount = match (decimal(fields, path, "tax_amount")?, tax_rate) {
        (Some(amount), _) => Some(amount),
        (None, Some(rate)) => Some(
            derive_tax_amount(net_amount, rate).ok_or_else(|| out_of_range(raw, path, "tax_amount"))?,
        ),
        (None, None) => None,
    };

    let currency = coerce::text(fields.get("currency"))
        .filter(|c| !c.trim().is_empty())
        .unwrap_or_else(|| default_currency.to_string());

    Ok(InvoiceItem {
        description: coerce::text(fields.get("description"))
            .unwrap_or_else(|| UNKNOWN_DESCRIPTION.to_string()),
        quantity,
        unit_price,
        unit: coerce::text(fields.get("unit")),
        net_amount,
        tax_rate,
        tax_amount,
        currency,
        category: coerce::text(fields.get("category")),
    })
}

/// Tax for a net amount at a percentage rate, rounded half-to-even.
///
/// `None` when the product does not fit a `Decimal`.
pub fn derive_tax_amount(net_amount: Decimal, tax_rate: Decimal) -> Option<Decimal> {
    net_amount
        .checked_mul(tax_rate)?
        .checked_div(Decimal::ONE_HUNDRED)
        .map(|tax| tax.round_dp(TAX_AMOUNT_SCALE))
}

fn out_of_range(raw: &Value, path: &str, name: &str) -> CoercionError {
    CoercionError::new(format!("{}.{}", path, name), raw, "amount out of range")
}

fn decimal(
    fields: &Map<String, Value>,
    path: &str,
    name: &str,
) -> Result<Option<Decimal>, CoercionError> {
    let raw = fields.get(name);
    match Numeric::from_value(raw) {
        Numeric::Absent => Ok(None),
        Numeric::Value(d) => Ok(Some(d)),
        Numeric::Invalid(reason) => Err(CoercionError::new(
            format!("{}.{}", path, name),
            raw.unwrap_or(&Value::Null),
            reason,
        )),
    }
}
