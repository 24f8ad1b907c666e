//! Strict typing of a normalized invoice.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::ValidationError;
use crate::models::config::NormalizeOptions;
use crate::models::invoice::{InvoiceData, InvoiceItem};

use super::coerce::{self, Numeric};
use super::dates::CANONICAL_DATE_FORMAT;
use super::schema::{NormalizedInvoice, TaxTotalShape};

lazy_static! {
    static ref CANONICAL_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();
}

/// Every top-level field the record keeps. Anything else is dropped.
pub const KNOWN_FIELDS: [&str; 14] = [
    "supplier_name",
    "supplier_address",
    "supplier_vat_id",
    "invoice_number",
    "invoice_date",
    "due_date",
    "items",
    "net_total",
    "tax_total",
    "gross_total",
    "currency",
    "payment_method",
    "iban",
    "notes",
];

type Result<T> = std::result::Result<T, ValidationError>;

/// Build the final [`InvoiceData`] from a normalized invoice.
pub fn validate_invoice(
    normalized: &NormalizedInvoice,
    options: &NormalizeOptions,
) -> Result<InvoiceData> {
    let fields = &normalized.fields;

    let dropped: Vec<&str> = fields
        .keys()
        .map(String::as_str)
        .filter(|key| !KNOWN_FIELDS.contains(key))
        .collect();
    if !dropped.is_empty() {
        debug!("Dropping unknown fields: {:?}", dropped);
    }

    for (index, item) in normalized.items.iter().enumerate() {
        validate_item(index, item)?;
    }

    let currency = match fields.get("currency") {
        None | Some(Value::Null) => options.default_currency.clone(),
        Some(Value::String(c)) => c.clone(),
        Some(other) => return Err(ValidationError::new("currency", other, "expected text")),
    };

    Ok(InvoiceData {
        supplier_name: optional_text(fields, "supplier_name")?,
        supplier_address: optional_text(fields, "supplier_address")?,
        supplier_vat_id: optional_text(fields, "supplier_vat_id")?,
        invoice_number: optional_text(fields, "invoice_number")?,
        invoice_date: optional_date(fields, "invoice_date")?,
        due_date: optional_date(fields, "due_date")?,
        items: normalized.items.clone(),
        net_total: optional_decimal("net_total", fields.get("net_total"))?,
        tax_total: tax_total(&normalized.tax_total)?,
        gross_total: optional_decimal("gross_total", fields.get("gross_total"))?,
        currency,
        payment_method: optional_text(fields, "payment_method")?,
        iban: optional_text(fields, "iban")?,
        notes: optional_text(fields, "notes")?,
    })
}

fn validate_item(index: usize, item: &InvoiceItem) -> Result<()> {
    if item.description.trim().is_empty() {
        return Err(ValidationError::new(
            format!("items[{}].description", index),
            &Value::String(item.description.clone()),
            "description must not be empty",
        ));
    }

    if item.quantity.is_sign_negative() && !item.quantity.is_zero() {
        return Err(ValidationError::new(
            format!("items[{}].quantity", index),
            &coerce::decimal_value(item.quantity),
            "quantity must not be negative",
        ));
    }

    Ok(())
}

fn optional_text(fields: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match fields.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ValidationError::new(name, other, "expected text")),
    }
}

fn optional_date(fields: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    let Some(date) = optional_text(fields, name)? else {
        return Ok(None);
    };

    let valid = CANONICAL_DATE.is_match(&date)
        && NaiveDate::parse_from_str(&date, CANONICAL_DATE_FORMAT).is_ok();
    if !valid {
        return Err(ValidationError::new(
            name,
            &Value::String(date),
            "expected a date in YYYY-MM-DD form",
        ));
    }

    Ok(Some(date))
}

fn optional_decimal(name: &str, value: Option<&Value>) -> Result<Option<Decimal>> {
    match Numeric::from_value(value) {
        Numeric::Absent => Ok(None),
        Numeric::Value(d) => Ok(Some(d)),
        Numeric::Invalid(reason) => Err(ValidationError::new(
            name,
            value.unwrap_or(&Value::Null),
            reason,
        )),
    }
}

fn tax_total(shape: &TaxTotalShape) -> Result<Option<Decimal>> {
    match shape {
        TaxTotalShape::Absent => Ok(None),
        TaxTotalShape::Scalar(d) => Ok(Some(*d)),
        TaxTotalShape::Unrepaired(value) => optional_decimal("tax_total", Some(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::schema::normalize_schema;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn validate(value: Value) -> Result<InvoiceData> {
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        let options = NormalizeOptions::default();
        let normalized = normalize_schema(map, &options).unwrap();
        validate_invoice(&normalized, &options)
    }

    #[test]
    fn test_minimal_record() {
        let invoice = validate(json!({})).unwrap();

        assert_eq!(invoice.currency, "EUR");
        assert_eq!(invoice.items, vec![]);
        assert_eq!(invoice.invoice_date, None);
    }

    #[test]
    fn test_full_record() {
        let invoice = validate(json!({
            "supplier_name": "Fisch GmbH",
            "supplier_vat_id": "DE123456789",
            "invoice_number": "R-2025-001",
            "invoice_date": "15.01.2025",
            "due_date": "2025-01-29",
            "net_total": "21.00",
            "tax_total": 1.47,
            "gross_total": 22.47,
            "iban": "DE89370400440532013000",
            "items": [{"description": "Cod", "quantity": 2, "unit_price": 10.5, "tax_rate": 7}]
        }))
        .unwrap();

        assert_eq!(invoice.supplier_name.as_deref(), Some("Fisch GmbH"));
        assert_eq!(invoice.invoice_date.as_deref(), Some("2025-01-15"));
        assert_eq!(invoice.due_date.as_deref(), Some("2025-01-29"));
        assert_eq!(invoice.net_total, Some(Decimal::new(2100, 2)));
        assert_eq!(invoice.tax_total, Some(Decimal::new(147, 2)));
        assert_eq!(invoice.items[0].tax_amount, Some(Decimal::new(147, 2)));
    }

    #[test]
    fn test_unparseable_date_is_rejected() {
        let err = validate(json!({"invoice_date": "mid-January"})).unwrap_err();

        assert_eq!(err.field, "invoice_date");
        assert_eq!(err.value, "\"mid-January\"");
    }

    #[test]
    fn test_impossible_date_is_rejected() {
        let err = validate(json!({"due_date": "2025-02-31"})).unwrap_err();
        assert_eq!(err.field, "due_date");
    }

    #[test]
    fn test_wrong_text_type() {
        let err = validate(json!({"supplier_name": ["Fisch", "GmbH"]})).unwrap_err();
        assert_eq!(err.field, "supplier_name");
    }

    #[test]
    fn test_wrong_total_type() {
        let err = validate(json!({"gross_total": {"amount": 10}})).unwrap_err();
        assert_eq!(err.field, "gross_total");
    }

    #[test]
    fn test_unrepaired_tax_total_still_coerced() {
        let invoice = validate(json!({"tax_total": "3.10"})).unwrap();
        assert_eq!(invoice.tax_total, Some(Decimal::new(310, 2)));

        let err = validate(json!({"tax_total": {"7": 1.0, "19": 2.1}})).unwrap_err();
        assert_eq!(err.field, "tax_total");
    }

    #[test]
    fn test_negative_quantity_is_rejected() {
        let err = validate(json!({"items": [{"description": "Pfand", "quantity": -2}]})).unwrap_err();
        assert_eq!(err.field, "items[0].quantity");
    }

    #[test]
    fn test_negative_amounts_are_allowed() {
        let invoice = validate(json!({"items": [{"description": "Pfand", "quantity": 2, "unit_price": -1.5}]})).unwrap();
        assert_eq!(invoice.items[0].net_amount, Decimal::new(-30, 1));
    }

    #[test]
    fn test_empty_description_is_rejected() {
        let err = validate(json!({"items": [{"description": " "}]})).unwrap_err();
        assert_eq!(err.field, "items[0].description");
    }

    #[test]
    fn test_unknown_fields_are_dropped() {
        let invoice = validate(json!({"invoice_number": "7", "deposit_total": 12.0, "discounts": 5})).unwrap();
        assert_eq!(invoice.invoice_number.as_deref(), Some("7"));
    }

    #[test]
    fn test_currency() {
        assert_eq!(validate(json!({"currency": null})).unwrap().currency, "EUR");
        assert_eq!(validate(json!({"currency": "CHF"})).unwrap().currency, "CHF");
        assert_eq!(validate(json!({"currency": 978})).unwrap_err().field, "currency");
    }
}
