//! Whole-invoice shape repair.
//!
//! Model output varies in how it represents some fields. Each such field has a
//! shape enum listing what may arrive and one function turning every variant
//! into the shape the validator expects. The repair rules are independent:
//! none of them reads a field another one writes.

use rust_decimal::Decimal;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::CoercionError;
use crate::models::config::{ItemPolicy, NormalizeOptions};
use crate::models::invoice::{Discount, InvoiceItem};

use super::coerce::{self, Numeric};
use super::dates::normalize_date;
use super::items::normalize_item;

/// Top-level fields routed through the date normalizer.
const DATE_FIELDS: [&str; 2] = ["invoice_date", "due_date"];

/// Raw shapes of `tax_total`.
#[derive(Debug, Clone, PartialEq)]
pub enum TaxTotalShape {
    Absent,
    /// A bare number with no itemized `taxes` structure beside it.
    Scalar(Decimal),
    /// Anything else; left for the validator to accept or reject.
    Unrepaired(Value),
}

impl TaxTotalShape {
    pub fn classify(tax_total: Option<&Value>, taxes: Option<&Value>) -> Self {
        let itemized = taxes.is_some_and(|t| !is_empty_value(t));
        match tax_total {
            None | Some(Value::Null) => TaxTotalShape::Absent,
            Some(Value::Number(n)) if !itemized => match coerce::parse_decimal(&n.to_string()) {
                Some(d) => TaxTotalShape::Scalar(d),
                None => TaxTotalShape::Unrepaired(Value::Number(n.clone())),
            },
            Some(other) => TaxTotalShape::Unrepaired(other.clone()),
        }
    }

    /// The shape as a JSON value, for the normalized mapping.
    pub fn to_value(&self) -> Value {
        match self {
            TaxTotalShape::Absent => Value::Null,
            TaxTotalShape::Scalar(d) => coerce::decimal_value(*d),
            TaxTotalShape::Unrepaired(v) => v.clone(),
        }
    }
}

/// Raw shapes of `discounts`.
#[derive(Debug, Clone, PartialEq)]
pub enum DiscountShape {
    Absent,
    /// A bare number.
    Amount(Decimal),
    /// A list of numbers and/or records.
    List(Vec<Value>),
    /// Anything else.
    Unsupported(Value),
}

impl DiscountShape {
    pub fn classify(discounts: Option<&Value>) -> Self {
        match discounts {
            None | Some(Value::Null) => DiscountShape::Absent,
            Some(Value::Number(n)) => match coerce::parse_decimal(&n.to_string()) {
                Some(d) => DiscountShape::Amount(d),
                None => DiscountShape::Unsupported(Value::Number(n.clone())),
            },
            Some(Value::Array(entries)) => DiscountShape::List(entries.clone()),
            Some(other) => DiscountShape::Unsupported(other.clone()),
        }
    }

    /// Convert to uniform records.
    ///
    /// Records contribute their first numeric value in key order; the rest of
    /// the record is discarded. Entries without a numeric value are dropped.
    pub fn into_discounts(self) -> Vec<Discount> {
        match self {
            DiscountShape::Absent | DiscountShape::Unsupported(_) => Vec::new(),
            DiscountShape::Amount(d) => vec![Discount::new(d)],
            DiscountShape::List(entries) => entries
                .iter()
                .filter_map(|entry| match entry {
                    Value::Number(_) => number(entry),
                    Value::Object(record) => record.values().find_map(number),
                    _ => None,
                })
                .map(Discount::new)
                .collect(),
        }
    }
}

fn number(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => coerce::parse_decimal(&n.to_string()),
        _ => None,
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
    }
}

/// An item that was dropped under [`ItemPolicy::SkipInvalid`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemIssue {
    /// Position of the item in the raw list.
    pub index: usize,
    pub error: CoercionError,
}

/// Output of the schema normalizer, ready for strict validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInvoice {
    /// Remaining top-level fields, with dates canonicalized.
    pub fields: Map<String, Value>,
    pub tax_total: TaxTotalShape,
    pub discounts: Vec<Discount>,
    pub items: Vec<InvoiceItem>,
    /// Items dropped by the skip policy.
    pub skipped: Vec<ItemIssue>,
    /// Non-fatal repair notes.
    pub warnings: Vec<String>,
}

impl NormalizedInvoice {
    /// Render the normalized mapping as one JSON object.
    pub fn to_value(&self) -> serde_json::Result<Value> {
        let mut map = self.fields.clone();
        map.insert("tax_total".to_string(), self.tax_total.to_value());
        map.insert("discounts".to_string(), serde_json::to_value(&self.discounts)?);
        map.insert("items".to_string(), serde_json::to_value(&self.items)?);
        Ok(Value::Object(map))
    }
}

/// Repair the known shape variants of a raw invoice object.
pub fn normalize_schema(
    mut raw: Map<String, Value>,
    options: &NormalizeOptions,
) -> Result<NormalizedInvoice, CoercionError> {
    let mut warnings = Vec::new();

    let tax_total = TaxTotalShape::classify(raw.get("tax_total"), raw.get("taxes"));
    raw.remove("tax_total");

    let discount_shape = DiscountShape::classify(raw.get("discounts"));
    if let DiscountShape::Unsupported(value) = &discount_shape {
        warn!("Ignoring discounts of unsupported shape: {}", value);
        warnings.push(format!("discounts ignored: unsupported shape {}", value));
    }
    let discounts = discount_shape.into_discounts();
    raw.remove("discounts");

    for field in DATE_FIELDS {
        if let Some(Value::String(date)) = raw.get(field) {
            let normalized = normalize_date(Some(date))
                .map(Value::String)
                .unwrap_or(Value::Null);
            raw.insert(field.to_string(), normalized);
        }
    }

    let raw_items = match raw.remove("items") {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => Vec::new(),
        Some(other) => {
            debug!("Replacing non-list items with an empty list: {}", other);
            warnings.push("items was not a list; replaced with an empty list".to_string());
            Vec::new()
        }
    };

    let mut items = Vec::with_capacity(raw_items.len());
    let mut skipped = Vec::new();

    for (index, raw_item) in raw_items.iter().enumerate() {
        let path = format!("items[{}]", index);
        match normalize_item(raw_item, &path, &options.default_currency) {
            Ok(item) => items.push(item),
            Err(error) if options.item_policy == ItemPolicy::SkipInvalid => {
                warn!("Skipping item {}: {}", index, error);
                warnings.push(format!("skipped {}: {}", path, error));
                skipped.push(ItemIssue { index, error });
            }
            Err(error) => return Err(error),
        }
    }

    debug!(
        "Normalized invoice: {} items, {} skipped, {} discounts",
        items.len(),
        skipped.len(),
        discounts.len()
    );

    Ok(NormalizedInvoice {
        fields: raw,
        tax_total,
        discounts,
        items,
        skipped,
        warnings,
    })
}
