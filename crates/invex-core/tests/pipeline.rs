//! End-to-end behaviour of the normalization pipeline.

use std::str::FromStr;

use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use serde_json::json;

use invex_core::normalize::normalize_date;
use invex_core::{
    extract_invoice, normalize_output, Discount, InvoiceItem, ItemPolicy, NormalizeError,
    NormalizeOptions,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

const RESTAURANT_INVOICE: &str = r#"```json
{
  "supplier_name": "Nordsee Fischhandel GmbH",
  "supplier_address": "Hafenstraße 12, 20457 Hamburg",
  "supplier_vat_id": "DE123456789",
  "invoice_number": "RE-2025-0142",
  "invoice_date": "15.01.2025",
  "due_date": "29/01/2025",
  "items": [
    {"description": "Kabeljaufilet", "quantity": 2.5, "unit_price": 18.9, "unit": "Kg",
     "tax_rate": 7, "currency": "EUR", "category": "Seafood"},
    {"description": "Mineralwasser 0,75l", "quantity": "12", "unit_price": "0.89",
     "net_amount": 10.68, "tax_rate": 19, "tax_amount": 2.03, "category": "Beverages"},
    {"description": "Pfand Kiste", "quantity": 1, "unit_price": -3.3, "category": "Packaging"}
  ],
  "net_total": 54.63,
  "tax_total": 5.34,
  "gross_total": 59.97,
  "discounts": [{"type": "Skonto", "value": 2}, 1.5],
  "currency": "EUR",
  "payment_method": "SEPA-Lastschrift",
  "iban": "DE89370400440532013000",
  "notes": "Ware bleibt bis zur vollständigen Bezahlung unser Eigentum.",
  "confidence": 0.93
}
```"#;

#[test]
fn test_fish_order_scenario() {
    let raw = r#"{"items":[{"description":"Cod","quantity":2,"unit_price":10.5}], "discounts": 5, "invoice_date":"15.01.2025"}"#;
    let normalized = normalize_output(raw, &NormalizeOptions::default()).unwrap();

    assert_eq!(
        normalized.items,
        vec![InvoiceItem {
            description: "Cod".to_string(),
            quantity: dec("2.0"),
            unit_price: dec("10.5"),
            unit: None,
            net_amount: dec("21.0"),
            tax_rate: None,
            tax_amount: None,
            currency: "EUR".to_string(),
            category: None,
        }]
    );
    assert_eq!(normalized.discounts, vec![Discount::new(dec("5.0"))]);
    assert_eq!(normalized.fields["invoice_date"], json!("2025-01-15"));

    let result = extract_invoice(raw, &NormalizeOptions::default()).unwrap();
    assert_eq!(result.invoice.invoice_date.as_deref(), Some("2025-01-15"));
    assert_eq!(result.invoice.items, normalized.items);
}

#[test]
fn test_restaurant_invoice() {
    let result = extract_invoice(RESTAURANT_INVOICE, &NormalizeOptions::default()).unwrap();
    let invoice = &result.invoice;

    assert_eq!(invoice.supplier_name.as_deref(), Some("Nordsee Fischhandel GmbH"));
    assert_eq!(invoice.invoice_date.as_deref(), Some("2025-01-15"));
    assert_eq!(invoice.due_date.as_deref(), Some("2025-01-29"));
    assert_eq!(invoice.items.len(), 3);

    let fish = &invoice.items[0];
    assert_eq!(fish.net_amount, dec("47.25"));
    assert_eq!(fish.tax_amount, Some(dec("3.31")));

    let water = &invoice.items[1];
    assert_eq!(water.net_amount, dec("10.68"));
    assert_eq!(water.tax_amount, Some(dec("2.03")));
    assert_eq!(water.currency, "EUR");

    let deposit = &invoice.items[2];
    assert_eq!(deposit.net_amount, dec("-3.3"));
    assert_eq!(deposit.tax_amount, None);

    assert_eq!(invoice.tax_total, Some(dec("5.34")));
    assert!(result.warnings.is_empty());
    assert!(result.skipped_items.is_empty());
}

#[test]
fn test_normalization_is_idempotent() {
    let options = NormalizeOptions::default();
    let first = extract_invoice(RESTAURANT_INVOICE, &options).unwrap().invoice;

    let serialized = serde_json::to_string(&first).unwrap();
    let second = extract_invoice(&serialized, &options).unwrap().invoice;

    assert_eq!(first, second);
}

#[test]
fn test_full_precision_survives_serialization() {
    let raw = r#"{"items": [{"description": "Saffron", "quantity": 1.23456789, "unit_price": 9.87654321, "tax_rate": 7}]}"#;
    let options = NormalizeOptions::default();
    let first = extract_invoice(raw, &options).unwrap().invoice;
    assert_eq!(first.items[0].net_amount, dec("12.1932631112635269"));

    let serialized = serde_json::to_string(&first).unwrap();
    assert!(serialized.contains(r#""net_amount":12.1932631112635269"#));

    let second = extract_invoice(&serialized, &options).unwrap().invoice;
    assert_eq!(first, second);
    assert_eq!(second.items[0].net_amount, dec("12.1932631112635269"));
}

#[test]
fn test_oversized_amounts_fail_without_panicking() {
    let raw = r#"{"items":[{"description":"Cod","quantity":"50000000000000000000000000000","unit_price":2}]}"#;
    let err = extract_invoice(raw, &NormalizeOptions::default()).unwrap_err();
    match err.error {
        NormalizeError::Coercion(e) => assert_eq!(e.field, "items[0].net_amount"),
        other => panic!("unexpected error: {:?}", other),
    }

    let raw = r#"{"items":[{"net_amount":"70000000000000000000000000000","tax_rate":19}]}"#;
    let err = extract_invoice(raw, &NormalizeOptions::default()).unwrap_err();
    match err.error {
        NormalizeError::Coercion(e) => assert_eq!(e.field, "items[0].tax_amount"),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(err.raw_output, raw);
}

#[test]
fn test_net_amount_derivation_and_precedence() {
    let raw = json!({
        "items": [
            {"quantity": 3, "unit_price": 0.35},
            {"quantity": 3, "unit_price": 0.35, "net_amount": 1.00}
        ]
    })
    .to_string();
    let invoice = extract_invoice(&raw, &NormalizeOptions::default()).unwrap().invoice;

    assert_eq!(invoice.items[0].net_amount, dec("1.05"));
    assert_eq!(invoice.items[1].net_amount, dec("1.00"));
}

#[test]
fn test_tax_amount_derivation_and_precedence() {
    let raw = json!({
        "items": [
            {"net_amount": 12.34, "tax_rate": 19},
            {"net_amount": 12.34, "tax_rate": 19, "tax_amount": 2.5},
            {"net_amount": 12.34}
        ]
    })
    .to_string();
    let invoice = extract_invoice(&raw, &NormalizeOptions::default()).unwrap().invoice;

    // 12.34 * 19 / 100 = 2.3446
    assert_eq!(invoice.items[0].tax_amount, Some(dec("2.34")));
    assert_eq!(invoice.items[1].tax_amount, Some(dec("2.5")));
    assert_eq!(invoice.items[2].tax_amount, None);
}

#[test]
fn test_discount_shapes_converge() {
    let options = NormalizeOptions::default();
    let discounts = |raw: serde_json::Value| {
        normalize_output(&raw.to_string(), &options).unwrap().discounts
    };

    assert_eq!(discounts(json!({})), vec![]);
    assert_eq!(discounts(json!({"discounts": null})), vec![]);
    assert_eq!(discounts(json!({"discounts": 7.5})), vec![Discount::new(dec("7.5"))]);
    assert_eq!(
        discounts(json!({"discounts": [1, {"name": "Rabatt", "amount": 2}, {"discount": 3.25}]})),
        vec![
            Discount::new(dec("1")),
            Discount::new(dec("2")),
            Discount::new(dec("3.25")),
        ]
    );
}

#[test]
fn test_items_type_safety() {
    let options = NormalizeOptions::default();
    for items in [json!(null), json!("none"), json!(3), json!({"description": "Cod"})] {
        let raw = json!({ "items": items }).to_string();
        let invoice = extract_invoice(&raw, &options).unwrap().invoice;
        assert_eq!(invoice.items, vec![]);
    }
}

#[test]
fn test_date_canonicalization() {
    for raw in ["15.01.25", "15.01.2025", "2025-01-15", "15/01/2025"] {
        assert_eq!(normalize_date(Some(raw)).as_deref(), Some("2025-01-15"));
    }
    assert_eq!(normalize_date(Some("mid-January")).as_deref(), Some("mid-January"));
}

#[test]
fn test_malformed_json() {
    let err = extract_invoice("not json at all", &NormalizeOptions::default()).unwrap_err();

    assert!(matches!(err.error, NormalizeError::Parse { .. }));
    assert_eq!(err.raw_output, "not json at all");
}

#[test]
fn test_one_bad_item_fails_the_batch() {
    let raw = json!({
        "items": [{"description": "Cod"}, {"description": "Salmon", "unit_price": "teuer"}]
    })
    .to_string();
    let err = extract_invoice(&raw, &NormalizeOptions::default()).unwrap_err();

    match err.error {
        NormalizeError::Coercion(e) => {
            assert_eq!(e.field, "items[1].unit_price");
            assert_eq!(e.value, "\"teuer\"");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn test_skip_policy_reports_bad_items() {
    let raw = json!({
        "items": [{"description": "Cod"}, 42, {"description": "Salmon", "unit_price": "teuer"}]
    })
    .to_string();
    let options = NormalizeOptions::default().with_item_policy(ItemPolicy::SkipInvalid);
    let result = extract_invoice(&raw, &options).unwrap();

    assert_eq!(result.invoice.items.len(), 1);
    let skipped: Vec<usize> = result.skipped_items.iter().map(|s| s.index).collect();
    assert_eq!(skipped, vec![1, 2]);
    assert_eq!(result.warnings.len(), 2);
}

#[test]
fn test_concurrent_invocations() {
    let handles: Vec<_> = (0..8)
        .map(|i| {
            std::thread::spawn(move || {
                let raw = json!({"invoice_number": format!("R-{}", i), "items": [{"quantity": i}]})
                    .to_string();
                extract_invoice(&raw, &NormalizeOptions::default()).unwrap().invoice
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        let invoice = handle.join().unwrap();
        assert_eq!(invoice.invoice_number, Some(format!("R-{}", i)));
        assert_eq!(invoice.items[0].quantity, Decimal::from(i as u64));
    }
}
