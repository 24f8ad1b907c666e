//! Rendering of extracted invoices.

use std::collections::BTreeMap;

use invex_core::{InvoiceData, ItemCategory};
use rust_decimal::Decimal;

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output, one row per item
    Csv,
    /// Plain text summary
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
        }
    }
}

pub fn format_invoice(invoice: &InvoiceData, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(invoice)?),
        OutputFormat::Csv => format_csv(invoice),
        OutputFormat::Text => Ok(format_text(invoice)),
    }
}

const CSV_HEADER: [&str; 13] = [
    "invoice_number",
    "invoice_date",
    "supplier_name",
    "description",
    "quantity",
    "unit",
    "unit_price",
    "net_amount",
    "tax_rate",
    "tax_amount",
    "currency",
    "category",
    "due_date",
];

fn format_csv(invoice: &InvoiceData) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(CSV_HEADER)?;

    let opt = |value: &Option<String>| value.clone().unwrap_or_default();

    for item in &invoice.items {
        wtr.write_record([
            opt(&invoice.invoice_number),
            opt(&invoice.invoice_date),
            opt(&invoice.supplier_name),
            item.description.clone(),
            item.quantity.to_string(),
            opt(&item.unit),
            item.unit_price.to_string(),
            item.net_amount.to_string(),
            item.tax_rate.map(|r| r.to_string()).unwrap_or_default(),
            item.tax_amount.map(|a| a.to_string()).unwrap_or_default(),
            item.currency.clone(),
            opt(&item.category),
            opt(&invoice.due_date),
        ])?;
    }

    Ok(String::from_utf8(wtr.into_inner()?)?)
}

fn format_text(invoice: &InvoiceData) -> String {
    let mut output = String::new();
    let na = "-".to_string();

    output.push_str(&format!(
        "Invoice: {}\n",
        invoice.invoice_number.as_ref().unwrap_or(&na)
    ));
    output.push_str(&format!("Date: {}\n", invoice.invoice_date.as_ref().unwrap_or(&na)));
    if let Some(due_date) = &invoice.due_date {
        output.push_str(&format!("Due: {}\n", due_date));
    }
    output.push('\n');

    output.push_str("Supplier:\n");
    output.push_str(&format!("  {}\n", invoice.supplier_name.as_ref().unwrap_or(&na)));
    if let Some(address) = &invoice.supplier_address {
        output.push_str(&format!("  {}\n", address));
    }
    if let Some(vat_id) = &invoice.supplier_vat_id {
        output.push_str(&format!("  VAT ID: {}\n", vat_id));
    }
    if let Some(iban) = &invoice.iban {
        output.push_str(&format!("  IBAN: {}\n", iban));
    }
    output.push('\n');

    output.push_str(&format!("Items ({}):\n", invoice.items.len()));
    for item in &invoice.items {
        output.push_str(&format!(
            "  {} x {} {} @ {} = {} {}\n",
            item.quantity.normalize(),
            item.description,
            item.unit.as_deref().unwrap_or(""),
            item.unit_price.normalize(),
            item.net_amount.round_dp(2),
            item.currency
        ));
    }

    // None once a category sum leaves the Decimal range
    let mut by_category: BTreeMap<String, Option<Decimal>> = BTreeMap::new();
    for item in &invoice.items {
        let label = match item.known_category() {
            Some(category) => category.label().to_string(),
            None => ItemCategory::Other.label().to_string(),
        };
        let total = by_category.entry(label).or_insert(Some(Decimal::ZERO));
        *total = total.and_then(|t| t.checked_add(item.net_amount));
    }
    if !by_category.is_empty() {
        output.push_str("\nBy category:\n");
        for (label, net) in &by_category {
            let net = net
                .map(|n| n.round_dp(2).to_string())
                .unwrap_or_else(|| "out of range".to_string());
            output.push_str(&format!("  {:<18} {} {}\n", label, net, invoice.currency));
        }
    }

    output.push_str("\nSummary:\n");
    let amount = |value: Option<Decimal>| {
        value.map(|v| v.round_dp(2).to_string()).unwrap_or_else(|| na.clone())
    };
    output.push_str(&format!("  Net:   {} {}\n", amount(invoice.net_total), invoice.currency));
    output.push_str(&format!("  Tax:   {} {}\n", amount(invoice.tax_total), invoice.currency));
    output.push_str(&format!("  Gross: {} {}\n", amount(invoice.gross_total), invoice.currency));

    if let Some(method) = &invoice.payment_method {
        output.push_str(&format!("\nPayment: {}\n", method));
    }
    if let Some(notes) = &invoice.notes {
        output.push_str(&format!("Notes: {}\n", notes));
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use invex_core::{extract_invoice, NormalizeOptions};

    fn sample() -> InvoiceData {
        let raw = r#"{
            "invoice_number": "R-7",
            "supplier_name": "Fisch GmbH",
            "net_total": 21,
            "items": [
                {"description": "Cod", "quantity": 2, "unit_price": 10.5, "unit": "Kg", "category": "Seafood"},
                {"description": "Crate", "quantity": 1, "unit_price": 0, "category": "Deposit"}
            ]
        }"#;
        extract_invoice(raw, &NormalizeOptions::default()).unwrap().invoice
    }

    #[test]
    fn test_csv_has_row_per_item() {
        let csv = format_invoice(&sample(), OutputFormat::Csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("invoice_number,invoice_date,supplier_name"));
        assert!(lines[1].starts_with("R-7,,Fisch GmbH,Cod,2,Kg,10.5,21.0"));
    }

    #[test]
    fn test_text_summary() {
        let text = format_invoice(&sample(), OutputFormat::Text).unwrap();

        assert!(text.contains("Invoice: R-7"));
        assert!(text.contains("Items (2):"));
        assert!(text.contains("Seafood"));
        assert!(text.contains("Net:   21 EUR"));
    }

    #[test]
    fn test_text_category_sum_out_of_range() {
        let raw = r#"{"items": [
            {"description": "Cod", "net_amount": "79228162514264337593543950335", "category": "Seafood"},
            {"description": "Tuna", "net_amount": 1, "category": "Seafood"}
        ]}"#;
        let invoice = extract_invoice(raw, &NormalizeOptions::default()).unwrap().invoice;
        let text = format_invoice(&invoice, OutputFormat::Text).unwrap();

        assert!(text.contains("out of range EUR"));
    }

    #[test]
    fn test_json_keeps_nulls() {
        let json = format_invoice(&sample(), OutputFormat::Json).unwrap();
        assert!(json.contains("\"due_date\": null"));
    }
}
