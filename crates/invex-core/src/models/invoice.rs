//! Invoice data models produced by the normalization pipeline.
//!
//! Field names are the wire format and are serialized verbatim. Absent
//! optionals serialize as `null`; decimals serialize as JSON numbers.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Description used when the model omits one.
pub const UNKNOWN_DESCRIPTION: &str = "Unknown";

/// Currency used when neither the model nor the config provides one.
pub const DEFAULT_CURRENCY: &str = "EUR";

/// One extracted invoice document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    /// Name of the issuing company.
    pub supplier_name: Option<String>,

    /// Postal address of the issuer.
    pub supplier_address: Option<String>,

    /// VAT identification number of the issuer.
    pub supplier_vat_id: Option<String>,

    /// Invoice number/identifier.
    pub invoice_number: Option<String>,

    /// Issue date, `YYYY-MM-DD`.
    pub invoice_date: Option<String>,

    /// Payment due date, `YYYY-MM-DD`.
    pub due_date: Option<String>,

    /// Line items in document order.
    #[serde(default)]
    pub items: Vec<InvoiceItem>,

    /// Total net amount (before tax).
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option", default)]
    pub net_total: Option<Decimal>,

    /// Total tax amount.
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option", default)]
    pub tax_total: Option<Decimal>,

    /// Total gross amount (after tax).
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option", default)]
    pub gross_total: Option<Decimal>,

    /// Currency code.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Payment method as printed on the invoice.
    pub payment_method: Option<String>,

    /// Bank account of the issuer.
    pub iban: Option<String>,

    /// Free-form notes copied from the document.
    pub notes: Option<String>,
}

/// A single purchased line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    /// Product/service description.
    pub description: String,

    /// Quantity.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub quantity: Decimal,

    /// Unit price (net).
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub unit_price: Decimal,

    /// Unit of measure.
    pub unit: Option<String>,

    /// Net amount for this line.
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub net_amount: Decimal,

    /// Tax rate in percent (19.0 for 19%).
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option", default)]
    pub tax_rate: Option<Decimal>,

    /// Tax amount for this line.
    #[serde(with = "rust_decimal::serde::arbitrary_precision_option", default)]
    pub tax_amount: Option<Decimal>,

    /// Currency code.
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Category label, see [`ItemCategory`].
    pub category: Option<String>,
}

/// A discount line in its uniform shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discount {
    #[serde(with = "rust_decimal::serde::arbitrary_precision")]
    pub discount: Decimal,
}

impl Discount {
    pub fn new(discount: Decimal) -> Self {
        Self { discount }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

/// Item categories the extraction prompt asks for.
///
/// The normalizer passes categories through untouched; this type is for
/// consumers that want to group or audit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ItemCategory {
    Seafood,
    Meat,
    Produce,
    Dairy,
    Beverages,
    Service,
    #[serde(rename = "Cleaning Supplies")]
    CleaningSupplies,
    Packaging,
    Other,
}

impl ItemCategory {
    pub const ALL: [ItemCategory; 9] = [
        ItemCategory::Seafood,
        ItemCategory::Meat,
        ItemCategory::Produce,
        ItemCategory::Dairy,
        ItemCategory::Beverages,
        ItemCategory::Service,
        ItemCategory::CleaningSupplies,
        ItemCategory::Packaging,
        ItemCategory::Other,
    ];

    /// Parse a category label, ignoring case and separators.
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_alphanumeric())
            .flat_map(char::to_lowercase)
            .collect();

        Self::ALL
            .into_iter()
            .find(|category| {
                let label: String = category
                    .label()
                    .chars()
                    .filter(|c| c.is_alphanumeric())
                    .flat_map(char::to_lowercase)
                    .collect();
                label == key
            })
    }

    /// Label as written in the wire format.
    pub fn label(&self) -> &'static str {
        match self {
            ItemCategory::Seafood => "Seafood",
            ItemCategory::Meat => "Meat",
            ItemCategory::Produce => "Produce",
            ItemCategory::Dairy => "Dairy",
            ItemCategory::Beverages => "Beverages",
            ItemCategory::Service => "Service",
            ItemCategory::CleaningSupplies => "Cleaning Supplies",
            ItemCategory::Packaging => "Packaging",
            ItemCategory::Other => "Other",
        }
    }
}

impl InvoiceItem {
    /// Category parsed against the known set, if any.
    pub fn known_category(&self) -> Option<ItemCategory> {
        self.category.as_deref().and_then(ItemCategory::parse)
    }
}

impl InvoiceData {
    /// Sum of item net amounts, `None` if it does not fit a `Decimal`.
    pub fn items_net_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |total, i| total.checked_add(i.net_amount))
    }

    /// Sum of known item tax amounts, `None` if it does not fit a `Decimal`.
    pub fn items_tax_total(&self) -> Option<Decimal> {
        self.items
            .iter()
            .filter_map(|i| i.tax_amount)
            .try_fold(Decimal::ZERO, Decimal::checked_add)
    }

    /// Check the totals against the items and return any inconsistencies.
    ///
    /// Advisory only; the pipeline never rejects a record for these.
    pub fn consistency_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let tolerance = Decimal::new(1, 2);

        if self.items.is_empty() {
            issues.push("No line items".to_string());
        }

        if let Some(net_total) = self.net_total {
            if !self.items.is_empty() {
                match self.items_net_total() {
                    Some(calculated) => {
                        if exceeds(calculated.checked_sub(net_total), tolerance) {
                            issues.push(format!(
                                "Line item net total ({}) differs from net_total ({})",
                                calculated, net_total
                            ));
                        }
                    }
                    None => issues.push("Line item net total is out of range".to_string()),
                }
            }
        }

        if let (Some(net), Some(tax), Some(gross)) = (self.net_total, self.tax_total, self.gross_total) {
            match net.checked_add(tax) {
                Some(sum) => {
                    if exceeds(sum.checked_sub(gross), tolerance) {
                        issues.push(format!(
                            "net_total + tax_total ({}) differs from gross_total ({})",
                            sum, gross
                        ));
                    }
                }
                None => issues.push("net_total + tax_total is out of range".to_string()),
            }
        }

        for (i, item) in self.items.iter().enumerate() {
            match item.category.as_deref() {
                None => issues.push(format!("items[{}] has no category", i)),
                Some(label) if ItemCategory::parse(label).is_none() => {
                    issues.push(format!("items[{}] has unknown category '{}'", i, label))
                }
                Some(_) => {}
            }
        }

        issues
    }
}

/// A difference beyond `tolerance`; an unrepresentable difference counts as one.
fn exceeds(difference: Option<Decimal>, tolerance: Decimal) -> bool {
    difference.is_none_or(|d| d.abs() > tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn item(net: &str, tax: Option<&str>, category: Option<&str>) -> InvoiceItem {
        InvoiceItem {
            description: "Cod".to_string(),
            quantity: Decimal::ONE,
            unit_price: Decimal::from_str(net).unwrap(),
            unit: None,
            net_amount: Decimal::from_str(net).unwrap(),
            tax_rate: None,
            tax_amount: tax.map(|t| Decimal::from_str(t).unwrap()),
            currency: DEFAULT_CURRENCY.to_string(),
            category: category.map(str::to_string),
        }
    }

    fn invoice(items: Vec<InvoiceItem>) -> InvoiceData {
        InvoiceData {
            supplier_name: None,
            supplier_address: None,
            supplier_vat_id: None,
            invoice_number: None,
            invoice_date: None,
            due_date: None,
            items,
            net_total: None,
            tax_total: None,
            gross_total: None,
            currency: DEFAULT_CURRENCY.to_string(),
            payment_method: None,
            iban: None,
            notes: None,
        }
    }

    #[test]
    fn test_category_parsing() {
        assert_eq!(ItemCategory::parse("Seafood"), Some(ItemCategory::Seafood));
        assert_eq!(ItemCategory::parse("cleaning supplies"), Some(ItemCategory::CleaningSupplies));
        assert_eq!(ItemCategory::parse("Cleaning_Supplies"), Some(ItemCategory::CleaningSupplies));
        assert_eq!(ItemCategory::parse("Deposit"), None);
    }

    #[test]
    fn test_serializes_every_field() {
        let json = serde_json::to_value(invoice(vec![item("21.0", None, Some("Seafood"))])).unwrap();

        let obj = json.as_object().unwrap();
        assert_eq!(obj.len(), 14);
        assert!(obj["invoice_date"].is_null());
        assert_eq!(obj["currency"], "EUR");
        assert_eq!(obj["items"][0]["net_amount"], 21.0);
        assert!(obj["items"][0]["tax_amount"].is_null());
    }

    #[test]
    fn test_item_totals() {
        let data = invoice(vec![
            item("10.50", Some("2.00"), Some("Seafood")),
            item("4.50", None, Some("Dairy")),
        ]);

        assert_eq!(data.items_net_total(), Some(Decimal::new(15, 0)));
        assert_eq!(data.items_tax_total(), Some(Decimal::new(2, 0)));
    }

    #[test]
    fn test_totals_out_of_range() {
        let mut data = invoice(vec![
            item("79228162514264337593543950335", Some("79228162514264337593543950335"), Some("Service")),
            item("1", Some("1"), Some("Service")),
        ]);
        data.net_total = Some(Decimal::MAX);
        data.tax_total = Some(Decimal::MAX);
        data.gross_total = Some(Decimal::ONE);

        assert_eq!(data.items_net_total(), None);
        assert_eq!(data.items_tax_total(), None);

        let issues = data.consistency_issues();
        assert_eq!(
            issues,
            vec![
                "Line item net total is out of range".to_string(),
                "net_total + tax_total is out of range".to_string(),
            ]
        );
    }

    #[test]
    fn test_consistency_issues() {
        let mut data = invoice(vec![item("10.00", None, Some("Fish"))]);
        data.net_total = Some(Decimal::new(12, 0));
        data.tax_total = Some(Decimal::new(2, 0));
        data.gross_total = Some(Decimal::new(14, 0));

        let issues = data.consistency_issues();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("net total"));
        assert!(issues[1].contains("unknown category 'Fish'"));
    }
}
