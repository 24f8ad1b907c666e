//! Normalization of raw model output into validated invoice records.
//!
//! Pipeline: strip code fences, parse JSON, repair shapes
//! ([`schema::normalize_schema`]), then type strictly
//! ([`validate::validate_invoice`]). Every stage is a pure function of its
//! input, so invocations can run concurrently without coordination.

pub(crate) mod coerce;
pub mod dates;
pub mod fence;
pub mod items;
pub mod schema;
pub mod validate;

pub use dates::normalize_date;
pub use fence::strip_code_fence;
pub use items::normalize_item;
pub use schema::{normalize_schema, DiscountShape, ItemIssue, NormalizedInvoice, TaxTotalShape};
pub use validate::validate_invoice;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ExtractionError, NormalizeError};
use crate::models::config::NormalizeOptions;
use crate::models::invoice::InvoiceData;

/// Result of turning one model response into an invoice.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    /// Validated invoice record.
    pub invoice: InvoiceData,
    /// Non-fatal notes from shape repair.
    pub warnings: Vec<String>,
    /// Items dropped under the skip policy.
    pub skipped_items: Vec<ItemIssue>,
}

/// Parse and shape-repair raw model output without the final validation.
pub fn normalize_output(raw_output: &str, options: &NormalizeOptions) -> Result<NormalizedInvoice, NormalizeError> {
    let cleaned = strip_code_fence(raw_output);

    let value: Value = serde_json::from_str(cleaned).map_err(|e| NormalizeError::Parse {
        reason: e.to_string(),
    })?;

    let Value::Object(raw) = value else {
        return Err(NormalizeError::Parse {
            reason: "expected a JSON object at the top level".to_string(),
        });
    };

    Ok(normalize_schema(raw, options)?)
}

/// Turn raw model output into a validated invoice record.
///
/// Any failure is returned together with the untouched `raw_output`.
pub fn extract_invoice(
    raw_output: &str,
    options: &NormalizeOptions,
) -> Result<ExtractionResult, ExtractionError> {
    let normalized = normalize_output(raw_output, options)
        .map_err(|e| ExtractionError::new(e, raw_output))?;

    let invoice = validate_invoice(&normalized, options).map_err(|e| {
        warn!("Normalized invoice failed validation: {}", e);
        ExtractionError::new(e, raw_output)
    })?;

    debug!(
        "Extracted invoice {:?} with {} items",
        invoice.invoice_number,
        invoice.items.len()
    );

    Ok(ExtractionResult {
        invoice,
        warnings: normalized.warnings,
        skipped_items: normalized.skipped,
    })
}
