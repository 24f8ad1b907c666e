//! Date canonicalization for model-provided date strings.

use chrono::NaiveDate;

/// Canonical output format.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Accepted input shapes, tried in order.
const INPUT_FORMATS: [&str; 5] = [
    "%d.%m.%y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%d/%m/%Y",
    "%d-%m-%Y",
];

/// Parse a date in any of the accepted shapes.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

/// Re-render a date string in the canonical form.
///
/// Empty input yields `None`. Text that matches none of the accepted shapes is
/// returned unchanged.
pub fn normalize_date(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    if raw.is_empty() {
        return None;
    }

    match parse_date(raw) {
        Some(date) => Some(date.format(CANONICAL_DATE_FORMAT).to_string()),
        None => Some(raw.to_string()),
    }
}
