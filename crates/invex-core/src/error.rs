//! Error types for the invex-core library.

use thiserror::Error;

/// Main error type for the invex library.
#[derive(Error, Debug)]
pub enum InvexError {
    /// Model output could not be turned into an invoice record.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Input document could not be prepared for the model.
    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    /// Image decoding or re-encoding error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors related to preparing an input document.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// The bytes are neither a PDF nor a decodable image.
    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Failed to extract embedded text from a PDF.
    #[error("failed to extract PDF text: {0}")]
    PdfText(String),

    /// The PDF object structure could not be read.
    #[error("failed to read PDF: {0}")]
    PdfStructure(String),

    /// The document carries no usable content.
    #[error("document is empty")]
    Empty,

    /// The document exceeds the configured size limit.
    #[error("document is {size} bytes, limit is {limit}")]
    TooLarge { size: usize, limit: usize },
}

/// A raw field value that cannot be converted to its declared type.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot coerce {field} = {value}: {reason}")]
pub struct CoercionError {
    /// Path of the offending field, e.g. `items[2].quantity`.
    pub field: String,
    /// The raw JSON value, rendered as JSON text.
    pub value: String,
    /// Why the value was rejected.
    pub reason: String,
}

impl CoercionError {
    pub fn new(field: impl Into<String>, value: &serde_json::Value, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// A normalized record that still violates the invoice schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("validation failed for {field} = {value}: {reason}")]
pub struct ValidationError {
    /// Path of the offending field, e.g. `invoice_date`.
    pub field: String,
    /// The offending value, rendered as JSON text.
    pub value: String,
    /// Which constraint was violated.
    pub reason: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, value: &serde_json::Value, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Failure of one stage of the normalization pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NormalizeError {
    /// Text is not valid JSON after fence stripping.
    #[error("invalid JSON: {reason}")]
    Parse { reason: String },

    /// An item field could not be coerced.
    #[error(transparent)]
    Coercion(#[from] CoercionError),

    /// The normalized record failed strict validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Unified extraction failure, carrying the untouched model output.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to parse/validate model output: {error}\nraw output:\n{raw_output}")]
pub struct ExtractionError {
    /// The stage that failed.
    #[source]
    pub error: NormalizeError,
    /// Raw model output exactly as received.
    pub raw_output: String,
}

impl ExtractionError {
    pub fn new(error: impl Into<NormalizeError>, raw_output: &str) -> Self {
        Self {
            error: error.into(),
            raw_output: raw_output.to_string(),
        }
    }
}

/// Result type for the invex library.
pub type Result<T> = std::result::Result<T, InvexError>;
