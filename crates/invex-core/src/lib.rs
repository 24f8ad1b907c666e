//! Core library for model-based invoice extraction.
//!
//! This crate provides:
//! - Normalization of free-form model JSON into validated invoice records
//! - Invoice data models and configuration
//! - Preparation of image and PDF inputs for a vision-capable model

pub mod document;
pub mod error;
pub mod models;
pub mod normalize;
pub mod pdf;

pub use document::{prepare_document, DocumentKind, ModelInput};
pub use error::{
    CoercionError, DocumentError, ExtractionError, InvexError, NormalizeError, Result,
    ValidationError,
};
pub use models::config::{DocumentConfig, InvexConfig, ItemPolicy, ModelConfig, NormalizeOptions};
pub use models::invoice::{Discount, InvoiceData, InvoiceItem, ItemCategory};
pub use normalize::{extract_invoice, normalize_output, ExtractionResult, NormalizedInvoice};
