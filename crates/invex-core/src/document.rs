//! Preparation of input documents for a vision-capable model.
//!
//! Images the model accepts are passed through; other raster formats are
//! re-encoded as PNG. PDFs contribute their embedded text, or the page image
//! when they are scans.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat};
use tracing::{debug, info};

use crate::error::{DocumentError, Result};
use crate::models::config::DocumentConfig;
use crate::pdf;

/// Kind of input document, detected from its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    Png,
    Jpeg,
    Gif,
    Webp,
    /// Anything else; may still be a raster format the decoder knows.
    Other,
}

impl DocumentKind {
    /// Detect the kind from magic bytes.
    pub fn detect(bytes: &[u8]) -> Self {
        if bytes.starts_with(b"%PDF") {
            DocumentKind::Pdf
        } else if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            DocumentKind::Png
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            DocumentKind::Jpeg
        } else if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            DocumentKind::Gif
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            DocumentKind::Webp
        } else {
            DocumentKind::Other
        }
    }

    /// MIME type for images the model accepts as-is.
    pub fn image_mime(&self) -> Option<&'static str> {
        match self {
            DocumentKind::Png => Some("image/png"),
            DocumentKind::Jpeg => Some("image/jpeg"),
            DocumentKind::Gif => Some("image/gif"),
            DocumentKind::Webp => Some("image/webp"),
            DocumentKind::Pdf | DocumentKind::Other => None,
        }
    }
}

/// Payload handed to the model collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelInput {
    /// An image with its MIME type.
    Image { mime: &'static str, data: Vec<u8> },
    /// Text extracted from a document.
    Text(String),
}

impl ModelInput {
    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            ModelInput::Image { mime, data } => format!("{} image, {} bytes", mime, data.len()),
            ModelInput::Text(text) => format!("text, {} chars", text.chars().count()),
        }
    }
}

/// Turn raw document bytes into a model payload.
pub fn prepare_document(bytes: Vec<u8>, config: &DocumentConfig) -> Result<ModelInput> {
    if bytes.is_empty() {
        return Err(DocumentError::Empty.into());
    }
    if config.max_bytes > 0 && bytes.len() > config.max_bytes {
        return Err(DocumentError::TooLarge {
            size: bytes.len(),
            limit: config.max_bytes,
        }
        .into());
    }

    let kind = DocumentKind::detect(&bytes);
    debug!("Detected document kind: {:?}", kind);

    if let Some(mime) = kind.image_mime() {
        return Ok(ModelInput::Image { mime, data: bytes });
    }

    match kind {
        DocumentKind::Pdf => prepare_pdf(&bytes, config),
        _ => reencode_png(&bytes),
    }
}

fn reencode_png(bytes: &[u8]) -> Result<ModelInput> {
    let format = image::guess_format(bytes)
        .map_err(|_| DocumentError::UnsupportedFormat("unrecognized file contents".to_string()))?;
    info!("Converting {:?} image to PNG", format);

    let image = image::load_from_memory_with_format(bytes, format)?;
    png_input(&image)
}

fn png_input(image: &DynamicImage) -> Result<ModelInput> {
    let mut data = Vec::new();
    image.write_to(&mut Cursor::new(&mut data), ImageFormat::Png)?;

    Ok(ModelInput::Image {
        mime: "image/png",
        data,
    })
}

/// Embedded text when there is enough of it, else the scanned first page.
fn prepare_pdf(bytes: &[u8], config: &DocumentConfig) -> Result<ModelInput> {
    match pdf_text(bytes) {
        Ok(text) if text.chars().count() >= config.min_pdf_text_length => {
            debug!("Extracted {} chars of PDF text", text.len());
            return Ok(ModelInput::Text(text));
        }
        Ok(text) => debug!("PDF has only {} chars of text", text.chars().count()),
        Err(e) => debug!("PDF text extraction failed: {}", e),
    }

    match pdf::first_page_image(bytes)? {
        Some(image) => {
            info!(
                "Sending scanned PDF page as {}x{} PNG",
                image.width(),
                image.height()
            );
            png_input(&image)
        }
        None => Err(DocumentError::PdfText(
            "PDF has neither usable embedded text nor a page image".to_string(),
        )
        .into()),
    }
}

#[cfg(feature = "native")]
fn pdf_text(bytes: &[u8]) -> Result<String> {
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|e| DocumentError::PdfText(e.to_string()))?;
    Ok(text.trim().to_string())
}

#[cfg(not(feature = "native"))]
fn pdf_text(_bytes: &[u8]) -> Result<String> {
    Err(DocumentError::PdfText("text extraction requires the native feature".to_string()).into())
}
