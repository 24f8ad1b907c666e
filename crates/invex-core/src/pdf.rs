//! Page images embedded in scanned PDFs.
//!
//! Scanners and phone apps wrap each page as one image XObject. No rendering
//! happens here: the embedded image is decoded as-is.

use image::{DynamicImage, ImageBuffer, ImageFormat, Luma, Rgb};
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, trace};

use crate::error::{DocumentError, Result};

/// The largest image on the first page.
///
/// Falls back to every image object in the document when the page has no
/// image XObjects of its own. `Ok(None)` means the PDF carries no decodable
/// image at all.
pub fn first_page_image(bytes: &[u8]) -> Result<Option<DynamicImage>> {
    let doc = load(bytes)?;

    let Some(page_id) = doc.get_pages().values().next().copied() else {
        return Err(DocumentError::PdfStructure("document has no pages".to_string()).into());
    };

    let mut images = page_images(&doc, page_id);
    if images.is_empty() {
        debug!("No image XObjects on the first page, scanning all objects");
        images = doc
            .objects
            .values()
            .filter_map(|object| decode_image(&doc, object))
            .collect();
    }

    debug!("Found {} candidate page images", images.len());
    Ok(images
        .into_iter()
        .max_by_key(|image| u64::from(image.width()) * u64::from(image.height())))
}

fn load(bytes: &[u8]) -> Result<Document> {
    let mut doc = Document::load_mem(bytes).map_err(|e| DocumentError::PdfStructure(e.to_string()))?;

    if doc.is_encrypted() {
        doc.decrypt("")
            .map_err(|_| DocumentError::PdfStructure("document is password protected".to_string()))?;
        debug!("Decrypted PDF with empty password");
    }

    Ok(doc)
}

fn page_images(doc: &Document, page_id: ObjectId) -> Vec<DynamicImage> {
    let Some(resources) = resources(doc, page_id) else {
        return Vec::new();
    };
    let Ok(xobjects) = resources.get(b"XObject") else {
        return Vec::new();
    };
    let Ok((_, Object::Dictionary(xobjects))) = doc.dereference(xobjects) else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(_, reference)| doc.dereference(reference).ok())
        .filter_map(|(_, object)| decode_image(doc, object))
        .collect()
}

/// Resources of a page tree node, inherited from its ancestors when absent.
fn resources(doc: &Document, node_id: ObjectId) -> Option<Dictionary> {
    let Ok(Object::Dictionary(node)) = doc.get_object(node_id) else {
        return None;
    };

    if let Ok(resources) = node.get(b"Resources") {
        if let Ok((_, Object::Dictionary(dict))) = doc.dereference(resources) {
            return Some(dict.clone());
        }
    }

    match node.get(b"Parent") {
        Ok(Object::Reference(parent_id)) => resources(doc, *parent_id),
        _ => None,
    }
}

fn decode_image(doc: &Document, object: &Object) -> Option<DynamicImage> {
    let Object::Stream(stream) = object else {
        return None;
    };
    let dict = &stream.dict;

    if dict.get(b"Subtype").ok()?.as_name().ok()? != b"Image" {
        return None;
    }

    let width = u32::try_from(dict.get(b"Width").ok()?.as_i64().ok()?).ok()?;
    let height = u32::try_from(dict.get(b"Height").ok()?.as_i64().ok()?).ok()?;
    trace!("Image object {}x{}", width, height);

    match filter(dict) {
        Some(b"DCTDecode") => {
            return image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg).ok();
        }
        Some(name @ (b"JPXDecode" | b"CCITTFaxDecode" | b"JBIG2Decode")) => {
            trace!("Unsupported image filter {}", String::from_utf8_lossy(name));
            return None;
        }
        _ => {}
    }

    let bits = dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        trace!("Unsupported bits per component: {}", bits);
        return None;
    }

    let data = stream
        .decompressed_content()
        .unwrap_or_else(|_| stream.content.clone());
    let pixels = (width as usize).checked_mul(height as usize)?;

    match color_space(doc, dict) {
        b"DeviceGray" | b"G" => {
            ImageBuffer::<Luma<u8>, _>::from_raw(width, height, data.get(..pixels)?.to_vec())
                .map(DynamicImage::ImageLuma8)
        }
        b"DeviceRGB" | b"RGB" => {
            let len = pixels.checked_mul(3)?;
            ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, data.get(..len)?.to_vec())
                .map(DynamicImage::ImageRgb8)
        }
        other => {
            trace!("Unsupported color space {}", String::from_utf8_lossy(other));
            None
        }
    }
}

/// First filter of the stream, if any.
fn filter(dict: &Dictionary) -> Option<&[u8]> {
    match dict.get(b"Filter").ok()? {
        Object::Name(name) => Some(name.as_slice()),
        Object::Array(filters) => filters.first().and_then(|o| o.as_name().ok()),
        _ => None,
    }
}

fn color_space<'a>(doc: &'a Document, dict: &'a Dictionary) -> &'a [u8] {
    dict.get(b"ColorSpace")
        .ok()
        .and_then(|o| match o {
            Object::Name(name) => Some(name.as_slice()),
            Object::Array(parts) => parts.first().and_then(|o| o.as_name().ok()),
            Object::Reference(r) => doc.get_object(*r).ok().and_then(|o| o.as_name().ok()),
            _ => None,
        })
        .unwrap_or(b"DeviceRGB")
}

/// A one-page PDF holding a single grayscale image and no text.
#[cfg(test)]
pub(crate) fn image_only_pdf(width: u32, height: u32) -> Vec<u8> {
    use lopdf::{dictionary, Stream};

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let pixels: Vec<u8> = (0..width * height).map(|i| (i % 256) as u8).collect();
    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(width),
            "Height" => i64::from(height),
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        pixels,
    ));
    let content_id = doc.add_object(Stream::new(
        dictionary! {},
        format!("q {} 0 0 {} 0 0 cm /Im0 Do Q", width, height).into_bytes(),
    ));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "MediaBox" => vec![0.into(), 0.into(), i64::from(width).into(), i64::from(height).into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data).unwrap();
    data
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InvexError;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_first_page_image() {
        let image = first_page_image(&image_only_pdf(40, 30)).unwrap().unwrap();

        assert_eq!((image.width(), image.height()), (40, 30));
        assert_eq!(image.to_luma8().get_pixel(1, 0).0, [1]);
    }

    #[test]
    fn test_not_a_pdf() {
        let err = first_page_image(b"%PDF-1.4 truncated").unwrap_err();
        assert!(matches!(err, InvexError::Document(DocumentError::PdfStructure(_))));
    }

    #[test]
    fn test_default_color_space() {
        let dict = Dictionary::new();
        assert_eq!(color_space(&Document::new(), &dict), b"DeviceRGB");
    }
}
