//! Source document loaders.

use crate::error::{DocgateError, Result};
use super::raster::{encode_png, Raster};
use lopdf::xobject::PdfImage;
use lopdf::{Document, Object, Stream};
use std::path::Path;
use tracing::{debug, instrument, warn};

/// Text of one page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageText {
    /// 1-based page number.
    pub page: u32,
    pub text: String,
}

/// A raster image embedded in a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    /// 1-based page number.
    pub page: u32,
    /// 1-based position of the image within its page.
    pub index: usize,
    pub bytes: Vec<u8>,
    /// File extension matching the encoded bytes.
    pub extension: String,
}

/// Reads the modalities a document format offers.
pub trait DocumentLoader: Send + Sync {
    /// Whether this loader handles the file.
    fn supports(&self, path: &Path) -> bool;

    fn load_text(&self, path: &Path) -> Result<Vec<PageText>>;

    /// Formats without embedded images return an empty list.
    fn load_images(&self, path: &Path) -> Result<Vec<PageImage>>;
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| extensions.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// PDF documents via `lopdf`.
#[derive(Debug, Default)]
pub struct PdfLoader;

impl PdfLoader {
    fn open(path: &Path) -> Result<Document> {
        Document::load(path).map_err(|e| {
            DocgateError::Extraction(format!("Failed to open {}: {}", path.display(), e))
        })
    }

    /// Bytes and extension of a viewable file for an image XObject.
    ///
    /// JPEG and JPEG 2000 streams are kept as encoded. Other images are
    /// decoded to raw samples and re-encoded as PNG.
    fn export_image(doc: &Document, image: &PdfImage<'_>) -> Result<(Vec<u8>, &'static str)> {
        let stream = doc.get_object(image.id).and_then(Object::as_stream)?;
        let filters = image.filters.as_deref().unwrap_or_default();

        match filters.split_last() {
            Some((last, leading)) if last == "DCTDecode" => Ok((decode_filters(stream, leading)?, "jpg")),
            Some((last, leading)) if last == "JPXDecode" => Ok((decode_filters(stream, leading)?, "jp2")),
            _ => {
                let samples = decode_filters(stream, filters)?;
                let raster = Raster {
                    width: dimension(image.width)?,
                    height: dimension(image.height)?,
                    components: color_components(doc, image)?,
                    bits_per_component: image.bits_per_component.unwrap_or(8).clamp(0, 255) as u8,
                    samples: &samples,
                };
                Ok((encode_png(&raster)?, "png"))
            }
        }
    }
}

fn dimension(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| DocgateError::Extraction(format!("invalid image dimension {}", value)))
}

/// Undo `filters` on a copy of the stream.
fn decode_filters(stream: &Stream, filters: &[String]) -> Result<Vec<u8>> {
    if filters.is_empty() {
        return Ok(stream.content.clone());
    }

    // lopdf refuses to decompress streams tagged as images.
    let mut plain = stream.clone();
    plain.dict.remove(b"Subtype");
    plain.dict.set(
        "Filter",
        Object::Array(filters.iter().map(|f| Object::Name(f.as_bytes().to_vec())).collect()),
    );
    Ok(plain.decompressed_content()?)
}

/// Components per pixel for the image's color space.
fn color_components(doc: &Document, image: &PdfImage<'_>) -> Result<u8> {
    let unsupported = |name: &str| DocgateError::Extraction(format!("unsupported color space {}", name));

    match image.color_space.as_deref() {
        Some("DeviceGray" | "CalGray") => Ok(1),
        Some("DeviceRGB" | "CalRGB") => Ok(3),
        Some("DeviceCMYK") => Ok(4),
        Some("ICCBased") => {
            let components = image
                .origin_dict
                .get(b"ColorSpace")
                .and_then(Object::as_array)
                .ok()
                .and_then(|cs| cs.get(1))
                .and_then(|profile| profile.as_reference().ok())
                .and_then(|id| doc.get_object(id).and_then(Object::as_stream).ok())
                .and_then(|profile| profile.dict.get(b"N").and_then(Object::as_i64).ok());
            match components {
                Some(n @ (1 | 3 | 4)) => Ok(n as u8),
                _ => Err(unsupported("ICCBased")),
            }
        }
        None if image.origin_dict.get(b"ImageMask").and_then(Object::as_bool).unwrap_or(false) => Ok(1),
        Some(other) => Err(unsupported(other)),
        None => Err(unsupported("(none)")),
    }
}

impl DocumentLoader for PdfLoader {
    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["pdf"])
    }

    #[instrument(skip(self))]
    fn load_text(&self, path: &Path) -> Result<Vec<PageText>> {
        let doc = Self::open(path)?;
        let mut pages = Vec::new();

        for page in doc.get_pages().into_keys() {
            let text = doc.extract_text(&[page])?;
            pages.push(PageText { page, text });
        }

        debug!("Read text from {} pages", pages.len());
        Ok(pages)
    }

    #[instrument(skip(self))]
    fn load_images(&self, path: &Path) -> Result<Vec<PageImage>> {
        let doc = Self::open(path)?;
        let mut images = Vec::new();

        for (page, page_id) in doc.get_pages() {
            // Pages without an XObject resource dictionary carry no images.
            let Ok(page_images) = doc.get_page_images(page_id) else {
                continue;
            };

            for (i, image) in page_images.iter().enumerate() {
                match Self::export_image(&doc, image) {
                    Ok((bytes, extension)) => images.push(PageImage {
                        page,
                        index: i + 1,
                        bytes,
                        extension: extension.to_string(),
                    }),
                    Err(e) => warn!("Skipping image {} on page {}: {}", i + 1, page, e),
                }
            }
        }

        debug!("Found {} images", images.len());
        Ok(images)
    }
}

/// Plain `.txt` / `.md` files, treated as a single page.
#[derive(Debug, Default)]
pub struct PlainTextLoader;

impl DocumentLoader for PlainTextLoader {
    fn supports(&self, path: &Path) -> bool {
        has_extension(path, &["txt", "md"])
    }

    fn load_text(&self, path: &Path) -> Result<Vec<PageText>> {
        Ok(vec![PageText {
            page: 1,
            text: std::fs::read_to_string(path)?,
        }])
    }

    fn load_images(&self, _path: &Path) -> Result<Vec<PageImage>> {
        Ok(Vec::new())
    }
}

/// The loaders used for a normal ingestion run.
pub fn default_loaders() -> Vec<Box<dyn DocumentLoader>> {
    vec![Box::new(PdfLoader), Box::new(PlainTextLoader)]
}
