//! Source documents.
//!
//! A [`Document`] owns the raw bytes of either a PDF or a single raster image,
//! together with the facts the pipeline needs before any page is rendered:
//! the source kind and the page count.

use crate::{Result, ScanlayerError};
use std::path::Path;
use std::sync::Arc;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Kind of source a [`Document`] was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Multi-page document (PDF).
    Paged,
    /// A single raster image, treated as a one-page document.
    Image,
}

/// A loaded, validated source document.
#[derive(Debug, Clone)]
pub struct Document {
    name: String,
    bytes: Arc<[u8]>,
    kind: SourceKind,
    page_count: u32,
    /// Pixel size for image sources.
    dimensions: Option<(u32, u32)>,
}

impl Document {
    /// Load a single-image source.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInput` if the bytes cannot be decoded as an image.
    pub fn from_image(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let name = name.into();
        let bytes: Vec<u8> = bytes.into();

        let image = image::load_from_memory(&bytes).map_err(|e| {
            ScanlayerError::unsupported_input_with_source(format!("'{}' is not a decodable image", name), e)
        })?;

        if image.width() == 0 || image.height() == 0 {
            return Err(ScanlayerError::unsupported_input(format!("'{}' is an empty image", name)));
        }

        tracing::debug!("Loaded image source '{}' ({}x{})", name, image.width(), image.height());

        Ok(Self {
            name,
            bytes: bytes.into(),
            kind: SourceKind::Image,
            page_count: 1,
            dimensions: Some((image.width(), image.height())),
        })
    }

    /// Load a PDF source.
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedInput` if the bytes do not parse as a PDF or the
    /// document has no pages.
    pub fn from_pdf(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let name = name.into();
        let bytes: Vec<u8> = bytes.into();

        let pdf = lopdf::Document::load_mem(&bytes).map_err(|e| {
            ScanlayerError::unsupported_input_with_source(format!("'{}' is not a readable PDF", name), e)
        })?;

        let page_count = u32::try_from(pdf.get_pages().len())
            .map_err(|_| ScanlayerError::unsupported_input(format!("'{}' has too many pages", name)))?;
        if page_count == 0 {
            return Err(ScanlayerError::unsupported_input(format!("'{}' has no pages", name)));
        }

        tracing::debug!("Loaded PDF source '{}' with {} pages", name, page_count);

        Ok(Self {
            name,
            bytes: bytes.into(),
            kind: SourceKind::Paged,
            page_count,
            dimensions: None,
        })
    }

    /// Load from bytes, sniffing the PDF header and otherwise trying the image decoders.
    pub fn from_bytes(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes: Vec<u8> = bytes.into();
        if is_pdf(&bytes) {
            Self::from_pdf(name, bytes)
        } else {
            Self::from_image(name, bytes)
        }
    }

    /// Read and load a file; the file name becomes the document name.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self::from_bytes(name, bytes)
    }

    /// File name the document was loaded under; used for language detection.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    pub fn is_image(&self) -> bool {
        self.kind == SourceKind::Image
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Width and height in pixels, for image sources.
    pub fn image_dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }

    /// Text already embedded in the first page of a PDF, truncated to `max_chars`.
    ///
    /// Returns `None` for images, for pages without a text layer, and when the
    /// text cannot be extracted.
    pub fn native_text_sample(&self, max_chars: usize) -> Option<String> {
        if self.kind != SourceKind::Paged || max_chars == 0 {
            return None;
        }

        let pdf = match lopdf::Document::load_mem(&self.bytes) {
            Ok(pdf) => pdf,
            Err(e) => {
                tracing::debug!("Native text sample unavailable for '{}': {}", self.name, e);
                return None;
            }
        };

        let text = match pdf.extract_text(&[1]) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("Native text extraction failed for '{}': {}", self.name, e);
                return None;
            }
        };

        let sample: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
        if sample.is_empty() {
            return None;
        }
        Some(sample.chars().take(max_chars).collect())
    }
}

fn is_pdf(bytes: &[u8]) -> bool {
    // Some producers emit garbage before the header; the PDF spec allows up to 1024 bytes.
    let window = &bytes[..bytes.len().min(1024)];
    window.windows(PDF_MAGIC.len()).any(|w| w == PDF_MAGIC)
}
