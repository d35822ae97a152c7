//! Page rasterization.
//!
//! Recognition works on bitmaps. A [`PageRasterizer`] turns one page of a
//! [`Document`] into a [`Bitmap`] at a requested scale; the scale the bitmap was
//! actually rendered at travels with it so token boxes can be mapped back to
//! page coordinates later.

mod image;

pub use self::image::ImageRasterizer;

use crate::core::config::RenderConfig;
use crate::core::document::{Document, SourceKind};
use crate::{Result, ScanlayerError};
use ::image::RgbImage;
use async_trait::async_trait;
use std::sync::Arc;

/// A rendered page.
#[derive(Debug, Clone)]
pub struct Bitmap {
    pub image: RgbImage,
    /// Pixels per page unit (points for PDFs, source pixels for images).
    pub scale: f64,
    /// 1-indexed page number the bitmap was rendered from.
    pub page: u32,
}

impl Bitmap {
    pub fn new(image: RgbImage, scale: f64, page: u32) -> Self {
        Self { image, scale, page }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

/// Renders document pages to bitmaps.
///
/// Implementations may lower the requested scale (for example to respect a
/// maximum bitmap size) and must then report the effective scale in
/// [`Bitmap::scale`].
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// # Errors
    ///
    /// Returns `PageRenderFailure` carrying `page`.
    async fn rasterize(&self, document: &Document, page: u32, scale: f64) -> Result<Bitmap>;
}

/// Dispatches to an image or paged-document rasterizer based on [`SourceKind`].
pub struct CompositeRasterizer {
    image: ImageRasterizer,
    paged: Option<Arc<dyn PageRasterizer>>,
}

impl CompositeRasterizer {
    /// Image support only; paged documents fail to render.
    pub fn images_only() -> Self {
        Self {
            image: ImageRasterizer,
            paged: None,
        }
    }

    pub fn with_paged(paged: Arc<dyn PageRasterizer>) -> Self {
        Self {
            image: ImageRasterizer,
            paged: Some(paged),
        }
    }

    /// Uses Pdfium for PDFs when the `pdf` feature is enabled.
    pub fn from_config(config: &RenderConfig) -> Self {
        #[cfg(feature = "pdf")]
        {
            let options = crate::pdf::PageRenderOptions::from(config);
            Self::with_paged(Arc::new(crate::pdf::PdfiumRasterizer::new(options)))
        }
        #[cfg(not(feature = "pdf"))]
        {
            let _ = config;
            Self::images_only()
        }
    }
}

impl Default for CompositeRasterizer {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

#[async_trait]
impl PageRasterizer for CompositeRasterizer {
    async fn rasterize(&self, document: &Document, page: u32, scale: f64) -> Result<Bitmap> {
        match document.kind() {
            SourceKind::Image => self.image.rasterize(document, page, scale).await,
            SourceKind::Paged => match &self.paged {
                Some(paged) => paged.rasterize(document, page, scale).await,
                None => Err(ScanlayerError::page_render(
                    page,
                    "no rasterizer for paged documents is available (enable the `pdf` feature)",
                )),
            },
        }
    }
}
