use super::bindings::bind_pdfium;
use crate::core::config::RenderConfig;
use crate::core::document::{Document, SourceKind};
use crate::render::{Bitmap, PageRasterizer};
use crate::{Result, ScanlayerError};
use async_trait::async_trait;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};

const PDF_POINTS_PER_INCH: f64 = 72.0;

/// Resolution limits applied on top of the scale a caller asks for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRenderOptions {
    pub max_image_dimension: u32,
    pub min_dpi: u32,
    pub max_dpi: u32,
}

impl Default for PageRenderOptions {
    fn default() -> Self {
        Self::from(&RenderConfig::default())
    }
}

impl From<&RenderConfig> for PageRenderOptions {
    fn from(config: &RenderConfig) -> Self {
        Self {
            max_image_dimension: config.max_image_dimension,
            min_dpi: config.min_dpi,
            max_dpi: config.max_dpi,
        }
    }
}

/// Pdfium-backed rasterizer for PDF pages.
///
/// The requested scale is converted to DPI, clamped to `min_dpi..=max_dpi` and
/// lowered when the bitmap would exceed `max_image_dimension`. The returned
/// bitmap carries the effective scale.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    options: PageRenderOptions,
}

impl PdfiumRasterizer {
    pub fn new(options: PageRenderOptions) -> Self {
        Self { options }
    }
}

#[async_trait]
impl PageRasterizer for PdfiumRasterizer {
    async fn rasterize(&self, document: &Document, page: u32, scale: f64) -> Result<Bitmap> {
        if document.kind() != SourceKind::Paged {
            return Err(ScanlayerError::page_render(page, "source is not a paged document"));
        }
        if page == 0 || page > document.page_count() {
            return Err(ScanlayerError::page_render(
                page,
                format!("page out of range (document has {} pages)", document.page_count()),
            ));
        }

        let document = document.clone();
        let options = self.options.clone();
        tokio::task::spawn_blocking(move || render_page(&document, page, scale, &options))
            .await
            .map_err(|e| ScanlayerError::page_render_with_source(page, "rasterization task failed", e))?
    }
}

fn render_page(document: &Document, page_number: u32, scale: f64, options: &PageRenderOptions) -> Result<Bitmap> {
    let bindings = bind_pdfium().map_err(|e| ScanlayerError::page_render(page_number, e))?;
    let pdfium = Pdfium::new(bindings);

    let pdf = pdfium
        .load_pdf_from_byte_slice(document.bytes(), None)
        .map_err(|e| ScanlayerError::page_render(page_number, format!("Pdfium could not open document: {}", e)))?;

    let index = u16::try_from(page_number - 1)
        .map_err(|_| ScanlayerError::page_render(page_number, "page index exceeds Pdfium limits"))?;
    let page = pdf
        .pages()
        .get(index)
        .map_err(|e| ScanlayerError::page_render(page_number, format!("page not found: {}", e)))?;

    let width_points = f64::from(page.width().value);
    let height_points = f64::from(page.height().value);

    let requested_dpi = (scale * PDF_POINTS_PER_INCH).round() as i64;
    let dpi = calculate_optimal_dpi(width_points, height_points, requested_dpi, options);
    let effective_scale = f64::from(dpi) / PDF_POINTS_PER_INCH;

    tracing::debug!(
        "Rendering page {} ({:.1}x{:.1} pt) at {} dpi",
        page_number,
        width_points,
        height_points,
        dpi
    );

    let config = PdfRenderConfig::new()
        .set_target_width(((width_points * effective_scale) as i32).max(1))
        .set_target_height(((height_points * effective_scale) as i32).max(1))
        .rotate_if_landscape(PdfPageRenderRotation::None, false);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| ScanlayerError::page_render(page_number, format!("Failed to render page: {}", e)))?;

    let image = bitmap.as_image().into_rgb8();
    Ok(Bitmap::new(image, effective_scale, page_number))
}

fn calculate_optimal_dpi(page_width: f64, page_height: f64, target_dpi: i64, options: &PageRenderOptions) -> u32 {
    let min_dpi = i64::from(options.min_dpi);
    let max_dpi = i64::from(options.max_dpi.max(options.min_dpi));
    let max_dimension = f64::from(options.max_image_dimension);

    let width_inches = page_width / PDF_POINTS_PER_INCH;
    let height_inches = page_height / PDF_POINTS_PER_INCH;

    let width_at_target = width_inches * target_dpi as f64;
    let height_at_target = height_inches * target_dpi as f64;

    let dpi = if width_at_target <= max_dimension && height_at_target <= max_dimension {
        target_dpi
    } else {
        let width_limited = (max_dimension / width_inches) as i64;
        let height_limited = (max_dimension / height_inches) as i64;
        width_limited.min(height_limited)
    };

    dpi.clamp(min_dpi, max_dpi) as u32
}
