use super::{Bitmap, PageRasterizer};
use crate::core::document::{Document, SourceKind};
use crate::{Result, ScanlayerError};
use async_trait::async_trait;
use image::imageops::FilterType;

/// Rasterizer for single-image sources.
///
/// Decodes the image and resizes it with Lanczos3 when `scale` differs from 1.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRasterizer;

#[async_trait]
impl PageRasterizer for ImageRasterizer {
    async fn rasterize(&self, document: &Document, page: u32, scale: f64) -> Result<Bitmap> {
        if document.kind() != SourceKind::Image {
            return Err(ScanlayerError::page_render(page, "source is not an image"));
        }
        if page != 1 {
            return Err(ScanlayerError::page_render(
                page,
                "image sources only have page 1",
            ));
        }
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ScanlayerError::page_render(page, format!("invalid scale {}", scale)));
        }

        let document = document.clone();
        tokio::task::spawn_blocking(move || render_image(&document, page, scale))
            .await
            .map_err(|e| ScanlayerError::page_render_with_source(page, "rasterization task failed", e))?
    }
}

fn render_image(document: &Document, page: u32, scale: f64) -> Result<Bitmap> {
    let decoded = image::load_from_memory(document.bytes())
        .map_err(|e| ScanlayerError::page_render_with_source(page, "failed to decode image", e))?;

    let image = decoded.into_rgb8();
    if (scale - 1.0).abs() < f64::EPSILON {
        return Ok(Bitmap::new(image, 1.0, page));
    }

    // Token boxes are divided by one scale, so both sides follow the rounded width.
    let width = ((f64::from(image.width()) * scale).round() as u32).max(1);
    let effective = f64::from(width) / f64::from(image.width());
    let height = ((f64::from(image.height()) * effective).round() as u32).max(1);
    tracing::debug!(
        "Resizing image page {}x{} -> {}x{} (requested scale {:.3}, effective {:.4})",
        image.width(),
        image.height(),
        width,
        height,
        scale,
        effective
    );
    let resized = image::imageops::resize(&image, width, height, FilterType::Lanczos3);

    Ok(Bitmap::new(resized, effective, page))
}
