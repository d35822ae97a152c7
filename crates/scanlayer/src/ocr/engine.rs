use super::{hocr, tsv};
use crate::Result;
use crate::render::Bitmap;
use crate::types::{PageResult, RecognitionToken};
use async_trait::async_trait;
use std::sync::Arc;

/// Shared handle to a loaded engine.
pub type EngineHandle = Arc<dyn RecognitionEngine>;

/// Raw output of recognizing one bitmap.
///
/// Engines that cannot produce hOCR or TSV themselves leave those fields empty;
/// they are synthesized from `tokens`.
#[derive(Debug, Clone, Default)]
pub struct EngineOutput {
    pub text: String,
    /// 0-100
    pub confidence: f64,
    pub tokens: Vec<RecognitionToken>,
    pub positional_markup: Option<String>,
    pub tabular_rows: Option<String>,
}

impl EngineOutput {
    /// Complete the output into a [`PageResult`] for the page `bitmap` was rendered from.
    pub fn into_page_result(self, bitmap: &Bitmap) -> PageResult {
        let (width, height) = (bitmap.width(), bitmap.height());
        let positional_markup = match self.positional_markup {
            Some(markup) if !markup.trim().is_empty() => markup,
            _ => hocr::synthesize_page(&self.tokens, bitmap.page, width, height),
        };
        let tabular_rows = match self.tabular_rows {
            Some(rows) if !rows.trim().is_empty() => rows,
            _ => tsv::synthesize_rows(&self.tokens, bitmap.page, width, height),
        };

        PageResult {
            page_number: bitmap.page,
            text: self.text,
            confidence: self.confidence.clamp(0.0, 100.0),
            tokens: self.tokens,
            positional_markup,
            tabular_rows,
            scale: bitmap.scale,
            raster_width: width,
            raster_height: height,
        }
    }
}

/// A recognition engine bound to one language.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Engine language code.
    fn language(&self) -> &str;

    /// Recognize text in a page bitmap.
    ///
    /// # Errors
    ///
    /// Returns `RecognitionFailure` for the bitmap's page.
    async fn recognize(&self, bitmap: &Bitmap) -> Result<EngineOutput>;
}

/// Loads engines for the pool.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    /// # Errors
    ///
    /// Returns `ModelLoadFailure` when the language model is unavailable.
    async fn load(&self, language: &str) -> Result<EngineHandle>;
}
