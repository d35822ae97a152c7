//! Shared fixtures and mock collaborators for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use image::{ImageBuffer, Rgb, RgbImage};
use lopdf::content::{Content, Operation};
use lopdf::{Object, Stream, dictionary};
use scanlayer::core::document::Document;
use scanlayer::ocr::{EngineHandle, EngineLoader, EngineOutput, RecognitionEngine};
use scanlayer::render::{Bitmap, PageRasterizer};
use scanlayer::types::{BoundingBox, RecognitionToken, TokenLevel};
use scanlayer::{Result, ScanlayerError};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Build a PDF with `pages` empty US Letter pages.
pub fn pdf_bytes(pages: usize) -> Vec<u8> {
    let mut doc = lopdf::Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::new();
    for index in 0..pages {
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new("re", vec![72.into(), 72.into(), (index as i64 + 1).into(), 10.into()]),
                Operation::new("f", vec![]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {},
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).unwrap();
    bytes
}

pub fn pdf_document(name: &str, pages: usize) -> Document {
    Document::from_pdf(name, pdf_bytes(pages)).unwrap()
}

/// A deterministic, non-uniform RGB image.
pub fn gradient_image(width: u32, height: u32) -> RgbImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        Rgb([(x * 7 % 256) as u8, (y * 13 % 256) as u8, ((x + y) * 3 % 256) as u8])
    })
}

pub fn png_bytes(image: &RgbImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .unwrap();
    bytes
}

pub fn word(text: &str, left: u32, top: u32, width: u32, height: u32) -> RecognitionToken {
    RecognitionToken {
        text: text.to_string(),
        confidence: 95.0,
        bbox: BoundingBox::new(left, top, width, height),
        level: TokenLevel::Word,
    }
}

/// Rasterizer producing blank bitmaps; records every page it is asked for.
#[derive(Default)]
pub struct MockRasterizer {
    pub fail_on: Option<u32>,
    pub calls: parking_lot::Mutex<Vec<(u32, f64)>>,
}

impl MockRasterizer {
    pub fn failing_on(page: u32) -> Self {
        Self {
            fail_on: Some(page),
            ..Self::default()
        }
    }

    pub fn pages(&self) -> Vec<u32> {
        self.calls.lock().iter().map(|(page, _)| *page).collect()
    }
}

#[async_trait]
impl PageRasterizer for MockRasterizer {
    async fn rasterize(&self, document: &Document, page: u32, scale: f64) -> Result<Bitmap> {
        self.calls.lock().push((page, scale));
        if self.fail_on == Some(page) {
            return Err(ScanlayerError::page_render(page, "mock render failure"));
        }
        if page == 0 || page > document.page_count() {
            return Err(ScanlayerError::page_render(page, "page out of range"));
        }
        Ok(Bitmap::new(ImageBuffer::from_pixel(64, 48, Rgb([255, 255, 255])), scale, page))
    }
}

/// What a [`MockEngine`] reports for one page.
#[derive(Clone)]
pub struct PageScript {
    pub text: String,
    pub confidence: f64,
    pub tokens: Vec<RecognitionToken>,
}

/// Engine returning scripted output per page, or a default derived from the page number.
pub struct MockEngine {
    language: String,
    script: HashMap<u32, PageScript>,
    fallback_text: Option<String>,
    pub recognized: AtomicUsize,
}

#[async_trait]
impl RecognitionEngine for MockEngine {
    fn language(&self) -> &str {
        &self.language
    }

    async fn recognize(&self, bitmap: &Bitmap) -> Result<EngineOutput> {
        self.recognized.fetch_add(1, Ordering::SeqCst);
        let script = self.script.get(&bitmap.page).cloned().unwrap_or_else(|| PageScript {
            text: self
                .fallback_text
                .clone()
                .unwrap_or_else(|| format!("page {} {}", bitmap.page, self.language)),
            confidence: 90.0,
            tokens: vec![word(&format!("page{}", bitmap.page), 4, 4, 20, 10)],
        });
        Ok(EngineOutput {
            text: script.text,
            confidence: script.confidence,
            tokens: script.tokens,
            positional_markup: None,
            tabular_rows: None,
        })
    }
}

/// Loader creating [`MockEngine`]s and recording every load.
#[derive(Default)]
pub struct MockLoader {
    pub script: HashMap<u32, PageScript>,
    /// Text returned for unscripted pages, regardless of language.
    pub fallback_text: Option<String>,
    pub fail: Vec<&'static str>,
    pub delay: Option<Duration>,
    pub loads: parking_lot::Mutex<Vec<String>>,
}

impl MockLoader {
    pub fn with_script(script: HashMap<u32, PageScript>) -> Self {
        Self {
            script,
            ..Self::default()
        }
    }

    pub fn loaded(&self) -> Vec<String> {
        self.loads.lock().clone()
    }
}

#[async_trait]
impl EngineLoader for MockLoader {
    async fn load(&self, language: &str) -> Result<EngineHandle> {
        self.loads.lock().push(language.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.contains(&language) {
            return Err(ScanlayerError::model_load(language, "no traineddata"));
        }
        Ok(Arc::new(MockEngine {
            language: language.to_string(),
            script: self.script.clone(),
            fallback_text: self.fallback_text.clone(),
            recognized: AtomicUsize::new(0),
        }))
    }
}

/// Script with the given confidence per page (1-indexed order).
pub fn confidences(values: &[f64]) -> HashMap<u32, PageScript> {
    values
        .iter()
        .enumerate()
        .map(|(index, confidence)| {
            let page = index as u32 + 1;
            (
                page,
                PageScript {
                    text: format!("text of page {}", page),
                    confidence: *confidence,
                    tokens: vec![word(&format!("p{}", page), 2, 2, 12, 8)],
                },
            )
        })
        .collect()
}
