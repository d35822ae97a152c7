//! Scanlayer - OCR for scanned documents
//!
//! Scanlayer turns scanned PDFs and page images into text, hOCR, TSV or a
//! searchable PDF. A run picks a recognition language (explicitly or by
//! detection), borrows an engine from a process-wide pool, recognizes the
//! selected pages one at a time and assembles the requested output.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "full")]
//! # async fn example() -> scanlayer::Result<()> {
//! use scanlayer::{Document, Recognizer, RecognitionRequest, ScanlayerConfig, TracingProgress};
//!
//! let recognizer = Recognizer::with_defaults(ScanlayerConfig::default())?;
//! let document = Document::open("scan_fra.pdf")?;
//! let result = recognizer
//!     .run_recognition(&document, &RecognitionRequest::default(), &TracingProgress, None)
//!     .await?;
//! std::fs::write("scan_fra.txt", result.output.into_bytes())?;
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Core** (`core`): configuration, documents, progress and the run orchestrator
//! - **Language detection** (`language_detection`): filename and content guesses
//! - **OCR** (`ocr`): engine traits, the LRU engine pool, TSV/hOCR helpers, Tesseract
//! - **Rendering** (`render`, `pdf`): page rasterizers for images and PDFs
//! - **Output** (`output`): text, hOCR, TSV and searchable-PDF assemblers
//!
//! # Features
//!
//! - `pdf`: Pdfium page rasterizer for paged documents
//! - `tesseract`: native Tesseract recognition engine
//! - `full`: both

#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod language_detection;
pub mod ocr;
pub mod output;
pub mod render;
pub mod types;

#[cfg(feature = "pdf")]
pub mod pdf;

pub use error::{ErrorKind, Result, ScanlayerError};
pub use types::*;

pub use core::config::ScanlayerConfig;
pub use core::document::{Document, SourceKind};
pub use core::pipeline::Recognizer;
pub use core::progress::{CancellationToken, NoProgress, ProgressEvent, ProgressSink, RunPhase, TracingProgress};

pub use language_detection::LanguageDetector;
pub use ocr::{EngineHandle, EngineLoader, EngineOutput, EnginePool, PoolStats, RecognitionEngine};
pub use output::{PdfTextLayerWriter, TextLayerWriter};
pub use render::{Bitmap, CompositeRasterizer, ImageRasterizer, PageRasterizer};

#[cfg(feature = "tesseract")]
pub use ocr::{TesseractEngine, TesseractLoader};

#[cfg(feature = "pdf")]
pub use pdf::PdfiumRasterizer;
