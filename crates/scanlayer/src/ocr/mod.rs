//! Recognition engines and the engine pool.
//!
//! - [`RecognitionEngine`] recognizes page bitmaps for one language
//! - [`EngineLoader`] creates engines; [`EnginePool`] caches them per language
//!   and de-duplicates concurrent loads
//! - `tsv` and `hocr` parse and synthesize Tesseract-style TSV and hOCR
//!
//! The native Tesseract engine is available with the `tesseract` feature:
//!
//! ```rust,no_run
//! # #[cfg(feature = "tesseract")]
//! # async fn example() -> scanlayer::Result<()> {
//! use scanlayer::core::config::TesseractConfig;
//! use scanlayer::ocr::{EnginePool, TesseractLoader};
//! use std::sync::Arc;
//!
//! let pool = EnginePool::new(Arc::new(TesseractLoader::new(TesseractConfig::default())), 2);
//! let engine = pool.acquire("eng").await?;
//! assert_eq!(engine.language(), "eng");
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod hocr;
pub mod pool;
#[cfg(feature = "tesseract")]
pub mod tesseract_backend;
pub mod tsv;

pub use engine::{EngineHandle, EngineLoader, EngineOutput, RecognitionEngine};
pub use pool::{EnginePool, PoolStats};
#[cfg(feature = "tesseract")]
pub use tesseract_backend::{TesseractEngine, TesseractLoader};
