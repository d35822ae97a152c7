//! Core run orchestration.
//!
//! - **Configuration** ([`config`]): loading, discovery and validation
//! - **Documents** ([`document`]): PDF and single-image sources
//! - **Progress** ([`progress`]): run phases, progress sinks and cancellation
//! - **Pipeline** ([`pipeline`]): the [`Recognizer`] that drives a run from
//!   language selection to the assembled output
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "tesseract")]
//! # async fn example() -> scanlayer::Result<()> {
//! use scanlayer::core::{Document, NoProgress, Recognizer, ScanlayerConfig};
//! use scanlayer::types::{OutputFormat, PageSelection, RecognitionRequest};
//!
//! let recognizer = Recognizer::with_defaults(ScanlayerConfig::default())?;
//! let document = Document::open("invoice-german.pdf")?;
//! let request = RecognitionRequest {
//!     selection: PageSelection::Range { start: 1, end: 2 },
//!     format: OutputFormat::Tsv,
//!     ..Default::default()
//! };
//! let result = recognizer.run_recognition(&document, &request, &NoProgress, None).await?;
//! assert_eq!(result.pages_processed, 2);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod document;
pub mod pipeline;
pub mod progress;

pub use config::{
    LanguageDetectionConfig, OutputConfig, PoolConfig, RenderConfig, ScanlayerConfig, TesseractConfig,
};
pub use document::{Document, SourceKind};
pub use pipeline::Recognizer;
pub use progress::{CancellationToken, NoProgress, ProgressEvent, ProgressSink, RunPhase, TracingProgress};
