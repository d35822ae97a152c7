//! Error types for scanlayer.
//!
//! Every fallible operation in the crate returns [`ScanlayerError`]. The variants
//! follow the failure points of a recognition run:
//!
//! - `UnsupportedInput` - the source bytes are neither a readable PDF nor a decodable image
//! - `InvalidSelection` - a page selection that does not fit the document
//! - `ModelLoadFailure` - the recognition engine for a language could not be loaded
//! - `PageRenderFailure` - a page could not be rasterized
//! - `RecognitionFailure` - the engine failed on a page bitmap
//! - `AssemblyFailure` - the selected output could not be built (including text-layer injection)
//! - `Cancelled` - the caller cancelled the run between pages
//!
//! Runs fail fast: the first error aborts the run and no partial result is returned.
//! The only non-fatal failure is language detection, which falls back silently.
//!
//! **System errors MUST always bubble up unchanged:** `ScanlayerError::Io` wraps
//! `std::io::Error` and is never rewritten into another variant.
//!
//! # Example
//!
//! ```rust
//! use scanlayer::{ScanlayerError, Result};
//!
//! fn check_range(start: u32, end: u32) -> Result<()> {
//!     if start > end {
//!         return Err(ScanlayerError::InvalidSelection(format!(
//!             "range {}-{} ends before it starts",
//!             start, end
//!         )));
//!     }
//!     Ok(())
//! }
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using `ScanlayerError`.
pub type Result<T> = std::result::Result<T, ScanlayerError>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for all scanlayer operations.
#[derive(Debug, Error)]
pub enum ScanlayerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported input: {message}")]
    UnsupportedInput {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Invalid page selection: {0}")]
    InvalidSelection(String),

    #[error("Failed to load recognition model for '{language}': {message}")]
    ModelLoadFailure { language: String, message: String },

    #[error("Failed to render page {page}: {message}")]
    PageRenderFailure {
        page: u32,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Recognition failed on page {page}: {message}")]
    RecognitionFailure {
        page: u32,
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Assembly error: {message}")]
    AssemblyFailure {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Run cancelled before page {page}")]
    Cancelled { page: u32 },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    #[error("Serialization error: {message}")]
    Serialization {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },
}

/// Fieldless discriminant of [`ScanlayerError`].
///
/// Callers use it to pick a localized message without matching on payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Io,
    UnsupportedInput,
    InvalidSelection,
    ModelLoadFailure,
    PageRenderFailure,
    RecognitionFailure,
    AssemblyFailure,
    Cancelled,
    Validation,
    Serialization,
}

impl From<serde_json::Error> for ScanlayerError {
    fn from(err: serde_json::Error) -> Self {
        ScanlayerError::Serialization {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

macro_rules! error_constructor {
    ($name:ident, $variant:ident) => {
        pastey::paste! {
            #[doc = "Create a " $variant " error"]
            pub fn $name<S: Into<String>>(message: S) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: None,
                }
            }

            #[doc = "Create a " $variant " error with source"]
            pub fn [<$name _with_source>]<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
                message: S,
                source: E,
            ) -> Self {
                Self::$variant {
                    message: message.into(),
                    source: Some(Box::new(source)),
                }
            }
        }
    };
}

impl ScanlayerError {
    error_constructor!(unsupported_input, UnsupportedInput);
    error_constructor!(assembly, AssemblyFailure);
    error_constructor!(validation, Validation);
    error_constructor!(serialization, Serialization);

    pub fn model_load<L: Into<String>, S: Into<String>>(language: L, message: S) -> Self {
        Self::ModelLoadFailure {
            language: language.into(),
            message: message.into(),
        }
    }

    pub fn page_render<S: Into<String>>(page: u32, message: S) -> Self {
        Self::PageRenderFailure {
            page,
            message: message.into(),
            source: None,
        }
    }

    pub fn page_render_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        page: u32,
        message: S,
        source: E,
    ) -> Self {
        Self::PageRenderFailure {
            page,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn recognition<S: Into<String>>(page: u32, message: S) -> Self {
        Self::RecognitionFailure {
            page,
            message: message.into(),
            source: None,
        }
    }

    pub fn recognition_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        page: u32,
        message: S,
        source: E,
    ) -> Self {
        Self::RecognitionFailure {
            page,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Kind of this error, for callers that present their own messages.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::UnsupportedInput { .. } => ErrorKind::UnsupportedInput,
            Self::InvalidSelection(_) => ErrorKind::InvalidSelection,
            Self::ModelLoadFailure { .. } => ErrorKind::ModelLoadFailure,
            Self::PageRenderFailure { .. } => ErrorKind::PageRenderFailure,
            Self::RecognitionFailure { .. } => ErrorKind::RecognitionFailure,
            Self::AssemblyFailure { .. } => ErrorKind::AssemblyFailure,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Serialization { .. } => ErrorKind::Serialization,
        }
    }

    /// Page the error is attached to, if any.
    pub fn page(&self) -> Option<u32> {
        match self {
            Self::PageRenderFailure { page, .. } | Self::RecognitionFailure { page, .. } | Self::Cancelled { page } => {
                Some(*page)
            }
            _ => None,
        }
    }
}
