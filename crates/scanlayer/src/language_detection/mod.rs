//! Language detection for recognition runs.
//!
//! A guess is first derived from the file name. A bounded content sample is
//! consulted when the source is an image or the filename guess is not high
//! confidence, and the two guesses are reconciled by [`resolve`]. Detection
//! never fails: with nothing to go on it yields the default language.
//!
//! # Example
//!
//! ```rust
//! use scanlayer::core::config::ScanlayerConfig;
//! use scanlayer::language_detection::LanguageDetector;
//! use scanlayer::types::ConfidenceTier;
//!
//! let detector = LanguageDetector::new(&ScanlayerConfig::default());
//! let guess = detector.detect("contract_deu.pdf", None, false);
//! assert_eq!(guess.language, "deu");
//! assert_eq!(guess.tier, ConfidenceTier::High);
//! ```

mod content;
mod filename;

pub use content::{detect_from_content, engine_code};
pub use filename::detect_from_filename;

use crate::core::config::{LanguageDetectionConfig, ScanlayerConfig};
use crate::types::{ConfidenceTier, LanguageDetection};

/// Whether a content sample should be consulted after the filename guess.
pub fn needs_content_scan(is_image: bool, filename: &LanguageDetection) -> bool {
    is_image || filename.tier != ConfidenceTier::High
}

/// Reconcile filename and content guesses.
///
/// The content guess wins when the source is an image, when it is high
/// confidence, or when it is medium confidence against a low-confidence
/// filename guess. Every other combination keeps the filename guess.
pub fn resolve(filename: LanguageDetection, content: Option<LanguageDetection>, is_image: bool) -> LanguageDetection {
    match content {
        Some(content)
            if is_image
                || content.tier == ConfidenceTier::High
                || (content.tier == ConfidenceTier::Medium && filename.tier == ConfidenceTier::Low) =>
        {
            content
        }
        _ => filename,
    }
}

/// Filename and content language detection with a configured fallback.
#[derive(Debug, Clone)]
pub struct LanguageDetector {
    config: LanguageDetectionConfig,
    default_language: String,
}

impl LanguageDetector {
    pub fn new(config: &ScanlayerConfig) -> Self {
        Self {
            config: config.language_detection.clone(),
            default_language: config.default_language.clone(),
        }
    }

    pub fn config(&self) -> &LanguageDetectionConfig {
        &self.config
    }

    pub fn default_language(&self) -> &str {
        &self.default_language
    }

    pub fn from_filename(&self, filename: &str) -> LanguageDetection {
        detect_from_filename(filename, &self.default_language)
    }

    /// Whether the orchestrator should obtain a content sample for this source.
    pub fn wants_content(&self, is_image: bool, filename: &LanguageDetection) -> bool {
        self.config.enabled && needs_content_scan(is_image, filename)
    }

    pub fn from_content(&self, sample: &str) -> Option<LanguageDetection> {
        detect_from_content(sample, &self.config)
    }

    /// Detect the language of a source from its file name and an optional content sample.
    ///
    /// The sample is ignored when the filename guess is already high confidence
    /// (for non-image sources) or content detection is disabled.
    pub fn detect(&self, filename: &str, content_sample: Option<&str>, is_image: bool) -> LanguageDetection {
        let from_name = self.from_filename(filename);
        if !self.wants_content(is_image, &from_name) {
            return from_name;
        }

        let from_content = content_sample.and_then(|sample| self.from_content(sample));
        if from_content.is_none() {
            tracing::debug!("No usable content sample for '{}'; keeping filename guess", filename);
        }
        resolve(from_name, from_content, is_image)
    }
}
