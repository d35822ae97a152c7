//! Content-derived language guesses using whatlang.

use crate::core::config::LanguageDetectionConfig;
use crate::types::{ConfidenceTier, DetectionSource, LanguageDetection};
use whatlang::{Lang, detect};

const HIGH_CONFIDENCE: f64 = 0.9;
const MEDIUM_CONFIDENCE: f64 = 0.5;

/// Guess the language of a text sample.
///
/// Returns `None` for empty samples and guesses below `min_confidence`.
/// Samples longer than `max_sample_chars` are truncated first.
pub fn detect_from_content(sample: &str, config: &LanguageDetectionConfig) -> Option<LanguageDetection> {
    let sample: String = sample.chars().take(config.max_sample_chars).collect();
    if sample.trim().is_empty() {
        return None;
    }

    let info = detect(&sample)?;
    let confidence = info.confidence();
    if confidence < config.min_confidence {
        tracing::debug!(
            "Content guess {:?} rejected (confidence {:.2} < {:.2})",
            info.lang(),
            confidence,
            config.min_confidence
        );
        return None;
    }

    let tier = if info.is_reliable() && confidence >= HIGH_CONFIDENCE {
        ConfidenceTier::High
    } else if confidence >= MEDIUM_CONFIDENCE {
        ConfidenceTier::Medium
    } else {
        ConfidenceTier::Low
    };

    Some(LanguageDetection {
        language: engine_code(info.lang()),
        tier,
        source: DetectionSource::Content,
    })
}

/// Map a whatlang language to its Tesseract traineddata name.
///
/// Mostly the ISO 639-3 code; Tesseract diverges for a few languages.
pub fn engine_code(lang: Lang) -> String {
    match lang {
        Lang::Cmn => "chi_sim",
        Lang::Pes => "fas",
        Lang::Nob => "nor",
        other => other.code(),
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(min_confidence: f64) -> LanguageDetectionConfig {
        LanguageDetectionConfig {
            min_confidence,
            ..LanguageDetectionConfig::default()
        }
    }

    #[test]
    fn test_detect_english() {
        let text = "The quick brown fox jumps over the lazy dog. This is definitely English text with clear patterns.";
        let detection = detect_from_content(text, &config(0.5)).unwrap();
        assert_eq!(detection.language, "eng");
        assert_eq!(detection.source, DetectionSource::Content);
        assert!(detection.tier >= ConfidenceTier::Medium);
    }

    #[test]
    fn test_detect_spanish() {
        let text = "Hola mundo! Esta es una prueba del sistema de detección de idiomas para documentos escaneados.";
        let detection = detect_from_content(text, &config(0.5)).unwrap();
        assert_eq!(detection.language, "spa");
    }

    #[test]
    fn test_empty_sample() {
        assert!(detect_from_content("   ", &config(0.0)).is_none());
    }

    #[test]
    fn test_threshold_filters_low_confidence() {
        assert!(detect_from_content("ok yes no", &config(0.99)).is_none());
    }

    #[test]
    fn test_engine_code_mapping() {
        assert_eq!(engine_code(Lang::Eng), "eng");
        assert_eq!(engine_code(Lang::Deu), "deu");
        assert_eq!(engine_code(Lang::Cmn), "chi_sim");
        assert_eq!(engine_code(Lang::Pes), "fas");
        assert_eq!(engine_code(Lang::Nob), "nor");
    }
}
