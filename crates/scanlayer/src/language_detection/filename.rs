//! Filename-derived language guesses.
//!
//! The file stem is split into lowercase tokens. A full language name anywhere
//! (`invoice-german.pdf`, `rechnung_deutsch.png`) or a three-letter code as the
//! last token (`scan_deu.tiff`) gives a high-confidence guess. A three-letter
//! code elsewhere, a trailing code that is also a common filename word
//! (`report_fin.pdf`), or a two-letter code as the last token (`report.de.pdf`)
//! gives a medium one. Anything else is low confidence and resolves to the default
//! language.

use super::content::engine_code;
use crate::types::{ConfidenceTier, DetectionSource, LanguageDetection};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use whatlang::Lang;

static TOKEN_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").expect("Token separator regex pattern is valid and should compile"));

/// Tesseract codes whatlang does not use, and the two-part Chinese codes.
const EXTRA_ENGINE_CODES: &[&str] = &["fas", "nor", "chi_sim", "chi_tra"];

/// Language codes that double as words or abbreviations in file names.
const AMBIGUOUS_CODES: &[&str] = &[
    "aka", "ben", "cat", "dan", "est", "fin", "ind", "lat", "mal", "mar", "pan", "sin", "tam", "tel",
];

/// ISO 639-1 codes commonly used as filename suffixes.
const TWO_LETTER_CODES: &[(&str, &str)] = &[
    ("en", "eng"),
    ("de", "deu"),
    ("fr", "fra"),
    ("es", "spa"),
    ("it", "ita"),
    ("pt", "por"),
    ("nl", "nld"),
    ("ru", "rus"),
    ("pl", "pol"),
    ("cs", "ces"),
    ("sv", "swe"),
    ("da", "dan"),
    ("fi", "fin"),
    ("no", "nor"),
    ("tr", "tur"),
    ("el", "ell"),
    ("hu", "hun"),
    ("ro", "ron"),
    ("uk", "ukr"),
    ("ar", "ara"),
    ("he", "heb"),
    ("hi", "hin"),
    ("ja", "jpn"),
    ("ko", "kor"),
    ("zh", "chi_sim"),
    ("vi", "vie"),
    ("th", "tha"),
    ("id", "ind"),
];

fn tokens(filename: &str) -> Vec<String> {
    let stem = Path::new(filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let raw: Vec<&str> = TOKEN_SEPARATOR.split(&stem).filter(|t| !t.is_empty()).collect();

    // Re-join `chi_sim` / `chi_tra`, which the separator splits apart.
    let mut joined = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] == "chi" && matches!(raw.get(i + 1), Some(&"sim") | Some(&"tra")) {
            joined.push(format!("chi_{}", raw[i + 1]));
            i += 2;
        } else {
            joined.push(raw[i].to_string());
            i += 1;
        }
    }
    joined
}

fn language_for_name(token: &str) -> Option<String> {
    Lang::all()
        .iter()
        .find(|lang| lang.eng_name().eq_ignore_ascii_case(token) || lang.name().to_lowercase() == token)
        .map(|lang| engine_code(*lang))
}

fn language_for_code(token: &str) -> Option<String> {
    if EXTRA_ENGINE_CODES.contains(&token) {
        return Some(token.to_string());
    }
    if token.len() == 3 {
        return Lang::from_code(token).map(engine_code);
    }
    None
}

fn language_for_short_code(token: &str) -> Option<String> {
    TWO_LETTER_CODES
        .iter()
        .find(|(short, _)| *short == token)
        .map(|(_, code)| (*code).to_string())
}

/// Guess a language from a file name. Never fails; no match yields a low-tier
/// guess of `default_language`.
pub fn detect_from_filename(filename: &str, default_language: &str) -> LanguageDetection {
    let tokens = tokens(filename);
    let mut best: Option<(ConfidenceTier, String)> = None;

    for (index, token) in tokens.iter().enumerate() {
        let is_last = index + 1 == tokens.len();
        let candidate = if let Some(code) = language_for_name(token) {
            Some((ConfidenceTier::High, code))
        } else if let Some(code) = language_for_code(token) {
            let tier = if is_last && !AMBIGUOUS_CODES.contains(&token.as_str()) {
                ConfidenceTier::High
            } else {
                ConfidenceTier::Medium
            };
            Some((tier, code))
        } else if is_last && tokens.len() > 1 {
            language_for_short_code(token).map(|code| (ConfidenceTier::Medium, code))
        } else {
            None
        };

        if let Some((tier, code)) = candidate
            && best.as_ref().is_none_or(|(best_tier, _)| tier > *best_tier)
        {
            best = Some((tier, code));
        }
    }

    match best {
        Some((tier, language)) => LanguageDetection {
            language,
            tier,
            source: DetectionSource::Filename,
        },
        None => LanguageDetection {
            language: default_language.to_string(),
            tier: ConfidenceTier::Low,
            source: DetectionSource::Filename,
        },
    }
}
