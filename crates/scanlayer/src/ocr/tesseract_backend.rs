//! Native Tesseract engine.
//!
//! [`TesseractLoader`] initializes one `TesseractAPI` per language for the
//! engine pool; [`TesseractEngine`] runs recognition on page bitmaps in a
//! blocking task and returns text, hOCR, TSV and tokens parsed from the TSV.

use super::engine::{EngineHandle, EngineLoader, EngineOutput, RecognitionEngine};
use super::tsv;
use crate::core::config::TesseractConfig;
use crate::render::Bitmap;
use crate::{Result, ScanlayerError};
use async_trait::async_trait;
use kreuzberg_tesseract::{TessPageSegMode, TesseractAPI};
use parking_lot::Mutex;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FALLBACK_TESSDATA_PATHS: &[&str] = &[
    "/opt/homebrew/share/tessdata",
    "/opt/homebrew/opt/tesseract/share/tessdata",
    "/usr/local/opt/tesseract/share/tessdata",
    "/usr/share/tesseract-ocr/5/tessdata",
    "/usr/share/tesseract-ocr/4/tessdata",
    "/usr/share/tessdata",
    "/usr/local/share/tessdata",
    r#"C:\Program Files\Tesseract-OCR\tessdata"#,
    r#"C:\ProgramData\Tesseract-OCR\tessdata"#,
];

/// Resolve the tessdata directory: explicit path, then `TESSDATA_PREFIX`, then well-known locations.
pub fn resolve_tessdata_path(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    if let Some(prefix) = env::var_os("TESSDATA_PREFIX") {
        return Some(PathBuf::from(prefix));
    }
    FALLBACK_TESSDATA_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.exists())
}

/// Removes control characters Tesseract occasionally emits, keeping newlines and tabs.
fn strip_control_characters(text: &str) -> String {
    text.chars()
        .filter(|c| !matches!(c, '\u{0000}'..='\u{001F}' | '\u{007F}') || matches!(c, '\n' | '\r' | '\t'))
        .collect()
}

/// Loads Tesseract engines for the pool.
#[derive(Debug, Clone, Default)]
pub struct TesseractLoader {
    config: TesseractConfig,
}

impl TesseractLoader {
    pub fn new(config: TesseractConfig) -> Self {
        Self { config }
    }

    fn load_blocking(config: &TesseractConfig, language: &str) -> Result<TesseractAPI> {
        // Tesseract can crash instead of erroring on empty or missing languages.
        if language.trim().is_empty() {
            return Err(ScanlayerError::model_load(language, "language cannot be empty"));
        }

        let tessdata = resolve_tessdata_path(config.tessdata_path.as_deref()).unwrap_or_default();
        if !tessdata.as_os_str().is_empty() {
            for lang in language.split('+').map(str::trim).filter(|l| !l.is_empty()) {
                let traineddata = tessdata.join(format!("{}.traineddata", lang));
                if !traineddata.exists() {
                    return Err(ScanlayerError::model_load(
                        language,
                        format!("traineddata file does not exist: {}", traineddata.display()),
                    ));
                }
            }
        }

        let tessdata_str = tessdata.to_string_lossy();
        let api = TesseractAPI::new();
        api.init(tessdata_str.as_ref(), language).map_err(|e| {
            ScanlayerError::model_load(
                language,
                format!("initialization with datapath '{}' failed: {}", tessdata_str, e),
            )
        })?;

        api.set_page_seg_mode(TessPageSegMode::from_int(i32::from(config.psm)))
            .map_err(|e| ScanlayerError::model_load(language, format!("failed to set PSM {}: {}", config.psm, e)))?;

        tracing::debug!(
            "Tesseract {} initialized for '{}' (tessdata '{}')",
            TesseractAPI::version(),
            language,
            tessdata_str
        );
        Ok(api)
    }
}

#[async_trait]
impl EngineLoader for TesseractLoader {
    async fn load(&self, language: &str) -> Result<EngineHandle> {
        let config = self.config.clone();
        let lang = language.to_string();
        let api = tokio::task::spawn_blocking(move || Self::load_blocking(&config, &lang))
            .await
            .map_err(|e| ScanlayerError::model_load(language, format!("loader task failed: {}", e)))??;

        Ok(Arc::new(TesseractEngine {
            api: Arc::new(Mutex::new(api)),
            language: language.to_string(),
        }))
    }
}

/// A Tesseract instance initialized for one language.
pub struct TesseractEngine {
    api: Arc<Mutex<TesseractAPI>>,
    language: String,
}

impl TesseractEngine {
    fn recognize_blocking(api: &TesseractAPI, bitmap: &Bitmap) -> Result<EngineOutput> {
        let page = bitmap.page;
        let (width, height) = (bitmap.width(), bitmap.height());
        let bytes_per_pixel = 3;
        let bytes_per_line = width * bytes_per_pixel;

        api.set_image(
            bitmap.image.as_raw(),
            width as i32,
            height as i32,
            bytes_per_pixel as i32,
            bytes_per_line as i32,
        )
        .map_err(|e| ScanlayerError::recognition(page, format!("failed to set image: {}", e)))?;

        api.recognize()
            .map_err(|e| ScanlayerError::recognition(page, format!("failed to recognize text: {}", e)))?;

        let text = api
            .get_utf8_text()
            .map_err(|e| ScanlayerError::recognition(page, format!("failed to extract text: {}", e)))?;
        let hocr = api
            .get_hocr_text(0)
            .map_err(|e| ScanlayerError::recognition(page, format!("failed to extract hOCR: {}", e)))?;
        let table = api
            .get_tsv_text(0)
            .map_err(|e| ScanlayerError::recognition(page, format!("failed to extract TSV: {}", e)))?;
        let confidence = api
            .mean_text_conf()
            .map_err(|e| ScanlayerError::recognition(page, format!("failed to read confidence: {}", e)))?;

        let tokens = tsv::parse_tokens(&table);
        let mut rows = String::with_capacity(table.len() + tsv::TSV_HEADER.len() + 1);
        if !table.lines().next().is_some_and(tsv::is_header) {
            rows.push_str(tsv::TSV_HEADER);
            rows.push('\n');
        }
        rows.push_str(&table);

        Ok(EngineOutput {
            text: strip_control_characters(text.trim_end()),
            confidence: f64::from(confidence),
            tokens,
            positional_markup: Some(hocr),
            tabular_rows: Some(rows),
        })
    }
}

#[async_trait]
impl RecognitionEngine for TesseractEngine {
    fn language(&self) -> &str {
        &self.language
    }

    async fn recognize(&self, bitmap: &Bitmap) -> Result<EngineOutput> {
        let api = Arc::clone(&self.api);
        let bitmap = bitmap.clone();
        let page = bitmap.page;
        tokio::task::spawn_blocking(move || {
            let api = api.lock();
            Self::recognize_blocking(&api, &bitmap)
        })
        .await
        .map_err(|e| ScanlayerError::recognition_with_source(page, "Tesseract task panicked", e))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_control_characters() {
        assert_eq!(strip_control_characters("Hello\x00World\x1F"), "HelloWorld");
        assert_eq!(strip_control_characters("Line 1\nLine 2\tTab"), "Line 1\nLine 2\tTab");
        assert_eq!(strip_control_characters("Test\x7FDelete"), "TestDelete");
    }

    #[test]
    fn test_resolve_prefers_configured_path() {
        let path = resolve_tessdata_path(Some(Path::new("/custom/tessdata")));
        assert_eq!(path, Some(PathBuf::from("/custom/tessdata")));
    }

    #[tokio::test]
    async fn test_missing_traineddata_is_model_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let loader = TesseractLoader::new(TesseractConfig {
            tessdata_path: Some(dir.path().to_path_buf()),
            ..TesseractConfig::default()
        });

        match loader.load("zzz").await {
            Err(ScanlayerError::ModelLoadFailure { language, message }) => {
                assert_eq!(language, "zzz");
                assert!(message.contains("zzz.traineddata"));
            }
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("load should fail without traineddata"),
        }
    }

    #[tokio::test]
    async fn test_empty_language_rejected() {
        let loader = TesseractLoader::default();
        assert!(loader.load("  ").await.is_err());
    }
}
