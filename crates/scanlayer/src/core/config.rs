//! Configuration loading and management.
//!
//! [`ScanlayerConfig`] can be loaded from TOML, YAML or JSON files, discovered
//! by walking up from the working directory, or built programmatically.

use crate::{Result, ScanlayerError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the file [`ScanlayerConfig::discover`] looks for.
pub const CONFIG_FILE_NAME: &str = "scanlayer.toml";

/// Main configuration.
///
/// # Example
///
/// ```rust
/// use scanlayer::core::config::ScanlayerConfig;
///
/// let config = ScanlayerConfig::default();
/// assert_eq!(config.default_language, "eng");
/// assert_eq!(config.pool.capacity, 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanlayerConfig {
    /// Language used when detection finds nothing, and for content scans.
    #[serde(default = "default_eng")]
    pub default_language: String,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub language_detection: LanguageDetectionConfig,

    #[serde(default)]
    pub output: OutputConfig,

    #[serde(default)]
    pub tesseract: TesseractConfig,
}

/// Rasterization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Target resolution for paged documents; scale is `dpi / 72`.
    #[serde(default = "default_target_dpi")]
    pub target_dpi: u32,

    #[serde(default = "default_min_dpi")]
    pub min_dpi: u32,

    #[serde(default = "default_max_dpi")]
    pub max_dpi: u32,

    /// Longest allowed bitmap edge; DPI is lowered to stay under it.
    #[serde(default = "default_max_dimension")]
    pub max_image_dimension: u32,

    /// Scale applied to single-image sources.
    #[serde(default = "default_image_scale")]
    pub image_scale: f64,
}

/// Recognition-engine pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of loaded engines kept (LRU).
    #[serde(default = "default_pool_capacity")]
    pub capacity: usize,
}

/// Language detection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageDetectionConfig {
    /// When disabled, `Auto` resolves straight to the filename guess.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Upper bound on the content sample handed to the detector.
    #[serde(default = "default_sample_chars")]
    pub max_sample_chars: usize,

    /// Scale used when a page has to be recognized to obtain a sample.
    #[serde(default = "default_scan_scale")]
    pub scan_scale: f64,

    /// Minimum whatlang confidence (0.0-1.0) for a content guess to count at all.
    #[serde(default = "default_confidence")]
    pub min_confidence: f64,
}

/// Output assembly settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Banner inserted before every page after the first; `{page}` is replaced.
    #[serde(default = "default_page_banner")]
    pub page_banner: String,

    #[serde(default = "default_markup_title")]
    pub markup_title: String,
}

/// Tesseract engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TesseractConfig {
    /// Directory holding `*.traineddata`; falls back to `TESSDATA_PREFIX` and system paths.
    #[serde(default)]
    pub tessdata_path: Option<PathBuf>,

    /// Page segmentation mode.
    #[serde(default = "default_psm")]
    pub psm: u8,
}

fn default_true() -> bool {
    true
}
fn default_eng() -> String {
    "eng".to_string()
}
fn default_target_dpi() -> u32 {
    300
}
fn default_min_dpi() -> u32 {
    72
}
fn default_max_dpi() -> u32 {
    600
}
fn default_max_dimension() -> u32 {
    65536
}
fn default_image_scale() -> f64 {
    1.0
}
fn default_pool_capacity() -> usize {
    2
}
fn default_sample_chars() -> usize {
    2000
}
fn default_scan_scale() -> f64 {
    0.5
}
fn default_confidence() -> f64 {
    0.5
}
fn default_page_banner() -> String {
    "--- Page {page} ---".to_string()
}
fn default_markup_title() -> String {
    "OCR Output".to_string()
}
fn default_psm() -> u8 {
    3
}

impl Default for ScanlayerConfig {
    fn default() -> Self {
        Self {
            default_language: default_eng(),
            render: RenderConfig::default(),
            pool: PoolConfig::default(),
            language_detection: LanguageDetectionConfig::default(),
            output: OutputConfig::default(),
            tesseract: TesseractConfig::default(),
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            target_dpi: default_target_dpi(),
            min_dpi: default_min_dpi(),
            max_dpi: default_max_dpi(),
            max_image_dimension: default_max_dimension(),
            image_scale: default_image_scale(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_pool_capacity(),
        }
    }
}

impl Default for LanguageDetectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_sample_chars: default_sample_chars(),
            scan_scale: default_scan_scale(),
            min_confidence: default_confidence(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            page_banner: default_page_banner(),
            markup_title: default_markup_title(),
        }
    }
}

impl Default for TesseractConfig {
    fn default() -> Self {
        Self {
            tessdata_path: None,
            psm: default_psm(),
        }
    }
}

impl RenderConfig {
    /// Rasterization scale for paged documents at the target DPI.
    pub fn document_scale(&self) -> f64 {
        f64::from(self.target_dpi.max(self.min_dpi).min(self.max_dpi)) / 72.0
    }
}

impl ScanlayerConfig {
    /// Check cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns `ScanlayerError::Validation` describing the first offending field.
    pub fn validate(&self) -> Result<()> {
        if self.default_language.trim().is_empty() {
            return Err(ScanlayerError::validation("default_language cannot be empty"));
        }
        if self.pool.capacity == 0 {
            return Err(ScanlayerError::validation("pool.capacity must be at least 1"));
        }
        if self.render.min_dpi == 0 || self.render.min_dpi > self.render.max_dpi {
            return Err(ScanlayerError::validation(format!(
                "render.min_dpi ({}) must be positive and not exceed render.max_dpi ({})",
                self.render.min_dpi, self.render.max_dpi
            )));
        }
        if !(self.render.image_scale.is_finite() && self.render.image_scale > 0.0) {
            return Err(ScanlayerError::validation(format!(
                "render.image_scale must be positive, got {}",
                self.render.image_scale
            )));
        }
        if self.render.max_image_dimension == 0 {
            return Err(ScanlayerError::validation("render.max_image_dimension must be positive"));
        }
        let detection = &self.language_detection;
        if !(detection.scan_scale.is_finite() && detection.scan_scale > 0.0) {
            return Err(ScanlayerError::validation(format!(
                "language_detection.scan_scale must be positive, got {}",
                detection.scan_scale
            )));
        }
        if !(0.0..=1.0).contains(&detection.min_confidence) {
            return Err(ScanlayerError::validation(format!(
                "language_detection.min_confidence must be within 0.0-1.0, got {}",
                detection.min_confidence
            )));
        }
        if !self.output.page_banner.contains("{page}") {
            return Err(ScanlayerError::validation(
                "output.page_banner must contain the {page} placeholder",
            ));
        }
        Ok(())
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns `ScanlayerError::Validation` if the file cannot be read or is invalid TOML.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ScanlayerError::validation(format!("Invalid TOML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_yaml_ng::from_str(&content)
            .map_err(|e| ScanlayerError::validation(format!("Invalid YAML in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| ScanlayerError::validation(format!("Invalid JSON in {}: {}", path.as_ref().display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file, picking the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|ext| ext.to_str()).map(str::to_ascii_lowercase) {
            Some(ext) if ext == "yaml" || ext == "yml" => Self::from_yaml_file(path),
            Some(ext) if ext == "json" => Self::from_json_file(path),
            Some(ext) if ext == "toml" => Self::from_toml_file(path),
            _ => Err(ScanlayerError::validation(format!(
                "Unsupported config file extension: {}",
                path.display()
            ))),
        }
    }

    /// Discover `scanlayer.toml` in the current directory or any parent.
    ///
    /// # Returns
    ///
    /// - `Some(config)` if found
    /// - `None` if no config file found
    pub fn discover() -> Result<Option<Self>> {
        let mut current = std::env::current_dir().map_err(ScanlayerError::Io)?;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.exists() {
                tracing::debug!("Using configuration from {}", candidate.display());
                return Ok(Some(Self::from_toml_file(candidate)?));
            }

            if let Some(parent) = current.parent() {
                current = parent.to_path_buf();
            } else {
                break;
            }
        }

        Ok(None)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| ScanlayerError::validation(format!("Failed to read config file {}: {}", path.display(), e)))
}
