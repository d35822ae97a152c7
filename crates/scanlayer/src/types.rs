//! Request, token and result types shared across the pipeline.

use crate::error::{Result, ScanlayerError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which pages of a document a run visits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PageSelection {
    #[default]
    All,
    FirstOnly,
    /// Inclusive, 1-indexed page range.
    Range { start: u32, end: u32 },
}

impl PageSelection {
    /// Resolve the selection into an ascending list of 1-indexed page numbers.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSelection` when a range starts at 0, ends before it starts,
    /// or runs past the last page, and when the document has no pages.
    pub fn resolve(&self, page_count: u32) -> Result<Vec<u32>> {
        if page_count == 0 {
            return Err(ScanlayerError::InvalidSelection(
                "document has no pages".to_string(),
            ));
        }

        match *self {
            PageSelection::All => Ok((1..=page_count).collect()),
            PageSelection::FirstOnly => Ok(vec![1]),
            PageSelection::Range { start, end } => {
                if start == 0 {
                    return Err(ScanlayerError::InvalidSelection(format!(
                        "range {}-{} must start at page 1 or later",
                        start, end
                    )));
                }
                if start > end {
                    return Err(ScanlayerError::InvalidSelection(format!(
                        "range {}-{} ends before it starts",
                        start, end
                    )));
                }
                if end > page_count {
                    return Err(ScanlayerError::InvalidSelection(format!(
                        "range {}-{} exceeds page count {}",
                        start, end, page_count
                    )));
                }
                Ok((start..=end).collect())
            }
        }
    }
}

impl FromStr for PageSelection {
    type Err = ScanlayerError;

    /// Parses `all`, `first`, a single page (`4`) or an inclusive range (`3-7`).
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "all" => return Ok(PageSelection::All),
            "first" => return Ok(PageSelection::FirstOnly),
            _ => {}
        }

        let parse_page = |value: &str| {
            value.trim().parse::<u32>().map_err(|_| {
                ScanlayerError::InvalidSelection(format!("'{}' is not a page number", value.trim()))
            })
        };

        match trimmed.split_once('-') {
            Some((start, end)) => Ok(PageSelection::Range {
                start: parse_page(start)?,
                end: parse_page(end)?,
            }),
            None => {
                let page = parse_page(trimmed)?;
                Ok(PageSelection::Range { start: page, end: page })
            }
        }
    }
}

/// Output encoding of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Plain text with page banners.
    #[default]
    Text,
    /// hOCR-style positional markup document.
    Hocr,
    /// Tab-separated token table.
    Tsv,
    /// The source document with an invisible, searchable text layer.
    SearchablePdf,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Hocr => "hocr",
            OutputFormat::Tsv => "tsv",
            OutputFormat::SearchablePdf => "pdf",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = ScanlayerError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "hocr" | "html" => Ok(OutputFormat::Hocr),
            "tsv" => Ok(OutputFormat::Tsv),
            "pdf" | "searchable_pdf" | "searchable-pdf" => Ok(OutputFormat::SearchablePdf),
            other => Err(ScanlayerError::validation(format!(
                "Invalid output format: '{}'. Must be one of: text, hocr, tsv, pdf",
                other
            ))),
        }
    }
}

/// Recognition language requested by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageChoice {
    /// Infer the language from the filename and, if needed, a content sample.
    #[default]
    Auto,
    /// Explicit engine language code (e.g. "eng", "deu", "chi_sim").
    Code(String),
}

impl FromStr for LanguageChoice {
    type Err = ScanlayerError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ScanlayerError::validation("Language cannot be empty"));
        }
        if trimmed.eq_ignore_ascii_case("auto") {
            return Ok(LanguageChoice::Auto);
        }
        if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ScanlayerError::validation(format!(
                "Invalid language code: '{}'",
                trimmed
            )));
        }
        Ok(LanguageChoice::Code(trimmed.to_string()))
    }
}

/// A single recognition run request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecognitionRequest {
    #[serde(default)]
    pub selection: PageSelection,
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default)]
    pub language: LanguageChoice,
}

/// Hierarchy level of a recognized token.
///
/// Numeric values match the `level` column of Tesseract TSV output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLevel {
    Page = 1,
    Block = 2,
    Paragraph = 3,
    Line = 4,
    Word = 5,
}

impl TokenLevel {
    pub fn from_tsv_level(level: u32) -> Option<Self> {
        match level {
            1 => Some(TokenLevel::Page),
            2 => Some(TokenLevel::Block),
            3 => Some(TokenLevel::Paragraph),
            4 => Some(TokenLevel::Line),
            5 => Some(TokenLevel::Word),
            _ => None,
        }
    }

    pub fn as_tsv_level(&self) -> u32 {
        *self as u32
    }
}

/// Axis-aligned box in rasterization pixels, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn right(&self) -> u32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.height
    }
}

/// A recognized text unit.
///
/// The bounding box is always expressed in the pixel space of the bitmap the
/// token was recognized from; see [`PageResult::scale`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognitionToken {
    pub text: String,
    /// 0-100
    pub confidence: f64,
    pub bbox: BoundingBox,
    pub level: TokenLevel,
}

/// Outcome of recognizing a single page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// 1-indexed page number in the source document.
    pub page_number: u32,
    pub text: String,
    /// 0-100
    pub confidence: f64,
    pub tokens: Vec<RecognitionToken>,
    /// hOCR fragment (`ocr_page` div) for this page.
    pub positional_markup: String,
    /// TSV rows for this page, header line first.
    pub tabular_rows: String,
    /// Pixels per page unit the bitmap was rendered at.
    pub scale: f64,
    pub raster_width: u32,
    pub raster_height: u32,
}

impl PageResult {
    /// Tokens to place in a text layer: words, or lines when no words were reported.
    pub fn layer_tokens(&self) -> Vec<&RecognitionToken> {
        let words: Vec<&RecognitionToken> = self
            .tokens
            .iter()
            .filter(|token| token.level == TokenLevel::Word && !token.text.trim().is_empty())
            .collect();
        if !words.is_empty() {
            return words;
        }
        self.tokens
            .iter()
            .filter(|token| token.level == TokenLevel::Line && !token.text.trim().is_empty())
            .collect()
    }
}

/// Confidence tier of a language guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

/// Where a language guess came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionSource {
    Filename,
    Content,
}

/// Result of language detection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageDetection {
    /// Engine language code (Tesseract traineddata name).
    pub language: String,
    pub tier: ConfidenceTier,
    pub source: DetectionSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextResult {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkupResult {
    pub markup: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableResult {
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchableDocumentResult {
    /// PDF bytes.
    pub document: Vec<u8>,
}

/// Assembled output, one variant per [`OutputFormat`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum RunOutput {
    Text(TextResult),
    Markup(MarkupResult),
    Table(TableResult),
    SearchableDocument(SearchableDocumentResult),
}

impl RunOutput {
    pub fn format(&self) -> OutputFormat {
        match self {
            RunOutput::Text(_) => OutputFormat::Text,
            RunOutput::Markup(_) => OutputFormat::Hocr,
            RunOutput::Table(_) => OutputFormat::Tsv,
            RunOutput::SearchableDocument(_) => OutputFormat::SearchablePdf,
        }
    }

    /// Output as bytes ready to be written to a file.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            RunOutput::Text(result) => result.text.into_bytes(),
            RunOutput::Markup(result) => result.markup.into_bytes(),
            RunOutput::Table(result) => result.table.into_bytes(),
            RunOutput::SearchableDocument(result) => result.document,
        }
    }
}

/// Aggregate result of a completed run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    pub output: RunOutput,
    /// Arithmetic mean of per-page confidences, 0-100.
    pub confidence: f64,
    pub pages_processed: usize,
    /// Language the engine ran with.
    pub language: String,
    /// Present when the language was chosen automatically.
    pub detection: Option<LanguageDetection>,
}

impl RunResult {
    pub fn format(&self) -> OutputFormat {
        self.output.format()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_all_pages() {
        assert_eq!(PageSelection::All.resolve(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_resolve_first_only() {
        assert_eq!(PageSelection::FirstOnly.resolve(5).unwrap(), vec![1]);
    }

    #[test]
    fn test_resolve_range_counts_pages() {
        for page_count in 1..=6u32 {
            for start in 1..=page_count {
                for end in start..=page_count {
                    let pages = PageSelection::Range { start, end }.resolve(page_count).unwrap();
                    assert_eq!(pages.len() as u32, end - start + 1);
                    assert!(pages.windows(2).all(|w| w[0] < w[1]));
                    assert_eq!(pages.first(), Some(&start));
                    assert_eq!(pages.last(), Some(&end));
                }
            }
        }
    }

    #[test]
    fn test_resolve_reversed_range_rejected() {
        let err = PageSelection::Range { start: 5, end: 2 }.resolve(10).unwrap_err();
        assert!(matches!(err, ScanlayerError::InvalidSelection(_)));
    }

    #[test]
    fn test_resolve_range_out_of_bounds() {
        assert!(PageSelection::Range { start: 0, end: 2 }.resolve(3).is_err());
        assert!(PageSelection::Range { start: 2, end: 4 }.resolve(3).is_err());
    }

    #[test]
    fn test_resolve_empty_document() {
        assert!(PageSelection::All.resolve(0).is_err());
    }

    #[test]
    fn test_parse_page_selection() {
        assert_eq!("all".parse::<PageSelection>().unwrap(), PageSelection::All);
        assert_eq!("First".parse::<PageSelection>().unwrap(), PageSelection::FirstOnly);
        assert_eq!(
            "3-7".parse::<PageSelection>().unwrap(),
            PageSelection::Range { start: 3, end: 7 }
        );
        assert_eq!(
            " 4 ".parse::<PageSelection>().unwrap(),
            PageSelection::Range { start: 4, end: 4 }
        );
        assert!("a-b".parse::<PageSelection>().is_err());
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!("hocr".parse::<OutputFormat>().unwrap(), OutputFormat::Hocr);
        assert_eq!("PDF".parse::<OutputFormat>().unwrap(), OutputFormat::SearchablePdf);
        let err = "docx".parse::<OutputFormat>().unwrap_err();
        assert!(err.to_string().contains("Invalid output format"));
    }

    #[test]
    fn test_parse_language_choice() {
        assert_eq!("auto".parse::<LanguageChoice>().unwrap(), LanguageChoice::Auto);
        assert_eq!(
            "chi_sim".parse::<LanguageChoice>().unwrap(),
            LanguageChoice::Code("chi_sim".to_string())
        );
        assert!("eng;rm".parse::<LanguageChoice>().is_err());
        assert!("".parse::<LanguageChoice>().is_err());
    }

    #[test]
    fn test_token_level_tsv_mapping() {
        assert_eq!(TokenLevel::from_tsv_level(5), Some(TokenLevel::Word));
        assert_eq!(TokenLevel::from_tsv_level(4), Some(TokenLevel::Line));
        assert_eq!(TokenLevel::from_tsv_level(9), None);
        assert_eq!(TokenLevel::Block.as_tsv_level(), 2);
    }

    #[test]
    fn test_layer_tokens_fall_back_to_lines() {
        let line = RecognitionToken {
            text: "HELLO WORLD".to_string(),
            confidence: 90.0,
            bbox: BoundingBox::new(0, 0, 100, 20),
            level: TokenLevel::Line,
        };
        let mut page = PageResult {
            page_number: 1,
            text: "HELLO WORLD".to_string(),
            confidence: 90.0,
            tokens: vec![line.clone()],
            positional_markup: String::new(),
            tabular_rows: String::new(),
            scale: 1.0,
            raster_width: 100,
            raster_height: 20,
        };
        assert_eq!(page.layer_tokens(), vec![&line]);

        let word = RecognitionToken {
            text: "HELLO".to_string(),
            level: TokenLevel::Word,
            ..line.clone()
        };
        page.tokens.push(word.clone());
        assert_eq!(page.layer_tokens(), vec![&word]);
    }

    #[test]
    fn test_run_output_format_tag() {
        let output = RunOutput::Table(TableResult {
            table: "level\ttext\n".to_string(),
        });
        assert_eq!(output.format(), OutputFormat::Tsv);
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["format"], "table");
    }
}
