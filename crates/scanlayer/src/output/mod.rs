//! Output assemblers.
//!
//! Each assembler consumes the run's [`PageResult`]s in ascending page order
//! and produces one [`RunOutput`] variant. Only the searchable document
//! assembler can fail; the string formats are infallible.

pub mod markup;
pub mod searchable;
pub mod table;
pub mod text;

pub use markup::assemble_markup;
pub use searchable::{PdfTextLayerWriter, TextLayerWriter, assemble_searchable};
pub use table::assemble_table;
pub use text::assemble_text;

use crate::Result;
use crate::core::config::OutputConfig;
use crate::core::document::Document;
use crate::types::{OutputFormat, PageResult, RunOutput};

/// Build the output selected by `format`.
///
/// # Errors
///
/// `AssemblyFailure` when the searchable document cannot be written.
pub fn assemble(
    format: OutputFormat,
    pages: &[PageResult],
    language: &str,
    config: &OutputConfig,
    source: &Document,
    writer: &dyn TextLayerWriter,
) -> Result<RunOutput> {
    let output = match format {
        OutputFormat::Text => RunOutput::Text(assemble_text(pages, &config.page_banner)),
        OutputFormat::Hocr => RunOutput::Markup(assemble_markup(pages, &config.markup_title, language)),
        OutputFormat::Tsv => RunOutput::Table(assemble_table(pages)),
        OutputFormat::SearchablePdf => RunOutput::SearchableDocument(assemble_searchable(writer, source, pages)?),
    };
    Ok(output)
}
