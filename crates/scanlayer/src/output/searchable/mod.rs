//! Searchable-document output: the source with an invisible text layer.

pub mod placement;
mod writer;

pub use placement::{PageGeometry, TextPlacement, place_page, place_token};
pub use writer::{PdfTextLayerWriter, TextLayerWriter, encode_win_ansi};

use crate::Result;
use crate::core::document::Document;
use crate::types::{PageResult, SearchableDocumentResult};

/// Build the searchable document for the recognized `pages` of `source`.
pub fn assemble_searchable(
    writer: &dyn TextLayerWriter,
    source: &Document,
    pages: &[PageResult],
) -> Result<SearchableDocumentResult> {
    Ok(SearchableDocumentResult {
        document: writer.write(source, pages)?,
    })
}
