//! Plain-text output.

use crate::types::{PageResult, TextResult};

/// Placeholder replaced by the page number in page banners.
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Concatenate page texts in order, with a banner before every page after the first.
pub fn assemble_text(pages: &[PageResult], banner: &str) -> TextResult {
    let mut text = String::new();
    for (index, page) in pages.iter().enumerate() {
        if index > 0 {
            text.push_str("\n\n");
            text.push_str(&banner.replace(PAGE_PLACEHOLDER, &page.page_number.to_string()));
            text.push_str("\n\n");
        }
        text.push_str(page.text.trim_end());
    }
    TextResult { text }
}
