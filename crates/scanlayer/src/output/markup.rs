//! Positional markup (hOCR) output.
//!
//! Page fragments from the engine are wrapped, in order, in one XHTML
//! document. Each fragment sits in a container tagged with its source page
//! number so selections such as `3-5` stay traceable.

use crate::types::{MarkupResult, PageResult};
use std::fmt::Write as _;

const OCR_CAPABILITIES: &str = "ocr_page ocr_carea ocr_par ocr_line ocrx_word";

/// Wrap every page's hOCR fragment in a single document.
pub fn assemble_markup(pages: &[PageResult], title: &str, language: &str) -> MarkupResult {
    let mut markup = String::new();
    markup.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    markup.push_str(
        "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.0 Transitional//EN\" \
         \"http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd\">\n",
    );
    let lang = html_escape::encode_double_quoted_attribute(language);
    let _ = writeln!(
        markup,
        "<html xmlns=\"http://www.w3.org/1999/xhtml\" xml:lang=\"{lang}\" lang=\"{lang}\">"
    );
    markup.push_str(" <head>\n");
    let _ = writeln!(markup, "  <title>{}</title>", html_escape::encode_text(title));
    markup.push_str("  <meta http-equiv=\"Content-Type\" content=\"text/html;charset=utf-8\"/>\n");
    let _ = writeln!(
        markup,
        "  <meta name=\"ocr-system\" content=\"scanlayer {}\"/>",
        env!("CARGO_PKG_VERSION")
    );
    let _ = writeln!(markup, "  <meta name=\"ocr-capabilities\" content=\"{}\"/>", OCR_CAPABILITIES);
    let _ = writeln!(markup, "  <meta name=\"ocr-langs\" content=\"{}\"/>", lang);
    let _ = writeln!(markup, "  <meta name=\"ocr-number-of-pages\" content=\"{}\"/>", pages.len());
    markup.push_str(" </head>\n <body>\n");

    for page in pages {
        let _ = writeln!(
            markup,
            "  <div class=\"ocr_page_container\" data-page=\"{}\">",
            page.page_number
        );
        for line in page.positional_markup.lines().filter(|line| !line.trim().is_empty()) {
            let _ = writeln!(markup, "  {}", line);
        }
        markup.push_str("  </div>\n");
    }

    markup.push_str(" </body>\n</html>\n");
    MarkupResult { markup }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page_number: u32) -> PageResult {
        PageResult {
            page_number,
            text: String::new(),
            confidence: 0.0,
            tokens: Vec::new(),
            positional_markup: format!("<div class='ocr_page' id='page_{0}'>p{0}</div>\n", page_number),
            tabular_rows: String::new(),
            scale: 1.0,
            raster_width: 10,
            raster_height: 10,
        }
    }

    #[test]
    fn test_pages_wrapped_in_order() {
        let markup = assemble_markup(&[page(3), page(4)], "OCR Output", "deu").markup;

        assert_eq!(markup.matches("<html").count(), 1);
        assert_eq!(markup.matches("class=\"ocr_page_container\"").count(), 2);
        let third = markup.find("data-page=\"3\"").unwrap();
        let fourth = markup.find("data-page=\"4\"").unwrap();
        assert!(third < fourth);
        assert!(markup.contains("p3</div>"));
        assert!(markup.contains("content=\"deu\""));
        assert!(markup.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_title_is_escaped() {
        let markup = assemble_markup(&[], "Scans <draft> & notes", "eng").markup;
        assert!(markup.contains("<title>Scans &lt;draft&gt; &amp; notes</title>"));
        assert!(markup.contains("ocr-number-of-pages\" content=\"0\""));
    }
}
