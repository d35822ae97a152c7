//! hOCR fragment synthesis for engines that only report tokens.

use crate::types::{RecognitionToken, TokenLevel};
use std::fmt::Write as _;

fn class_for(level: TokenLevel) -> (&'static str, &'static str, &'static str) {
    match level {
        TokenLevel::Page => ("div", "ocr_page", "page"),
        TokenLevel::Block => ("div", "ocr_carea", "block"),
        TokenLevel::Paragraph => ("p", "ocr_par", "par"),
        TokenLevel::Line => ("span", "ocr_line", "line"),
        TokenLevel::Word => ("span", "ocrx_word", "word"),
    }
}

/// Build an `ocr_page` fragment from a flat, document-ordered token list.
///
/// Block, paragraph and line tokens open elements that stay open until a token
/// of the same or a higher level arrives.
pub fn synthesize_page(tokens: &[RecognitionToken], page_number: u32, width: u32, height: u32) -> String {
    let page_index = page_number.saturating_sub(1);
    let mut out = String::new();
    let _ = writeln!(
        out,
        "  <div class='ocr_page' id='page_{page}' title='bbox 0 0 {width} {height}; ppageno {index}'>",
        page = page_number,
        width = width,
        height = height,
        index = page_index
    );

    let mut open: Vec<TokenLevel> = Vec::new();
    let mut counters = [0u32; 5];

    for token in tokens.iter().filter(|t| t.level != TokenLevel::Page) {
        while let Some(&top) = open.last()
            && top >= token.level
        {
            close(&mut out, top, open.len());
            open.pop();
        }

        let (tag, class, prefix) = class_for(token.level);
        let slot = token.level as usize - 1;
        counters[slot] += 1;
        let id = format!("{}_{}_{}", prefix, page_number, counters[slot]);
        let b = token.bbox;
        let indent = "  ".repeat(open.len() + 2);

        if token.level == TokenLevel::Word {
            let _ = writeln!(
                out,
                "{indent}<{tag} class='{class}' id='{id}' title='bbox {} {} {} {}; x_wconf {}'>{}</{tag}>",
                b.left,
                b.top,
                b.right(),
                b.bottom(),
                token.confidence.round() as i64,
                html_escape::encode_text(&token.text),
            );
        } else {
            let _ = writeln!(
                out,
                "{indent}<{tag} class='{class}' id='{id}' title='bbox {} {} {} {}'>",
                b.left,
                b.top,
                b.right(),
                b.bottom(),
            );
            open.push(token.level);
        }
    }

    while let Some(top) = open.pop() {
        close(&mut out, top, open.len() + 1);
    }

    out.push_str("  </div>\n");
    out
}

fn close(out: &mut String, level: TokenLevel, depth: usize) {
    let (tag, _, _) = class_for(level);
    let _ = writeln!(out, "{}</{}>", "  ".repeat(depth + 1), tag);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BoundingBox;

    fn token(text: &str, level: TokenLevel, left: u32) -> RecognitionToken {
        RecognitionToken {
            text: text.to_string(),
            confidence: 92.4,
            bbox: BoundingBox::new(left, 10, 30, 12),
            level,
        }
    }

    #[test]
    fn test_words_only() {
        let tokens = vec![token("Hello", TokenLevel::Word, 0), token("World", TokenLevel::Word, 40)];
        let html = synthesize_page(&tokens, 2, 200, 100);
        assert!(html.contains("id='page_2'"));
        assert!(html.contains("bbox 0 0 200 100; ppageno 1"));
        assert!(html.contains("title='bbox 0 10 30 22; x_wconf 92'>Hello</span>"));
        assert!(html.contains(">World</span>"));
        assert!(html.trim_end().ends_with("</div>"));
    }

    #[test]
    fn test_nesting_is_balanced() {
        let tokens = vec![
            token("", TokenLevel::Block, 0),
            token("", TokenLevel::Paragraph, 0),
            token("a b", TokenLevel::Line, 0),
            token("a", TokenLevel::Word, 0),
            token("b", TokenLevel::Word, 40),
            token("c", TokenLevel::Line, 0),
            token("c", TokenLevel::Word, 0),
            token("", TokenLevel::Block, 0),
            token("d", TokenLevel::Word, 0),
        ];
        let html = synthesize_page(&tokens, 1, 100, 100);

        assert_eq!(html.matches("<div").count(), html.matches("</div>").count());
        assert_eq!(html.matches("<p").count(), html.matches("</p>").count());
        assert_eq!(html.matches("<span").count(), html.matches("</span>").count());
        assert_eq!(html.matches("class='ocr_line'").count(), 2);
        assert_eq!(html.matches("class='ocr_carea'").count(), 2);
        assert!(html.contains("id='word_1_4'"));
    }

    #[test]
    fn test_text_is_escaped() {
        let tokens = vec![token("<a&b>", TokenLevel::Word, 0)];
        let html = synthesize_page(&tokens, 1, 10, 10);
        assert!(html.contains("&lt;a&amp;b&gt;"));
    }
}
