//! Tesseract TSV parsing and synthesis.
//!
//! Columns: `level page_num block_num par_num line_num word_num left top width height conf text`.
//! Only word rows (level 5) carry text; the text of lines, paragraphs and
//! blocks is rebuilt from their words.

use crate::types::{BoundingBox, RecognitionToken, TokenLevel};
use std::fmt::Write as _;

pub const TSV_HEADER: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";
pub const TSV_MIN_FIELDS: usize = 12;

const PAGE_NUM_COLUMN: usize = 1;

#[derive(Debug, Clone)]
struct TsvRow {
    level: TokenLevel,
    block: u32,
    par: u32,
    line: u32,
    bbox: BoundingBox,
    conf: f64,
    text: String,
}

impl TsvRow {
    /// Whether `word` lies inside this row in the block/paragraph/line hierarchy.
    fn contains(&self, word: &TsvRow) -> bool {
        match self.level {
            TokenLevel::Page => true,
            TokenLevel::Block => word.block == self.block,
            TokenLevel::Paragraph => word.block == self.block && word.par == self.par,
            TokenLevel::Line => word.block == self.block && word.par == self.par && word.line == self.line,
            TokenLevel::Word => false,
        }
    }
}

fn parse_row(line: &str) -> Option<TsvRow> {
    let fields: Vec<&str> = line.split('\t').collect();
    // Empty word text leaves only 11 fields.
    if fields.len() < TSV_MIN_FIELDS - 1 {
        return None;
    }

    let number = |index: usize| fields[index].trim().parse::<u32>().ok();

    let level = TokenLevel::from_tsv_level(number(0)?)?;
    Some(TsvRow {
        level,
        block: number(2)?,
        par: number(3)?,
        line: number(4)?,
        bbox: BoundingBox::new(number(6)?, number(7)?, number(8)?, number(9)?),
        conf: fields[10].trim().parse::<f64>().unwrap_or(-1.0),
        text: fields.get(11).map(|t| t.trim().to_string()).unwrap_or_default(),
    })
}

/// Whether a line is the TSV header row.
pub fn is_header(line: &str) -> bool {
    line.starts_with("level\t")
}

/// Parse TSV output into tokens, in document order.
///
/// Malformed rows are skipped. Word rows without text are dropped; structural
/// rows get the space-joined text of their words and the mean word confidence,
/// and are dropped when they contain no words.
pub fn parse_tokens(tsv: &str) -> Vec<RecognitionToken> {
    let rows: Vec<TsvRow> = tsv
        .lines()
        .filter(|line| !line.trim().is_empty() && !is_header(line))
        .filter_map(parse_row)
        .collect();

    let words: Vec<&TsvRow> = rows
        .iter()
        .filter(|row| row.level == TokenLevel::Word && !row.text.is_empty())
        .collect();

    rows.iter()
        .filter_map(|row| {
            if row.level == TokenLevel::Word {
                if row.text.is_empty() {
                    return None;
                }
                return Some(RecognitionToken {
                    text: row.text.clone(),
                    confidence: row.conf.clamp(0.0, 100.0),
                    bbox: row.bbox,
                    level: TokenLevel::Word,
                });
            }

            let children: Vec<&&TsvRow> = words.iter().filter(|word| row.contains(word)).collect();
            if children.is_empty() {
                return None;
            }
            let text = children.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
            let confidence = children.iter().map(|w| w.conf.clamp(0.0, 100.0)).sum::<f64>() / children.len() as f64;
            Some(RecognitionToken {
                text,
                confidence,
                bbox: row.bbox,
                level: row.level,
            })
        })
        .collect()
}

/// Build TSV rows (header first) for tokens that did not come with a table.
///
/// Hierarchy numbers are assigned from token order: each block, paragraph and
/// line token opens a new group for the tokens that follow it.
pub fn synthesize_rows(tokens: &[RecognitionToken], page_number: u32, width: u32, height: u32) -> String {
    let mut out = String::with_capacity(TSV_HEADER.len() + tokens.len() * 48);
    out.push_str(TSV_HEADER);
    out.push('\n');
    let _ = writeln!(
        out,
        "1\t{}\t0\t0\t0\t0\t0\t0\t{}\t{}\t-1\t",
        page_number, width, height
    );

    let (mut block, mut par, mut line, mut word) = (0u32, 0u32, 0u32, 0u32);
    for token in tokens {
        match token.level {
            TokenLevel::Page => continue,
            TokenLevel::Block => {
                block += 1;
                (par, line, word) = (0, 0, 0);
            }
            TokenLevel::Paragraph => {
                par += 1;
                (line, word) = (0, 0);
            }
            TokenLevel::Line => {
                line += 1;
                word = 0;
            }
            TokenLevel::Word => word += 1,
        }

        let (conf, text) = if token.level == TokenLevel::Word {
            (format!("{:.6}", token.confidence), sanitize(&token.text))
        } else {
            ("-1".to_string(), String::new())
        };
        let b = token.bbox;
        let _ = writeln!(
            out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            token.level.as_tsv_level(),
            page_number,
            block,
            par,
            line,
            word,
            b.left,
            b.top,
            b.width,
            b.height,
            conf,
            text
        );
    }

    out
}

/// Data rows of a page's TSV with the header removed and `page_num` set to `page_number`.
pub fn data_rows(tsv: &str, page_number: u32) -> Vec<String> {
    tsv.lines()
        .filter(|line| !line.trim().is_empty() && !is_header(line))
        .map(|line| {
            let mut fields: Vec<&str> = line.split('\t').collect();
            let page = page_number.to_string();
            if fields.len() > PAGE_NUM_COLUMN {
                fields[PAGE_NUM_COLUMN] = &page;
                fields.join("\t")
            } else {
                line.to_string()
            }
        })
        .collect()
}

fn sanitize(text: &str) -> String {
    text.chars().map(|c| if c == '\t' || c == '\n' || c == '\r' { ' ' } else { c }).collect()
}
