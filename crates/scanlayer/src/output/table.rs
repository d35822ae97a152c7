//! Tabular (TSV) output.

use crate::ocr::tsv::{self, TSV_HEADER};
use crate::types::{PageResult, TableResult};

/// One header line followed by every page's data rows, in page order.
pub fn assemble_table(pages: &[PageResult]) -> TableResult {
    let mut table = String::from(TSV_HEADER);
    table.push('\n');
    for page in pages {
        for row in tsv::data_rows(&page.tabular_rows, page.page_number) {
            table.push_str(&row);
            table.push('\n');
        }
    }
    TableResult { table }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(page_number: u32, rows: &str) -> PageResult {
        PageResult {
            page_number,
            text: String::new(),
            confidence: 0.0,
            tokens: Vec::new(),
            positional_markup: String::new(),
            tabular_rows: rows.to_string(),
            scale: 1.0,
            raster_width: 100,
            raster_height: 100,
        }
    }

    #[test]
    fn test_single_header_and_all_rows() {
        let first = format!(
            "{}\n1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n5\t1\t1\t1\t1\t1\t10\t10\t30\t12\t95.5\tHello\n",
            TSV_HEADER
        );
        let second = format!(
            "{}\n1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n5\t1\t1\t1\t1\t1\t10\t10\t30\t12\t91\tWorld\n",
            TSV_HEADER
        );

        let table = assemble_table(&[page(1, &first), page(2, &second)]).table;
        let lines: Vec<&str> = table.lines().collect();

        assert_eq!(lines.iter().filter(|line| tsv::is_header(line)).count(), 1);
        assert_eq!(lines[0], TSV_HEADER);
        assert_eq!(lines.len(), 1 + 4);
        assert!(lines[4].starts_with("5\t2\t"));
        assert!(lines[4].ends_with("World"));
    }

    #[test]
    fn test_empty_run_is_header_only() {
        assert_eq!(assemble_table(&[]).table, format!("{}\n", TSV_HEADER));
    }
}
