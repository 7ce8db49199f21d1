//! PDF extraction via `lopdf` (§4.1).

use std::path::Path;

use lopdf::Document;
use serde_json::json;

use super::{validate_file, ExtractedTable, ExtractionError, Extractor, RawExtraction};

const EXTENSIONS: &[&str] = &["pdf"];
const MIME_TYPES: &[&str] = &["application/pdf"];

/// Extracts per-page text from PDF documents.
///
/// `lopdf` exposes raw content streams rather than pdfplumber's layout
/// engine, so table detection here is heuristic: runs of lines whose
/// whitespace-separated token count agrees are treated as a table, with
/// the first such line as the header.
pub struct PdfExtractor {
    max_size_bytes: u64,
}

impl PdfExtractor {
    #[must_use]
    pub fn new(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    fn detect_table(lines: &[String], page: usize) -> Option<ExtractedTable> {
        let tokenized: Vec<Vec<&str>> = lines
            .iter()
            .map(|l| l.split_whitespace().collect())
            .collect();

        let mut best: Option<(usize, usize)> = None; // (start, len)
        let mut run_start = 0;
        let mut i = 1;
        while i <= tokenized.len() {
            let same_width = i < tokenized.len()
                && !tokenized[i].is_empty()
                && tokenized[i].len() == tokenized[run_start].len();
            if !same_width {
                let run_len = i - run_start;
                if run_len >= 3 && tokenized[run_start].len() >= 2 {
                    if best.is_none_or(|(_, len)| run_len > len) {
                        best = Some((run_start, run_len));
                    }
                }
                run_start = i;
            }
            i += 1;
        }

        let (start, len) = best?;
        let headers: Vec<String> = tokenized[start].iter().map(|s| (*s).to_string()).collect();
        let rows: Vec<Vec<String>> = tokenized[start + 1..start + len]
            .iter()
            .map(|row| row.iter().map(|s| (*s).to_string()).collect())
            .collect();

        Some(ExtractedTable {
            page,
            index: 0,
            headers,
            rows,
        })
    }

    /// `| `-joins a table's headers and rows for inlining back into
    /// `raw_text` (§4.1: tables are "included both as structured data and
    /// as `| `-joined rows inlined in `raw_text`").
    fn table_to_text(table: &ExtractedTable) -> String {
        let mut lines = Vec::with_capacity(table.rows.len() + 1);
        lines.push(table.headers.join(" | "));
        for row in &table.rows {
            lines.push(row.join(" | "));
        }
        lines.join("\n")
    }
}

impl Extractor for PdfExtractor {
    fn extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn mime_types(&self) -> &[&str] {
        MIME_TYPES
    }

    fn extract(&self, path: &Path) -> Result<RawExtraction, ExtractionError> {
        validate_file(path, self.max_size_bytes)?;

        let doc = Document::load(path)
            .map_err(|e| ExtractionError::Failed(format!("could not open PDF: {e}")))?;

        let pages = doc.get_pages();
        if pages.is_empty() {
            return Err(ExtractionError::Failed(
                "PDF has no extractable pages".to_string(),
            ));
        }

        let mut text_parts = Vec::with_capacity(pages.len());
        let mut tables = Vec::new();

        for (&page_num, _object_id) in &pages {
            let page_text = doc.extract_text(&[page_num]).unwrap_or_default();
            let page_num = page_num as usize;
            let lines: Vec<String> = page_text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(ToString::to_string)
                .collect();

            let mut page_text_parts = vec![format!("--- Page {page_num} ---\n{page_text}")];

            if let Some(mut table) = Self::detect_table(&lines, page_num) {
                table.index = tables.iter().filter(|t: &&ExtractedTable| t.page == page_num).count();
                let table_number = table.index + 1;
                page_text_parts.push(format!(
                    "\n[Table {table_number} on Page {page_num}]\n{}",
                    Self::table_to_text(&table)
                ));
                tables.push(table);
            }

            text_parts.push(page_text_parts.join("\n"));
        }

        let raw_text = text_parts.join("\n\n");
        let page_count = pages.len();

        Ok(RawExtraction {
            raw_text,
            structured_tables: tables.clone(),
            metadata: json!({
                "page_count": page_count,
                "has_tables": !tables.is_empty(),
                "table_count": tables.len(),
                "extraction_method": "lopdf",
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_file() {
        let extractor = PdfExtractor::new(10);
        let err = extractor.extract(Path::new("/nonexistent.pdf")).unwrap_err();
        assert!(matches!(err, ExtractionError::Validation(_)));
    }

    #[test]
    fn can_handle_matches_extension() {
        let extractor = PdfExtractor::new(50 * 1024 * 1024);
        assert!(extractor.can_handle(Path::new("statement.pdf"), "application/octet-stream"));
        assert!(!extractor.can_handle(Path::new("statement.csv"), "text/csv"));
    }

    #[test]
    fn detect_table_requires_repeated_width() {
        let lines = vec![
            "Date Amount Description".to_string(),
            "2024-01-01 10.00 Coffee".to_string(),
            "2024-01-02 20.00 Lunch".to_string(),
            "2024-01-03 5.00 Tea".to_string(),
        ];
        let table = PdfExtractor::detect_table(&lines, 1).unwrap();
        assert_eq!(table.headers, vec!["Date", "Amount", "Description"]);
        assert_eq!(table.rows.len(), 3);
    }

    #[test]
    fn table_to_text_joins_headers_and_rows_with_pipes() {
        let lines = vec![
            "Date Amount Description".to_string(),
            "2024-01-01 10.00 Coffee".to_string(),
            "2024-01-02 20.00 Lunch".to_string(),
            "2024-01-03 5.00 Tea".to_string(),
        ];
        let table = PdfExtractor::detect_table(&lines, 1).unwrap();
        let text = PdfExtractor::table_to_text(&table);
        let expected = "Date | Amount | Description\n2024-01-01 | 10.00 | Coffee\n2024-01-02 | 20.00 | Lunch\n2024-01-03 | 5.00 | Tea";
        assert_eq!(text, expected);
    }
}
