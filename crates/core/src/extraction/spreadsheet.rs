//! Spreadsheet (Excel/CSV) extraction (§4.1).

use std::fs;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use encoding_rs::{Encoding, WINDOWS_1252};
use encoding_rs_io::DecodeReaderBytesBuilder;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use super::{validate_file, ExtractedTable, ExtractionError, Extractor, RawExtraction};

const EXTENSIONS: &[&str] = &["xlsx", "xls", "csv"];
const MIME_TYPES: &[&str] = &[
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
    "text/csv",
    "application/csv",
];

/// CSV encoding fallback chain, tried in order until one parses cleanly.
const CSV_ENCODINGS: &[&str] = &["utf-8", "latin-1", "iso-8859-1", "cp1252"];

/// Column roles the Classifier/Chunker look for when deciding whether a
/// sheet holds one transaction or many.
const DATE_PATTERNS: &[&str] = &["date", "transaction_date", "trans_date", "datetime", "timestamp"];
const AMOUNT_PATTERNS: &[&str] = &["amount", "total", "price", "cost", "value", "sum", "debit", "credit"];
const VENDOR_PATTERNS: &[&str] = &["vendor", "merchant", "supplier", "company", "store", "payee"];
const DESCRIPTION_PATTERNS: &[&str] = &["description", "memo", "note", "details", "comment"];
const CATEGORY_PATTERNS: &[&str] = &["category", "type", "class", "classification"];

/// Vocabulary a stray header-like row scores against before it's dropped
/// from the row-level transaction extraction (§4.1).
const HEADER_VOCABULARY: &[&str] = &["date", "amount", "description", "vendor", "transaction"];

/// Date formats tried in order when coercing a cell to ISO `YYYY-MM-DD`.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%d/%m/%Y",
    "%d-%m-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
];

/// Extracts tabular data from Excel workbooks and CSV files.
pub struct SpreadsheetExtractor {
    max_size_bytes: u64,
}

impl SpreadsheetExtractor {
    #[must_use]
    pub fn new(max_size_bytes: u64) -> Self {
        Self { max_size_bytes }
    }

    fn read_excel(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>), ExtractionError> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| ExtractionError::Failed(format!("could not open workbook: {e}")))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| ExtractionError::Failed("workbook has no sheets".to_string()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .map_err(|e| ExtractionError::Failed(format!("could not read sheet: {e}")))?;

        let mut rows = range.rows();
        let headers: Vec<String> = rows
            .next()
            .map(|row| row.iter().map(data_to_string).collect())
            .unwrap_or_default();

        let data_rows: Vec<Vec<String>> = rows
            .map(|row| row.iter().map(data_to_string).collect())
            .collect();

        Ok((headers, data_rows))
    }

    /// Reads a CSV file, retrying through a chain of encodings when a
    /// given decoding fails to parse cleanly, matching the original
    /// fallback order (utf-8, then the three Windows/Latin label aliases
    /// the WHATWG Encoding Standard maps onto `windows-1252`).
    fn read_csv(path: &Path) -> Result<(Vec<String>, Vec<Vec<String>>), ExtractionError> {
        let mut last_err = None;

        for label in CSV_ENCODINGS {
            let encoding = Encoding::for_label(label.as_bytes()).unwrap_or(WINDOWS_1252);
            let file = fs::File::open(path)
                .map_err(|e| ExtractionError::Failed(format!("could not read file: {e}")))?;
            let decoder = DecodeReaderBytesBuilder::new()
                .encoding(Some(encoding))
                .build(file);

            match Self::parse_csv_reader(decoder) {
                Ok(result) => return Ok(result),
                Err(e) => last_err = Some(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            ExtractionError::Failed("could not read CSV with any supported encoding".to_string())
        }))
    }

    fn parse_csv_reader<R: std::io::Read>(
        source: R,
    ) -> Result<(Vec<String>, Vec<Vec<String>>), ExtractionError> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(source);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| ExtractionError::Failed(format!("invalid CSV header: {e}")))?
            .iter()
            .map(ToString::to_string)
            .collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| ExtractionError::Failed(format!("invalid CSV row: {e}")))?;
            rows.push(record.iter().map(ToString::to_string).collect());
        }

        Ok((headers, rows))
    }

    fn detect_column(columns: &[String], patterns: &[&str]) -> Option<String> {
        patterns.iter().find_map(|pattern| {
            columns
                .iter()
                .find(|c| c.to_lowercase().contains(pattern))
                .cloned()
        })
    }

    fn detect_transaction_columns(columns: &[String]) -> Value {
        json!({
            "date": Self::detect_column(columns, DATE_PATTERNS),
            "amount": Self::detect_column(columns, AMOUNT_PATTERNS),
            "vendor": Self::detect_column(columns, VENDOR_PATTERNS),
            "description": Self::detect_column(columns, DESCRIPTION_PATTERNS),
            "category": Self::detect_column(columns, CATEGORY_PATTERNS),
        })
    }

    /// §4.1: a sheet is multi-transaction when at least 3 rows carry both
    /// a recognized, parseable date and a recognized, parseable amount.
    fn is_multi_transaction(rows: &[Vec<String>], detected: &Value, headers: &[String]) -> bool {
        let Some(date_idx) = column_index(detected, "date", headers) else {
            return false;
        };
        let Some(amount_idx) = column_index(detected, "amount", headers) else {
            return false;
        };

        rows.iter()
            .filter(|row| {
                let date_ok = row.get(date_idx).is_some_and(|v| clean_date(v).is_some());
                let amount_ok = row.get(amount_idx).is_some_and(|v| clean_amount(v).is_some());
                date_ok && amount_ok
            })
            .count()
            >= 3
    }

    /// Best-effort per-column type tag (`"date"`, `"numeric"`, `"string"`,
    /// `"empty"`) used in place of a pandas dtype, since calamine/csv never
    /// give us one.
    fn infer_column_types(headers: &[String], rows: &[Vec<String>]) -> Value {
        let mut types = Map::new();
        for (index, header) in headers.iter().enumerate() {
            let values: Vec<&str> = rows
                .iter()
                .filter_map(|row| row.get(index))
                .map(String::as_str)
                .filter(|cell| !cell.trim().is_empty())
                .collect();

            let column_type = if values.is_empty() {
                "empty"
            } else if values.iter().all(|v| clean_amount(v).is_some()) {
                "numeric"
            } else if values.iter().all(|v| clean_date(v).is_some()) {
                "date"
            } else {
                "string"
            };

            types.insert(header.clone(), Value::String(column_type.to_string()));
        }
        Value::Object(types)
    }

    fn rows_to_records(headers: &[String], rows: &[Vec<String>]) -> Vec<Value> {
        rows.iter()
            .map(|row| {
                let mut record = Map::new();
                for (index, header) in headers.iter().enumerate() {
                    let cell = row.get(index).map(String::as_str).unwrap_or_default();
                    let value = if cell.is_empty() { Value::Null } else { Value::String(cell.to_string()) };
                    record.insert(header.clone(), value);
                }
                Value::Object(record)
            })
            .collect()
    }

    /// §4.1 row-level extraction path: drops blank rows and a leading
    /// header-like row, then cleans and emits one record per row that
    /// carries both a date and an amount.
    fn build_transactions(rows: &[Vec<String>], detected: &Value, headers: &[String]) -> Vec<Value> {
        let mut data_rows: Vec<(usize, &Vec<String>)> = rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.iter().any(|cell| !cell.trim().is_empty()))
            .collect();

        if data_rows.len() > 5 && data_rows.first().is_some_and(|(_, row)| looks_like_header_row(row)) {
            data_rows.remove(0);
        }

        data_rows
            .into_iter()
            .filter_map(|(row_index, row)| extract_transaction_from_row(row_index, row, detected, headers))
            .collect()
    }

    fn to_text(headers: &[String], rows: &[Vec<String>]) -> String {
        let mut text = headers.join(" | ");
        text.push('\n');
        for row in rows {
            text.push_str(&row.join(" | "));
            text.push('\n');
        }
        text
    }
}

fn column_index(detected: &Value, field: &str, headers: &[String]) -> Option<usize> {
    let name = detected.get(field)?.as_str()?;
    headers.iter().position(|h| h == name)
}

fn looks_like_header_row(row: &[String]) -> bool {
    HEADER_VOCABULARY
        .iter()
        .filter(|word| row.iter().any(|cell| cell.to_lowercase().contains(*word)))
        .count()
        >= 2
}

/// Strips currency symbols, thousands separators, and parenthesized
/// negatives (`"(1.23)"` → `-1.23`) before parsing.
fn clean_amount(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let cleaned = trimmed.replace('$', "").replace(',', "").replace('(', "-").replace(')', "");
    cleaned.trim().parse::<Decimal>().ok()
}

/// Coerces a cell to a date by trying each of [`DATE_FORMATS`] in order.
fn clean_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    DATE_FORMATS.iter().find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

fn extract_transaction_from_row(row_index: usize, row: &[String], detected: &Value, headers: &[String]) -> Option<Value> {
    let cell_for = |field: &str| -> Option<&str> {
        column_index(detected, field, headers)
            .and_then(|index| row.get(index))
            .map(String::as_str)
            .filter(|cell| !cell.trim().is_empty())
    };

    let date = cell_for("date").and_then(clean_date)?;
    let amount = cell_for("amount").and_then(clean_amount)?;

    let mut transaction = Map::new();
    transaction.insert("date".to_string(), json!(date.format("%Y-%m-%d").to_string()));
    transaction.insert("amount".to_string(), json!(amount));
    if let Some(vendor) = cell_for("vendor") {
        transaction.insert("vendor".to_string(), json!(vendor.trim()));
    }
    if let Some(description) = cell_for("description") {
        transaction.insert("description".to_string(), json!(description.trim()));
    }
    if let Some(category) = cell_for("category") {
        transaction.insert("category".to_string(), json!(category.trim()));
    }
    // Sheets encode direction through the amount's sign (e.g. a debit/credit
    // column), unlike the LLM extractor which reports `is_income` directly.
    transaction.insert("is_income".to_string(), json!(amount.is_sign_positive() && !amount.is_zero()));
    transaction.insert("row_index".to_string(), json!(row_index));
    transaction.insert("extraction_method".to_string(), json!("excel_row"));

    Some(Value::Object(transaction))
}

fn data_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("#ERROR({e:?})"),
    }
}

impl Extractor for SpreadsheetExtractor {
    fn extensions(&self) -> &[&str] {
        EXTENSIONS
    }

    fn mime_types(&self) -> &[&str] {
        MIME_TYPES
    }

    fn extract(&self, path: &Path) -> Result<RawExtraction, ExtractionError> {
        validate_file(path, self.max_size_bytes)?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let (headers, rows) = if extension == "csv" {
            Self::read_csv(path)?
        } else {
            Self::read_excel(path)?
        };

        let raw_text = Self::to_text(&headers, &rows);
        let detected_columns = Self::detect_transaction_columns(&headers);
        let multi = Self::is_multi_transaction(&rows, &detected_columns, &headers);
        let is_likely_expense_sheet =
            detected_columns.get("amount").is_some_and(Value::is_string) || detected_columns.get("date").is_some_and(Value::is_string);

        let table = ExtractedTable {
            page: 0,
            index: 0,
            headers: headers.clone(),
            rows: rows.clone(),
        };

        let mut metadata = json!({
            "file_type": extension,
            "row_count": rows.len(),
            "column_count": headers.len(),
            "columns": headers,
            "column_types": Self::infer_column_types(&headers, &rows),
            "records": Self::rows_to_records(&headers, &rows),
            "detected_transaction_columns": detected_columns,
            "is_likely_expense_sheet": is_likely_expense_sheet,
            "is_multi_transaction": multi,
        });

        if multi {
            let transactions = Self::build_transactions(&rows, &detected_columns, &headers);
            metadata["transactions"] = json!(transactions);
        }

        Ok(RawExtraction {
            raw_text,
            structured_tables: vec![table],
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn detects_transaction_columns_by_substring() {
        let columns = vec![
            "Transaction Date".to_string(),
            "Amount (USD)".to_string(),
            "Merchant Name".to_string(),
        ];
        let detected = SpreadsheetExtractor::detect_transaction_columns(&columns);
        assert_eq!(detected["date"], "Transaction Date");
        assert_eq!(detected["amount"], "Amount (USD)");
        assert_eq!(detected["vendor"], "Merchant Name");
    }

    #[test]
    fn detects_debit_and_credit_as_amount_columns() {
        let columns = vec!["Date".to_string(), "Debit".to_string()];
        let detected = SpreadsheetExtractor::detect_transaction_columns(&columns);
        assert_eq!(detected["amount"], "Debit");
    }

    #[test]
    fn is_multi_transaction_requires_three_rows_with_date_and_amount() {
        let headers = vec!["Date".to_string(), "Amount".to_string()];
        let rows = vec![
            vec!["2024-01-01".to_string(), "10.00".to_string()],
            vec!["2024-01-02".to_string(), "20.00".to_string()],
            vec!["2024-01-03".to_string(), "30.00".to_string()],
        ];
        let detected = SpreadsheetExtractor::detect_transaction_columns(&headers);
        assert!(SpreadsheetExtractor::is_multi_transaction(&rows, &detected, &headers));

        let too_few = &rows[..2];
        assert!(!SpreadsheetExtractor::is_multi_transaction(too_few, &detected, &headers));

        let no_columns = SpreadsheetExtractor::detect_transaction_columns(&["Notes".to_string()]);
        assert!(!SpreadsheetExtractor::is_multi_transaction(&rows, &no_columns, &["Notes".to_string()]));
    }

    #[test]
    fn clean_amount_handles_currency_commas_and_parens() {
        assert_eq!(clean_amount("$1,234.56"), Some(dec!(1234.56)));
        assert_eq!(clean_amount("(45.00)"), Some(dec!(-45.00)));
        assert_eq!(clean_amount(""), None);
        assert_eq!(clean_amount("n/a"), None);
    }

    #[test]
    fn clean_date_accepts_multiple_formats() {
        assert_eq!(clean_date("2024-03-05"), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(clean_date("03/05/2024"), NaiveDate::from_ymd_opt(2024, 3, 5));
        assert_eq!(clean_date("not a date"), None);
    }

    #[test]
    fn build_transactions_drops_header_like_first_row_and_cleans_fields() {
        let headers = vec!["Date".to_string(), "Amount".to_string(), "Vendor".to_string()];
        let detected = SpreadsheetExtractor::detect_transaction_columns(&headers);
        let mut rows = vec![vec!["Date".to_string(), "Amount".to_string(), "Vendor".to_string()]];
        for i in 1..=6 {
            rows.push(vec![format!("2024-01-0{i}"), format!("{i}0.00"), format!("Vendor {i}")]);
        }

        let transactions = SpreadsheetExtractor::build_transactions(&rows, &detected, &headers);
        assert_eq!(transactions.len(), 6);
        assert_eq!(transactions[0]["date"], "2024-01-01");
        assert_eq!(transactions[0]["amount"], json!(dec!(10.00)));
        assert_eq!(transactions[0]["vendor"], "Vendor 1");
        assert_eq!(transactions[0]["extraction_method"], "excel_row");
    }

    #[test]
    fn build_transactions_skips_rows_missing_date_or_amount() {
        let headers = vec!["Date".to_string(), "Amount".to_string()];
        let detected = SpreadsheetExtractor::detect_transaction_columns(&headers);
        let rows = vec![
            vec!["2024-01-01".to_string(), "10.00".to_string()],
            vec![String::new(), "20.00".to_string()],
            vec!["2024-01-03".to_string(), String::new()],
        ];

        let transactions = SpreadsheetExtractor::build_transactions(&rows, &detected, &headers);
        assert_eq!(transactions.len(), 1);
    }

    #[test]
    fn extract_emits_transactions_array_only_when_multi() {
        let mut file = tempfile::NamedTempFile::with_suffix(".csv").unwrap();
        writeln!(file, "date,amount,vendor").unwrap();
        writeln!(file, "2024-01-01,10.00,Coffee Shop").unwrap();
        writeln!(file, "2024-01-02,20.00,Office Depot").unwrap();
        writeln!(file, "2024-01-03,30.00,Gas Station").unwrap();

        let extractor = SpreadsheetExtractor::new(10 * 1024 * 1024);
        let result = extractor.extract(file.path()).unwrap();
        assert_eq!(result.metadata["is_multi_transaction"], true);
        assert_eq!(result.metadata["transactions"].as_array().unwrap().len(), 3);
        assert_eq!(result.metadata["is_likely_expense_sheet"], true);
        assert_eq!(result.metadata["column_types"]["amount"], "numeric");
    }

    #[test]
    fn parses_csv_with_utf8() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "date,amount,vendor\n2024-01-01,10.00,Coffee Shop").unwrap();
        let (headers, rows) = SpreadsheetExtractor::read_csv(file.path()).unwrap();
        assert_eq!(headers, vec!["date", "amount", "vendor"]);
        assert_eq!(rows.len(), 1);
    }
}
