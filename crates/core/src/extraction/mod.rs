//! Format Extractors (§4.1): per-format adapters producing a uniform
//! `RawExtraction`.

mod image;
mod pdf;
mod spreadsheet;

pub use image::{ImageExtractor, MockOcrEngine, OcrEngine};
pub use pdf::PdfExtractor;
pub use spreadsheet::SpreadsheetExtractor;

use std::fs;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

/// Shared, format-agnostic validation applied before any format-specific
/// work: the file must exist, be a regular file, be readable, be
/// non-empty, and fit under the configured size cap.
///
/// # Errors
///
/// Returns `ExtractionError::Validation` on any failed check.
pub fn validate_file(path: &Path, max_size_bytes: u64) -> Result<(), ExtractionError> {
    let metadata = fs::metadata(path)
        .map_err(|_| ExtractionError::Validation(format!("file not found: {}", path.display())))?;

    if !metadata.is_file() {
        return Err(ExtractionError::Validation(format!(
            "not a file: {}",
            path.display()
        )));
    }

    if metadata.len() == 0 {
        return Err(ExtractionError::Validation(format!(
            "file is empty: {}",
            path.display()
        )));
    }

    if metadata.len() > max_size_bytes {
        return Err(ExtractionError::Validation(format!(
            "file too large ({} bytes, max {}): {}",
            metadata.len(),
            max_size_bytes,
            path.display()
        )));
    }

    fs::File::open(path)
        .map_err(|e| ExtractionError::Validation(format!("cannot read file: {e}")))?;

    Ok(())
}

/// Errors raised by a format extractor. Any extractor-local failure wraps
/// into this; the Orchestrator treats it as terminal for the document.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Failed the shared pre-extraction validation.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The format-specific extraction step itself failed.
    #[error("extraction failed: {0}")]
    Failed(String),
    /// No registered extractor claims this file's extension/MIME.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl From<ExtractionError> for ledgerstream_shared::AppError {
    fn from(err: ExtractionError) -> Self {
        Self::Extraction(err.to_string())
    }
}

/// A normalized table extracted from a document (PDF or spreadsheet).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExtractedTable {
    /// Source page number (1-indexed), 0 if not page-based.
    pub page: usize,
    /// Index of this table within its page.
    pub index: usize,
    /// Column headers.
    pub headers: Vec<String>,
    /// Data rows, each the same length as `headers` where possible.
    pub rows: Vec<Vec<String>>,
}

/// Uniform output of every Format Extractor (§4.1).
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct RawExtraction {
    /// Extracted plain text, with `--- Page N ---` markers for paginated
    /// sources so the Chunker can split on them.
    pub raw_text: String,
    /// Tables detected during extraction, if any.
    pub structured_tables: Vec<ExtractedTable>,
    /// Format-specific structured data (column shapes, OCR confidence,
    /// detected transaction rows, ...), merged into one JSON object so the
    /// Classifier and Chunker can inspect it without format-specific code.
    pub metadata: Value,
}

/// A format adapter: claims a set of extensions/MIME types and extracts a
/// `RawExtraction` from a file it claims.
pub trait Extractor {
    /// File extensions this extractor claims, lowercase, without the dot.
    fn extensions(&self) -> &[&str];

    /// MIME types this extractor claims.
    fn mime_types(&self) -> &[&str];

    /// True if this extractor claims `path` by extension or MIME type.
    fn can_handle(&self, path: &Path, mime_type: &str) -> bool {
        let ext_match = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| self.extensions().contains(&e.to_lowercase().as_str()));
        ext_match || self.mime_types().contains(&mime_type)
    }

    /// Extracts a `RawExtraction` from `path`.
    ///
    /// # Errors
    ///
    /// Returns `ExtractionError` on any extraction failure.
    fn extract(&self, path: &Path) -> Result<RawExtraction, ExtractionError>;
}
