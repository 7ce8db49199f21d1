//! Document Processor dispatch (§4.2): routes a file to the extractor that
//! claims its extension/MIME, timing the call and recording the outcome.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::extraction::{Extractor, RawExtraction};

/// Outcome of one dispatch: either the `RawExtraction` or the error
/// message the claimed extractor raised.
#[derive(Debug, Clone)]
pub enum DispatchStatus {
    Completed(RawExtraction),
    Failed(String),
}

/// A single dispatch record (§4.2), kept for observability regardless of
/// outcome.
#[derive(Debug, Clone)]
pub struct DispatchRecord {
    pub processing_id: Uuid,
    pub file_name: String,
    pub extractor: &'static str,
    pub status: DispatchStatus,
    pub processing_time_ms: u64,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

/// Registry mapping a file to the extractor that claims it; carries no
/// format knowledge of its own beyond routing.
pub struct DocumentProcessor {
    extractors: Vec<(&'static str, Box<dyn Extractor + Send + Sync>)>,
}

impl DocumentProcessor {
    #[must_use]
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Registers an extractor under a display name used in dispatch
    /// records (e.g. `"pdf"`, `"image"`, `"spreadsheet"`).
    #[must_use]
    pub fn register(
        mut self,
        name: &'static str,
        extractor: Box<dyn Extractor + Send + Sync>,
    ) -> Self {
        self.extractors.push((name, extractor));
        self
    }

    fn find(&self, path: &Path, mime_type: &str) -> Option<(&'static str, &(dyn Extractor + Send + Sync))> {
        self.extractors
            .iter()
            .find(|(_, extractor)| extractor.can_handle(path, mime_type))
            .map(|(name, extractor)| (*name, extractor.as_ref()))
    }

    /// Dispatches `path` to the claiming extractor, recording timings
    /// regardless of success.
    pub fn process(&self, path: &Path, mime_type: &str) -> DispatchRecord {
        let processing_id = Uuid::new_v4();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let started_at = Utc::now();
        let started = Instant::now();

        let Some((name, extractor)) = self.find(path, mime_type) else {
            let completed_at = Utc::now();
            return DispatchRecord {
                processing_id,
                file_name,
                extractor: "none",
                status: DispatchStatus::Failed(format!(
                    "no extractor claims this file (mime={mime_type})"
                )),
                processing_time_ms: started.elapsed().as_millis() as u64,
                started_at,
                completed_at,
            };
        };

        let status = match extractor.extract(path) {
            Ok(raw) => DispatchStatus::Completed(raw),
            Err(e) => DispatchStatus::Failed(e.to_string()),
        };
        let completed_at = Utc::now();

        DispatchRecord {
            processing_id,
            file_name,
            extractor: name,
            status,
            processing_time_ms: started.elapsed().as_millis() as u64,
            started_at,
            completed_at,
        }
    }
}

impl Default for DocumentProcessor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::{ExtractedTable, ExtractionError};

    struct StubExtractor {
        ext: &'static str,
    }

    impl Extractor for StubExtractor {
        fn extensions(&self) -> &[&str] {
            std::slice::from_ref(&self.ext)
        }

        fn mime_types(&self) -> &[&str] {
            &[]
        }

        fn extract(&self, _path: &Path) -> Result<RawExtraction, ExtractionError> {
            Ok(RawExtraction {
                raw_text: "stub".to_string(),
                structured_tables: Vec::<ExtractedTable>::new(),
                metadata: serde_json::json!({}),
            })
        }
    }

    #[test]
    fn dispatches_to_claiming_extractor() {
        let processor = DocumentProcessor::new()
            .register("pdf", Box::new(StubExtractor { ext: "pdf" }));
        let record = processor.process(Path::new("statement.pdf"), "application/pdf");
        assert_eq!(record.extractor, "pdf");
        assert!(matches!(record.status, DispatchStatus::Completed(_)));
    }

    #[test]
    fn reports_failure_when_no_extractor_claims_file() {
        let processor = DocumentProcessor::new();
        let record = processor.process(Path::new("mystery.xyz"), "application/octet-stream");
        assert!(matches!(record.status, DispatchStatus::Failed(_)));
    }
}
