//! Classifier (§4.3): assigns a document-type tag and a multi-transaction
//! flag from filename hints, structured-data shape, and regex scoring.

mod patterns;

use std::path::Path;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use patterns::{
    content_patterns, file_modifiers, file_type_patterns, multi_transaction_keywords,
};

/// Classifier output (§4.3).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Classification {
    pub document_type: String,
    pub is_multi_transaction: bool,
    pub confidence: f32,
    pub multi_transaction_confidence: f32,
    pub indicators: Vec<String>,
}

/// Classifies a document from its extracted text and optional structured
/// shape.
pub struct Classifier;

impl Classifier {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Runs the three scoring passes and returns the winning classification.
    #[must_use]
    pub fn classify(
        &self,
        file_path: &Path,
        raw_text: &str,
        structured_data: Option<&Value>,
    ) -> Classification {
        let mut indicators = Vec::new();

        let (file_type, file_confidence) = self.score_file_characteristics(file_path, structured_data, &mut indicators);
        let (content_type, content_confidence) = self.score_content_regex(raw_text, &mut indicators);
        let (multi_score, multi_indicators) = self.score_multi_transaction_signal(raw_text, structured_data);
        indicators.extend(multi_indicators);

        let (mut document_type, confidence) = if file_confidence >= content_confidence {
            (file_type, file_confidence)
        } else {
            (content_type, content_confidence)
        };

        let is_multi_transaction = multi_score > 0.6;
        if is_multi_transaction && multi_score > 0.7 && !document_type.ends_with("_multi") {
            document_type = format!("{document_type}_multi");
        }

        debug!(
            document_type = %document_type,
            confidence,
            multi_score,
            "classified document"
        );

        Classification {
            document_type,
            is_multi_transaction,
            confidence,
            multi_transaction_confidence: multi_score,
            indicators,
        }
    }

    fn score_file_characteristics(
        &self,
        file_path: &Path,
        structured_data: Option<&Value>,
        indicators: &mut Vec<String>,
    ) -> (String, f32) {
        let file_name = file_path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        for (doc_type, keyword) in file_type_patterns() {
            if file_name.contains(keyword) {
                let mut confidence: f32 = 0.8;
                for modifier in file_modifiers() {
                    if file_name.contains(modifier) {
                        confidence = (confidence + 0.05).min(1.0);
                        indicators.push(format!("filename modifier: {modifier}"));
                    }
                }
                indicators.push(format!("filename pattern: {keyword}"));
                return (doc_type.to_string(), confidence);
            }
        }

        if let Some(data) = structured_data {
            if let Some(columns) = data.get("columns").and_then(Value::as_array) {
                let lower: Vec<String> = columns
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_lowercase)
                    .collect();
                let shape_hits = ["date", "amount", "description", "vendor", "transaction"]
                    .iter()
                    .filter(|k| lower.iter().any(|c| c.contains(*k)))
                    .count();
                if shape_hits >= 3 {
                    indicators.push(format!("spreadsheet shape: {shape_hits} matching columns"));
                    return ("bank_statement".to_string(), 0.8);
                }
            }
        }

        ("unknown".to_string(), 0.0)
    }

    fn score_content_regex(&self, raw_text: &str, indicators: &mut Vec<String>) -> (String, f32) {
        let mut best_type = "unknown".to_string();
        let mut best_confidence = 0.0f32;

        for (doc_type, patterns) in content_patterns() {
            let total = patterns.len();
            if total == 0 {
                continue;
            }
            let matches = patterns
                .iter()
                .filter(|p| Regex::new(p).is_ok_and(|re| re.is_match(raw_text)))
                .count();
            if matches == 0 {
                continue;
            }
            let confidence = matches as f32 / total as f32;
            if confidence > best_confidence {
                best_confidence = confidence;
                best_type = doc_type.to_string();
                indicators.push(format!("content regex: {doc_type} ({matches}/{total})"));
            }
        }

        (best_type, best_confidence)
    }

    fn score_multi_transaction_signal(
        &self,
        raw_text: &str,
        structured_data: Option<&Value>,
    ) -> (f32, Vec<String>) {
        let mut score = 0.0f32;
        let mut indicators = Vec::new();
        let lower = raw_text.to_lowercase();

        for bundle in multi_transaction_keywords() {
            if bundle.iter().any(|kw| lower.contains(kw)) {
                score += 0.2;
                indicators.push(format!("multi-transaction keyword bundle: {bundle:?}"));
            }
        }

        if let Some(data) = structured_data {
            if let Some(row_count) = data.get("row_count").and_then(Value::as_u64) {
                if row_count > 5 {
                    score += 0.3;
                    indicators.push(format!("row_count > 5 ({row_count})"));
                }
            }
            let detected = data.get("detected_transaction_columns");
            let has_amount = detected.and_then(|d| d.get("amount")).is_some_and(|v| !v.is_null());
            let has_date = detected.and_then(|d| d.get("date")).is_some_and(|v| !v.is_null());
            if has_amount && has_date {
                score += 0.4;
                indicators.push("amount and date columns detected".to_string());
            }
        }

        if let Ok(re) = Regex::new(r"transaction\s*\d+") {
            let count = re.find_iter(&lower).count();
            if count > 2 {
                score += 0.3;
                indicators.push(format!("transaction\\d+ occurrences: {count}"));
            }
        }

        if let Ok(re) = Regex::new(r"(?m)^.*date.*amount.*$") {
            let count = re.find_iter(&lower).count();
            if count > 3 {
                score += 0.25;
                indicators.push(format!("date-amount co-occurrence lines: {count}"));
            }
        }

        (score.min(1.0), indicators)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new()
    }
}
