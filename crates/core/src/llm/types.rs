//! Dynamic extraction output types (§4.6, §9 "Dynamic field dicts").

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single extracted transaction record, mirroring the Transaction
/// fields from §3. Every field is optional since the LLM may fail to
/// extract it; absence is itself meaningful (drives the required-field
/// gate in §4.8).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    pub vendor: Option<String>,
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub payment_method: Option<String>,
    pub recipient_id: Option<String>,
    pub is_income: Option<bool>,
    pub line_items: Vec<LineItem>,
    /// Per-field confidence in `[0, 1]`, keyed by field name.
    pub field_confidence: HashMap<String, f32>,
    /// Set when extraction exhausted retries or produced an empty
    /// schema result (§4.6 failure semantics); the record is otherwise
    /// zero-confidence.
    pub extraction_error: Option<String>,
}

/// One line item within a record, when the source breaks the total down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub amount: Option<Decimal>,
    pub quantity: Option<Decimal>,
}

/// Output of a chunk that the prompt/classifier marked as multi-transaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MultiTransactionResult {
    pub transactions: Vec<ExtractedRecord>,
    pub total_raw_transactions: Option<usize>,
    pub valid_transactions: Option<usize>,
}

/// The merged output of one LLM Extractor invocation over a chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtractionOutcome {
    Single(ExtractedRecord),
    Multi(MultiTransactionResult),
}

impl ExtractionOutcome {
    /// Flattens into a list of records regardless of shape, preserving
    /// document order.
    #[must_use]
    pub fn into_records(self) -> Vec<ExtractedRecord> {
        match self {
            Self::Single(record) => vec![record],
            Self::Multi(result) => result.transactions,
        }
    }
}
