//! LLM Extractor (§4.6): prompt → call → parse → retry orchestration for
//! one chunk.

use std::time::Duration;

use serde_json::Value;
use tokio::time::sleep;
use tracing::warn;

use super::client::{LlmClient, LlmClientError};
use super::parser::{coerce_record, parse_json_lenient};
use super::prompt::build_prompt;
use super::types::{ExtractedRecord, ExtractionOutcome, MultiTransactionResult};

/// Bounded retries on transport or JSON-parse failure (§4.6).
const MAX_RETRIES: u32 = 3;
/// `max_tokens` for a structured-extraction call.
const EXTRACTION_MAX_TOKENS: u32 = 2000;

/// Runs prompt construction, the LLM call, and lenient-JSON parsing for
/// one chunk, retrying with exponential backoff on failure.
pub struct LlmExtractor<C: LlmClient> {
    client: C,
}

impl<C: LlmClient> LlmExtractor<C> {
    #[must_use]
    pub fn new(client: C) -> Self {
        Self { client }
    }

    /// Extracts structured data from `chunk_text`. Exhausted retries or a
    /// schema-empty result produce a zero-confidence `ExtractedRecord`
    /// with `extraction_error` set rather than propagating an error, so
    /// the Orchestrator always reaches the Scorer (§4.6 failure
    /// semantics).
    pub async fn extract(
        &self,
        document_type: &str,
        chunk_text: &str,
        category_listing: &str,
        force_multi: bool,
    ) -> ExtractionOutcome {
        let prompt = build_prompt(document_type, chunk_text, category_listing, force_multi);

        let mut last_error = String::new();
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = Duration::from_millis(200 * 2u64.pow(attempt - 1));
                sleep(backoff).await;
            }

            match self.client.complete(&prompt, EXTRACTION_MAX_TOKENS).await {
                Ok(raw) => match parse_json_lenient(&raw) {
                    Ok(value) => return Self::to_outcome(&value, force_multi),
                    Err(e) => {
                        last_error = e.to_string();
                        warn!(attempt, error = %last_error, "LLM response failed JSON parsing, retrying");
                    }
                },
                Err(e) => {
                    last_error = e.to_string();
                    warn!(attempt, error = %last_error, "LLM call failed, retrying");
                    if matches!(e, LlmClientError::ProviderError(_)) {
                        break;
                    }
                }
            }
        }

        ExtractionOutcome::Single(Self::failed_record(&last_error))
    }

    fn failed_record(error: &str) -> ExtractedRecord {
        ExtractedRecord {
            extraction_error: Some(error.to_string()),
            ..ExtractedRecord::default()
        }
    }

    /// Coerces the parsed JSON into the expected shape. When `force_multi`
    /// is set and the LLM still replied with a single object, it is
    /// auto-wrapped into a one-element array (§4.6 force-multi behavior).
    fn to_outcome(value: &Value, force_multi: bool) -> ExtractionOutcome {
        let is_multi_shape = value.get("extraction_type").and_then(Value::as_str) == Some("multi_transaction")
            || value.get("transactions").and_then(Value::as_array).is_some();

        if is_multi_shape {
            let transactions = value
                .get("transactions")
                .and_then(Value::as_array)
                .map(|arr| arr.iter().map(coerce_record).collect())
                .unwrap_or_default();

            return ExtractionOutcome::Multi(MultiTransactionResult {
                transactions,
                total_raw_transactions: value
                    .get("total_raw_transactions")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize),
                valid_transactions: value
                    .get("valid_transactions")
                    .and_then(Value::as_u64)
                    .map(|n| n as usize),
            });
        }

        let record = coerce_record(value);
        if force_multi {
            return ExtractionOutcome::Multi(MultiTransactionResult {
                transactions: vec![record],
                total_raw_transactions: Some(1),
                valid_transactions: Some(1),
            });
        }
        ExtractionOutcome::Single(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct FlakyClient {
        succeed_after: u32,
        calls: Arc<AtomicU32>,
        response: String,
    }

    impl LlmClient for FlakyClient {
        async fn complete(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmClientError> {
            let call_number = self.calls.fetch_add(1, Ordering::SeqCst);
            if call_number < self.succeed_after {
                return Err(LlmClientError::Transport("connection reset".to_string()));
            }
            Ok(self.response.clone())
        }
    }

    #[tokio::test]
    async fn retries_on_transport_failure_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let client = FlakyClient {
            succeed_after: 2,
            calls: calls.clone(),
            response: r#"{"vendor": "Acme", "amount": 10.00}"#.to_string(),
        };
        let extractor = LlmExtractor::new(client);
        let outcome = extractor.extract("receipt", "chunk text", "", false).await;
        match outcome {
            ExtractionOutcome::Single(record) => assert_eq!(record.vendor.as_deref(), Some("Acme")),
            ExtractionOutcome::Multi(_) => panic!("expected single record"),
        }
        assert!(calls.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn exhausted_retries_yield_zero_confidence_record_with_error() {
        let client = FlakyClient {
            succeed_after: 99,
            calls: Arc::new(AtomicU32::new(0)),
            response: String::new(),
        };
        let extractor = LlmExtractor::new(client);
        let outcome = extractor.extract("receipt", "chunk text", "", false).await;
        match outcome {
            ExtractionOutcome::Single(record) => {
                assert!(record.extraction_error.is_some());
                assert!(record.amount.is_none());
            }
            ExtractionOutcome::Multi(_) => panic!("expected single record"),
        }
    }

    #[tokio::test]
    async fn force_multi_wraps_single_object_response() {
        let client = FlakyClient {
            succeed_after: 0,
            calls: Arc::new(AtomicU32::new(0)),
            response: r#"{"vendor": "Acme", "amount": 10.00}"#.to_string(),
        };
        let extractor = LlmExtractor::new(client);
        let outcome = extractor.extract("bank_statement", "chunk text", "", true).await;
        match outcome {
            ExtractionOutcome::Multi(result) => assert_eq!(result.transactions.len(), 1),
            ExtractionOutcome::Single(_) => panic!("expected multi result"),
        }
    }
}
