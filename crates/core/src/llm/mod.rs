//! LLM Extractor (§4.6): per-chunk call to an external LLM with a
//! document-type-specific prompt, JSON-mode response, robust parsing, and
//! bounded retry.

mod client;
mod extractor;
mod parser;
mod prompt;
mod types;

pub use client::{LlmClient, LlmClientError, OpenAiCompatibleClient};
pub use extractor::LlmExtractor;
pub use parser::{clean_llm_text, coerce_record, parse_json_lenient, ParseError};
pub use prompt::build_prompt;
pub use types::{ExtractedRecord, ExtractionOutcome, LineItem, MultiTransactionResult};
