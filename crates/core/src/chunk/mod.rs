//! Chunker (§4.4): decides whether a document must be split, then splits
//! it by transaction groups, page markers, or byte-bounded windows.

#[cfg(test)]
mod service_props;

use serde_json::Value;
use tracing::debug;

/// A chunk's payload: either raw text or a slice of a transactions array.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum ChunkPayload {
    Text(String),
    Transactions {
        start_index: usize,
        end_index: usize,
        batch: Vec<Value>,
    },
}

/// Strategy that produced a chunk, carried for observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ChunkType {
    Transactions,
    Pages,
    Size,
}

/// One chunk of a document (§4.4).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Chunk {
    pub chunk_id: usize,
    pub chunk_type: ChunkType,
    pub payload: ChunkPayload,
    pub char_count: usize,
}

/// Chunker configuration, defaulting to the values from §4.11/config.
#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub max_chunk_size: usize,
    pub overlap: usize,
    pub max_transactions_per_chunk: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: 4000,
            overlap: 200,
            max_transactions_per_chunk: 30,
        }
    }
}

/// Hard cap on chunk count guarding against pathological input.
const MAX_CHUNKS: usize = 1000;

/// Splits oversized documents into chunks the LLM Extractor can process
/// per-call.
pub struct Chunker {
    config: ChunkerConfig,
}

impl Chunker {
    #[must_use]
    pub fn new(config: ChunkerConfig) -> Self {
        Self { config }
    }

    /// §4.4 `should_chunk` decision rule.
    #[must_use]
    pub fn should_chunk(&self, raw_text: &str, detected_transaction_count: usize) -> bool {
        raw_text.len() > 2 * self.config.max_chunk_size
            || detected_transaction_count > self.config.max_transactions_per_chunk
    }

    /// Splits `raw_text`/`structured_data` into chunks, auto-selecting a
    /// strategy.
    #[must_use]
    pub fn chunk(&self, raw_text: &str, structured_data: Option<&Value>) -> Vec<Chunk> {
        if let Some(transactions) = structured_data
            .and_then(|d| d.get("transactions"))
            .and_then(Value::as_array)
        {
            return self.chunk_transactions(transactions);
        }

        if raw_text.contains("--- Page ") {
            return self.chunk_pages(raw_text);
        }

        self.chunk_by_size(raw_text)
    }

    fn chunk_transactions(&self, transactions: &[Value]) -> Vec<Chunk> {
        let batch_size = self.config.max_transactions_per_chunk;
        let mut chunks = Vec::new();

        for (chunk_id, start) in (0..transactions.len()).step_by(batch_size).enumerate() {
            if chunk_id >= MAX_CHUNKS {
                debug!(chunk_count = chunk_id, "aborting: chunk cap reached");
                break;
            }
            let end = (start + batch_size).min(transactions.len());
            let batch: Vec<Value> = transactions[start..end].to_vec();
            chunks.push(Chunk {
                chunk_id,
                chunk_type: ChunkType::Transactions,
                char_count: batch.iter().map(|v| v.to_string().len()).sum(),
                payload: ChunkPayload::Transactions {
                    start_index: start,
                    end_index: end,
                    batch,
                },
            });
        }

        chunks
    }

    fn chunk_pages(&self, raw_text: &str) -> Vec<Chunk> {
        let marker = "--- Page ";
        let mut chunks = Vec::new();
        let mut chunk_id = 0;

        if let Some(first_marker) = raw_text.find(marker) {
            let preamble = raw_text[..first_marker].trim();
            if !preamble.is_empty() {
                chunks.push(Chunk {
                    chunk_id,
                    chunk_type: ChunkType::Pages,
                    char_count: preamble.chars().count(),
                    payload: ChunkPayload::Text(preamble.to_string()),
                });
                chunk_id += 1;
            }
        }

        let mut remaining = raw_text;
        if let Some(first_marker) = remaining.find(marker) {
            remaining = &remaining[first_marker..];
        }

        let mut markers: Vec<usize> = remaining.match_indices(marker).map(|(i, _)| i).collect();
        markers.push(remaining.len());

        for window in markers.windows(2) {
            if chunk_id >= MAX_CHUNKS {
                debug!(chunk_count = chunk_id, "aborting: chunk cap reached");
                break;
            }
            let text = remaining[window[0]..window[1]].trim().to_string();
            if text.is_empty() {
                continue;
            }
            chunks.push(Chunk {
                chunk_id,
                chunk_type: ChunkType::Pages,
                char_count: text.chars().count(),
                payload: ChunkPayload::Text(text),
            });
            chunk_id += 1;
        }

        chunks
    }

    fn chunk_by_size(&self, raw_text: &str) -> Vec<Chunk> {
        self.chunk_by_size_ranges(raw_text)
            .into_iter()
            .enumerate()
            .map(|(chunk_id, (start, end))| {
                let text = &raw_text[start..end];
                Chunk {
                    chunk_id,
                    chunk_type: ChunkType::Size,
                    char_count: text.chars().count(),
                    payload: ChunkPayload::Text(text.to_string()),
                }
            })
            .collect()
    }

    /// Byte ranges `[start, end)` the size strategy would cut `raw_text`
    /// into. Exposed at crate visibility so the round-trip property test
    /// (§8 P7) can verify full coverage without duplicating the cutting
    /// logic.
    pub(crate) fn chunk_by_size_ranges(&self, raw_text: &str) -> Vec<(usize, usize)> {
        let len = raw_text.len();
        let mut ranges = Vec::new();
        let mut start = 0usize;

        while start < len {
            if ranges.len() >= MAX_CHUNKS {
                debug!(chunk_count = ranges.len(), "aborting: chunk cap reached");
                break;
            }

            let target_end = (start + self.config.max_chunk_size).min(len);
            let end = Self::find_cut_point(raw_text, start, target_end);
            let end = Self::align_char_boundary(raw_text, end);

            ranges.push((start, end));

            let next_start = end.saturating_sub(self.config.overlap);
            start = if next_start > start { next_start } else { end };
        }

        ranges
    }

    /// Looks back up to 500 chars from `target_end` for a `\n` or `. `
    /// boundary to cut on, so chunks don't split mid-sentence.
    fn find_cut_point(text: &str, start: usize, target_end: usize) -> usize {
        if target_end >= text.len() {
            return text.len();
        }

        let lookback_start = target_end.saturating_sub(500).max(start);
        let window = &text[lookback_start..target_end];

        if let Some(pos) = window.rfind(". ") {
            return lookback_start + pos + 2;
        }
        if let Some(pos) = window.rfind('\n') {
            return lookback_start + pos + 1;
        }

        target_end
    }

    fn align_char_boundary(text: &str, mut index: usize) -> usize {
        while index < text.len() && !text.is_char_boundary(index) {
            index += 1;
        }
        index
    }

    /// Processing-time estimate used only for observability (§4.4).
    #[must_use]
    pub fn estimate_processing_time_secs(chunks: &[Chunk]) -> f64 {
        chunks
            .iter()
            .map(|c| match c.chunk_type {
                ChunkType::Pages => 2.0,
                ChunkType::Transactions => {
                    if let ChunkPayload::Transactions { batch, .. } = &c.payload {
                        0.5 * batch.len() as f64
                    } else {
                        0.0
                    }
                }
                ChunkType::Size => 3.0,
            })
            .sum()
    }
}
