//! Property test for the size-strategy chunker (§8 P7): concatenating
//! chunk ranges in order, modulo deliberate overlap, reproduces the full
//! original text with no gaps.

use proptest::prelude::*;

use super::{Chunker, ChunkerConfig};

proptest! {
    /// P7: ranges cover `[0, len(text))` contiguously — each range starts
    /// at or before the previous range's end, and the last range ends at
    /// the text's length, so no content is dropped between chunks.
    #[test]
    fn prop_size_chunks_cover_full_text(
        text in "[a-zA-Z0-9 .\n]{0,3000}",
        max_chunk_size in 20usize..500,
        overlap in 0usize..50,
    ) {
        let chunker = Chunker::new(ChunkerConfig {
            max_chunk_size,
            overlap: overlap.min(max_chunk_size.saturating_sub(1)),
            max_transactions_per_chunk: 30,
        });
        let ranges = chunker.chunk_by_size_ranges(&text);

        if text.is_empty() {
            prop_assert!(ranges.is_empty());
            return Ok(());
        }

        prop_assert!(!ranges.is_empty());
        prop_assert_eq!(ranges[0].0, 0);
        prop_assert_eq!(ranges.last().unwrap().1, text.len());

        for window in ranges.windows(2) {
            prop_assert!(window[1].0 <= window[0].1, "gap between chunks");
            prop_assert!(window[1].0 > window[0].0, "chunker must make forward progress");
        }
    }
}
