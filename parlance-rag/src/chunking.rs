//! Document chunking strategies.
//!
//! This module provides the [`Chunker`] trait and two implementations:
//!
//! - [`FixedSizeChunker`]: hard character windows with configurable overlap
//! - [`SeparatorChunker`]: the same windows, with each window end pulled back
//!   to the nearest paragraph, line, sentence or word boundary
//!
//! Both measure sizes in characters, never bytes, and both guarantee that
//! consecutive chunks overlap by exactly the configured number of characters
//! and that together they cover the whole document.

use std::sync::Arc;

use crate::config::{ChunkingStrategy, RagConfig, validate_chunking};
use crate::document::{Chunk, Document};
use crate::error::Result;

/// Boundaries tried by [`SeparatorChunker`], highest priority first.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", ". ", " "];

/// A strategy for splitting documents into chunks.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has empty text.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;
}

/// Build the chunker selected by `config`.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfig`](crate::RagError::InvalidConfig) if the
/// window parameters are inconsistent.
pub fn chunker_from_config(config: &RagConfig) -> Result<Arc<dyn Chunker>> {
    Ok(match config.chunking {
        ChunkingStrategy::Fixed => {
            Arc::new(FixedSizeChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
        ChunkingStrategy::Separator => {
            Arc::new(SeparatorChunker::new(config.chunk_size, config.chunk_overlap)?)
        }
    })
}

/// Split `text` into fixed character windows.
///
/// # Errors
///
/// Returns [`RagError::InvalidConfig`](crate::RagError::InvalidConfig) unless
/// `0 <= overlap < max_chunk_size`.
pub fn chunk_text(
    source_id: &str,
    text: &str,
    max_chunk_size: usize,
    overlap: usize,
) -> Result<Vec<Chunk>> {
    let chunker = FixedSizeChunker::new(max_chunk_size, overlap)?;
    Ok(chunker.chunk(&Document::new(source_id, text)))
}

/// Splits text into fixed-size chunks by character count with configurable overlap.
///
/// The window advances by `chunk_size - chunk_overlap` characters. The window
/// that reaches the end of the text is the last one and may be shorter.
///
/// # Example
///
/// ```rust,ignore
/// use parlance_rag::FixedSizeChunker;
///
/// let chunker = FixedSizeChunker::new(256, 50)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct FixedSizeChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl FixedSizeChunker {
    /// Create a new `FixedSizeChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }
}

impl Chunker for FixedSizeChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = CharText::new(&document.text);
        let spans =
            window_spans(text.len(), self.chunk_size, self.chunk_overlap, |_, hard_end| hard_end);
        build_chunks(document, &text, spans)
    }
}

/// Splits text into overlapping windows that prefer to end on a boundary.
///
/// Each window end is moved back to just after the highest-priority separator
/// (`"\n\n"`, `"\n"`, `". "`, `" "`) found in the second half of the window.
/// When the window has no such separator the hard edge is used, so a single
/// very long word is still cut.
///
/// # Example
///
/// ```rust,ignore
/// use parlance_rag::SeparatorChunker;
///
/// let chunker = SeparatorChunker::new(1000, 200)?;
/// let chunks = chunker.chunk(&document);
/// ```
#[derive(Debug, Clone)]
pub struct SeparatorChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl SeparatorChunker {
    /// Create a new `SeparatorChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of characters per chunk
    /// * `chunk_overlap`: number of overlapping characters between consecutive chunks
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        validate_chunking(chunk_size, chunk_overlap)?;
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Latest boundary in `[min_end, hard_end]`, trying separators by priority.
    fn boundary_end(&self, chars: &[char], start: usize, hard_end: usize) -> usize {
        // The next window starts at `end - overlap`, so `end` must stay past
        // `start + overlap` for the scan to advance.
        let min_end = (start + self.chunk_overlap + 1).max(start + self.chunk_size / 2);

        for separator in SEPARATORS {
            let pattern: Vec<char> = separator.chars().collect();
            let found = (min_end..=hard_end).rev().find(|&cut| {
                cut >= pattern.len() && chars[cut - pattern.len()..cut] == pattern[..]
            });
            if let Some(cut) = found {
                return cut;
            }
        }
        hard_end
    }
}

impl Chunker for SeparatorChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        let text = CharText::new(&document.text);
        let chars: Vec<char> = document.text.chars().collect();
        let spans = window_spans(text.len(), self.chunk_size, self.chunk_overlap, |start, end| {
            self.boundary_end(&chars, start, end)
        });
        build_chunks(document, &text, spans)
    }
}

/// Character-indexed view of a string.
struct CharText<'a> {
    text: &'a str,
    /// Byte offset of every char boundary, including the end of the string.
    offsets: Vec<usize>,
}

impl<'a> CharText<'a> {
    fn new(text: &'a str) -> Self {
        let offsets =
            text.char_indices().map(|(i, _)| i).chain(std::iter::once(text.len())).collect();
        Self { text, offsets }
    }

    fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    fn slice(&self, start: usize, end: usize) -> &'a str {
        &self.text[self.offsets[start]..self.offsets[end]]
    }
}

/// Compute `[start, end)` character spans for a sliding window.
///
/// `pick_end(start, hard_end)` may shorten a window; it must return a value in
/// `(start + overlap, hard_end]`. It is not consulted for the final window.
fn window_spans(
    len: usize,
    size: usize,
    overlap: usize,
    mut pick_end: impl FnMut(usize, usize) -> usize,
) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    if len == 0 {
        return spans;
    }

    let mut start = 0;
    loop {
        let hard_end = (start + size).min(len);
        if hard_end == len {
            spans.push((start, len));
            break;
        }
        let end = pick_end(start, hard_end);
        debug_assert!(end > start + overlap && end <= hard_end);
        spans.push((start, end));
        start = end - overlap;
    }
    spans
}

fn build_chunks(
    document: &Document,
    text: &CharText<'_>,
    spans: Vec<(usize, usize)>,
) -> Vec<Chunk> {
    spans
        .into_iter()
        .enumerate()
        .map(|(chunk_index, (char_start, char_end))| Chunk {
            text: text.slice(char_start, char_end).to_string(),
            source_id: document.source_id.clone(),
            chunk_index,
            char_start,
            char_end,
            metadata: document.metadata.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RagError;

    fn spans(chunks: &[Chunk]) -> Vec<(usize, usize)> {
        chunks.iter().map(|c| (c.char_start, c.char_end)).collect()
    }

    #[test]
    fn fixed_windows_match_worked_example() {
        let chunks = chunk_text("doc.txt", "AAAA BBBB CCCC DDDD", 9, 3).unwrap();
        assert_eq!(spans(&chunks), vec![(0, 9), (6, 15), (12, 19)]);
        assert_eq!(chunks[0].text, "AAAA BBBB");
        assert_eq!(chunks[1].text, "BBB CCCC ");
        assert_eq!(chunks[2].text, "CC DDDD");
        assert_eq!(chunks[2].chunk_index, 2);
        assert_eq!(chunks[2].id(), "doc.txt#2");
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("empty.txt", "", 10, 2).unwrap().is_empty());
        let chunker = SeparatorChunker::new(10, 2).unwrap();
        assert!(chunker.chunk(&Document::new("empty.txt", "")).is_empty());
    }

    #[test]
    fn text_shorter_than_window_is_one_chunk() {
        let chunks = chunk_text("a", "short", 100, 10).unwrap();
        assert_eq!(spans(&chunks), vec![(0, 5)]);
    }

    #[test]
    fn invalid_windows_are_rejected() {
        assert!(matches!(chunk_text("a", "text", 0, 0), Err(RagError::InvalidConfig(_))));
        assert!(matches!(chunk_text("a", "text", 4, 4), Err(RagError::InvalidConfig(_))));
        assert!(SeparatorChunker::new(4, 5).is_err());
    }

    #[test]
    fn offsets_count_characters_not_bytes() {
        let text = "héllo wörld ñandú";
        let chunks = chunk_text("u.txt", text, 6, 2).unwrap();
        for chunk in &chunks {
            let expected: String =
                text.chars().skip(chunk.char_start).take(chunk.char_len()).collect();
            assert_eq!(chunk.text, expected);
            assert!(chunk.char_len() <= 6);
        }
        assert_eq!(chunks.last().unwrap().char_end, text.chars().count());
    }

    #[test]
    fn separator_chunker_prefers_word_boundaries() {
        let doc = Document::new("words.txt", "alpha beta gamma delta epsilon zeta");
        let chunks = SeparatorChunker::new(12, 2).unwrap().chunk(&doc);

        for pair in chunks.windows(2) {
            assert_eq!(pair[0].char_end - pair[1].char_start, 2);
            assert!(pair[0].text.ends_with(' '), "{:?} should end on a space", pair[0].text);
        }
        assert_eq!(chunks.last().unwrap().char_end, doc.text.chars().count());
    }

    #[test]
    fn separator_chunker_prefers_paragraphs_over_words() {
        let doc = Document::new("p.md", "first para here\n\nsecond para text goes on");
        let chunks = SeparatorChunker::new(24, 0).unwrap().chunk(&doc);
        assert_eq!(chunks[0].text, "first para here\n\n");
    }

    #[test]
    fn separator_chunker_falls_back_to_hard_edge() {
        let doc = Document::new("long.txt", "x".repeat(25));
        let chunks = SeparatorChunker::new(10, 3).unwrap().chunk(&doc);
        assert_eq!(spans(&chunks), vec![(0, 10), (7, 17), (14, 24), (21, 25)]);
    }

    #[test]
    fn chunks_inherit_document_metadata() {
        let doc = Document::new("m.txt", "some text to split").with_metadata("lang", "en");
        let chunks = FixedSizeChunker::new(5, 1).unwrap().chunk(&doc);
        assert!(chunks.iter().all(|c| c.metadata.get("lang").map(String::as_str) == Some("en")));
        assert!(chunks.iter().all(|c| c.source_id == "m.txt"));
    }

    #[test]
    fn chunker_from_config_selects_strategy() {
        let config = RagConfig::builder()
            .chunk_size(9)
            .chunk_overlap(3)
            .chunking(ChunkingStrategy::Fixed)
            .build()
            .unwrap();
        let chunker = chunker_from_config(&config).unwrap();
        let chunks = chunker.chunk(&Document::new("d", "AAAA BBBB CCCC DDDD"));
        assert_eq!(spans(&chunks), vec![(0, 9), (6, 15), (12, 19)]);
    }
}
