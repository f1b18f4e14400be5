//! Data types for documents, chunks, and retrieval results.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A source document: raw text plus the file it came from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Source identifier, usually a path relative to the corpus root.
    pub source_id: String,
    /// The text content of the document.
    pub text: String,
    /// Key-value metadata copied onto every chunk.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    /// Create a document with no metadata.
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self { source_id: source_id.into(), text: text.into(), metadata: HashMap::new() }
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A bounded slice of a [`Document`], the unit of retrieval.
///
/// `char_start` and `char_end` are character (not byte) offsets into the
/// parent document's text, half-open.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The text content of the chunk.
    pub text: String,
    /// The parent document's source identifier.
    pub source_id: String,
    /// Position of this chunk within its document, starting at 0.
    pub chunk_index: usize,
    /// First character offset covered by this chunk.
    pub char_start: usize,
    /// One past the last character offset covered by this chunk.
    pub char_end: usize,
    /// Metadata inherited from the parent document.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Chunk {
    /// Stable identifier of the form `{source_id}#{chunk_index}`.
    pub fn id(&self) -> String {
        format!("{}#{}", self.source_id, self.chunk_index)
    }

    /// Number of characters covered.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// A retrieved [`Chunk`] paired with its similarity score.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoredChunk {
    /// Insertion id of the index entry the chunk came from.
    pub entry_id: u64,
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query (higher is more relevant).
    pub score: f32,
}

/// Ranked search hits: descending score, ties by ascending entry id.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RetrievalResult {
    hits: Vec<ScoredChunk>,
}

impl RetrievalResult {
    /// Wrap hits that are already in ranking order.
    pub(crate) fn from_ranked(hits: Vec<ScoredChunk>) -> Self {
        Self { hits }
    }

    /// An empty result.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The hits, best first.
    pub fn hits(&self) -> &[ScoredChunk] {
        &self.hits
    }

    /// The scores, best first.
    pub fn scores(&self) -> Vec<f32> {
        self.hits.iter().map(|hit| hit.score).collect()
    }

    /// Number of hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether no hit was found.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    /// Iterate over the hits, best first.
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredChunk> {
        self.hits.iter()
    }

    /// Drop hits scoring below `threshold`. Ranking order is preserved.
    pub(crate) fn retain_at_least(&mut self, threshold: f32) {
        self.hits.retain(|hit| hit.score >= threshold);
    }

    /// Consume the result, returning the hits.
    pub fn into_hits(self) -> Vec<ScoredChunk> {
        self.hits
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a ScoredChunk;
    type IntoIter = std::slice::Iter<'a, ScoredChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.hits.iter()
    }
}
