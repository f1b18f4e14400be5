//! Exact in-memory vector index using cosine similarity.
//!
//! [`VectorIndex`] is append-only: a corpus change builds a new index which is
//! then published through an [`IndexHandle`]. Readers take an `Arc` snapshot
//! and search it without holding any lock, so a rebuild never blocks or
//! disturbs an in-flight query.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::document::{Chunk, RetrievalResult, ScoredChunk};
use crate::embedding::check_dimensions;
use crate::error::{RagError, Result};

/// Format tag written at the top of every persisted index.
const FORMAT_TAG: &str = "parlance-vector-index";
/// Current persisted format version.
const FORMAT_VERSION: u32 = 1;
/// How many entries are scored between cancellation checks.
const CANCEL_CHECK_INTERVAL: usize = 1024;

/// A stored chunk, its embedding and its insertion id.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    id: u64,
    chunk: Chunk,
    embedding: Vec<f32>,
    norm: f64,
}

impl IndexEntry {
    /// Insertion id, unique and increasing within one index.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The stored chunk.
    pub fn chunk(&self) -> &Chunk {
        &self.chunk
    }

    /// The stored embedding.
    pub fn embedding(&self) -> &[f32] {
        &self.embedding
    }
}

/// An exact nearest-neighbour index over chunk embeddings.
///
/// All embeddings share the dimension given at construction. Search scores
/// every entry with cosine similarity (zero-magnitude vectors score `0.0`) and
/// returns the top `k` by descending score, ties broken by ascending
/// insertion id.
///
/// # Example
///
/// ```rust,ignore
/// use parlance_rag::VectorIndex;
///
/// let mut index = VectorIndex::new(768, "nomic-embed-text")?;
/// let id = index.insert(chunk, embedding)?;
/// let results = index.search(&query_embedding, 5)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimensions: usize,
    embedding_model: String,
    entries: Vec<IndexEntry>,
    next_id: u64,
}

impl VectorIndex {
    /// Create an empty index for vectors of the given dimension.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if `dimensions` is zero.
    pub fn new(dimensions: usize, embedding_model: impl Into<String>) -> Result<Self> {
        if dimensions == 0 {
            return Err(RagError::InvalidConfig(
                "index dimensions must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            dimensions,
            embedding_model: embedding_model.into(),
            entries: Vec::new(),
            next_id: 0,
        })
    }

    /// The embedding dimension every entry shares.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The embedding model the index was built with.
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The stored entries in insertion order.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Append a chunk and its embedding, returning the new entry id.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::DimensionMismatch`] if the embedding has the wrong
    /// length and [`RagError::InvalidArgument`] if it contains a non-finite value.
    pub fn insert(&mut self, chunk: Chunk, embedding: Vec<f32>) -> Result<u64> {
        check_dimensions(self.dimensions, &embedding, || format!("chunk {}", chunk.id()))?;
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(RagError::InvalidArgument(format!(
                "embedding for chunk {} contains a non-finite value",
                chunk.id()
            )));
        }

        let id = self.next_id;
        let norm = l2_norm(&embedding);
        self.entries.push(IndexEntry { id, chunk, embedding, norm });
        self.next_id += 1;
        Ok(id)
    }

    /// Drop every entry whose chunk came from `source_id`, returning how many
    /// were removed. Ids are never reused.
    pub fn remove_source(&mut self, source_id: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| entry.chunk.source_id != source_id);
        before - self.entries.len()
    }

    /// Return the `k` entries most similar to `query`.
    ///
    /// An empty index yields an empty result.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if `k == 0` or the query contains a
    /// non-finite value, and [`RagError::DimensionMismatch`] if the query has
    /// the wrong length.
    pub fn search(&self, query: &[f32], k: usize) -> Result<RetrievalResult> {
        self.search_inner(query, k, None)
    }

    /// Like [`search`](Self::search), checking `cancel` periodically during the scan.
    ///
    /// # Errors
    ///
    /// Additionally returns [`RagError::Cancelled`] once the token fires.
    pub fn search_cancellable(
        &self,
        query: &[f32],
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<RetrievalResult> {
        self.search_inner(query, k, Some(cancel))
    }

    fn search_inner(
        &self,
        query: &[f32],
        k: usize,
        cancel: Option<&CancellationToken>,
    ) -> Result<RetrievalResult> {
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be greater than zero".to_string()));
        }
        check_dimensions(self.dimensions, query, || "query".to_string())?;
        if query.iter().any(|v| !v.is_finite()) {
            return Err(RagError::InvalidArgument(
                "query embedding contains a non-finite value".to_string(),
            ));
        }

        let query_norm = l2_norm(query);
        let mut heap: BinaryHeap<Candidate> =
            BinaryHeap::with_capacity(k.min(self.entries.len()) + 1);

        for (position, entry) in self.entries.iter().enumerate() {
            if position % CANCEL_CHECK_INTERVAL == 0 && cancel.is_some_and(|c| c.is_cancelled()) {
                return Err(RagError::Cancelled {
                    operation: "search".to_string(),
                    reason: "cancellation requested".to_string(),
                });
            }

            let score = cosine_similarity(query, query_norm, &entry.embedding, entry.norm);
            heap.push(Candidate { score, id: entry.id, position });
            if heap.len() > k {
                heap.pop();
            }
        }

        let hits = heap
            .into_sorted_vec()
            .into_iter()
            .map(|candidate| {
                let entry = &self.entries[candidate.position];
                ScoredChunk {
                    entry_id: entry.id,
                    chunk: entry.chunk.clone(),
                    score: candidate.score,
                }
            })
            .collect::<Vec<_>>();

        debug!(entries = self.entries.len(), k, hits = hits.len(), "index search completed");
        Ok(RetrievalResult::from_ranked(hits))
    }

    /// Serialize the index to a self-describing byte blob.
    ///
    /// Embeddings are written as IEEE-754 bit patterns, so
    /// [`from_bytes`](Self::from_bytes) restores them exactly.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorruptIndex`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let file = IndexFileRef {
            format: FORMAT_TAG,
            version: FORMAT_VERSION,
            dimensions: self.dimensions,
            embedding_model: &self.embedding_model,
            next_id: self.next_id,
            entries: self
                .entries
                .iter()
                .map(|entry| StoredEntryRef {
                    id: entry.id,
                    chunk: &entry.chunk,
                    embedding: entry.embedding.iter().map(|v| v.to_bits()).collect(),
                })
                .collect(),
        };
        serde_json::to_vec(&file)
            .map_err(|e| RagError::CorruptIndex(format!("failed to encode index: {e}")))
    }

    /// Decode a blob produced by [`to_bytes`](Self::to_bytes).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::CorruptIndex`] if the blob is malformed, has an
    /// unknown format or version, was built for a dimension other than
    /// `expected_dimensions`, or violates an index invariant.
    pub fn from_bytes(bytes: &[u8], expected_dimensions: usize) -> Result<Self> {
        let file: IndexFile = serde_json::from_slice(bytes)
            .map_err(|e| RagError::CorruptIndex(format!("failed to decode index: {e}")))?;

        if file.format != FORMAT_TAG {
            return Err(RagError::CorruptIndex(format!("unknown format tag '{}'", file.format)));
        }
        if file.version != FORMAT_VERSION {
            return Err(RagError::CorruptIndex(format!(
                "unsupported format version {} (expected {FORMAT_VERSION})",
                file.version
            )));
        }
        if file.dimensions != expected_dimensions {
            return Err(RagError::CorruptIndex(format!(
                "index was built with dimension {}, embedder produces {expected_dimensions}",
                file.dimensions
            )));
        }

        let mut index = VectorIndex::new(file.dimensions, file.embedding_model)
            .map_err(|e| RagError::CorruptIndex(e.to_string()))?;
        let mut previous: Option<u64> = None;

        for stored in file.entries {
            if previous.is_some_and(|p| stored.id <= p) {
                return Err(RagError::CorruptIndex(format!(
                    "entry ids are not strictly increasing at id {}",
                    stored.id
                )));
            }
            if stored.chunk.char_end < stored.chunk.char_start {
                return Err(RagError::CorruptIndex(format!(
                    "chunk {} has an inverted character range",
                    stored.chunk.id()
                )));
            }
            let embedding: Vec<f32> = stored.embedding.into_iter().map(f32::from_bits).collect();
            if embedding.len() != index.dimensions {
                return Err(RagError::CorruptIndex(format!(
                    "entry {} has {} values, expected {}",
                    stored.id,
                    embedding.len(),
                    index.dimensions
                )));
            }
            if embedding.iter().any(|v| !v.is_finite()) {
                return Err(RagError::CorruptIndex(format!(
                    "entry {} contains a non-finite value",
                    stored.id
                )));
            }

            previous = Some(stored.id);
            let norm = l2_norm(&embedding);
            index.entries.push(IndexEntry { id: stored.id, chunk: stored.chunk, embedding, norm });
        }

        if previous.is_some_and(|p| file.next_id <= p) {
            return Err(RagError::CorruptIndex(format!(
                "next id {} does not follow the last entry id",
                file.next_id
            )));
        }
        index.next_id = file.next_id;
        Ok(index)
    }

    /// Write the index to `path`, replacing any existing file atomically.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| RagError::io(parent, e))?;
        }

        let bytes = self.to_bytes()?;
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = std::path::PathBuf::from(tmp);

        std::fs::write(&tmp, &bytes).map_err(|e| RagError::io(&tmp, e))?;
        std::fs::rename(&tmp, path).map_err(|e| RagError::io(path, e))?;
        debug!(path = %path.display(), bytes = bytes.len(), entries = self.len(), "index saved");
        Ok(())
    }

    /// Read an index written by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file cannot be read, otherwise the
    /// errors of [`from_bytes`](Self::from_bytes).
    pub fn load(path: impl AsRef<Path>, expected_dimensions: usize) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| RagError::io(path, e))?;
        Self::from_bytes(&bytes, expected_dimensions)
    }
}

/// Shared pointer to the active [`VectorIndex`] snapshot.
///
/// Cloning the handle shares the same slot. [`snapshot`](Self::snapshot)
/// returns the current index; [`swap`](Self::swap) publishes a new one.
/// Readers holding an older snapshot keep using it until they drop it.
#[derive(Debug, Clone)]
pub struct IndexHandle {
    current: Arc<RwLock<Arc<VectorIndex>>>,
}

impl IndexHandle {
    /// Create a handle publishing `index`.
    pub fn new(index: VectorIndex) -> Self {
        Self { current: Arc::new(RwLock::new(Arc::new(index))) }
    }

    /// The currently published index.
    pub fn snapshot(&self) -> Arc<VectorIndex> {
        self.current.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Publish `index`, returning the previously published one.
    pub fn swap(&self, index: VectorIndex) -> Arc<VectorIndex> {
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, Arc::new(index))
    }
}

/// A scored entry awaiting top-k selection.
///
/// Ordered so that the *worst* candidate is the greatest, which lets a
/// max-heap evict it first and `into_sorted_vec` yield best-first order.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    score: f32,
    id: u64,
    position: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        // Scores are never NaN here, and -0.0 must tie with 0.0.
        other
            .score
            .partial_cmp(&self.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

// Accumulated in f64: squares of any finite f32 neither overflow nor
// underflow to zero there.
fn l2_norm(v: &[f32]) -> f64 {
    v.iter().map(|&x| f64::from(x) * f64::from(x)).sum::<f64>().sqrt()
}

/// Cosine similarity given precomputed norms.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], norm_a: f64, b: &[f32], norm_b: f64) -> f32 {
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| f64::from(x) * f64::from(y)).sum();
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0) as f32
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    format: &'a str,
    version: u32,
    dimensions: usize,
    embedding_model: &'a str,
    next_id: u64,
    entries: Vec<StoredEntryRef<'a>>,
}

#[derive(Serialize)]
struct StoredEntryRef<'a> {
    id: u64,
    chunk: &'a Chunk,
    embedding: Vec<u32>,
}

#[derive(Deserialize)]
struct IndexFile {
    format: String,
    version: u32,
    dimensions: usize,
    embedding_model: String,
    next_id: u64,
    entries: Vec<StoredEntry>,
}

#[derive(Deserialize)]
struct StoredEntry {
    id: u64,
    chunk: Chunk,
    embedding: Vec<u32>,
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn chunk(source: &str, index: usize) -> Chunk {
        Chunk {
            text: format!("{source} passage {index}"),
            source_id: source.to_string(),
            chunk_index: index,
            char_start: index * 10,
            char_end: index * 10 + 10,
            metadata: HashMap::new(),
        }
    }

    fn unit(cos: f32) -> Vec<f32> {
        vec![cos, (1.0 - cos * cos).sqrt()]
    }

    #[test]
    fn ties_are_broken_by_insertion_order() {
        let mut index = VectorIndex::new(2, "test").unwrap();
        let a = index.insert(chunk("a.txt", 0), unit(0.9)).unwrap();
        let b = index.insert(chunk("b.txt", 0), unit(0.5)).unwrap();
        let c = index.insert(chunk("c.txt", 0), unit(0.5)).unwrap();

        let result = index.search(&[1.0, 0.0], 3).unwrap();
        let ids: Vec<u64> = result.iter().map(|hit| hit.entry_id).collect();
        assert_eq!(ids, vec![a, b, c]);

        let scores = result.scores();
        assert!((scores[0] - 0.9).abs() < 1e-6);
        assert_eq!(scores[1], scores[2]);
        assert!(scores[0] > scores[1]);
    }

    #[test]
    fn search_truncates_to_k() {
        let mut index = VectorIndex::new(2, "test").unwrap();
        for (i, cos) in [0.1, 0.8, 0.3, 0.95, 0.5].into_iter().enumerate() {
            index.insert(chunk("doc", i), unit(cos)).unwrap();
        }
        let result = index.search(&[1.0, 0.0], 2).unwrap();
        let indexes: Vec<usize> = result.iter().map(|hit| hit.chunk.chunk_index).collect();
        assert_eq!(indexes, vec![3, 1]);
    }

    #[test]
    fn empty_index_returns_empty_result() {
        let index = VectorIndex::new(3, "test").unwrap();
        let result = index.search(&[1.0, 0.0, 0.0], 5).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn rejects_zero_k_and_wrong_dimensions() {
        let mut index = VectorIndex::new(2, "test").unwrap();
        assert!(matches!(index.search(&[1.0, 0.0], 0), Err(RagError::InvalidArgument(_))));
        assert!(matches!(
            index.search(&[1.0, 0.0, 0.0], 1),
            Err(RagError::DimensionMismatch { expected: 2, actual: 3, .. })
        ));
        assert!(matches!(
            index.insert(chunk("x", 0), vec![1.0]),
            Err(RagError::DimensionMismatch { expected: 2, actual: 1, .. })
        ));
        assert!(index.insert(chunk("x", 0), vec![f32::NAN, 1.0]).is_err());
        assert!(index.is_empty());
        assert!(VectorIndex::new(0, "test").is_err());
    }

    #[test]
    fn zero_vectors_score_zero() {
        let mut index = VectorIndex::new(2, "test").unwrap();
        index.insert(chunk("zero", 0), vec![0.0, 0.0]).unwrap();
        let result = index.search(&[1.0, 1.0], 1).unwrap();
        assert_eq!(result.scores(), vec![0.0]);
        let result = index.search(&[0.0, 0.0], 1).unwrap();
        assert_eq!(result.scores(), vec![0.0]);
    }

    #[test]
    fn identical_vectors_rank_first_at_extreme_magnitudes() {
        for magnitude in [1e20_f32, 1e-25, 3e38] {
            let mut index = VectorIndex::new(2, "test").unwrap();
            index.insert(chunk("near.txt", 0), unit(0.6)).unwrap();
            let same = index
                .insert(chunk("same.txt", 0), vec![magnitude, magnitude])
                .unwrap();

            let result = index.search(&[magnitude, magnitude], 2).unwrap();
            assert_eq!(result.hits()[0].entry_id, same, "magnitude {magnitude}");
            assert!((result.scores()[0] - 1.0).abs() < 1e-6, "magnitude {magnitude}");
        }
    }

    #[test]
    fn removing_a_source_keeps_other_entries_and_ids() {
        let mut index = VectorIndex::new(2, "test").unwrap();
        index.insert(chunk("a.txt", 0), unit(0.9)).unwrap();
        let kept = index.insert(chunk("b.txt", 0), unit(0.5)).unwrap();
        index.insert(chunk("a.txt", 1), unit(0.3)).unwrap();

        assert_eq!(index.remove_source("a.txt"), 2);
        assert_eq!(index.remove_source("missing.txt"), 0);
        let ids: Vec<u64> = index.entries().iter().map(|e| e.id()).collect();
        assert_eq!(ids, vec![kept]);
        assert_eq!(index.insert(chunk("a.txt", 0), unit(0.9)).unwrap(), 3);
    }

    #[test]
    fn cancelled_search_fails() {
        let mut index = VectorIndex::new(2, "test").unwrap();
        index.insert(chunk("doc", 0), unit(0.5)).unwrap();
        let token = CancellationToken::new();
        token.cancel();
        assert!(matches!(
            index.search_cancellable(&[1.0, 0.0], 1, &token),
            Err(RagError::Cancelled { .. })
        ));
        let live = CancellationToken::new();
        assert_eq!(index.search_cancellable(&[1.0, 0.0], 1, &live).unwrap().len(), 1);
    }

    #[test]
    fn round_trip_preserves_entries_exactly() {
        let mut index = VectorIndex::new(3, "nomic-embed-text").unwrap();
        index.insert(chunk("a", 0), vec![0.1, -0.2, 0.3]).unwrap();
        index.insert(chunk("a", 1), vec![1.0e-7, 3.402_823_5e38, -0.0]).unwrap();

        let bytes = index.to_bytes().unwrap();
        let restored = VectorIndex::from_bytes(&bytes, 3).unwrap();
        assert_eq!(restored, index);
        assert_eq!(restored.embedding_model(), "nomic-embed-text");

        let query = [0.3, 0.2, 0.1];
        assert_eq!(restored.search(&query, 2).unwrap(), index.search(&query, 2).unwrap());
    }

    #[test]
    fn restored_index_keeps_assigning_fresh_ids() {
        let mut index = VectorIndex::new(2, "test").unwrap();
        index.insert(chunk("a", 0), unit(0.2)).unwrap();
        let mut restored = VectorIndex::from_bytes(&index.to_bytes().unwrap(), 2).unwrap();
        assert_eq!(restored.insert(chunk("a", 1), unit(0.4)).unwrap(), 1);
    }

    #[test]
    fn decoding_rejects_corrupt_blobs() {
        let mut index = VectorIndex::new(2, "test").unwrap();
        index.insert(chunk("a", 0), unit(0.2)).unwrap();
        index.insert(chunk("a", 1), unit(0.4)).unwrap();
        let bytes = index.to_bytes().unwrap();

        assert!(matches!(VectorIndex::from_bytes(&bytes, 3), Err(RagError::CorruptIndex(_))));
        assert!(matches!(VectorIndex::from_bytes(b"{not json", 2), Err(RagError::CorruptIndex(_))));
        assert!(matches!(
            VectorIndex::from_bytes(&bytes[..bytes.len() / 2], 2),
            Err(RagError::CorruptIndex(_))
        ));

        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["format"] = "something-else".into();
        let tampered = serde_json::to_vec(&value).unwrap();
        assert!(matches!(VectorIndex::from_bytes(&tampered, 2), Err(RagError::CorruptIndex(_))));

        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["entries"][1]["id"] = 0.into();
        let tampered = serde_json::to_vec(&value).unwrap();
        assert!(matches!(VectorIndex::from_bytes(&tampered, 2), Err(RagError::CorruptIndex(_))));

        let mut value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["entries"][0]["embedding"] = serde_json::json!([1]);
        let tampered = serde_json::to_vec(&value).unwrap();
        assert!(matches!(VectorIndex::from_bytes(&tampered, 2), Err(RagError::CorruptIndex(_))));
    }

    #[test]
    fn save_and_load_through_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("index.json");

        let mut index = VectorIndex::new(2, "test").unwrap();
        index.insert(chunk("a", 0), unit(0.7)).unwrap();
        index.save(&path).unwrap();

        let loaded = VectorIndex::load(&path, 2).unwrap();
        assert_eq!(loaded, index);
        assert!(matches!(
            VectorIndex::load(dir.path().join("missing.json"), 2),
            Err(RagError::Io { .. })
        ));
    }

    #[test]
    fn handle_swap_leaves_old_snapshots_intact() {
        let mut first = VectorIndex::new(2, "test").unwrap();
        first.insert(chunk("old", 0), unit(0.5)).unwrap();
        let handle = IndexHandle::new(first);

        let before = handle.snapshot();
        let previous = handle.swap(VectorIndex::new(2, "test").unwrap());

        assert_eq!(before.len(), 1);
        assert_eq!(previous.len(), 1);
        assert!(handle.snapshot().is_empty());
        assert!(handle.clone().snapshot().is_empty());
    }
}
