//! Query-time retrieval: embed the question, search the active index.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::RagConfig;
use crate::deadline::bounded;
use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::IndexHandle;

/// Embeds queries and searches the current index snapshot.
///
/// A retriever is cheap to clone and shares its [`IndexHandle`] with the
/// [`KnowledgeBase`](crate::KnowledgeBase) that created it, so it always sees
/// the most recently published index.
pub struct Retriever<E: EmbeddingProvider> {
    embedder: Arc<E>,
    index: IndexHandle,
    similarity_threshold: f32,
    request_timeout: Duration,
}

impl<E: EmbeddingProvider> Clone for Retriever<E> {
    fn clone(&self) -> Self {
        Self {
            embedder: Arc::clone(&self.embedder),
            index: self.index.clone(),
            similarity_threshold: self.similarity_threshold,
            request_timeout: self.request_timeout,
        }
    }
}

impl<E: EmbeddingProvider> Retriever<E> {
    /// Create a retriever over `index` using the threshold and timeout in `config`.
    pub fn new(embedder: Arc<E>, index: IndexHandle, config: &RagConfig) -> Self {
        Self {
            embedder,
            index,
            similarity_threshold: config.similarity_threshold,
            request_timeout: config.request_timeout(),
        }
    }

    /// The minimum score a hit needs to be returned. `0.0` means no filtering.
    pub fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    /// Return up to `k` passages relevant to `query`.
    ///
    /// Hits scoring below the similarity threshold are dropped even when they
    /// are in the top `k`.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidArgument`] for a blank query or `k == 0`
    /// - embedder errors, unchanged
    /// - [`RagError::Cancelled`] if `cancel` fires or the embedder times out
    /// - [`RagError::DimensionMismatch`] if the embedder no longer matches the index
    pub async fn retrieve(
        &self,
        query: &str,
        k: usize,
        cancel: &CancellationToken,
    ) -> Result<RetrievalResult> {
        if query.trim().is_empty() {
            return Err(RagError::InvalidArgument("query must not be empty".to_string()));
        }
        if k == 0 {
            return Err(RagError::InvalidArgument("k must be greater than zero".to_string()));
        }

        let snapshot = self.index.snapshot();
        let query_embedding =
            bounded("query embedding", self.request_timeout, cancel, self.embedder.embed(query))
                .await
                .inspect_err(|e| error!(error = %e, "embedding failed during query"))?;

        let mut results = snapshot
            .search_cancellable(&query_embedding, k, cancel)
            .inspect_err(|e| error!(error = %e, "index search failed"))?;

        let before = results.len();
        if self.similarity_threshold > 0.0 {
            results.retain_at_least(self.similarity_threshold);
        }

        info!(
            k,
            index_entries = snapshot.len(),
            result_count = results.len(),
            below_threshold = before - results.len(),
            "query completed"
        );
        Ok(results)
    }
}
