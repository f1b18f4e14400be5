//! Corpus ingestion and index lifecycle.
//!
//! The [`KnowledgeBase`] turns documents into a [`VectorIndex`]
//! (chunk → embed in batches → insert) and publishes it through an
//! [`IndexHandle`]. A new index is always built off to the side and swapped
//! in only once it is complete, so queries running during ingestion keep
//! searching the previous snapshot and a failed or cancelled ingestion leaves
//! no trace.
//!
//! # Example
//!
//! ```rust,ignore
//! use parlance_rag::{KnowledgeBase, RagConfig};
//!
//! let kb = KnowledgeBase::new(RagConfig::default(), Arc::new(embedder))?;
//! let report = kb.rebuild(&documents, &CancellationToken::new()).await?;
//! kb.save("knowledge_base/index.json")?;
//! ```

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::chunking::{Chunker, chunker_from_config};
use crate::config::RagConfig;
use crate::deadline::bounded;
use crate::document::{Chunk, Document};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::index::{IndexHandle, VectorIndex};
use crate::retriever::Retriever;

/// Summary of one ingestion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// Documents that produced at least one chunk.
    pub documents: usize,
    /// Documents skipped because their text was empty.
    pub skipped_empty: usize,
    /// Chunks embedded and inserted by this run.
    pub chunks: usize,
    /// Entries dropped because their source was ingested again.
    pub replaced: usize,
    /// Entries in the published index after the run.
    pub total_entries: usize,
}

/// Owns the embedder, the chunker and the active index of one corpus.
pub struct KnowledgeBase<E: EmbeddingProvider> {
    config: RagConfig,
    embedder: Arc<E>,
    chunker: Arc<dyn Chunker>,
    index: IndexHandle,
    ingest_lock: Mutex<()>,
}

impl<E: EmbeddingProvider> KnowledgeBase<E> {
    /// Create a knowledge base with an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if `config` is invalid or the
    /// embedder reports zero dimensions.
    pub fn new(config: RagConfig, embedder: Arc<E>) -> Result<Self> {
        config.validate()?;
        let chunker = chunker_from_config(&config)?;
        let index = VectorIndex::new(embedder.dimensions(), embedder.model_name())?;
        if embedder.model_name() != config.embedding_model {
            debug!(
                configured = %config.embedding_model,
                provider = embedder.model_name(),
                "embedder model differs from configured embedding_model"
            );
        }
        Ok(Self {
            config,
            embedder,
            chunker,
            index: IndexHandle::new(index),
            ingest_lock: Mutex::new(()),
        })
    }

    /// Replace the chunker selected by the config.
    pub fn with_chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = chunker;
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// The embedding provider.
    pub fn embedder(&self) -> &Arc<E> {
        &self.embedder
    }

    /// The shared handle to the active index.
    pub fn index_handle(&self) -> &IndexHandle {
        &self.index
    }

    /// The currently published index.
    pub fn snapshot(&self) -> Arc<VectorIndex> {
        self.index.snapshot()
    }

    /// A retriever over this knowledge base's active index.
    pub fn retriever(&self) -> Retriever<E> {
        Retriever::new(Arc::clone(&self.embedder), self.index.clone(), &self.config)
    }

    /// Replace the corpus: build a fresh index from `documents` and publish it.
    ///
    /// # Errors
    ///
    /// Returns embedder errors (with the failing document named),
    /// [`RagError::DimensionMismatch`] or [`RagError::Cancelled`]. On error the
    /// previously published index stays active. A batch that repeats a
    /// `source_id` is rejected with [`RagError::InvalidArgument`].
    pub async fn rebuild(
        &self,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        check_unique_sources(documents)?;
        let _guard = self.ingest_lock.lock().await;
        let mut index = VectorIndex::new(self.embedder.dimensions(), self.embedder.model_name())?;
        let report = self.ingest_into(&mut index, documents, cancel).await?;
        self.publish(index, report)
    }

    /// Add `documents` to the current corpus and publish the result.
    ///
    /// The active index is copied, extended and swapped in, so readers never
    /// observe a partially extended index. A document whose `source_id` is
    /// already indexed replaces the passages previously stored for it.
    ///
    /// # Errors
    ///
    /// As for [`rebuild`](Self::rebuild).
    pub async fn add_documents(
        &self,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        check_unique_sources(documents)?;
        let _guard = self.ingest_lock.lock().await;
        let mut index = VectorIndex::clone(&self.index.snapshot());

        let mut replaced = 0;
        for document in documents {
            let removed = index.remove_source(&document.source_id);
            if removed > 0 {
                debug!(source_id = %document.source_id, removed, "replacing indexed source");
                replaced += removed;
            }
        }

        let mut report = self.ingest_into(&mut index, documents, cancel).await?;
        report.replaced = replaced;
        self.publish(index, report)
    }

    /// Persist the active index to `path`.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let snapshot = self.index.snapshot();
        snapshot.save(path.as_ref())?;
        info!(path = %path.as_ref().display(), entries = snapshot.len(), "index saved");
        Ok(())
    }

    /// Load a persisted index and publish it, returning its entry count.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file cannot be read and
    /// [`RagError::CorruptIndex`] if it cannot be decoded or was built for a
    /// different embedding dimension.
    pub async fn load(&self, path: impl AsRef<Path>) -> Result<usize> {
        let path = path.as_ref();
        let _guard = self.ingest_lock.lock().await;
        let index = VectorIndex::load(path, self.embedder.dimensions())
            .inspect_err(|e| error!(path = %path.display(), error = %e, "failed to load index"))?;

        if index.embedding_model() != self.embedder.model_name() {
            warn!(
                path = %path.display(),
                stored = index.embedding_model(),
                current = self.embedder.model_name(),
                "index was built with a different embedding model; consider rebuilding"
            );
        }

        let entries = index.len();
        self.index.swap(index);
        info!(path = %path.display(), entries, "index loaded");
        Ok(entries)
    }

    /// Load `path` if it exists. Returns whether an index was loaded.
    ///
    /// # Errors
    ///
    /// As for [`load`](Self::load), except that a missing file is not an error.
    pub async fn load_if_exists(&self, path: impl AsRef<Path>) -> Result<bool> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(path = %path.display(), "no persisted index");
            return Ok(false);
        }
        self.load(path).await?;
        Ok(true)
    }

    fn publish(&self, index: VectorIndex, mut report: IngestReport) -> Result<IngestReport> {
        report.total_entries = index.len();
        self.index.swap(index);
        info!(
            documents = report.documents,
            skipped_empty = report.skipped_empty,
            chunks = report.chunks,
            replaced = report.replaced,
            total_entries = report.total_entries,
            "index published"
        );
        Ok(report)
    }

    async fn ingest_into(
        &self,
        index: &mut VectorIndex,
        documents: &[Document],
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let mut report = IngestReport::default();

        for document in documents {
            let chunks = self.chunker.chunk(document);
            if chunks.is_empty() {
                debug!(source_id = %document.source_id, "skipping empty document");
                report.skipped_empty += 1;
                continue;
            }

            let chunk_count = chunks.len();
            self.embed_and_insert(index, document, chunks, cancel).await?;
            report.documents += 1;
            report.chunks += chunk_count;
            info!(source_id = %document.source_id, chunk_count, "ingested document");
        }

        Ok(report)
    }

    async fn embed_and_insert(
        &self,
        index: &mut VectorIndex,
        document: &Document,
        chunks: Vec<Chunk>,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let timeout = self.config.request_timeout();
        let mut pending = chunks.into_iter().peekable();

        while pending.peek().is_some() {
            let batch: Vec<Chunk> = pending.by_ref().take(self.config.embed_batch_size).collect();
            let texts: Vec<&str> = batch.iter().map(|c| c.text.as_str()).collect();
            let first = batch[0].chunk_index;
            let last = batch[batch.len() - 1].chunk_index;
            debug!(source_id = %document.source_id, first, last, "embedding batch");

            let embeddings =
                bounded("ingestion embedding", timeout, cancel, self.embedder.embed_batch(&texts))
                    .await
                    .map_err(|e| {
                        error!(
                            source_id = %document.source_id,
                            error = %e,
                            "embedding failed during ingestion"
                        );
                        with_document_context(e, &document.source_id, first, last)
                    })?;

            if embeddings.len() != batch.len() {
                return Err(RagError::EmbeddingUnavailable {
                    provider: self.embedder.model_name().to_string(),
                    message: format!(
                        "returned {} embeddings for {} chunks of '{}'",
                        embeddings.len(),
                        batch.len(),
                        document.source_id
                    ),
                });
            }

            for (chunk, embedding) in batch.into_iter().zip(embeddings) {
                index.insert(chunk, embedding)?;
            }
        }
        Ok(())
    }
}

/// Name the document and chunk range in an embedder failure.
fn with_document_context(err: RagError, source_id: &str, first: usize, last: usize) -> RagError {
    match err {
        RagError::EmbeddingUnavailable { provider, message } => RagError::EmbeddingUnavailable {
            provider,
            message: format!("{message} (document '{source_id}', chunks {first}..={last})"),
        },
        RagError::Cancelled { operation, reason } => RagError::Cancelled {
            operation: format!("{operation} of '{source_id}'"),
            reason,
        },
        other => other,
    }
}

fn check_unique_sources(documents: &[Document]) -> Result<()> {
    let mut seen = HashSet::with_capacity(documents.len());
    let mut repeated: Vec<&str> = documents
        .iter()
        .map(|d| d.source_id.as_str())
        .filter(|id| !seen.insert(*id))
        .collect();
    if repeated.is_empty() {
        return Ok(());
    }
    repeated.sort_unstable();
    repeated.dedup();
    Err(RagError::InvalidArgument(format!(
        "documents repeat source ids: {}",
        repeated.join(", ")
    )))
}
