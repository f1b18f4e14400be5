//! Configuration for chunking, retrieval, memory and prompt assembly.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default instructions placed at the top of every assembled prompt.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant answering questions about \
the user's documents. Answer using only the retrieved passages and the conversation so far. \
Cite the sources you rely on by their bracketed number. If the passages do not contain the \
answer, say that you don't know instead of guessing.";

/// How documents are cut into chunks.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChunkingStrategy {
    /// Hard character windows.
    Fixed,
    /// Character windows whose end snaps back to the nearest paragraph,
    /// line, sentence or word boundary.
    #[default]
    Separator,
}

/// Configuration parameters for the retrieval pipeline and assistant.
///
/// Every field has a default, so a JSON config file only needs to list the
/// values it overrides.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RagConfig {
    /// Maximum chunk size in characters.
    pub chunk_size: usize,
    /// Number of overlapping characters between consecutive chunks.
    pub chunk_overlap: usize,
    /// Chunk boundary strategy.
    pub chunking: ChunkingStrategy,
    /// Number of top results to return from vector search.
    pub top_k: usize,
    /// Minimum similarity score for results. `0.0` disables filtering.
    pub similarity_threshold: f32,
    /// Number of most recent conversation turns kept per session.
    pub memory_window_size: usize,
    /// Per-turn character cap applied when rendering history.
    pub memory_turn_chars: usize,
    /// Maximum assembled prompt length in characters.
    pub max_context_length: usize,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Language model identifier.
    pub language_model: String,
    /// Number of chunk texts sent to the embedder per request during ingestion.
    pub embed_batch_size: usize,
    /// Upper bound for a single embedder or language model call.
    pub request_timeout_secs: u64,
    /// Rewrite follow-up questions into standalone ones before retrieval.
    pub condense_question: bool,
    /// Instructions placed at the top of every prompt.
    pub system_prompt: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            chunking: ChunkingStrategy::default(),
            top_k: 4,
            similarity_threshold: 0.0,
            memory_window_size: 10,
            memory_turn_chars: 2000,
            max_context_length: 12_000,
            embedding_model: "nomic-embed-text".to_string(),
            language_model: "llama3.2".to_string(),
            embed_batch_size: 32,
            request_timeout_secs: 120,
            condense_question: true,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Read a JSON config file and validate it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the file cannot be read and
    /// [`RagError::InvalidConfig`] if it does not parse or fails validation.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| RagError::io(path, e))?;
        let config: RagConfig = serde_json::from_str(&raw).map_err(|e| {
            RagError::InvalidConfig(format!("failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// The per-call deadline for embedder and language model requests.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Check that all parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] if:
    /// - `chunk_size == 0` or `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `similarity_threshold` is not a finite value in `0.0..=1.0`
    /// - `memory_turn_chars`, `max_context_length`, `embed_batch_size` or
    ///   `request_timeout_secs` is zero
    /// - a model identifier is blank
    pub fn validate(&self) -> Result<()> {
        validate_chunking(self.chunk_size, self.chunk_overlap)?;
        if self.top_k == 0 {
            return Err(RagError::InvalidConfig("top_k must be greater than zero".to_string()));
        }
        if !self.similarity_threshold.is_finite()
            || !(0.0..=1.0).contains(&self.similarity_threshold)
        {
            return Err(RagError::InvalidConfig(format!(
                "similarity_threshold ({}) must be between 0.0 and 1.0",
                self.similarity_threshold
            )));
        }
        if self.memory_turn_chars == 0 {
            return Err(RagError::InvalidConfig(
                "memory_turn_chars must be greater than zero".to_string(),
            ));
        }
        if self.max_context_length == 0 {
            return Err(RagError::InvalidConfig(
                "max_context_length must be greater than zero".to_string(),
            ));
        }
        if self.embed_batch_size == 0 {
            return Err(RagError::InvalidConfig(
                "embed_batch_size must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(RagError::InvalidConfig(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.embedding_model.trim().is_empty() {
            return Err(RagError::InvalidConfig("embedding_model must not be blank".to_string()));
        }
        if self.language_model.trim().is_empty() {
            return Err(RagError::InvalidConfig("language_model must not be blank".to_string()));
        }
        Ok(())
    }
}

/// Check the chunk window parameters shared by every chunker.
pub(crate) fn validate_chunking(chunk_size: usize, chunk_overlap: usize) -> Result<()> {
    if chunk_size == 0 {
        return Err(RagError::InvalidConfig("chunk_size must be greater than zero".to_string()));
    }
    if chunk_overlap >= chunk_size {
        return Err(RagError::InvalidConfig(format!(
            "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
        )));
    }
    Ok(())
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the chunk boundary strategy.
    pub fn chunking(mut self, strategy: ChunkingStrategy) -> Self {
        self.config.chunking = strategy;
        self
    }

    /// Set the number of top results to return from vector search.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the minimum similarity threshold for filtering results.
    pub fn similarity_threshold(mut self, threshold: f32) -> Self {
        self.config.similarity_threshold = threshold;
        self
    }

    /// Set how many recent turns each session remembers.
    pub fn memory_window_size(mut self, turns: usize) -> Self {
        self.config.memory_window_size = turns;
        self
    }

    /// Set the per-turn character cap used when rendering history.
    pub fn memory_turn_chars(mut self, chars: usize) -> Self {
        self.config.memory_turn_chars = chars;
        self
    }

    /// Set the maximum assembled prompt length in characters.
    pub fn max_context_length(mut self, chars: usize) -> Self {
        self.config.max_context_length = chars;
        self
    }

    /// Set the embedding model identifier.
    pub fn embedding_model(mut self, model: impl Into<String>) -> Self {
        self.config.embedding_model = model.into();
        self
    }

    /// Set the language model identifier.
    pub fn language_model(mut self, model: impl Into<String>) -> Self {
        self.config.language_model = model.into();
        self
    }

    /// Set the ingestion embedding batch size.
    pub fn embed_batch_size(mut self, size: usize) -> Self {
        self.config.embed_batch_size = size;
        self
    }

    /// Set the per-call timeout in seconds.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Enable or disable follow-up question condensing.
    pub fn condense_question(mut self, enabled: bool) -> Self {
        self.config.condense_question = enabled;
        self
    }

    /// Replace the system instructions.
    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidConfig`] under the rules of [`RagConfig::validate`].
    pub fn build(self) -> Result<RagConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
