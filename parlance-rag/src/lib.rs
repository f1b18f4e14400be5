//! Retrieval-augmented question answering over a local document corpus.
//!
//! This crate provides:
//! - Character-window chunking with overlap (fixed or separator-aware)
//! - A pluggable [`EmbeddingProvider`] and an exact in-memory cosine
//!   [`VectorIndex`] with deterministic ranking and bit-exact persistence
//! - A [`KnowledgeBase`] that builds indexes off to the side and swaps them in
//! - A [`Retriever`] with similarity thresholding and cancellation
//! - Bounded per-session [`ConversationMemory`] and budgeted prompt assembly
//! - An [`Assistant`] tying retrieval, memory and a [`LanguageModel`] together
//!
//! Backends for a local Ollama server live in [`ollama`] behind the `ollama`
//! feature.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use parlance_rag::{Assistant, KnowledgeBase, RagConfig, load_documents};
//! use parlance_rag::ollama::{OllamaChatModel, OllamaEmbeddingProvider};
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel = CancellationToken::new();
//! let kb = KnowledgeBase::new(RagConfig::default(), Arc::new(OllamaEmbeddingProvider::new()))?;
//! kb.rebuild(&load_documents("docs")?, &cancel).await?;
//!
//! let assistant = Assistant::new(&kb, Arc::new(OllamaChatModel::new()));
//! let mut session = assistant.new_session();
//! let answer = assistant.ask(&mut session, "How do I configure chunking?", &cancel).await?;
//! println!("{}", answer.text);
//! ```

pub mod assistant;
pub mod chunking;
pub mod config;
pub mod context;
mod deadline;
pub mod document;
pub mod embedding;
pub mod error;
pub mod index;
pub mod knowledge;
pub mod llm;
pub mod loader;
pub mod memory;
pub mod retriever;

#[cfg(feature = "ollama")]
pub mod ollama;

pub use assistant::{Answer, Assistant, ChatSession};
pub use chunking::{Chunker, FixedSizeChunker, SeparatorChunker, chunk_text, chunker_from_config};
pub use config::{ChunkingStrategy, DEFAULT_SYSTEM_PROMPT, RagConfig, RagConfigBuilder};
pub use context::{AssembledPrompt, ContextAssembler};
pub use document::{Chunk, Document, RetrievalResult, ScoredChunk};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use index::{IndexEntry, IndexHandle, VectorIndex};
pub use knowledge::{IngestReport, KnowledgeBase};
pub use llm::LanguageModel;
pub use loader::load_documents;
pub use memory::{ConversationMemory, ConversationTurn};
pub use retriever::Retriever;
