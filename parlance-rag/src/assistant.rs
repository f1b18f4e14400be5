//! Conversational question answering over a [`KnowledgeBase`].
//!
//! An [`Assistant`] is shared by every session; each conversation owns its
//! [`ChatSession`] and passes it in by `&mut`, so one session handles one
//! request at a time while many sessions query the same index concurrently.
//!
//! # Example
//!
//! ```rust,ignore
//! use parlance_rag::{Assistant, KnowledgeBase};
//!
//! let assistant = Assistant::new(&knowledge, Arc::new(llm));
//! let mut session = assistant.new_session();
//! let answer = assistant.ask(&mut session, "What is a chunk?", &cancel).await?;
//! for hit in &answer.sources {
//!     println!("{} ({:.2})", hit.chunk.source_id, hit.score);
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RagConfig;
use crate::context::ContextAssembler;
use crate::deadline::bounded;
use crate::document::RetrievalResult;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::knowledge::KnowledgeBase;
use crate::llm::LanguageModel;
use crate::memory::{ConversationMemory, ConversationTurn};
use crate::retriever::Retriever;

const CONDENSE_INSTRUCTIONS: &str = "Rewrite the follow-up question so it can be understood \
without the conversation. Keep names and terms from the conversation that it refers to. \
Reply with the rewritten question only.";

/// One user's conversation: an id and its bounded memory.
#[derive(Debug, Clone)]
pub struct ChatSession {
    id: String,
    memory: ConversationMemory,
}

impl ChatSession {
    /// Start a session with a fresh random id.
    pub fn new(memory: ConversationMemory) -> Self {
        Self { id: Uuid::new_v4().to_string(), memory }
    }

    /// Start a session whose memory is sized by `config`.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(ConversationMemory::from_config(config))
    }

    /// Random v4 uuid identifying this session in logs.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Turns remembered so far.
    pub fn memory(&self) -> &ConversationMemory {
        &self.memory
    }

    /// Forget the conversation, keeping the id.
    pub fn clear(&mut self) {
        self.memory.clear();
    }
}

/// The outcome of a successful [`Assistant::ask`].
#[derive(Debug, Clone)]
pub struct Answer {
    /// The language model's reply.
    pub text: String,
    /// The question used for retrieval (the condensed rewrite, or the
    /// question itself when no rewrite happened).
    pub standalone_question: String,
    /// The passages that made it into the prompt, best first.
    pub sources: RetrievalResult,
    /// Prompt length in characters.
    pub prompt_chars: usize,
    /// Retrieved passages left out to respect `max_context_length`.
    pub dropped_passages: usize,
}

/// Answers questions by retrieving passages and prompting a language model.
pub struct Assistant<E: EmbeddingProvider, L: LanguageModel> {
    retriever: Retriever<E>,
    llm: Arc<L>,
    assembler: ContextAssembler,
    config: RagConfig,
}

impl<E: EmbeddingProvider, L: LanguageModel> Assistant<E, L> {
    /// Create an assistant over `knowledge`'s active index.
    ///
    /// Later rebuilds of `knowledge` are picked up by the next question.
    pub fn new(knowledge: &KnowledgeBase<E>, llm: Arc<L>) -> Self {
        let config = knowledge.config().clone();
        Self {
            retriever: knowledge.retriever(),
            llm,
            assembler: ContextAssembler::from_config(&config),
            config,
        }
    }

    /// A new session sized by this assistant's config.
    pub fn new_session(&self) -> ChatSession {
        ChatSession::from_config(&self.config)
    }

    /// The model answers are generated with.
    pub fn language_model(&self) -> &Arc<L> {
        &self.llm
    }

    /// Answer `query` in the context of `session`.
    ///
    /// The turn is appended to the session memory only if every step
    /// succeeds; on error the session is left exactly as it was.
    ///
    /// # Errors
    ///
    /// - [`RagError::InvalidArgument`] for a blank query, or when the question
    ///   and latest turn alone exceed `max_context_length`
    /// - embedder and language model errors, unchanged
    /// - [`RagError::Cancelled`] if `cancel` fires or a backend call times out
    pub async fn ask(
        &self,
        session: &mut ChatSession,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Answer> {
        let query = query.trim();
        if query.is_empty() {
            return Err(RagError::InvalidArgument("query must not be empty".to_string()));
        }

        let standalone = self.standalone_question(&session.memory, query, cancel).await?;
        let results = self.retriever.retrieve(&standalone, self.config.top_k, cancel).await?;
        let prompt = self.assembler.assemble(query, &results, &session.memory)?;
        debug!(
            session = %session.id,
            prompt_chars = prompt.char_len(),
            passages = prompt.kept_passages.len(),
            dropped = prompt.dropped_passages,
            history_turns = prompt.history_turns,
            "prompt assembled"
        );

        let text = bounded("generation", self.timeout(), cancel, self.llm.generate(&prompt.text))
            .await
            .inspect_err(|e| {
                error!(
                    session = %session.id,
                    model = self.llm.model_name(),
                    error = %e,
                    "generation failed"
                )
            })?;
        let text = text.trim().to_string();

        let hits = results.hits();
        let sources = RetrievalResult::from_ranked(
            prompt.kept_passages.iter().map(|&position| hits[position].clone()).collect(),
        );
        session.memory.append(ConversationTurn::new(query, text.clone()));
        info!(
            session = %session.id,
            sources = sources.len(),
            answer_chars = text.chars().count(),
            "question answered"
        );

        Ok(Answer {
            text,
            standalone_question: standalone,
            sources,
            prompt_chars: prompt.char_len(),
            dropped_passages: prompt.dropped_passages,
        })
    }

    fn timeout(&self) -> Duration {
        self.config.request_timeout()
    }

    /// Rewrite a follow-up into a question that stands on its own.
    async fn standalone_question(
        &self,
        memory: &ConversationMemory,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if !self.config.condense_question || memory.is_empty() {
            return Ok(query.to_string());
        }

        let prompt = format!(
            "{CONDENSE_INSTRUCTIONS}\n\nConversation so far:\n{}\n\nFollow-up question: {query}\n\n\
             Standalone question:",
            memory.render()
        );
        let rewrite =
            bounded("question condensing", self.timeout(), cancel, self.llm.generate(&prompt))
                .await
                .inspect_err(|e| warn!(error = %e, "question condensing failed"))?;

        let rewrite = rewrite.trim();
        if rewrite.is_empty() {
            debug!("empty rewrite, retrieving with the original question");
            return Ok(query.to_string());
        }
        debug!(original = query, rewrite, "question condensed");
        Ok(rewrite.to_string())
    }
}
