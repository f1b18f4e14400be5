//! Prompt assembly under a context-length budget.
//!
//! [`ContextAssembler`] lays out, in order: system instructions, conversation
//! history, retrieved passages tagged with their source, and the question.
//! When the result exceeds `max_context_length` characters it sheds whole
//! passages (lowest similarity first), then older history turns. The question
//! and the most recent turn are never dropped.

use crate::config::RagConfig;
use crate::document::{RetrievalResult, ScoredChunk};
use crate::error::{RagError, Result};
use crate::memory::ConversationMemory;

/// A prompt ready for the language model, with a record of what was kept.
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledPrompt {
    /// The full prompt text.
    pub text: String,
    /// Positions (into the retrieval result) of the passages that fit, in
    /// prompt order.
    pub kept_passages: Vec<usize>,
    /// Number of passages shed to respect the budget.
    pub dropped_passages: usize,
    /// Number of history turns included.
    pub history_turns: usize,
}

impl AssembledPrompt {
    /// Prompt length in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// Builds prompts from a question, retrieved passages and session history.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    system_prompt: String,
    max_context_length: usize,
}

impl ContextAssembler {
    /// Create an assembler with the given instructions and character budget.
    pub fn new(system_prompt: impl Into<String>, max_context_length: usize) -> Self {
        Self { system_prompt: system_prompt.into(), max_context_length }
    }

    /// Create an assembler from `config`.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.system_prompt.clone(), config.max_context_length)
    }

    /// The character budget.
    pub fn max_context_length(&self) -> usize {
        self.max_context_length
    }

    /// Assemble a prompt that fits the budget.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::InvalidArgument`] if the instructions, the question
    /// and the most recent history turn alone exceed the budget.
    pub fn assemble(
        &self,
        query: &str,
        results: &RetrievalResult,
        memory: &ConversationMemory,
    ) -> Result<AssembledPrompt> {
        let hits = results.hits();
        let mut kept: Vec<usize> = (0..hits.len()).collect();
        let mut history_turns = memory.len();

        loop {
            let text = self.render(query, hits, &kept, &memory.render_recent(history_turns));
            if text.chars().count() <= self.max_context_length {
                return Ok(AssembledPrompt {
                    text,
                    dropped_passages: hits.len() - kept.len(),
                    kept_passages: kept,
                    history_turns,
                });
            }

            if let Some(weakest) = weakest_passage(hits, &kept) {
                kept.remove(weakest);
            } else if history_turns > 1 {
                history_turns -= 1;
            } else {
                return Err(RagError::InvalidArgument(format!(
                    "question and latest conversation turn need {} characters, over the \
                     max_context_length of {}",
                    text.chars().count(),
                    self.max_context_length
                )));
            }
        }
    }

    fn render(&self, query: &str, hits: &[ScoredChunk], kept: &[usize], history: &str) -> String {
        let mut sections = Vec::with_capacity(4);
        if !self.system_prompt.trim().is_empty() {
            sections.push(self.system_prompt.trim().to_string());
        }
        if !history.is_empty() {
            sections.push(format!("Conversation so far:\n{history}"));
        }

        if kept.is_empty() {
            sections.push("Retrieved passages:\n(none)".to_string());
        } else {
            let passages = kept
                .iter()
                .enumerate()
                .map(|(n, &position)| {
                    let chunk = &hits[position].chunk;
                    format!(
                        "[{}] source: {} (chunk {})\n{}",
                        n + 1,
                        chunk.source_id,
                        chunk.chunk_index,
                        chunk.text.trim()
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n");
            sections.push(format!("Retrieved passages:\n{passages}"));
        }

        sections.push(format!("Question: {}", query.trim()));
        sections.join("\n\n")
    }
}

/// Index within `kept` of the lowest-scoring passage; the later-ranked one on ties.
fn weakest_passage(hits: &[ScoredChunk], kept: &[usize]) -> Option<usize> {
    kept.iter()
        .enumerate()
        .min_by(|&(_, &a), &(_, &b)| {
            hits[a]
                .score
                .partial_cmp(&hits[b].score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| hits[b].entry_id.cmp(&hits[a].entry_id))
        })
        .map(|(slot, _)| slot)
}
