//! Bounded conversation history for one chat session.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::RagConfig;

/// One answered question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    /// What the user asked.
    pub query: String,
    /// What the assistant answered.
    pub answer: String,
    /// When the turn completed.
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a turn stamped with the current time.
    pub fn new(query: impl Into<String>, answer: impl Into<String>) -> Self {
        Self { query: query.into(), answer: answer.into(), timestamp: Utc::now() }
    }
}

/// The most recent turns of a conversation, oldest first.
///
/// Holds at most `window` turns; appending past the window evicts the oldest
/// turn. A window of zero disables memory. Turns are never modified after
/// they are appended.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversationMemory {
    turns: VecDeque<ConversationTurn>,
    window: usize,
    turn_chars: usize,
}

impl ConversationMemory {
    /// Default per-turn character cap used by [`ConversationMemory::new`].
    pub const DEFAULT_TURN_CHARS: usize = 2000;
    /// Turns allocated up front; larger windows grow on demand.
    const PREALLOCATED_TURNS: usize = 16;

    /// Create an empty memory keeping the last `window` turns.
    pub fn new(window: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(window.min(Self::PREALLOCATED_TURNS)),
            window,
            turn_chars: Self::DEFAULT_TURN_CHARS,
        }
    }

    /// Create an empty memory sized by `config`.
    pub fn from_config(config: &RagConfig) -> Self {
        Self::new(config.memory_window_size).with_turn_chars(config.memory_turn_chars)
    }

    /// Cap the characters rendered for each query and each answer.
    ///
    /// A zero cap is raised to one.
    pub fn with_turn_chars(mut self, chars: usize) -> Self {
        self.turn_chars = chars.max(1);
        self
    }

    /// Maximum number of retained turns.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Record a turn, evicting the oldest one if the window is full.
    pub fn append(&mut self, turn: ConversationTurn) {
        if self.window == 0 {
            return;
        }
        if self.turns.len() == self.window {
            self.turns.pop_front();
        }
        self.turns.push_back(turn);
    }

    /// Forget every turn.
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// Number of retained turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Whether no turn is retained.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Retained turns, oldest first.
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    /// The most recent turn.
    pub fn latest(&self) -> Option<&ConversationTurn> {
        self.turns.back()
    }

    /// Format every retained turn for prompt inclusion, oldest first.
    pub fn render(&self) -> String {
        self.render_recent(self.turns.len())
    }

    /// Format only the `count` most recent turns, oldest first.
    pub fn render_recent(&self, count: usize) -> String {
        let skip = self.turns.len().saturating_sub(count);
        self.turns
            .iter()
            .skip(skip)
            .map(|turn| self.render_turn(turn))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn render_turn(&self, turn: &ConversationTurn) -> String {
        format!(
            "User: {}\nAssistant: {}",
            truncate_chars(&turn.query, self.turn_chars),
            truncate_chars(&turn.answer, self.turn_chars)
        )
    }
}

/// Keep at most `max` characters, marking a cut with a trailing ellipsis.
fn truncate_chars(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
