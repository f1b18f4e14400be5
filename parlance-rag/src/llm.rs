//! Language model trait for turning a prompt into an answer.

use async_trait::async_trait;

use crate::error::Result;

/// A text-generation backend.
///
/// Implementations should report backend failures as
/// [`RagError::GenerationUnavailable`](crate::RagError::GenerationUnavailable).
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// The model identifier, used in logs and errors.
    fn model_name(&self) -> &str;
}
