//! Error types for the `parlance-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in retrieval and answering operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Chunking, threshold or other configuration parameters are invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A vector's length differs from the dimension the index was built with.
    ///
    /// Usually means the embedding model changed without rebuilding the index.
    #[error("Dimension mismatch ({context}): expected {expected}, got {actual}")]
    DimensionMismatch {
        /// The dimension of the index or embedder.
        expected: usize,
        /// The dimension of the offending vector.
        actual: usize,
        /// Which document, chunk or query produced the vector.
        context: String,
    },

    /// The embedding backend failed. Retryable at the caller's discretion.
    #[error("Embedding unavailable ({provider}): {message}")]
    EmbeddingUnavailable {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The language model backend failed. Retryable at the caller's discretion.
    #[error("Generation unavailable ({model}): {message}")]
    GenerationUnavailable {
        /// The language model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// A persisted index blob could not be decoded. The index must be rebuilt.
    #[error("Corrupt index: {0}")]
    CorruptIndex(String),

    /// The operation was cancelled or timed out. No state was modified.
    #[error("Cancelled during {operation}: {reason}")]
    Cancelled {
        /// The operation that was interrupted.
        operation: String,
        /// Why it stopped (token cancelled, deadline elapsed).
        reason: String,
    },

    /// The caller passed an argument the operation cannot accept.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A file could not be read or written.
    #[error("I/O error at {}: {source}", path.display())]
    Io {
        /// The file or directory involved.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl RagError {
    /// Whether retrying the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::EmbeddingUnavailable { .. } | Self::GenerationUnavailable { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }
}

/// A convenience result type for retrieval operations.
pub type Result<T> = std::result::Result<T, RagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_backend_failures_are_retryable() {
        let embed = RagError::EmbeddingUnavailable { provider: "p".into(), message: "down".into() };
        let generate =
            RagError::GenerationUnavailable { model: "m".into(), message: "down".into() };
        assert!(embed.is_retryable());
        assert!(generate.is_retryable());
        assert!(!RagError::CorruptIndex("bad".into()).is_retryable());
        assert!(!RagError::InvalidArgument("k".into()).is_retryable());
    }

    #[test]
    fn dimension_mismatch_message_names_context() {
        let err = RagError::DimensionMismatch {
            expected: 768,
            actual: 384,
            context: "chunk notes.txt#2".into(),
        };
        assert_eq!(
            err.to_string(),
            "Dimension mismatch (chunk notes.txt#2): expected 768, got 384"
        );
    }
}
