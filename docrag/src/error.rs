//! Error types for the `docrag` crate.

use thiserror::Error;
use tracing::error;
use uuid::Uuid;

/// Errors that can occur in RAG operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid input: empty or oversized text, out-of-range parameters.
    ///
    /// Never retried, and the message is safe to show to the caller.
    #[error("validation error: {0}")]
    Validation(String),

    /// An embedding provider failed after retries were exhausted.
    ///
    /// Fatal for single-item calls. During batch indexing the adapters
    /// degrade to zero vectors instead of surfacing this.
    #[error("embedding error ({provider}): {message}")]
    Embedding {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector store backend failed. No partial writes survive.
    #[error("vector store error ({backend}): {message}")]
    VectorStore {
        /// The vector store backend that produced the error.
        backend: String,
        /// A description of the failure.
        message: String,
    },

    /// A reranker failed. Callers fall back to hybrid ranking.
    #[error("rerank error ({reranker}): {message}")]
    Rerank {
        /// The reranker that produced the error.
        reranker: String,
        /// A description of the failure.
        message: String,
    },

    /// Text generation failed. Fatal to the request.
    #[error("generation error ({model}): {message}")]
    Generation {
        /// The generation model that produced the error.
        model: String,
        /// A description of the failure.
        message: String,
    },

    /// Document indexing failed; the corpus is unchanged for that document.
    #[error("indexing error: {0}")]
    Index(String),

    /// Invalid pipeline or provider configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;

impl RagError {
    /// Whether the request may continue by degrading to a lesser ranking
    /// instead of failing outright.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, RagError::Rerank { .. })
    }

    /// A message safe to surface outside the process.
    ///
    /// Validation and configuration problems are the caller's to fix, so
    /// their messages pass through. Everything else collapses to an opaque
    /// reference id; the full detail goes to the log only.
    pub fn user_message(&self) -> String {
        match self {
            RagError::Validation(msg) | RagError::Config(msg) => msg.clone(),
            other => {
                let id = Uuid::new_v4().simple().to_string();
                let reference = &id[..8];
                error!(reference, error = %other, "internal error surfaced to caller");
                format!("An internal error occurred (ref: {reference}). Contact the administrator if the problem persists.")
            }
        }
    }
}
