//! Reranker port for second-pass relevance ordering.

use async_trait::async_trait;

use crate::error::Result;

/// A candidate's original position paired with its rerank score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RerankedItem {
    /// Index of the candidate in the input list.
    pub index: usize,
    /// Relevance score in [0, 1].
    pub score: f32,
}

/// A reranker that reorders a small candidate set by finer-grained
/// relevance than the first-pass retrieval.
///
/// Reranking is a quality enhancement, never a hard dependency: by
/// contract every failure is recoverable and the query path falls back to
/// the hybrid ranking.
#[async_trait]
pub trait Reranker: Send + Sync {
    /// Reorder `documents` by relevance to `query`, best first.
    ///
    /// Returns at most `top_k` items with scores in [0, 1].
    async fn rerank(
        &self,
        query: &str,
        documents: &[&str],
        top_k: usize,
    ) -> Result<Vec<RerankedItem>>;

    /// Short identifier for logging.
    fn name(&self) -> &str;
}
