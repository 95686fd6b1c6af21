//! Vector store port and shared scoring helpers.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;

use crate::document::{Chunk, META_FILENAME};
use crate::error::{RagError, Result};
use crate::query::SearchResult;

/// A storage backend for chunk embeddings with similarity search.
///
/// A store instance is bound to one named collection; collection naming is
/// the registry's concern because embedding dimensionality differs per
/// provider and a collection cannot mix dimensions. Stores must tolerate
/// concurrent reads during concurrent writes; last-writer-wins per chunk
/// id is acceptable.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add chunks for a document, overwriting chunks with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the chunk list is empty or if
    /// any chunk is missing its embedding. A missing embedding is a
    /// precondition violation, never silently skipped.
    async fn add(&self, chunks: &[Chunk], document_id: &str) -> Result<()>;

    /// Return the `k` chunks nearest to the query vector, best first.
    ///
    /// `k` larger than the indexed population is not an error; at most
    /// [`count()`](VectorStore::count) results come back. `filter`
    /// restricts results to chunks whose metadata contains every given
    /// key-value pair.
    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<SearchResult>>;

    /// Delete every chunk belonging to a document.
    async fn delete_document(&self, document_id: &str) -> Result<()>;

    /// Number of chunks currently indexed.
    async fn count(&self) -> Result<usize>;

    /// Filenames of all indexed documents.
    async fn list_indexed_documents(&self) -> Result<BTreeSet<String>>;

    /// Remove every chunk from the store.
    async fn clear_all(&self) -> Result<()>;
}

/// Cosine distance between two vectors, in [0, 2].
///
/// A zero-magnitude vector is treated as orthogonal to everything.
pub(crate) fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}

/// Convert a cosine distance in [0, 2] to a similarity score in [0, 1].
pub(crate) fn distance_to_score(distance: f32) -> f32 {
    (1.0 - distance / 2.0).clamp(0.0, 1.0)
}

/// Whether chunk metadata satisfies an equality filter.
pub(crate) fn matches_filter(
    metadata: &HashMap<String, String>,
    filter: Option<&HashMap<String, String>>,
) -> bool {
    filter.is_none_or(|f| f.iter().all(|(key, value)| metadata.get(key) == Some(value)))
}

/// Score chunks against a query embedding and keep the best `k`.
///
/// Shared by the embedded store implementations.
pub(crate) fn rank_chunks<'a>(
    chunks: impl Iterator<Item = &'a Chunk>,
    query_embedding: &[f32],
    k: usize,
    filter: Option<&HashMap<String, String>>,
    backend: &str,
) -> Result<Vec<SearchResult>> {
    let mut results = Vec::new();
    for chunk in chunks {
        if !matches_filter(&chunk.metadata, filter) {
            continue;
        }
        let embedding = chunk.embedding.as_deref().ok_or_else(|| RagError::VectorStore {
            backend: backend.to_string(),
            message: format!("stored chunk '{}' has no embedding", chunk.id),
        })?;
        let score = distance_to_score(cosine_distance(embedding, query_embedding));
        results.push(SearchResult::new(
            chunk.id.clone(),
            chunk.text.clone(),
            score,
            chunk.metadata.clone(),
        )?);
    }

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    results.truncate(k);
    Ok(results)
}

/// Filenames of all documents present in a chunk map.
pub(crate) fn collect_filenames<'a>(
    chunks: impl Iterator<Item = &'a Chunk>,
) -> BTreeSet<String> {
    chunks.filter_map(|chunk| chunk.metadata.get(META_FILENAME).cloned()).collect()
}
