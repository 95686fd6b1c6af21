//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] is a zero-dependency store backed by a
//! `HashMap` protected by a `tokio::sync::RwLock`. It is suitable for
//! development, testing, and small single-session corpora.

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::query::SearchResult;
use crate::vectorstore::{VectorStore, collect_filenames, rank_chunks};

const BACKEND: &str = "memory";

/// An in-memory vector store using cosine similarity for search.
///
/// Chunks are keyed by id, so re-adding a chunk overwrites the previous
/// version (last-writer-wins). Reads proceed concurrently with writes via
/// the `RwLock`.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add(&chunks, &document.id).await?;
/// let results = store.search(&query_embedding, 5, None).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    chunks: RwLock<HashMap<String, Chunk>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Reject additions that would leave the store inconsistent.
pub(crate) fn validate_addition(chunks: &[Chunk], backend: &str) -> Result<()> {
    if chunks.is_empty() {
        return Err(RagError::VectorStore {
            backend: backend.to_string(),
            message: "no chunks to add".into(),
        });
    }
    for chunk in chunks {
        if chunk.embedding.is_none() {
            return Err(RagError::VectorStore {
                backend: backend.to_string(),
                message: format!("chunk '{}' has no embedding", chunk.id),
            });
        }
    }
    Ok(())
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, chunks: &[Chunk], document_id: &str) -> Result<()> {
        validate_addition(chunks, BACKEND)?;

        let mut store = self.chunks.write().await;
        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk.clone());
        }
        debug!(document_id, count = chunks.len(), "added chunks to in-memory store");
        Ok(())
    }

    async fn search(
        &self,
        query_embedding: &[f32],
        k: usize,
        filter: Option<&HashMap<String, String>>,
    ) -> Result<Vec<SearchResult>> {
        let store = self.chunks.read().await;
        rank_chunks(store.values(), query_embedding, k, filter, BACKEND)
    }

    async fn delete_document(&self, document_id: &str) -> Result<()> {
        let mut store = self.chunks.write().await;
        let before = store.len();
        store.retain(|_, chunk| chunk.document_id != document_id);
        debug!(document_id, removed = before - store.len(), "deleted document chunks");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.chunks.read().await.len())
    }

    async fn list_indexed_documents(&self) -> Result<BTreeSet<String>> {
        let store = self.chunks.read().await;
        Ok(collect_filenames(store.values()))
    }

    async fn clear_all(&self) -> Result<()> {
        self.chunks.write().await.clear();
        debug!("cleared in-memory store");
        Ok(())
    }
}
