//! Embedded persistent vector store with JSON snapshots.
//!
//! [`PersistentVectorStore`] keeps the working set in memory like
//! [`InMemoryVectorStore`](crate::inmemory::InMemoryVectorStore) and
//! snapshots it to a versioned JSON file after every mutation, writing via
//! a temp file and rename so a crash mid-write cannot corrupt the previous
//! snapshot.

use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::document::Chunk;
use crate::error::{RagError, Result};
use crate::inmemory::validate_addition;
use crate::query::SearchResult;
use crate::vectorstore::{VectorStore, collect_filenames, rank_chunks};

const BACKEND: &str = "embedded";
const STATE_VERSION: u32 = 1;

/// Snapshot format written to disk.
#[derive(Serialize, Deserialize)]
struct PersistedState {
    version: u32,
    collection: String,
    chunks: HashMap<String, Chunk>,
}

/// An embedded vector store persisted as a JSON snapshot per collection.
///
/// The collection name should come from
/// [`collection_name`](crate::registry::collection_name) so that corpora
/// built with different embedding providers never share a file.
pub struct PersistentVectorStore {
    chunks: RwLock<HashMap<String, Chunk>>,
    collection: String,
    path: PathBuf,
}

impl PersistentVectorStore {
    /// Open (or create) the store for `collection` under `dir`.
    ///
    /// An unreadable or mismatched snapshot is logged and replaced by an
    /// empty corpus rather than failing open.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the directory cannot be
    /// created or the snapshot file cannot be read.
    pub async fn open(dir: impl AsRef<Path>, collection: impl Into<String>) -> Result<Self> {
        let collection = collection.into();
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir).await.map_err(|e| RagError::VectorStore {
            backend: BACKEND.to_string(),
            message: format!("failed to create '{}': {e}", dir.display()),
        })?;

        let path = dir.join(format!("{collection}.json"));
        let chunks = match tokio::fs::try_exists(&path).await {
            Ok(true) => Self::load_snapshot(&path, &collection).await?,
            Ok(false) => HashMap::new(),
            Err(e) => {
                return Err(RagError::VectorStore {
                    backend: BACKEND.to_string(),
                    message: format!("failed to probe '{}': {e}", path.display()),
                });
            }
        };

        info!(collection = %collection, chunk_count = chunks.len(), "opened embedded store");
        Ok(Self { chunks: RwLock::new(chunks), collection, path })
    }

    async fn load_snapshot(path: &Path, collection: &str) -> Result<HashMap<String, Chunk>> {
        let data = tokio::fs::read_to_string(path).await.map_err(|e| RagError::VectorStore {
            backend: BACKEND.to_string(),
            message: format!("failed to read '{}': {e}", path.display()),
        })?;

        match serde_json::from_str::<PersistedState>(&data) {
            Ok(state) if state.version == STATE_VERSION && state.collection == collection => {
                Ok(state.chunks)
            }
            Ok(state) => {
                warn!(
                    version = state.version,
                    collection = %state.collection,
                    "snapshot does not match this collection, starting empty"
                );
                Ok(HashMap::new())
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "unreadable snapshot, starting empty");
                Ok(HashMap::new())
            }
        }
    }

    /// Write the current chunk map to disk via temp file + rename.
    async fn save_snapshot(&self, chunks: &HashMap<String, Chunk>) -> Result<()> {
        let state = PersistedState {
            version: STATE_VERSION,
            collection: self.collection.clone(),
            chunks: chunks.clone(),
        };
        let data = serde_json::to_vec(&state).map_err(|e| RagError::VectorStore {
            backend: BACKEND.to_string(),
            message: format!("failed to serialize snapshot: {e}"),
        })?;

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &data).await.map_err(|e| RagError::VectorStore {
            backend: BACKEND.to_string(),
            message: format!("failed to write '{}': {e}", tmp.display()),
        })?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(|e| RagError::VectorStore {
            backend: BACKEND.to_string(),
            message: format!("failed to replace '{}': {e}", self.path.display()),
        })?;

        debug!(collection = %self.collection, chunk_count = chunks.len(), "saved snapshot");
        Ok(())
    }
}

#[async_trait]
impl VectorStore for PersistentVectorStore {
    async fn add(&self, chunks: &[Chunk], document_id: &str) -> Result<()> {
        validate_addition(chunks, BACKEND)?;

        let mut store = self.chunks.write().await;
        for chunk in chunks {
            store.insert(chunk.id.clone(), chunk.clone());
        }
        self.save_snapshot(&store).await?;
        debug!(document_id, count = chunks.len(), "added chunks to embedded store");
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
        if store.len() != before {
            self.save_snapshot(&store).await?;
        }
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
        let mut store = self.chunks.write().await;
        store.clear();
        self.save_snapshot(&store).await
    }
}
