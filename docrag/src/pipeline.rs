//! RAG pipeline orchestrator.
//!
//! [`RagPipeline`] wires a [`ProviderRegistry`] and a [`Chunker`] together
//! and exposes the two use cases (indexing and querying) plus corpus
//! maintenance. Every call takes an explicit [`RagConfig`]; the pipeline
//! holds no per-request state, so independent requests run concurrently
//! against it.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{
//!     EmbeddingBackend, InMemoryVectorStore, LlmBackend, ProviderRegistry, RagConfig,
//!     RagPipeline,
//! };
//!
//! let registry = ProviderRegistry::builder()
//!     .embedding(EmbeddingBackend::Local, Arc::new(embedder))
//!     .vector_store(EmbeddingBackend::Local, Arc::new(InMemoryVectorStore::new()))
//!     .llm(LlmBackend::Primary, Arc::new(chat_model))
//!     .build()?;
//! let pipeline = RagPipeline::builder().registry(registry).build()?;
//!
//! let config = RagConfig::default();
//! pipeline.index(document, &config).await?;
//! let response = pipeline.query("what does the report conclude?", &[], &config, None).await?;
//! ```

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use crate::chunking::{Chunker, HeaderContextChunker};
use crate::config::RagConfig;
use crate::error::{RagError, Result};
use crate::registry::ProviderRegistry;

/// The RAG pipeline orchestrator.
///
/// Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    pub(crate) registry: ProviderRegistry,
    pub(crate) chunker: Arc<dyn Chunker>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Return a reference to the provider registry.
    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Delete every chunk of a document from the active corpus.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::VectorStore`] if the deletion fails; the corpus
    /// is unchanged in that case.
    pub async fn delete_document(&self, document_id: &str, config: &RagConfig) -> Result<()> {
        let store = self.registry.vector_store(config.embedding_provider)?;
        store.delete_document(document_id).await?;
        info!(document_id, backend = %config.embedding_provider, "document deleted");
        Ok(())
    }

    /// Number of chunks in the active corpus.
    pub async fn document_count(&self, config: &RagConfig) -> Result<usize> {
        let store = self.registry.vector_store(config.embedding_provider)?;
        store.count().await
    }

    /// Filenames of all documents in the active corpus.
    pub async fn indexed_documents(&self, config: &RagConfig) -> Result<BTreeSet<String>> {
        let store = self.registry.vector_store(config.embedding_provider)?;
        store.list_indexed_documents().await
    }

    /// Remove every chunk from the active corpus.
    pub async fn clear_corpus(&self, config: &RagConfig) -> Result<()> {
        let store = self.registry.vector_store(config.embedding_provider)?;
        store.clear_all().await?;
        info!(backend = %config.embedding_provider, "corpus cleared");
        Ok(())
    }
}

/// Builder for constructing a [`RagPipeline`].
///
/// The registry is required; the chunker defaults to
/// [`HeaderContextChunker`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    registry: Option<ProviderRegistry>,
    chunker: Option<Arc<dyn Chunker>>,
}

impl RagPipelineBuilder {
    /// Set the provider registry.
    pub fn registry(mut self, registry: ProviderRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Set the document chunker.
    pub fn chunker(mut self, chunker: Arc<dyn Chunker>) -> Self {
        self.chunker = Some(chunker);
        self
    }

    /// Build the [`RagPipeline`].
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the registry is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let registry = self
            .registry
            .ok_or_else(|| RagError::Config("registry is required".to_string()))?;
        let chunker = self.chunker.unwrap_or_else(|| Arc::new(HeaderContextChunker));
        Ok(RagPipeline { registry, chunker })
    }
}
