//! Provider registry: closed backend tags resolved to concrete adapters.
//!
//! Business logic never dispatches on provider strings. Backends form a
//! small closed set of enum tags, and the registry resolves a tag to the
//! injected adapter once per request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::LlmProvider;
use crate::reranker::Reranker;
use crate::vectorstore::VectorStore;
use crate::vision::VisionProvider;

/// Which embedding service serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// A locally hosted embedding service.
    Local,
    /// A remote embedding API.
    Remote,
}

impl EmbeddingBackend {
    /// Stable tag used in collection names and configuration.
    pub fn tag(&self) -> &'static str {
        match self {
            EmbeddingBackend::Local => "local",
            EmbeddingBackend::Remote => "remote",
        }
    }
}

impl fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Which generation service serves a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmBackend {
    /// The default chat endpoint.
    Primary,
    /// An alternative chat endpoint.
    Secondary,
}

impl LlmBackend {
    /// Stable tag used in configuration.
    pub fn tag(&self) -> &'static str {
        match self {
            LlmBackend::Primary => "primary",
            LlmBackend::Secondary => "secondary",
        }
    }
}

impl fmt::Display for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Collection identifier for an embedding backend.
///
/// Collections are split per backend because embedding dimensionality
/// differs between providers and a collection cannot mix dimensions.
pub fn collection_name(backend: EmbeddingBackend) -> String {
    format!("documents_{}", backend.tag())
}

/// Holds the configured adapters and resolves backend tags to them.
#[derive(Default)]
pub struct ProviderRegistry {
    embeddings: HashMap<EmbeddingBackend, Arc<dyn EmbeddingProvider>>,
    llms: HashMap<LlmBackend, Arc<dyn LlmProvider>>,
    stores: HashMap<EmbeddingBackend, Arc<dyn VectorStore>>,
    reranker: Option<Arc<dyn Reranker>>,
    vision: Option<Arc<dyn VisionProvider>>,
}

impl ProviderRegistry {
    /// Create a new [`ProviderRegistryBuilder`].
    pub fn builder() -> ProviderRegistryBuilder {
        ProviderRegistryBuilder::default()
    }

    /// Resolve the embedding provider for a backend tag.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if no provider is registered for it.
    pub fn embedding(&self, backend: EmbeddingBackend) -> Result<Arc<dyn EmbeddingProvider>> {
        self.embeddings.get(&backend).cloned().ok_or_else(|| {
            RagError::Config(format!("no embedding provider registered for backend '{backend}'"))
        })
    }

    /// Resolve the generation provider for a backend tag.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if no provider is registered for it.
    pub fn llm(&self, backend: LlmBackend) -> Result<Arc<dyn LlmProvider>> {
        self.llms.get(&backend).cloned().ok_or_else(|| {
            RagError::Config(format!("no llm provider registered for backend '{backend}'"))
        })
    }

    /// Resolve the vector store for an embedding backend tag.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if no store is registered for it.
    pub fn vector_store(&self, backend: EmbeddingBackend) -> Result<Arc<dyn VectorStore>> {
        self.stores.get(&backend).cloned().ok_or_else(|| {
            RagError::Config(format!("no vector store registered for backend '{backend}'"))
        })
    }

    /// The registered reranker, if any.
    pub fn reranker(&self) -> Option<Arc<dyn Reranker>> {
        self.reranker.clone()
    }

    /// The registered vision provider, if any.
    pub fn vision(&self) -> Option<Arc<dyn VisionProvider>> {
        self.vision.clone()
    }
}

/// Builder for constructing a [`ProviderRegistry`].
#[derive(Default)]
pub struct ProviderRegistryBuilder {
    registry: ProviderRegistry,
}

impl ProviderRegistryBuilder {
    /// Register an embedding provider for a backend tag.
    pub fn embedding(
        mut self,
        backend: EmbeddingBackend,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        self.registry.embeddings.insert(backend, provider);
        self
    }

    /// Register a generation provider for a backend tag.
    pub fn llm(mut self, backend: LlmBackend, provider: Arc<dyn LlmProvider>) -> Self {
        self.registry.llms.insert(backend, provider);
        self
    }

    /// Register a vector store for an embedding backend tag.
    pub fn vector_store(
        mut self,
        backend: EmbeddingBackend,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        self.registry.stores.insert(backend, store);
        self
    }

    /// Register an optional reranker.
    pub fn reranker(mut self, reranker: Arc<dyn Reranker>) -> Self {
        self.registry.reranker = Some(reranker);
        self
    }

    /// Register an optional vision provider.
    pub fn vision(mut self, vision: Arc<dyn VisionProvider>) -> Self {
        self.registry.vision = Some(vision);
        self
    }

    /// Build the [`ProviderRegistry`], validating that it can serve
    /// requests.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if no embedding provider or no llm
    /// provider is registered, or if a registered embedding backend has no
    /// matching vector store.
    pub fn build(self) -> Result<ProviderRegistry> {
        let registry = self.registry;
        if registry.embeddings.is_empty() {
            return Err(RagError::Config("at least one embedding provider is required".into()));
        }
        if registry.llms.is_empty() {
            return Err(RagError::Config("at least one llm provider is required".into()));
        }
        for backend in registry.embeddings.keys() {
            if !registry.stores.contains_key(backend) {
                return Err(RagError::Config(format!(
                    "embedding backend '{backend}' has no matching vector store"
                )));
            }
        }
        Ok(registry)
    }
}
