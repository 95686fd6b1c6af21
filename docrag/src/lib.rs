//! Hybrid retrieval-augmented generation over document corpora.
//!
//! `docrag` splits uploaded documents into header-aware overlapping
//! chunks, indexes them for semantic and lexical retrieval, and answers
//! queries by fusing both signals (optionally superseded by a reranker)
//! before grounding an LLM answer on the winning chunks.
//!
//! Provider backends sit behind async ports so the pipeline composes
//! against interchangeable services:
//!
//! - [`EmbeddingProvider`] — text → fixed-dimension vector, batch-capable
//! - [`VectorStore`] — chunk persistence with cosine nearest-neighbor search
//! - [`LlmProvider`] — grounded answer generation
//! - [`Reranker`] — optional second-pass relevance ordering
//! - [`VisionProvider`] — optional image-description indexing
//!
//! The bundled stores are [`InMemoryVectorStore`] and the snapshotting
//! [`PersistentVectorStore`]. Remote adapters (OpenAI-compatible
//! embeddings/chat/vision, Ollama embeddings, Cohere-style reranking) are
//! feature-gated: `openai`, `ollama`, `cohere`.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use docrag::{
//!     Document, EmbeddingBackend, InMemoryVectorStore, LlmBackend, ProviderRegistry,
//!     RagConfig, RagPipeline,
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
//! let document = Document::new("report.pdf", extracted_text)?;
//! pipeline.index(document, &config).await?;
//!
//! let response = pipeline.query("what does the report conclude?", &[], &config, None).await?;
//! println!("{}", response.answer);
//! ```

mod answer;
pub mod bm25;
pub mod chunking;
pub mod config;
pub mod document;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generation;
mod indexing;
pub mod inmemory;
pub mod persistent;
pub mod pipeline;
pub mod query;
pub mod registry;
pub mod reranker;
pub mod retrieval;
pub mod vectorstore;
pub mod vision;

#[cfg(any(test, feature = "openai", feature = "ollama", feature = "cohere"))]
pub(crate) mod retry;

#[cfg(feature = "cohere")]
pub mod cohere;
#[cfg(feature = "ollama")]
pub mod ollama;
#[cfg(feature = "openai")]
pub mod openai;

pub use chunking::{Chunker, HeaderContextChunker};
pub use config::{RagConfig, RagConfigBuilder};
pub use document::{Chunk, Document, MAX_CHUNK_CHARS};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use extract::{FileUpload, PlainTextExtractor, TextExtractor};
pub use generation::{ChatMessage, ChatRole, GenerationRequest, LlmProvider};
pub use inmemory::InMemoryVectorStore;
pub use persistent::PersistentVectorStore;
pub use pipeline::{RagPipeline, RagPipelineBuilder};
pub use query::{MAX_QUERY_CHARS, Query, RagResponse, SearchResult};
pub use registry::{
    EmbeddingBackend, LlmBackend, ProviderRegistry, ProviderRegistryBuilder, collection_name,
};
pub use reranker::{RerankedItem, Reranker};
pub use retrieval::{fuse_scores, hybrid_rank, normalize_scores};
pub use vectorstore::VectorStore;
pub use vision::{ImageAttachment, VisionProvider};
