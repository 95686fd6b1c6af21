//! Per-request configuration for the RAG pipeline.
//!
//! A [`RagConfig`] is an explicit value passed into every use-case call.
//! There is no ambient or global mutable state: the surrounding
//! application reads its session settings once per request and hands the
//! resulting config down.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{RagError, Result};
use crate::registry::{EmbeddingBackend, LlmBackend};
use crate::retrieval::HYBRID_FETCH_FACTOR;

/// Configuration parameters for one pipeline request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Which embedding backend serves this request.
    pub embedding_provider: EmbeddingBackend,
    /// Which generation backend serves this request.
    pub llm_provider: LlmBackend,
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters.
    pub chunk_overlap: usize,
    /// Number of results to ground the answer on.
    pub n_results: usize,
    /// Whether to fuse lexical scores into the ranking.
    pub hybrid_enabled: bool,
    /// Weight of the semantic score in the fused ranking, in [0, 1].
    pub semantic_weight: f32,
    /// Whether to rerank candidates when a reranker is registered.
    pub rerank_enabled: bool,
    /// Whether to index image descriptions when a vision provider is
    /// registered.
    pub vision_enabled: bool,
    /// Sampling temperature for generation.
    pub temperature: f32,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Per-call timeout for external services, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding_provider: EmbeddingBackend::Local,
            llm_provider: LlmBackend::Primary,
            chunk_size: 800,
            chunk_overlap: 100,
            n_results: 7,
            hybrid_enabled: true,
            semantic_weight: 0.5,
            rerank_enabled: false,
            vision_enabled: false,
            temperature: 0.7,
            max_tokens: 1024,
            request_timeout_secs: 120,
        }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }

    /// Per-call timeout for external services.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// How many candidates the semantic stage fetches.
    ///
    /// Hybrid ranking over-fetches so BM25 has a pool to re-score; pure
    /// semantic requests fetch exactly `n_results`.
    pub fn fetch_count(&self) -> usize {
        if self.hybrid_enabled && self.semantic_weight < 1.0 {
            self.n_results * HYBRID_FETCH_FACTOR
        } else {
            self.n_results
        }
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the embedding backend.
    pub fn embedding_provider(mut self, backend: EmbeddingBackend) -> Self {
        self.config.embedding_provider = backend;
        self
    }

    /// Set the generation backend.
    pub fn llm_provider(mut self, backend: LlmBackend) -> Self {
        self.config.llm_provider = backend;
        self
    }

    /// Set the target chunk size in characters.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in characters.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of results to ground the answer on.
    pub fn n_results(mut self, n: usize) -> Self {
        self.config.n_results = n;
        self
    }

    /// Enable or disable hybrid ranking.
    pub fn hybrid_enabled(mut self, enabled: bool) -> Self {
        self.config.hybrid_enabled = enabled;
        self
    }

    /// Set the semantic weight used by hybrid ranking.
    pub fn semantic_weight(mut self, weight: f32) -> Self {
        self.config.semantic_weight = weight;
        self
    }

    /// Enable or disable reranking.
    pub fn rerank_enabled(mut self, enabled: bool) -> Self {
        self.config.rerank_enabled = enabled;
        self
    }

    /// Enable or disable image-description indexing.
    pub fn vision_enabled(mut self, enabled: bool) -> Self {
        self.config.vision_enabled = enabled;
        self
    }

    /// Set the sampling temperature for generation.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Set the upper bound on generated tokens.
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    /// Set the per-call timeout for external services, in seconds.
    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// An overlap at or above the chunk size is unusual but permitted; the
    /// chunker guarantees forward progress regardless, so it only draws a
    /// warning.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0`
    /// - `n_results == 0`
    /// - `semantic_weight` lies outside [0, 1]
    /// - `temperature` lies outside [0, 2]
    /// - `max_tokens == 0`
    /// - `request_timeout_secs == 0`
    pub fn build(self) -> Result<RagConfig> {
        let config = self.config;
        if config.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".into()));
        }
        if config.n_results == 0 {
            return Err(RagError::Config("n_results must be greater than zero".into()));
        }
        if !(0.0..=1.0).contains(&config.semantic_weight) {
            return Err(RagError::Config(format!(
                "semantic_weight must lie in [0, 1], got {}",
                config.semantic_weight
            )));
        }
        if !(0.0..=2.0).contains(&config.temperature) {
            return Err(RagError::Config(format!(
                "temperature must lie in [0, 2], got {}",
                config.temperature
            )));
        }
        if config.max_tokens == 0 {
            return Err(RagError::Config("max_tokens must be greater than zero".into()));
        }
        if config.request_timeout_secs == 0 {
            return Err(RagError::Config(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }
        if config.chunk_overlap >= config.chunk_size {
            warn!(
                chunk_overlap = config.chunk_overlap,
                chunk_size = config.chunk_size,
                "chunk_overlap is at or above chunk_size; chunking will degrade to small steps"
            );
        }

        Ok(config)
    }
}
