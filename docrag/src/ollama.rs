//! Local embedding provider backed by the Ollama HTTP API.
//!
//! This module is only available when the `ollama` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::retry::{CallError, DEFAULT_ATTEMPTS, retry_with_backoff};

/// The default Ollama endpoint.
const DEFAULT_BASE_URL: &str = "http://localhost:11434";

/// The default embedding model.
const DEFAULT_MODEL: &str = "nomic-embed-text";

/// A local server retries fast; long backoff buys nothing here.
const LOCAL_BASE_DELAY: Duration = Duration::from_millis(250);

/// Dimensionality of well-known Ollama embedding models.
fn known_dimensions(model: &str) -> usize {
    match model {
        "nomic-embed-text" => 768,
        "mxbai-embed-large" => 1024,
        "all-minilm" => 384,
        "snowflake-arctic-embed" => 1024,
        _ => 768,
    }
}

/// An [`EmbeddingProvider`] backed by a local Ollama server.
///
/// The Ollama embeddings endpoint takes one prompt per request, so the
/// batch path iterates items, substituting a zero vector for any item that
/// still fails after retries (the same degradation contract as the remote
/// adapter).
///
/// # Example
///
/// ```rust,ignore
/// use docrag::ollama::OllamaEmbeddingProvider;
///
/// let provider = OllamaEmbeddingProvider::new("nomic-embed-text");
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OllamaEmbeddingProvider {
    client: reqwest::Client,
    base_url: String,
    model: String,
    dimensions: usize,
    attempts: u32,
    base_delay: Duration,
}

impl OllamaEmbeddingProvider {
    /// Create a new provider for the given model against the default
    /// local endpoint.
    pub fn new(model: impl Into<String>) -> Self {
        let model = model.into();
        let dimensions = known_dimensions(&model);
        Self {
            client: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.into(),
            model,
            dimensions,
            attempts: DEFAULT_ATTEMPTS,
            base_delay: LOCAL_BASE_DELAY,
        }
    }

    /// Point the provider at a non-default Ollama endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Override the dimensionality for models not in the known list.
    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = dimensions;
        self
    }

    async fn request_embedding(&self, text: &str) -> std::result::Result<Vec<f32>, CallError> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            embedding: Vec<f32>,
        }

        let body = EmbeddingRequest { model: &self.model, prompt: text };
        let response = self
            .client
            .post(format!("{}/api/embeddings", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CallError::Transient(RagError::Embedding {
                    provider: "ollama".into(),
                    message: format!("request failed: {e}"),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let err = RagError::Embedding {
                provider: "ollama".into(),
                message: format!("API returned {status}: {detail}"),
            };
            return Err(if status.is_server_error() {
                CallError::Transient(err)
            } else {
                // 404 means the model is not pulled; no 4xx is fixed by retrying.
                CallError::Fatal(err)
            });
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            CallError::Fatal(RagError::Embedding {
                provider: "ollama".into(),
                message: format!("failed to parse response: {e}"),
            })
        })?;

        Ok(parsed.embedding)
    }
}

#[async_trait]
impl EmbeddingProvider for OllamaEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "ollama", model = %self.model, text_len = text.len(), "embedding text");

        retry_with_backoff("ollama_embed", self.attempts, self.base_delay, || {
            self.request_embedding(text)
        })
        .await
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for (i, text) in texts.iter().enumerate() {
            match self.embed(text).await {
                Ok(embedding) => vectors.push(embedding),
                Err(e) => {
                    error!(item = i, error = %e, "embedding failed for one item, substituting zeros");
                    vectors.push(vec![0.0; self.dimensions]);
                }
            }
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
