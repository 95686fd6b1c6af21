//! Shared mock providers for integration tests.

#![allow(dead_code)]

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use docrag::{
    EmbeddingBackend, EmbeddingProvider, GenerationRequest, ImageAttachment,
    InMemoryVectorStore, LlmBackend, LlmProvider, ProviderRegistry, RagError, RagPipeline,
    RerankedItem, Reranker, VisionProvider,
};

/// Route all test logs through the capture machinery.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Deterministic bag-of-words embeddings.
///
/// Each token bumps a hashed bucket, then the vector is L2-normalized, so
/// texts sharing vocabulary land close in cosine space. Good enough to
/// exercise retrieval without a real model.
pub struct MockEmbeddingProvider {
    dimensions: usize,
}

impl MockEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbeddingProvider {
    async fn embed(&self, text: &str) -> docrag::Result<Vec<f32>> {
        let mut embedding = vec![0.0f32; self.dimensions];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            let bucket = (hasher.finish() % self.dimensions as u64) as usize;
            embedding[bucket] += 1.0;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }
        Ok(embedding)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "mock-embed"
    }
}

/// Echoes a canned answer; never calls out anywhere.
pub struct MockLlm;

#[async_trait]
impl LlmProvider for MockLlm {
    async fn generate(&self, request: &GenerationRequest) -> docrag::Result<String> {
        Ok(format!("mock answer ({} messages)", request.messages.len()))
    }

    fn model_name(&self) -> &str {
        "mock-llm"
    }
}

/// Fails every rerank call.
pub struct FailingReranker;

#[async_trait]
impl Reranker for FailingReranker {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[&str],
        _top_k: usize,
    ) -> docrag::Result<Vec<RerankedItem>> {
        Err(RagError::Rerank { reranker: "failing".into(), message: "unreachable".into() })
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Hangs far past any request timeout.
pub struct SlowReranker;

#[async_trait]
impl Reranker for SlowReranker {
    async fn rerank(
        &self,
        _query: &str,
        _documents: &[&str],
        _top_k: usize,
    ) -> docrag::Result<Vec<RerankedItem>> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(Vec::new())
    }

    fn name(&self) -> &str {
        "slow"
    }
}

/// Describes every image the same way, tagged with its label.
pub struct MockVision;

#[async_trait]
impl VisionProvider for MockVision {
    async fn describe(&self, image: &ImageAttachment) -> docrag::Result<String> {
        Ok(format!("schéma technique ({})", image.label))
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}

/// Fails every description call.
pub struct FailingVision;

#[async_trait]
impl VisionProvider for FailingVision {
    async fn describe(&self, _image: &ImageAttachment) -> docrag::Result<String> {
        Err(RagError::Generation { model: "mock-vision".into(), message: "no eyes".into() })
    }

    fn model_name(&self) -> &str {
        "mock-vision"
    }
}

/// Embedding dimensionality used across the integration tests.
pub const DIM: usize = 64;

/// A pipeline over an in-memory store with mock embedding and generation.
pub fn build_pipeline() -> RagPipeline {
    build_pipeline_with(|registry| registry)
}

/// Same as [`build_pipeline`], with a hook to extend the registry (e.g.
/// register a reranker).
pub fn build_pipeline_with(
    extend: impl FnOnce(docrag::ProviderRegistryBuilder) -> docrag::ProviderRegistryBuilder,
) -> RagPipeline {
    let builder = ProviderRegistry::builder()
        .embedding(EmbeddingBackend::Local, Arc::new(MockEmbeddingProvider::new(DIM)))
        .vector_store(EmbeddingBackend::Local, Arc::new(InMemoryVectorStore::new()))
        .llm(LlmBackend::Primary, Arc::new(MockLlm));
    let registry = extend(builder).build().expect("registry should build");
    RagPipeline::builder().registry(registry).build().expect("pipeline should build")
}
