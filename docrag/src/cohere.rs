//! Remote reranker backed by a Cohere-style `/rerank` endpoint.
//!
//! This module is only available when the `cohere` feature is enabled.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RagError, Result};
use crate::reranker::{RerankedItem, Reranker};

/// The default Cohere API base URL.
const DEFAULT_BASE_URL: &str = "https://api.cohere.com/v2";

/// The default rerank model.
const DEFAULT_MODEL: &str = "rerank-v3.5";

/// A [`Reranker`] backed by a Cohere-style rerank REST endpoint.
///
/// No retry loop here: rerank failures are recoverable by contract, and
/// the query path falls back to the hybrid ranking immediately rather
/// than spending the request's time budget on a quality enhancement.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::cohere::CohereReranker;
///
/// let reranker = CohereReranker::new("key")?;
/// let ranked = reranker.rerank("query", &docs, 5).await?;
/// ```
pub struct CohereReranker {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl CohereReranker {
    /// Create a new reranker with the given API key and default model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Rerank`] if the API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Rerank {
                reranker: "cohere".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
        })
    }

    /// Point the reranker at a compatible gateway.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the rerank model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl Reranker for CohereReranker {
    async fn rerank(
        &self,
        query: &str,
        documents: &[&str],
        top_k: usize,
    ) -> Result<Vec<RerankedItem>> {
        #[derive(Serialize)]
        struct RerankRequest<'a> {
            model: &'a str,
            query: &'a str,
            documents: &'a [&'a str],
            top_n: usize,
        }
        #[derive(Deserialize)]
        struct RerankResponse {
            results: Vec<RerankEntry>,
        }
        #[derive(Deserialize)]
        struct RerankEntry {
            index: usize,
            relevance_score: f32,
        }

        if documents.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.model, candidates = documents.len(), top_k, "reranking");

        let body = RerankRequest { model: &self.model, query, documents, top_n: top_k };
        let response = self
            .client
            .post(format!("{}/rerank", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::Rerank {
                reranker: "cohere".into(),
                message: format!("request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RagError::Rerank {
                reranker: "cohere".into(),
                message: format!("API returned {status}: {detail}"),
            });
        }

        let parsed: RerankResponse = response.json().await.map_err(|e| RagError::Rerank {
            reranker: "cohere".into(),
            message: format!("failed to parse response: {e}"),
        })?;

        let mut items: Vec<RerankedItem> = parsed
            .results
            .into_iter()
            .map(|entry| RerankedItem {
                index: entry.index,
                score: entry.relevance_score.clamp(0.0, 1.0),
            })
            .collect();
        items.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        items.truncate(top_k);
        Ok(items)
    }

    fn name(&self) -> &str {
        "cohere"
    }
}
