//! OpenAI-compatible remote providers: embeddings, chat, and vision.
//!
//! These adapters speak the OpenAI REST dialect (`/embeddings`,
//! `/chat/completions`) via `reqwest`, so they also cover self-hosted
//! OpenAI-compatible gateways through
//! [`with_base_url`](OpenAIEmbeddingProvider::with_base_url).
//!
//! This module is only available when the `openai` feature is enabled.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use futures::future;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, error, warn};

use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::{ChatRole, GenerationRequest, LlmProvider};
use crate::retry::{CallError, DEFAULT_ATTEMPTS, DEFAULT_BASE_DELAY, retry_with_backoff};
use crate::vision::{ImageAttachment, VisionProvider};

/// The default OpenAI API base URL.
const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// The default embedding model and its dimensionality.
const DEFAULT_EMBED_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBED_DIMENSIONS: usize = 1536;

/// Character limit per embedded text; longer inputs are truncated at a
/// word boundary and marked.
const MAX_CHARS_PER_TEXT: usize = 4000;
const TRUNCATION_MARKER: &str = "...";

/// Texts per embedding request and concurrent in-flight requests.
const TEXTS_PER_REQUEST: usize = 10;
const MAX_IN_FLIGHT: usize = 2;

/// Pause between request waves, to stay under provider throughput
/// ceilings.
const PACING: Duration = Duration::from_millis(100);

/// Strip control characters and collapse whitespace runs.
///
/// Control bytes inside extracted PDF text are a common cause of
/// embedding-endpoint rejections.
fn clean_text(text: &str) -> String {
    let replaced: String =
        text.chars().map(|c| if c.is_control() { ' ' } else { c }).collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Deterministically truncate an overlong text for an embedding request.
///
/// Prefers a cut at the last word boundary within the final 20% of the
/// limit and appends a truncation marker.
fn truncate_for_request(text: &str, max_chars: usize) -> String {
    let cleaned = clean_text(text);
    if cleaned.chars().count() <= max_chars {
        return cleaned;
    }

    let mut cut: String = cleaned.chars().take(max_chars).collect();
    if let Some(space) = cut.rfind(' ') {
        let chars_before = cut[..space].chars().count();
        if chars_before * 10 >= max_chars * 8 {
            cut.truncate(space);
        }
    }
    format!("{cut}{TRUNCATION_MARKER}")
}

/// Classify an HTTP status for the retry loop.
fn classify_status(status: StatusCode, error: RagError) -> CallError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        CallError::RateLimited(error)
    } else if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT {
        CallError::Transient(error)
    } else {
        CallError::Fatal(error)
    }
}

/// Extract the provider's error message from a response body, falling
/// back to the raw body.
fn error_detail(body: &str) -> String {
    #[derive(Deserialize)]
    struct ErrorResponse {
        error: ErrorDetail,
    }
    #[derive(Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    serde_json::from_str::<ErrorResponse>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string())
}

// ── Embeddings ─────────────────────────────────────────────────────

/// An [`EmbeddingProvider`] backed by an OpenAI-compatible embeddings
/// endpoint.
///
/// Owns the request-side resilience: deterministic truncation, bounded
/// retry with backoff on rate limits and transient server errors, batch
/// splitting with paced, bounded concurrency, and zero-vector substitution
/// for items that fail even when embedded alone.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::openai::OpenAIEmbeddingProvider;
///
/// let provider = OpenAIEmbeddingProvider::new("sk-...")?;
/// let embedding = provider.embed("hello world").await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    max_chars: usize,
    batch_size: usize,
    attempts: u32,
    base_delay: Duration,
    pacing: Duration,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the given API key and the default model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Embedding`] if the API key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(RagError::Embedding {
                provider: "openai".into(),
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_EMBED_MODEL.into(),
            dimensions: DEFAULT_EMBED_DIMENSIONS,
            max_chars: MAX_CHARS_PER_TEXT,
            batch_size: TEXTS_PER_REQUEST,
            attempts: DEFAULT_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
            pacing: PACING,
        })
    }

    /// Create a new provider using the `OPENAI_API_KEY` environment
    /// variable.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY").map_err(|_| RagError::Embedding {
            provider: "openai".into(),
            message: "OPENAI_API_KEY environment variable not set".into(),
        })?;
        Self::new(api_key)
    }

    /// Point the provider at an OpenAI-compatible gateway.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set the model name and its embedding dimensionality.
    pub fn with_model(mut self, model: impl Into<String>, dimensions: usize) -> Self {
        self.model = model.into();
        self.dimensions = dimensions;
        self
    }

    /// One embeddings request, classified for the retry loop.
    async fn request_embeddings(
        &self,
        inputs: &[String],
    ) -> std::result::Result<Vec<Vec<f32>>, CallError> {
        #[derive(Serialize)]
        struct EmbeddingRequest<'a> {
            model: &'a str,
            input: &'a [String],
            encoding_format: &'a str,
        }
        #[derive(Deserialize)]
        struct EmbeddingResponse {
            data: Vec<EmbeddingData>,
        }
        #[derive(Deserialize)]
        struct EmbeddingData {
            index: usize,
            embedding: Vec<f32>,
        }

        let body =
            EmbeddingRequest { model: &self.model, input: inputs, encoding_format: "float" };
        let response = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CallError::Transient(RagError::Embedding {
                    provider: "openai".into(),
                    message: format!("request failed: {e}"),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(&response.text().await.unwrap_or_default());
            return Err(classify_status(
                status,
                RagError::Embedding {
                    provider: "openai".into(),
                    message: format!("API returned {status}: {detail}"),
                },
            ));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            CallError::Fatal(RagError::Embedding {
                provider: "openai".into(),
                message: format!("failed to parse response: {e}"),
            })
        })?;

        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    /// Embed one sub-batch, degrading instead of failing.
    ///
    /// The whole sub-batch is retried first; if it still fails, items are
    /// embedded one by one and any item that fails even alone becomes a
    /// zero vector, so one bad chunk cannot sink a document.
    async fn embed_sub_batch(&self, batch: &[String]) -> Vec<Vec<f32>> {
        let attempt = retry_with_backoff("openai_embed_batch", self.attempts, self.base_delay, || {
            self.request_embeddings(batch)
        })
        .await;

        match attempt {
            Ok(vectors) if vectors.len() == batch.len() => vectors,
            Ok(vectors) => {
                warn!(
                    expected = batch.len(),
                    got = vectors.len(),
                    "embedding count mismatch, falling back to per-item embedding"
                );
                self.embed_items_individually(batch).await
            }
            Err(e) => {
                warn!(error = %e, "batch embedding failed, falling back to per-item embedding");
                self.embed_items_individually(batch).await
            }
        }
    }

    async fn embed_items_individually(&self, batch: &[String]) -> Vec<Vec<f32>> {
        let mut vectors = Vec::with_capacity(batch.len());
        for item in batch {
            let input = std::slice::from_ref(item);
            let attempt =
                retry_with_backoff("openai_embed_item", self.attempts, self.base_delay, || {
                    self.request_embeddings(input)
                })
                .await;

            match attempt {
                Ok(mut v) if !v.is_empty() => vectors.push(v.remove(0)),
                Ok(_) => {
                    error!("provider returned no embedding for one item, substituting zeros");
                    vectors.push(vec![0.0; self.dimensions]);
                }
                Err(e) => {
                    error!(error = %e, "embedding failed for one item, substituting zeros");
                    vectors.push(vec![0.0; self.dimensions]);
                }
            }
        }
        vectors
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = "openai", text_len = text.len(), "embedding single text");

        let input = vec![truncate_for_request(text, self.max_chars)];
        let mut vectors =
            retry_with_backoff("openai_embed", self.attempts, self.base_delay, || {
                self.request_embeddings(&input)
            })
            .await?;

        if vectors.is_empty() {
            return Err(RagError::Embedding {
                provider: "openai".into(),
                message: "API returned empty response".into(),
            });
        }
        Ok(vectors.remove(0))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(provider = "openai", batch_size = texts.len(), model = %self.model, "embedding batch");

        let prepared: Vec<String> =
            texts.iter().map(|t| truncate_for_request(t, self.max_chars)).collect();
        let sub_batches: Vec<&[String]> = prepared.chunks(self.batch_size).collect();

        let mut out = Vec::with_capacity(prepared.len());
        for (wave, batches) in sub_batches.chunks(MAX_IN_FLIGHT).enumerate() {
            if wave > 0 {
                sleep(self.pacing).await;
            }
            let wave_results =
                future::join_all(batches.iter().map(|batch| self.embed_sub_batch(batch))).await;
            for vectors in wave_results {
                out.extend(vectors);
            }
        }

        Ok(out)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ── Chat ───────────────────────────────────────────────────────────

/// An [`LlmProvider`] backed by an OpenAI-compatible chat completions
/// endpoint.
///
/// # Example
///
/// ```rust,ignore
/// use docrag::openai::OpenAIChatModel;
///
/// let model = OpenAIChatModel::compatible("key", "https://llm.example/v1", "llama-3.3-70b")?;
/// let answer = model.generate(&request).await?;
/// ```
pub struct OpenAIChatModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    attempts: u32,
    base_delay: Duration,
}

impl OpenAIChatModel {
    /// Create a new chat model against the default OpenAI endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the API key is empty.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let model = model.into();
        if api_key.is_empty() {
            return Err(RagError::Generation {
                model,
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model,
            attempts: DEFAULT_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        })
    }

    /// Create a chat model for an OpenAI-compatible gateway.
    pub fn compatible(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(api_key, model)?.with_base_url(base_url))
    }

    /// Point the model at an OpenAI-compatible gateway.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request_completion(
        &self,
        request: &GenerationRequest,
    ) -> std::result::Result<String, CallError> {
        #[derive(Serialize)]
        struct WireMessage<'a> {
            role: &'a str,
            content: &'a str,
        }
        #[derive(Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: Vec<WireMessage<'a>>,
            temperature: f32,
            max_tokens: u32,
        }
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }
        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: Option<String>,
        }

        let mut messages = Vec::with_capacity(request.messages.len() + 1);
        messages.push(WireMessage {
            role: ChatRole::System.as_str(),
            content: &request.system_prompt,
        });
        messages.extend(
            request
                .messages
                .iter()
                .map(|m| WireMessage { role: m.role.as_str(), content: &m.content }),
        );

        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CallError::Transient(RagError::Generation {
                    model: self.model.clone(),
                    message: format!("request failed: {e}"),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(&response.text().await.unwrap_or_default());
            return Err(classify_status(
                status,
                RagError::Generation {
                    model: self.model.clone(),
                    message: format!("API returned {status}: {detail}"),
                },
            ));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            CallError::Fatal(RagError::Generation {
                model: self.model.clone(),
                message: format!("failed to parse response: {e}"),
            })
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                CallError::Fatal(RagError::Generation {
                    model: self.model.clone(),
                    message: "API returned an empty completion".into(),
                })
            })
    }
}

#[async_trait]
impl LlmProvider for OpenAIChatModel {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        debug!(
            model = %self.model,
            message_count = request.messages.len(),
            temperature = request.temperature,
            max_tokens = request.max_tokens,
            "generating completion"
        );

        retry_with_backoff("openai_chat", self.attempts, self.base_delay, || {
            self.request_completion(request)
        })
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ── Vision ─────────────────────────────────────────────────────────

/// Prompt used when describing images for indexing.
const VISION_PROMPT: &str =
    "Describe this image in detail for document search indexing. Include any visible text.";

/// Token budget for one image description.
const DESCRIPTION_MAX_TOKENS: u32 = 512;

/// A [`VisionProvider`] backed by an OpenAI-compatible multimodal chat
/// endpoint. Images travel as base64 data URLs.
pub struct OpenAIVisionModel {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    attempts: u32,
    base_delay: Duration,
}

impl OpenAIVisionModel {
    /// Create a new vision model.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the API key is empty.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let model = model.into();
        if api_key.is_empty() {
            return Err(RagError::Generation {
                model,
                message: "API key must not be empty".into(),
            });
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.into(),
            model,
            attempts: DEFAULT_ATTEMPTS,
            base_delay: DEFAULT_BASE_DELAY,
        })
    }

    /// Point the model at an OpenAI-compatible gateway.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request_description(
        &self,
        image: &ImageAttachment,
    ) -> std::result::Result<String, CallError> {
        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<Choice>,
        }
        #[derive(Deserialize)]
        struct Choice {
            message: ChoiceMessage,
        }
        #[derive(Deserialize)]
        struct ChoiceMessage {
            content: Option<String>,
        }

        let data_url =
            format!("data:{};base64,{}", image.media_type, BASE64.encode(&image.bytes));
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": VISION_PROMPT },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }],
            "max_tokens": DESCRIPTION_MAX_TOKENS,
        });

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                CallError::Transient(RagError::Generation {
                    model: self.model.clone(),
                    message: format!("request failed: {e}"),
                })
            })?;

        let status = response.status();
        if !status.is_success() {
            let detail = error_detail(&response.text().await.unwrap_or_default());
            return Err(classify_status(
                status,
                RagError::Generation {
                    model: self.model.clone(),
                    message: format!("API returned {status}: {detail}"),
                },
            ));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            CallError::Fatal(RagError::Generation {
                model: self.model.clone(),
                message: format!("failed to parse response: {e}"),
            })
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                CallError::Fatal(RagError::Generation {
                    model: self.model.clone(),
                    message: "API returned an empty description".into(),
                })
            })
    }
}

#[async_trait]
impl VisionProvider for OpenAIVisionModel {
    async fn describe(&self, image: &ImageAttachment) -> Result<String> {
        debug!(model = %self.model, label = %image.label, bytes = image.bytes.len(), "describing image");

        retry_with_backoff("openai_vision", self.attempts, self.base_delay, || {
            self.request_description(image)
        })
        .await
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
