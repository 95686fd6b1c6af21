//! Query-side data types: queries, search results, and answer bundles.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RagError, Result};

/// Upper bound on query text, in characters.
pub const MAX_QUERY_CHARS: usize = 20_000;

/// One user question.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Query {
    /// Unique identifier for the query.
    pub id: String,
    /// The trimmed query text.
    pub text: String,
    /// The query embedding, absent until computed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// When the query was created.
    pub created_at: DateTime<Utc>,
}

impl Query {
    /// Create a query, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if the text is empty after trimming
    /// or exceeds [`MAX_QUERY_CHARS`] characters.
    pub fn new(text: impl AsRef<str>) -> Result<Self> {
        let text = text.as_ref().trim();
        if text.is_empty() {
            return Err(RagError::Validation("query text must not be empty".into()));
        }
        let chars = text.chars().count();
        if chars > MAX_QUERY_CHARS {
            return Err(RagError::Validation(format!(
                "query text is too long ({chars} chars, max {MAX_QUERY_CHARS})"
            )));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            text: text.to_string(),
            embedding: None,
            created_at: Utc::now(),
        })
    }
}

/// One retrieved chunk scored against a query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Identifier of the retrieved chunk.
    pub chunk_id: String,
    /// The retrieved chunk text.
    pub text: String,
    /// Relevance score, normalized to [0, 1].
    pub score: f32,
    /// Metadata carried over from the chunk.
    pub metadata: HashMap<String, String>,
}

impl SearchResult {
    /// Create a search result.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if `score` lies outside [0, 1].
    pub fn new(
        chunk_id: impl Into<String>,
        text: impl Into<String>,
        score: f32,
        metadata: HashMap<String, String>,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&score) {
            return Err(RagError::Validation(format!(
                "search result score must lie in [0, 1], got {score}"
            )));
        }

        Ok(Self { chunk_id: chunk_id.into(), text: text.into(), score, metadata })
    }
}

/// The final answer bundle for one query.
///
/// Owned by the query use case for the duration of one request, then handed
/// to the caller as a read-only value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RagResponse {
    /// Unique identifier for the response.
    pub id: String,
    /// The originating query, with its embedding attached.
    pub query: Query,
    /// The generated answer text.
    pub answer: String,
    /// The search results used as grounding, in ranked order.
    pub sources: Vec<SearchResult>,
    /// Name of the generation model that produced the answer.
    pub model_name: String,
    /// When the response was assembled.
    pub created_at: DateTime<Utc>,
}

impl RagResponse {
    /// Assemble a response bundle.
    pub fn new(
        query: Query,
        answer: impl Into<String>,
        sources: Vec<SearchResult>,
        model_name: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            query,
            answer: answer.into(),
            sources,
            model_name: model_name.into(),
            created_at: Utc::now(),
        }
    }

    /// Number of grounding sources used for the answer.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }
}
