//! Core data types: documents and their retrievable chunks.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{RagError, Result};

/// Upper bound on chunk text, in characters.
///
/// Oversized chunks are rejected at construction rather than silently
/// truncated downstream.
pub const MAX_CHUNK_CHARS: usize = 10_000;

/// Metadata key carrying the owning document's filename.
pub const META_FILENAME: &str = "filename";
/// Metadata key carrying the chunk's position within its document.
pub const META_SEQUENCE: &str = "sequence_index";
/// Metadata key carrying the owning document's id.
pub const META_DOCUMENT_ID: &str = "document_id";

/// A source document with its extracted text and derived chunks.
///
/// Immutable once indexed: re-indexing builds a fresh chunk sequence, it
/// never edits chunks in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document.
    pub id: String,
    /// Name of the uploaded file this document came from.
    pub filename: String,
    /// The full extracted text content.
    pub text: String,
    /// Ordered chunk sequence, populated during indexing.
    pub chunks: Vec<Chunk>,
    /// Key-value metadata associated with the document.
    pub metadata: HashMap<String, String>,
    /// When the document was created.
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Create a document from extracted text.
    ///
    /// The chunk sequence starts empty; the index use case fills it.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if the filename is empty.
    pub fn new(filename: impl Into<String>, text: impl Into<String>) -> Result<Self> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(RagError::Validation("document filename must not be empty".into()));
        }

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            filename,
            text: text.into(),
            chunks: Vec::new(),
            metadata: HashMap::new(),
            created_at: Utc::now(),
        })
    }

    /// Number of chunks derived from this document.
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// One retrievable unit of a [`Document`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// `{filename}_{sequence_index}`, which doubles as the persistence
    /// key, so re-indexing the same filename overwrites same-position
    /// chunks.
    pub id: String,
    /// The chunk text, including the header-context prefix when present.
    pub text: String,
    /// The embedding vector, absent until computed during indexing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    /// Key-value metadata; stamped with filename, sequence index, and
    /// document id before persistence.
    pub metadata: HashMap<String, String>,
    /// The id of the owning [`Document`].
    pub document_id: String,
    /// Zero-based position within the owning document.
    pub sequence_index: usize,
    /// Character offset where this chunk's span starts in the source text.
    pub start: usize,
    /// Character offset one past the end of this chunk's span.
    pub end: usize,
    /// Whether the text carries the shared document-header prefix.
    pub has_header: bool,
}

impl Chunk {
    /// Create a chunk for position `sequence_index` of a document.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if the text is empty after trimming
    /// or exceeds [`MAX_CHUNK_CHARS`] characters.
    pub fn new(
        filename: &str,
        document_id: &str,
        sequence_index: usize,
        text: impl Into<String>,
    ) -> Result<Self> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(RagError::Validation("chunk text must not be empty".into()));
        }
        let chars = text.chars().count();
        if chars > MAX_CHUNK_CHARS {
            return Err(RagError::Validation(format!(
                "chunk text is too long ({chars} chars, max {MAX_CHUNK_CHARS})"
            )));
        }

        Ok(Self {
            id: format!("{filename}_{sequence_index}"),
            text,
            embedding: None,
            metadata: HashMap::new(),
            document_id: document_id.to_string(),
            sequence_index,
            start: 0,
            end: 0,
            has_header: false,
        })
    }

    /// Record the character span this chunk covers in the source text.
    pub fn with_span(mut self, start: usize, end: usize) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    /// Record whether the chunk text carries the header prefix.
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }
}
