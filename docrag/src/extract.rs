//! Collaborator boundary for file-format text extraction.
//!
//! PDF/DOCX parsing lives outside the pipeline. The pipeline consumes the
//! extractor's output as opaque UTF-8 text and performs no format-specific
//! handling itself.

use crate::error::{RagError, Result};

/// An uploaded file as an explicit byte buffer.
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Original filename of the upload.
    pub filename: String,
    /// Raw file content.
    pub bytes: Vec<u8>,
}

impl FileUpload {
    /// Create a file upload value.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if the filename or the content is
    /// empty.
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Result<Self> {
        let filename = filename.into();
        if filename.trim().is_empty() {
            return Err(RagError::Validation("upload filename must not be empty".into()));
        }
        if bytes.is_empty() {
            return Err(RagError::Validation("uploaded file is empty".into()));
        }
        Ok(Self { filename, bytes })
    }
}

/// Format-specific text extraction.
pub trait TextExtractor: Send + Sync {
    /// Extract plain text from an uploaded file.
    fn extract(&self, file: &FileUpload) -> Result<String>;
}

/// Pass-through extractor for files that already contain plain text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextExtractor;

impl TextExtractor for PlainTextExtractor {
    fn extract(&self, file: &FileUpload) -> Result<String> {
        Ok(String::from_utf8_lossy(&file.bytes).into_owned())
    }
}
