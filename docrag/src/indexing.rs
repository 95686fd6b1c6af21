//! Document ingestion: chunk → embed → store.

use std::fmt;
use std::sync::Arc;

use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::config::RagConfig;
use crate::document::{Chunk, Document, META_DOCUMENT_ID, META_FILENAME, META_SEQUENCE};
use crate::error::{RagError, Result};
use crate::extract::{FileUpload, TextExtractor};
use crate::pipeline::RagPipeline;
use crate::vision::{ImageAttachment, VisionProvider};

/// Ingestion progress for one document.
///
/// Failures are terminal: a document that fails any transition leaves the
/// corpus unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IndexPhase {
    Pending,
    Chunked,
    Embedded,
    Stored,
    Indexed,
    Failed,
}

impl fmt::Display for IndexPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexPhase::Pending => "pending",
            IndexPhase::Chunked => "chunked",
            IndexPhase::Embedded => "embedded",
            IndexPhase::Stored => "stored",
            IndexPhase::Indexed => "indexed",
            IndexPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Advance the phase, tracing the transition.
fn advance(filename: &str, phase: &mut IndexPhase, to: IndexPhase) {
    debug!(filename, from = %phase, to = %to, "index phase");
    *phase = to;
}

/// Mark the document failed and hand the error back.
fn fail(filename: &str, phase: IndexPhase, error: RagError) -> RagError {
    error!(filename, from = %phase, to = %IndexPhase::Failed, error = %error, "indexing failed");
    error
}

impl RagPipeline {
    /// Index one document: chunk, embed, persist.
    ///
    /// Returns the document with its chunk sequence attached. Chunk ids are
    /// derived from the filename and sequence index, so indexing the same
    /// file again with identical sizing overwrites rather than duplicates.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Validation`] if the document yields no chunks,
    /// and [`RagError::Index`] if embedding or storage fails. Failures
    /// abort the whole document; no partial subset is ever indexed.
    pub async fn index(&self, document: Document, config: &RagConfig) -> Result<Document> {
        self.index_with_images(document, &[], config).await
    }

    /// Extract text from an upload and index the resulting document.
    pub async fn index_upload(
        &self,
        extractor: &dyn TextExtractor,
        file: &FileUpload,
        config: &RagConfig,
    ) -> Result<Document> {
        let text = extractor.extract(file)?;
        let document = Document::new(&file.filename, text)?;
        self.index(document, config).await
    }

    /// Index a document together with images extracted from it.
    ///
    /// When `vision_enabled` is set and a vision provider is registered,
    /// each image is described and the description indexed as an extra
    /// chunk. A failed description skips that image only.
    pub async fn index_with_images(
        &self,
        mut document: Document,
        images: &[ImageAttachment],
        config: &RagConfig,
    ) -> Result<Document> {
        let mut phase = IndexPhase::Pending;
        let filename = document.filename.clone();

        let embeddings_provider = self.registry.embedding(config.embedding_provider)?;
        let store = self.registry.vector_store(config.embedding_provider)?;
        let call_timeout = config.request_timeout();

        let mut chunks = self
            .chunker
            .chunk(&document, config.chunk_size, config.chunk_overlap)
            .map_err(|e| fail(&filename, phase, e))?;
        if chunks.is_empty() {
            return Err(fail(
                &filename,
                phase,
                RagError::Validation(format!("document '{filename}' produced no chunks")),
            ));
        }
        advance(&filename, &mut phase, IndexPhase::Chunked);

        if config.vision_enabled && !images.is_empty() {
            match self.registry.vision() {
                Some(vision) => {
                    let image_chunks = self
                        .describe_images(&document, vision, images, chunks.len(), config)
                        .await
                        .map_err(|e| fail(&filename, phase, e))?;
                    chunks.extend(image_chunks);
                }
                None => {
                    warn!(filename = %filename, "vision enabled but no vision provider registered");
                }
            }
        }

        let embeddings = {
            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            match timeout(call_timeout, embeddings_provider.embed_batch(&texts)).await {
                Ok(result) => result.map_err(|e| {
                    fail(&filename, phase, RagError::Index(format!("embedding failed: {e}")))
                })?,
                Err(_) => {
                    return Err(fail(
                        &filename,
                        phase,
                        RagError::Index(format!(
                            "embedding timed out after {}s",
                            call_timeout.as_secs()
                        )),
                    ));
                }
            }
        };
        if embeddings.len() != chunks.len() {
            return Err(fail(
                &filename,
                phase,
                RagError::Index(format!(
                    "embedding count mismatch: {} chunks, {} vectors",
                    chunks.len(),
                    embeddings.len()
                )),
            ));
        }

        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            chunk.embedding = Some(embedding);
            chunk.metadata.insert(META_DOCUMENT_ID.to_string(), document.id.clone());
            chunk.metadata.insert(META_FILENAME.to_string(), document.filename.clone());
            chunk
                .metadata
                .insert(META_SEQUENCE.to_string(), chunk.sequence_index.to_string());
        }
        advance(&filename, &mut phase, IndexPhase::Embedded);

        match timeout(call_timeout, store.add(&chunks, &document.id)).await {
            Ok(result) => result.map_err(|e| {
                fail(&filename, phase, RagError::Index(format!("storage failed: {e}")))
            })?,
            Err(_) => {
                return Err(fail(
                    &filename,
                    phase,
                    RagError::Index(format!(
                        "storage timed out after {}s",
                        call_timeout.as_secs()
                    )),
                ));
            }
        }
        advance(&filename, &mut phase, IndexPhase::Stored);

        document.chunks = chunks;
        advance(&filename, &mut phase, IndexPhase::Indexed);
        info!(
            filename = %filename,
            document_id = %document.id,
            chunk_count = document.chunk_count(),
            "document indexed"
        );

        Ok(document)
    }

    /// Turn image attachments into description chunks.
    ///
    /// Sequence indices continue after the document's text chunks so chunk
    /// ids stay unique within the file.
    async fn describe_images(
        &self,
        document: &Document,
        vision: Arc<dyn VisionProvider>,
        images: &[ImageAttachment],
        next_index: usize,
        config: &RagConfig,
    ) -> Result<Vec<Chunk>> {
        let mut chunks = Vec::new();
        let mut sequence_index = next_index;

        for image in images {
            match timeout(config.request_timeout(), vision.describe(image)).await {
                Ok(Ok(description)) if !description.trim().is_empty() => {
                    let mut chunk = Chunk::new(
                        &document.filename,
                        &document.id,
                        sequence_index,
                        format!("[IMAGE: {}]\n{}", image.label, description),
                    )?;
                    chunk.metadata.insert("kind".to_string(), "image_description".to_string());
                    chunks.push(chunk);
                    sequence_index += 1;
                }
                Ok(Ok(_)) => {
                    warn!(label = %image.label, "vision returned an empty description, skipping image");
                }
                Ok(Err(e)) => {
                    warn!(label = %image.label, error = %e, "image description failed, skipping image");
                }
                Err(_) => {
                    warn!(label = %image.label, "image description timed out, skipping image");
                }
            }
        }

        if !chunks.is_empty() {
            debug!(
                filename = %document.filename,
                image_chunks = chunks.len(),
                model = vision.model_name(),
                "indexed image descriptions"
            );
        }
        Ok(chunks)
    }
}
