//! Vision port: image description for indexable image content.

use async_trait::async_trait;

use crate::error::Result;

/// An image handed over by the document extractor, as an explicit byte
/// buffer.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    /// Raw image bytes.
    pub bytes: Vec<u8>,
    /// MIME type, e.g. `image/png`.
    pub media_type: String,
    /// Human-readable origin, e.g. `report.pdf page 3, image 1`.
    pub label: String,
}

impl ImageAttachment {
    /// Create an image attachment.
    pub fn new(
        bytes: Vec<u8>,
        media_type: impl Into<String>,
        label: impl Into<String>,
    ) -> Self {
        Self { bytes, media_type: media_type.into(), label: label.into() }
    }
}

/// A provider that produces a textual description of an image.
///
/// Descriptions are indexed as regular chunks so image content becomes
/// retrievable. A failed description skips that image; it never fails the
/// document.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Describe the image for document search indexing.
    async fn describe(&self, image: &ImageAttachment) -> Result<String>;

    /// Return the identifier of the underlying vision model.
    fn model_name(&self) -> &str;
}
