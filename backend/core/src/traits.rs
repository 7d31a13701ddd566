use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::error::PhotoError;
use crate::photo::ImageDataUrl;

/// Incremental description text, in provider arrival order.
pub type DescriptionStream = BoxStream<'static, anyhow::Result<String>>;

/// Trait for multimodal inference providers used by the relay.
///
/// Model selection, prompt text and the extraction schema are the
/// provider's concern; callers only hand over an image.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name (e.g., "llama", "mock").
    fn name(&self) -> &str;

    /// Open a streaming description of the image.
    ///
    /// An `Err` here means nothing was produced. Errors yielded by the
    /// returned stream happen after some text may already have been sent.
    async fn describe(&self, image: &ImageDataUrl) -> Result<DescriptionStream, PhotoError>;

    /// Run a schema-constrained extraction and return the parsed document.
    async fn extract(&self, image: &ImageDataUrl) -> Result<Value, PhotoError>;
}
