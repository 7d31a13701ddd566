use std::time::Duration;

use anyhow::anyhow;
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use serde_json::{json, Value};

use photolens_core::{DescriptionStream, ImageDataUrl, PhotoError, VisionProvider};

/// How a scripted description should go wrong, if at all.
#[derive(Debug, Clone)]
enum DescribeFault {
    None,
    BeforeStream(String),
    AfterChunks(usize, String),
}

/// A vision provider that replays canned output.
pub struct MockVisionProvider {
    name: String,
    chunks: Vec<String>,
    chunk_delay: Option<Duration>,
    describe_fault: DescribeFault,
    extraction: Result<Value, String>,
}

impl MockVisionProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            chunks: [
                "## Overview\n\n",
                "A **white ceramic cup** sits on a ",
                "*wooden* kitchen counter.\n\n",
                "- Morning light from a window\n",
                "- A folded towel beside the cup\n",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            chunk_delay: None,
            describe_fault: DescribeFault::None,
            extraction: Ok(json!({
                "objects": ["cup", "towel", "counter"],
                "text_content": "",
                "scene_type": "kitchen",
                "colors": ["white", "brown"],
                "crucial_elements": ["cup"]
            })),
        }
    }

    pub fn with_chunks<I, S>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chunks = chunks.into_iter().map(Into::into).collect();
        self
    }

    /// Pause between chunks so streaming is observable.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    pub fn with_extraction(mut self, document: Value) -> Self {
        self.extraction = Ok(document);
        self
    }

    pub fn failing_extraction(mut self, message: impl Into<String>) -> Self {
        self.extraction = Err(message.into());
        self
    }

    /// Fail to open the description stream at all.
    pub fn failing_before_stream(mut self, message: impl Into<String>) -> Self {
        self.describe_fault = DescribeFault::BeforeStream(message.into());
        self
    }

    /// Yield `count` chunks, then an error.
    pub fn failing_after(mut self, count: usize, message: impl Into<String>) -> Self {
        self.describe_fault = DescribeFault::AfterChunks(count, message.into());
        self
    }
}

impl Default for MockVisionProvider {
    fn default() -> Self {
        Self::new("mock")
    }
}

#[async_trait]
impl VisionProvider for MockVisionProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn describe(&self, _image: &ImageDataUrl) -> Result<DescriptionStream, PhotoError> {
        let mut items: Vec<anyhow::Result<String>> = match &self.describe_fault {
            DescribeFault::BeforeStream(message) => {
                return Err(PhotoError::UpstreamFailure(message.clone()));
            }
            DescribeFault::None => self.chunks.iter().cloned().map(Ok).collect(),
            DescribeFault::AfterChunks(count, _) => {
                self.chunks.iter().take(*count).cloned().map(Ok).collect()
            }
        };
        if let DescribeFault::AfterChunks(_, message) = &self.describe_fault {
            items.push(Err(anyhow!(message.clone())));
        }

        let delay = self.chunk_delay;
        Ok(stream::iter(items)
            .then(move |item| async move {
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                item
            })
            .boxed())
    }

    async fn extract(&self, _image: &ImageDataUrl) -> Result<Value, PhotoError> {
        self.extraction
            .clone()
            .map_err(PhotoError::UpstreamFailure)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> ImageDataUrl {
        ImageDataUrl::parse("data:image/jpeg;base64,AAAA").unwrap()
    }

    #[tokio::test]
    async fn test_default_script_is_well_formed() {
        let provider = MockVisionProvider::default();
        let text: Vec<String> = provider
            .describe(&image())
            .await
            .unwrap()
            .map(|c| c.unwrap())
            .collect()
            .await;
        assert!(text.concat().contains("white ceramic cup"));

        let doc = provider.extract(&image()).await.unwrap();
        assert_eq!(doc["scene_type"], "kitchen");
    }

    #[tokio::test]
    async fn test_failing_after_yields_partial_then_error() {
        let provider = MockVisionProvider::default()
            .with_chunks(["a", "b", "c"])
            .failing_after(2, "dropped");
        let items: Vec<_> = provider.describe(&image()).await.unwrap().collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].as_ref().unwrap(), "b");
        assert!(items[2].is_err());
    }

    #[tokio::test]
    async fn test_failing_before_stream() {
        let provider = MockVisionProvider::default().failing_before_stream("down");
        assert!(provider.describe(&image()).await.is_err());
    }
}
