use std::collections::VecDeque;
use std::time::Instant;

use anyhow::anyhow;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::{self, BoxStream, StreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use logging::redact_sensitive_data;
use photolens_core::prompts::{
    extraction_schema, DESCRIBE_PROMPT, EXTRACTION_SCHEMA_NAME, EXTRACT_PROMPT,
};
use photolens_core::{DescriptionStream, ImageDataUrl, PhotoError, VisionProvider};

use crate::sse::{SseDecoder, DONE_MARKER};

pub const DEFAULT_BASE_URL: &str = "https://api.llama.com/compat/v1";
pub const DEFAULT_MODEL: &str = "Llama-4-Maverick-17B-128E-Instruct-FP8";

/// Llama API provider, spoken through its OpenAI-compatible endpoint.
pub struct LlamaProvider {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlamaProvider {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send(&self, body: &ChatRequest<'_>) -> Result<reqwest::Response, PhotoError> {
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| PhotoError::upstream(format!("Llama API request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(PhotoError::UpstreamFailure(format!(
                "Llama API returned {}: {}",
                status,
                redact_sensitive_data(&error_body)
            )));
        }
        Ok(response)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

impl<'a> ChatRequest<'a> {
    fn with_image(model: &'a str, prompt: &'a str, image: &'a ImageDataUrl) -> Self {
        Self {
            model,
            messages: vec![ChatMessage {
                role: "user",
                content: vec![
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.as_str(),
                        },
                    },
                ],
            }],
            stream: false,
            response_format: None,
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl<'a> },
}

#[derive(Serialize)]
struct ImageUrl<'a> {
    url: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
    json_schema: JsonSchemaFormat,
}

#[derive(Serialize)]
struct JsonSchemaFormat {
    name: &'static str,
    schema: Value,
    strict: bool,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    error: Option<Value>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Default, Deserialize)]
struct StreamDelta {
    content: Option<String>,
}

#[async_trait]
impl VisionProvider for LlamaProvider {
    fn name(&self) -> &str {
        "llama"
    }

    async fn describe(&self, image: &ImageDataUrl) -> Result<DescriptionStream, PhotoError> {
        let mut body = ChatRequest::with_image(&self.model, DESCRIBE_PROMPT, image);
        body.stream = true;

        debug!(model = %self.model, image_bytes = image.len(), "Opening description stream");
        let response = self.send(&body).await?;
        Ok(content_deltas(response.bytes_stream().boxed()))
    }

    async fn extract(&self, image: &ImageDataUrl) -> Result<Value, PhotoError> {
        let start = Instant::now();
        let mut body = ChatRequest::with_image(&self.model, EXTRACT_PROMPT, image);
        body.response_format = Some(ResponseFormat {
            kind: "json_schema",
            json_schema: JsonSchemaFormat {
                name: EXTRACTION_SCHEMA_NAME,
                schema: extraction_schema(),
                strict: true,
            },
        });

        debug!(model = %self.model, image_bytes = image.len(), "Sending extraction request");
        let response = self.send(&body).await?;
        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| PhotoError::upstream(format!("Failed to parse Llama API response: {e}")))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| PhotoError::upstream("Llama API returned no content"))?;

        let document: Value = serde_json::from_str(&content)
            .map_err(|e| PhotoError::upstream(format!("Extraction output is not JSON: {e}")))?;

        debug!(latency_ms = start.elapsed().as_millis() as u64, "Extraction completed");
        Ok(document)
    }
}

enum Delta {
    Text(String),
    Done,
    Failed(String),
    Skip,
}

fn parse_delta(data: &str) -> Delta {
    if data.trim() == DONE_MARKER {
        return Delta::Done;
    }
    match serde_json::from_str::<StreamChunk>(data) {
        Ok(StreamChunk {
            error: Some(error), ..
        }) => Delta::Failed(error.to_string()),
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|text| !text.is_empty())
            .map(Delta::Text)
            .unwrap_or(Delta::Skip),
        Err(e) => {
            warn!(error = %e, "Skipping malformed stream event");
            Delta::Skip
        }
    }
}

struct DeltaState {
    bytes: BoxStream<'static, reqwest::Result<Bytes>>,
    decoder: SseDecoder,
    pending: VecDeque<anyhow::Result<String>>,
    finished: bool,
}

impl DeltaState {
    /// Queue the outcome of one SSE event; returns false once the stream is over.
    fn accept(&mut self, data: &str) -> bool {
        match parse_delta(data) {
            Delta::Text(text) => self.pending.push_back(Ok(text)),
            Delta::Skip => {}
            Delta::Done => return false,
            Delta::Failed(message) => {
                self.pending
                    .push_back(Err(anyhow!("provider error mid-stream: {message}")));
                return false;
            }
        }
        true
    }
}

/// Turn an SSE byte stream into content deltas, stopping at `[DONE]` or the
/// first error.
fn content_deltas(bytes: BoxStream<'static, reqwest::Result<Bytes>>) -> DescriptionStream {
    let state = DeltaState {
        bytes,
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    for data in state.decoder.push(&chunk) {
                        if !state.accept(&data) {
                            state.finished = true;
                            break;
                        }
                    }
                }
                Some(Err(e)) => {
                    state.finished = true;
                    state
                        .pending
                        .push_back(Err(anyhow!(e).context("description stream interrupted")));
                }
                None => {
                    state.finished = true;
                    if let Some(data) = state.decoder.finish() {
                        state.accept(&data);
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn image() -> ImageDataUrl {
        ImageDataUrl::parse("data:image/png;base64,iVBORw0KGgo=").unwrap()
    }

    fn sse_body(deltas: &[&str]) -> String {
        let mut body = String::new();
        for delta in deltas {
            let chunk = json!({ "choices": [{ "index": 0, "delta": { "content": delta } }] });
            body.push_str(&format!("data: {chunk}\n\n"));
        }
        body.push_str("data: [DONE]\n\n");
        body
    }

    #[test]
    fn test_parse_delta_variants() {
        assert!(matches!(parse_delta("[DONE]"), Delta::Done));
        assert!(matches!(
            parse_delta(r#"{"choices":[{"delta":{"content":"hi"}}]}"#),
            Delta::Text(t) if t == "hi"
        ));
        assert!(matches!(
            parse_delta(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#),
            Delta::Skip
        ));
        assert!(matches!(
            parse_delta(r#"{"error":{"message":"overloaded"}}"#),
            Delta::Failed(_)
        ));
        assert!(matches!(parse_delta("not json"), Delta::Skip));
    }

    #[tokio::test]
    async fn test_describe_streams_deltas_in_order() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({ "stream": true })))
            .with_status(200)
            .with_header("content-type", "text/event-stream")
            .with_body(sse_body(&["A **red", "** mug ", "on a desk."]))
            .create_async()
            .await;

        let provider = LlamaProvider::new("test-key").with_base_url(server.url());
        let stream = provider.describe(&image()).await.unwrap();
        let chunks: Vec<String> = stream.map(|c| c.unwrap()).collect().await;

        assert_eq!(chunks, vec!["A **red", "** mug ", "on a desk."]);
        assert_eq!(chunks.concat(), "A **red** mug on a desk.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_describe_upstream_error_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let provider = LlamaProvider::new("k").with_base_url(server.url());
        match provider.describe(&image()).await {
            Err(PhotoError::UpstreamFailure(msg)) => assert!(msg.contains("503")),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn test_describe_error_event_ends_stream() {
        let mut server = mockito::Server::new_async().await;
        let body = format!(
            "{}data: {}\n\ndata: {}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"partial\"}}]}\n\n",
            json!({ "error": { "message": "boom" } }),
            json!({ "choices": [{ "delta": { "content": "never" } }] }),
        );
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;

        let provider = LlamaProvider::new("k").with_base_url(server.url());
        let items: Vec<anyhow::Result<String>> =
            provider.describe(&image()).await.unwrap().collect().await;

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().unwrap(), "partial");
        assert!(items[1].is_err());
    }

    #[tokio::test]
    async fn test_extract_sends_schema_and_parses_content() {
        let document = json!({
            "objects": ["cup"],
            "text_content": "",
            "scene_type": "kitchen",
            "colors": ["white"],
            "crucial_elements": ["cup"]
        });
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(Matcher::PartialJson(json!({
                "stream": false,
                "response_format": {
                    "type": "json_schema",
                    "json_schema": { "name": EXTRACTION_SCHEMA_NAME }
                }
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "choices": [{ "message": { "role": "assistant", "content": document.to_string() } }]
                })
                .to_string(),
            )
            .create_async()
            .await;

        let provider = LlamaProvider::new("k").with_base_url(server.url());
        let result = provider.extract(&image()).await.unwrap();
        assert_eq!(result, document);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_extract_rejects_non_json_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                json!({ "choices": [{ "message": { "content": "I see a cup." } }] }).to_string(),
            )
            .create_async()
            .await;

        let provider = LlamaProvider::new("k").with_base_url(server.url());
        let err = provider.extract(&image()).await.unwrap_err();
        assert!(matches!(err, PhotoError::UpstreamFailure(_)));
    }
}
