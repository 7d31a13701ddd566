//! HTTP client for the relay and the analysis driver.
//!
//! `run_analysis` fires both requests for one ticket and reports progress as
//! `AnalysisEvent`s on a channel. The session that consumes the channel is
//! the only thing that touches the panels.

use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use photolens_core::{ImageDataUrl, PhotoRequest};

use crate::session::AnalysisTicket;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("relay responded with status {0}")]
    Status(reqwest::StatusCode),

    #[error("unreadable response body: {0}")]
    Body(String),
}

pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Thin wrapper over the relay's HTTP API.
#[derive(Debug, Clone)]
pub struct PhotoClient {
    http: reqwest::Client,
    base_url: String,
}

impl PhotoClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post(&self, path: &str, image: &ImageDataUrl) -> Result<reqwest::Response, ClientError> {
        let request = PhotoRequest { image: image.clone() };
        let response = self
            .http
            .post(format!("{}{path}", self.base_url))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            debug!(%status, path, "Relay rejected request");
            return Err(ClientError::Status(status));
        }
        Ok(response)
    }

    /// Raw description bytes, in arrival order.
    pub async fn describe(&self, image: &ImageDataUrl) -> Result<ByteStream, ClientError> {
        let response = self.post("/api/photos/describe", image).await?;
        Ok(response.bytes_stream().map(|item| item.map_err(ClientError::from)).boxed())
    }

    /// The extraction document, read in full before parsing.
    pub async fn extract(&self, image: &ImageDataUrl) -> Result<Value, ClientError> {
        let response = self.post("/api/photos/extract", image).await?;
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Body(e.to_string()))
    }

    pub async fn health(&self) -> Result<Value, ClientError> {
        let response = self.http.get(format!("{}/api/health", self.base_url)).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status));
        }
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Body(e.to_string()))
    }
}

/// Progress of one analysis attempt, tagged with its generation.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisEvent {
    DescriptionChunk { generation: u64, bytes: Bytes },
    DescriptionFinished { generation: u64 },
    DescriptionFailed { generation: u64, error: String },
    ExtractionReceived { generation: u64, document: Value },
    ExtractionFailed { generation: u64, error: String },
}

impl AnalysisEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::DescriptionChunk { generation, .. }
            | Self::DescriptionFinished { generation }
            | Self::DescriptionFailed { generation, .. }
            | Self::ExtractionReceived { generation, .. }
            | Self::ExtractionFailed { generation, .. } => *generation,
        }
    }
}

/// Run both requests for `ticket` concurrently. Returns once both have
/// settled or the receiver has gone away.
pub async fn run_analysis(client: &PhotoClient, ticket: &AnalysisTicket, tx: &mpsc::Sender<AnalysisEvent>) {
    let generation = ticket.generation;

    let describe = async {
        let mut stream = match client.describe(&ticket.image).await {
            Ok(stream) => stream,
            Err(e) => {
                warn!(generation, error = %e, "Description request failed");
                let _ = tx.send(AnalysisEvent::DescriptionFailed { generation, error: e.to_string() }).await;
                return;
            }
        };

        while let Some(item) = stream.next().await {
            let event = match item {
                Ok(bytes) => AnalysisEvent::DescriptionChunk { generation, bytes },
                Err(e) => {
                    warn!(generation, error = %e, "Description stream broke");
                    let _ = tx.send(AnalysisEvent::DescriptionFailed { generation, error: e.to_string() }).await;
                    return;
                }
            };
            if tx.send(event).await.is_err() {
                return;
            }
        }
        let _ = tx.send(AnalysisEvent::DescriptionFinished { generation }).await;
    };

    let extract = async {
        let event = match client.extract(&ticket.image).await {
            Ok(document) => AnalysisEvent::ExtractionReceived { generation, document },
            Err(e) => {
                warn!(generation, error = %e, "Extraction request failed");
                AnalysisEvent::ExtractionFailed { generation, error: e.to_string() }
            }
        };
        let _ = tx.send(event).await;
    };

    tokio::join!(describe, extract);
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;
    use std::sync::Arc;
    use std::time::Duration;

    use photolens_gateway::{build_router, GatewayState};
    use photolens_providers::MockVisionProvider;
    use serde_json::json;

    use super::*;
    use crate::camera::NoCamera;
    use crate::description::PanelState;
    use crate::extraction::{ExtractionView, FAILED_HTML};
    use crate::session::CaptureSession;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    async fn spawn_relay(provider: MockVisionProvider) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = build_router(GatewayState::new(Arc::new(provider)));
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        addr
    }

    async fn analyze(provider: MockVisionProvider) -> (CaptureSession, Vec<AnalysisEvent>) {
        let addr = spawn_relay(provider).await;
        let client = PhotoClient::new(format!("http://{addr}"));

        let mut session = CaptureSession::new(Box::new(NoCamera));
        let ticket = session.accept_file("image/png", PNG).expect("png is accepted");

        let (tx, mut rx) = mpsc::channel(64);
        run_analysis(&client, &ticket, &tx).await;
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            assert!(session.apply(event.clone()));
            events.push(event);
        }
        (session, events)
    }

    #[tokio::test]
    async fn test_both_panels_filled() {
        let provider = MockVisionProvider::default()
            .with_chunks(["A **white**", " cup."])
            .with_extraction(json!({ "objects": ["cup"], "scene_type": "kitchen" }));
        let (session, events) = analyze(provider).await;

        assert!(events.contains(&AnalysisEvent::DescriptionFinished { generation: 1 }));
        assert_eq!(session.description().text(), "A **white** cup.");
        assert_eq!(session.description().state(), PanelState::Done);
        assert!(matches!(session.extraction().view(), Some(ExtractionView::Sections(_))));
        assert!(!session.is_analyzing());
        assert_eq!(session.snapshot().analyze_label, "Re-analyze");
    }

    #[tokio::test]
    async fn test_panels_fail_independently() {
        let provider = MockVisionProvider::default()
            .failing_before_stream("upstream down")
            .with_extraction(json!({ "scene_type": "street" }));
        let (session, _) = analyze(provider).await;

        assert_eq!(session.description().state(), PanelState::Failed);
        assert!(session.extraction().html().contains("street"));
    }

    #[tokio::test]
    async fn test_extraction_failure_shows_fixed_message() {
        let provider = MockVisionProvider::default().failing_extraction("not json");
        let (session, _) = analyze(provider).await;

        assert_eq!(session.extraction().html(), FAILED_HTML);
        assert_eq!(session.description().state(), PanelState::Done);
    }

    #[tokio::test]
    async fn test_health() {
        let addr = spawn_relay(MockVisionProvider::new("scripted")).await;
        let health = PhotoClient::new(format!("http://{addr}/")).health().await.unwrap();
        assert_eq!(health["provider"], "scripted");
    }

    #[tokio::test]
    async fn test_unreachable_relay_reports_http_error() {
        let client = PhotoClient::new("http://127.0.0.1:1");
        let image = ImageDataUrl::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert!(matches!(client.extract(&image).await, Err(ClientError::Http(_))));
    }

    #[tokio::test]
    async fn test_extraction_not_blocked_by_slow_description() {
        let provider = MockVisionProvider::default().with_chunk_delay(Duration::from_millis(50));
        let addr = spawn_relay(provider).await;
        let client = PhotoClient::new(format!("http://{addr}"));

        let mut session = CaptureSession::new(Box::new(NoCamera));
        let ticket = session.accept_file("image/png", PNG).expect("png is accepted");

        let (tx, mut rx) = mpsc::channel(64);
        let driver = tokio::spawn(async move { run_analysis(&client, &ticket, &tx).await });

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            assert!(session.apply(event.clone()));
            events.push(event);
        }
        driver.await.unwrap();

        let position = |wanted: fn(&AnalysisEvent) -> bool| events.iter().position(wanted).unwrap();
        let extracted = position(|e| matches!(e, AnalysisEvent::ExtractionReceived { .. }));
        let finished = position(|e| matches!(e, AnalysisEvent::DescriptionFinished { .. }));
        let first_chunk = position(|e| matches!(e, AnalysisEvent::DescriptionChunk { .. }));
        assert!(extracted < finished, "extraction waited on the description: {events:?}");
        assert!(first_chunk < finished);
        assert_eq!(session.description().state(), PanelState::Done);
        assert!(session.extraction().view().is_some());
    }
}
