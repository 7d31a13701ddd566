//! Photo analysis endpoints.
//!
//! `POST /api/photos/describe` streams the provider's description as plain
//! text; `POST /api/photos/extract` returns the provider's structured
//! document. Both take `{"image": "data:image/..."}`.

use std::convert::Infallible;

use axum::{
    Json,
    body::{Body, Bytes},
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use futures::stream::{self, StreamExt};
use serde_json::Value;
use tracing::{error, warn};
use uuid::Uuid;

use logging::{EventLogger, RelayEvent};
use photolens_core::{DescriptionStream, ImageDataUrl, PhotoError};

use crate::error::ApiError;
use crate::server::GatewayState;

/// Pull a validated image out of the request body.
fn image_from_body(
    request_id: Uuid,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<ImageDataUrl, ApiError> {
    let result = match payload {
        Ok(Json(body)) => match body.get("image").and_then(Value::as_str) {
            Some(raw) => ImageDataUrl::parse(raw),
            None => Err(PhotoError::InvalidInput("image is required".to_string())),
        },
        Err(rejection) => Err(PhotoError::InvalidInput(rejection.body_text())),
    };

    result.map_err(|e| {
        EventLogger::log_event(request_id, RelayEvent::Rejected { reason: e.to_string() });
        ApiError::from(e)
    })
}

fn upstream_failure(request_id: Uuid, endpoint: &str, err: impl std::fmt::Display, public: &str) -> ApiError {
    error!(%request_id, endpoint, error = %err, "Provider call failed");
    EventLogger::log_event(
        request_id,
        RelayEvent::Failed {
            endpoint: endpoint.to_string(),
            error_msg: err.to_string(),
        },
    );
    ApiError::Upstream(public.to_string())
}

/// Handler for `POST /api/photos/describe`.
pub async fn describe(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let request_id = Uuid::new_v4();
    let image = image_from_body(request_id, payload)?;

    EventLogger::log_event(
        request_id,
        RelayEvent::DescribeStarted {
            provider: state.provider.name().to_string(),
            image_bytes: image.len(),
        },
    );

    const PUBLIC: &str = "Failed to describe image";
    let mut upstream = state
        .provider
        .describe(&image)
        .await
        .map_err(|e| upstream_failure(request_id, "describe", e, PUBLIC))?;

    // The status line is only committed once the provider has produced
    // something, so a failure on the first read can still become a 500.
    let first = match upstream.next().await {
        Some(Ok(chunk)) => Some(chunk),
        Some(Err(e)) => return Err(upstream_failure(request_id, "describe", e, PUBLIC)),
        None => None,
    };

    let mut response = Response::new(Body::from_stream(relay_stream(request_id, first, upstream)));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    headers.insert(header::CONTENT_ENCODING, HeaderValue::from_static("identity"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    Ok(response)
}

struct Relay {
    request_id: Uuid,
    first: Option<String>,
    upstream: DescriptionStream,
    chunks: usize,
    bytes: usize,
}

impl Relay {
    fn finish(&self, interrupted: bool) {
        EventLogger::log_event(
            self.request_id,
            RelayEvent::DescribeFinished {
                chunks: self.chunks,
                bytes: self.bytes,
                interrupted,
            },
        );
    }
}

/// Forward deltas in arrival order. A mid-stream provider error ends the
/// body cleanly; the client keeps whatever it already received.
fn relay_stream(
    request_id: Uuid,
    first: Option<String>,
    upstream: DescriptionStream,
) -> impl futures::Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
    let relay = Relay {
        request_id,
        first,
        upstream,
        chunks: 0,
        bytes: 0,
    };

    stream::unfold(Some(relay), |relay| async move {
        let mut relay = relay?;
        let next = match relay.first.take() {
            Some(chunk) => Some(Ok(chunk)),
            None => relay.upstream.next().await,
        };
        match next {
            Some(Ok(chunk)) => {
                relay.chunks += 1;
                relay.bytes += chunk.len();
                Some((Ok(Bytes::from(chunk)), Some(relay)))
            }
            Some(Err(e)) => {
                warn!(request_id = %relay.request_id, error = %e, "Description stream ended early");
                relay.finish(true);
                None
            }
            None => {
                relay.finish(false);
                None
            }
        }
    })
}

/// Handler for `POST /api/photos/extract`.
///
/// The provider's document is returned as-is, keys in the order the model
/// produced them.
pub async fn extract(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request_id = Uuid::new_v4();
    let image = image_from_body(request_id, payload)?;

    let document = state
        .provider
        .extract(&image)
        .await
        .map_err(|e| upstream_failure(request_id, "extract", e, "Failed to extract data"))?;

    EventLogger::log_event(
        request_id,
        RelayEvent::ExtractCompleted {
            provider: state.provider.name().to_string(),
            fields: document.as_object().map_or(0, |fields| fields.len()),
        },
    );

    Ok(Json(document))
}
