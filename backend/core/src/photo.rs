//! Photo payloads.
//!
//! A photo only ever travels as a `data:` URL: the capture side builds one
//! from raw bytes, the relay validates one before forwarding it upstream.

use base64::{engine::general_purpose::STANDARD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::PhotoError;

/// Prefix every accepted image payload must start with.
pub const DATA_URL_IMAGE_PREFIX: &str = "data:image/";

/// A validated `data:image/...` URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ImageDataUrl(String);

impl ImageDataUrl {
    pub fn parse(raw: impl Into<String>) -> Result<Self, PhotoError> {
        let raw = raw.into();
        if !raw.starts_with(DATA_URL_IMAGE_PREFIX) {
            return Err(PhotoError::InvalidInput(
                "image must be a data:image/ URL".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    /// Encode raw image bytes as a base64 data URL.
    pub fn encode(mime_type: &str, bytes: &[u8]) -> Result<Self, PhotoError> {
        Self::parse(format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes)))
    }

    /// MIME type declared in the URL header, e.g. `image/png`.
    pub fn mime_type(&self) -> &str {
        let header = self.0["data:".len()..]
            .split(',')
            .next()
            .unwrap_or_default();
        header.split(';').next().unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl TryFrom<String> for ImageDataUrl {
    type Error = PhotoError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<ImageDataUrl> for String {
    fn from(value: ImageDataUrl) -> Self {
        value.0
    }
}

impl std::fmt::Display for ImageDataUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a photo came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoSource {
    Camera,
    Upload,
}

/// A single captured image held by the client until reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Photo {
    pub source: PhotoSource,
    pub data_url: ImageDataUrl,
}

impl Photo {
    /// Camera frames are always JPEG-encoded.
    pub fn from_camera_frame(jpeg: &[u8]) -> Result<Self, PhotoError> {
        Ok(Self {
            source: PhotoSource::Camera,
            data_url: ImageDataUrl::encode("image/jpeg", jpeg)?,
        })
    }

    pub fn from_upload(mime_type: &str, bytes: &[u8]) -> Result<Self, PhotoError> {
        Ok(Self {
            source: PhotoSource::Upload,
            data_url: ImageDataUrl::encode(mime_type, bytes)?,
        })
    }

    pub fn mime_type(&self) -> &str {
        self.data_url.mime_type()
    }
}

/// Request body accepted by both analysis endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoRequest {
    pub image: ImageDataUrl,
}
