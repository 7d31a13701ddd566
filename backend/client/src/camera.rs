//! Camera capability.
//!
//! Device access lives outside this crate; a `Camera` is whatever can be
//! switched on, asked for its current frame, and released.

use async_trait::async_trait;

use photolens_core::PhotoError;

#[async_trait]
pub trait Camera: Send {
    /// Acquire the device. Refusal is reported as `CapabilityDenied`.
    async fn start(&mut self) -> Result<(), PhotoError>;

    /// The current frame, rasterised and JPEG-encoded.
    async fn capture_jpeg(&mut self) -> Result<Vec<u8>, PhotoError>;

    /// Release the device. Safe to call when not started.
    fn stop(&mut self);
}

/// Stand-in for environments without a camera: every start is refused.
#[derive(Debug, Default)]
pub struct NoCamera;

#[async_trait]
impl Camera for NoCamera {
    async fn start(&mut self) -> Result<(), PhotoError> {
        Err(PhotoError::CapabilityDenied("no camera available".to_string()))
    }

    async fn capture_jpeg(&mut self) -> Result<Vec<u8>, PhotoError> {
        Err(PhotoError::CapabilityDenied("no camera available".to_string()))
    }

    fn stop(&mut self) {}
}
