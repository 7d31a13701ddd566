//! Telemetry and structured logging components for PhotoLens.
//!
//! Handles subscriber setup, log redaction, and relay lifecycle events.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{EventLogger, RelayEvent, RelayEventEntry};
pub use logger::{init_logger, LogFormat};
pub use redact::redact_sensitive_data;
