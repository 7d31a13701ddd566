//! Relay Event Logger
//!
//! Lifecycle events for analysis requests, emitted as structured entries on
//! the `relay_events` target so they land in the NDJSON file alongside
//! ordinary logs.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    DescribeStarted {
        provider: String,
        image_bytes: usize,
    },
    DescribeFinished {
        chunks: usize,
        bytes: usize,
        interrupted: bool,
    },
    ExtractCompleted {
        provider: String,
        fields: usize,
    },
    Rejected {
        reason: String,
    },
    Failed {
        endpoint: String,
        error_msg: String,
    },
}

#[derive(Debug, Serialize)]
pub struct RelayEventEntry {
    pub request_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event: RelayEvent,
}

pub struct EventLogger;

impl EventLogger {
    /// Build the entry for an event, redacting any free-text fields.
    pub fn entry(request_id: Uuid, mut event: RelayEvent) -> RelayEventEntry {
        match &mut event {
            RelayEvent::Rejected { reason } => *reason = redact_sensitive_data(reason),
            RelayEvent::Failed { error_msg, .. } => *error_msg = redact_sensitive_data(error_msg),
            _ => {}
        }
        RelayEventEntry {
            request_id,
            timestamp: Utc::now(),
            event,
        }
    }

    pub fn log_event(request_id: Uuid, event: RelayEvent) {
        let is_failure = matches!(event, RelayEvent::Failed { .. });
        let entry = Self::entry(request_id, event);
        let payload = serde_json::to_string(&entry).unwrap_or_default();
        if is_failure {
            warn!(target: "relay_events", event = %payload, "Relay event");
        } else {
            info!(target: "relay_events", event = %payload, "Relay event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_message_is_redacted() {
        let entry = EventLogger::entry(
            Uuid::new_v4(),
            RelayEvent::Failed {
                endpoint: "describe".into(),
                error_msg: "401 for Bearer abc.def".into(),
            },
        );
        match entry.event {
            RelayEvent::Failed { error_msg, .. } => assert_eq!(error_msg, "401 for [REDACTED_TOKEN]"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_entry_serializes_with_type_tag() {
        let entry = EventLogger::entry(
            Uuid::nil(),
            RelayEvent::DescribeFinished { chunks: 3, bytes: 42, interrupted: false },
        );
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["event"]["type"], "describe_finished");
        assert_eq!(json["event"]["bytes"], 42);
    }
}
