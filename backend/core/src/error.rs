use thiserror::Error;

/// Top-level error type for PhotoLens analysis.
#[derive(Debug, Error)]
pub enum PhotoError {
    /// The image payload is missing or is not a `data:image/` URL.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The inference provider was unreachable, failed, or returned unparsable output.
    #[error("upstream failure: {0}")]
    UpstreamFailure(String),

    /// The camera capability was refused.
    #[error("capability denied: {0}")]
    CapabilityDenied(String),

    /// Startup configuration is missing or inconsistent.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl PhotoError {
    pub fn upstream(err: impl std::fmt::Display) -> Self {
        Self::UpstreamFailure(err.to_string())
    }

    /// Whether the caller, rather than the provider, is at fault.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_classification() {
        assert!(PhotoError::InvalidInput("missing".into()).is_client_error());
        assert!(!PhotoError::upstream("timeout").is_client_error());
    }

    #[test]
    fn test_upstream_display() {
        let err = PhotoError::upstream("connection reset");
        assert_eq!(err.to_string(), "upstream failure: connection reset");
    }
}
