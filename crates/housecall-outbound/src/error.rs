//! Error types for outbound requests.

use thiserror::Error;

/// Result type alias for outbound operations.
pub type Result<T> = std::result::Result<T, OutboundError>;

/// Errors from calling an upstream service.
#[derive(Debug, Error)]
pub enum OutboundError {
    /// Missing or unusable credentials/settings.
    ///
    /// Checked per request rather than at startup, so a deployment
    /// without SMS credentials still serves webhooks.
    #[error("outbound client not configured: {0}")]
    Configuration(String),

    /// The caller's request cannot be forwarded as given.
    #[error("invalid outbound request: {0}")]
    InvalidRequest(String),

    /// The upstream answered with a non-success status.
    #[error("upstream returned HTTP {status}")]
    UpstreamStatus {
        /// Status code the upstream returned.
        status: u16,
        /// Upstream response body, for diagnostics.
        body: String,
    },

    /// Transport-level failure reaching the upstream.
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl OutboundError {
    /// Creates a configuration error from a message.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Creates an invalid-request error from a message.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    /// Whether this error is the caller's fault.
    ///
    /// Maps to HTTP 400 when true, 500 when false.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}
