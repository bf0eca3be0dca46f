//! Error types for webhook event processing.
//!
//! The split here drives HTTP status mapping: validation problems are the
//! sender's fault, a missing conversation on a lifecycle event means we
//! lost data somewhere, and storage errors are ours.

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, IngestError>;

/// Errors from processing a webhook event.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Payload was recognized but a required field is missing or
    /// malformed.
    #[error("invalid payload: {0}")]
    Validation(String),

    /// A lifecycle event referenced a call we never recorded.
    ///
    /// This is loud on purpose: a `call_ended` with no conversation row
    /// means the `call_started` write was lost, and patching the row up
    /// silently would hide that.
    #[error("no conversation found for call {call_id}")]
    CallNotFound {
        /// Provider call ID the event referenced.
        call_id: String,
    },

    /// Database operation failed.
    #[error("storage error: {0}")]
    Storage(#[from] housecall_core::CoreError),
}

impl IngestError {
    /// Creates a validation error from a message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Creates a call-not-found error.
    pub fn call_not_found(call_id: impl Into<String>) -> Self {
        Self::CallNotFound { call_id: call_id.into() }
    }

    /// Whether this error is the sender's fault.
    ///
    /// Maps to HTTP 400 when true, 500 when false.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
