//! Fail-open audit logging of inbound deliveries.
//!
//! The audit log is the pipeline's black box: written first, consulted
//! when anything downstream went wrong. Logging must therefore never be
//! the thing that breaks ingestion, so a failed append is reported in
//! the process log and swallowed.

use std::sync::Arc;

use housecall_core::{Storage, WebhookEventId};
use tracing::error;

/// Append-only view of the webhook audit log.
pub struct EventLog {
    storage: Arc<Storage>,
}

impl EventLog {
    /// Creates an event log over the given storage.
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }

    /// Appends one delivery to the audit log.
    ///
    /// Returns the audit row's ID, or `None` when the append failed; the
    /// failure is logged, never propagated.
    pub async fn append(
        &self,
        provider: &str,
        event_type: &str,
        provider_event_id: Option<&str>,
        payload: &serde_json::Value,
    ) -> Option<WebhookEventId> {
        match self
            .storage
            .webhook_events
            .append(provider, event_type, provider_event_id, payload)
            .await
        {
            Ok(id) => Some(id),
            Err(e) => {
                error!(provider, event_type, error = %e, "failed to append audit event");
                None
            },
        }
    }
}
