//! Webhook intake handlers for the call and lead providers.
//!
//! Both endpoints read the raw body, audit it, and hand the parsed JSON
//! to the shared pipeline. Responses always carry a `success` boolean;
//! unrecognized event types are acknowledged with 200 so the provider
//! does not retry deliveries we will never handle.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use housecall_core::{ConversationId, LeadId};
use housecall_ingest::{IngestOutcome, ProviderAdapter};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::AppState;

/// Response for an event the pipeline applied.
#[derive(Debug, Serialize)]
pub struct ProcessedResponse {
    /// Always true for this shape.
    pub success: bool,
    /// Always true for this shape.
    pub processed: bool,
    /// Conversation touched by the event, when it was a call event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<ConversationId>,
    /// Lead the event matched or created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead_id: Option<LeadId>,
    /// Whether this delivery created a lead.
    pub lead_created: bool,
}

/// Response for an event type we acknowledge but do not process.
#[derive(Debug, Serialize)]
pub struct IgnoredResponse {
    /// Always true; the delivery was accepted.
    pub success: bool,
    /// Always false; nothing was applied.
    pub processed: bool,
    /// The event type as the provider sent it.
    pub event_type: String,
}

/// Response when the provider's feature flag is off.
#[derive(Debug, Serialize)]
pub struct DisabledResponse {
    /// Always true; the delivery was accepted and audited.
    pub success: bool,
    /// Always the literal `disabled`.
    pub status: &'static str,
    /// The flag key that gated processing off.
    pub feature: &'static str,
}

/// Error envelope shared by all webhook and outbound endpoints.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Always false for this shape.
    pub success: bool,
    /// Human-readable error description.
    pub error: String,
    /// When the failure was produced.
    pub timestamp: DateTime<Utc>,
}

/// Ingests a voice provider webhook.
///
/// # Errors
///
/// Returns appropriate HTTP status codes:
/// - 400: Known event type with missing/invalid required fields
/// - 500: Lifecycle event for an unrecorded call, storage failure, or a
///   body that is not valid JSON
#[instrument(name = "retell_webhook", skip(state, body))]
pub async fn retell_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let adapter = state.retell;
    process_webhook(&state, &adapter, &body).await
}

/// Ingests a lead provider webhook.
///
/// Same contract as [`retell_webhook`] with the lead provider's adapter.
#[instrument(name = "cinc_webhook", skip(state, body))]
pub async fn cinc_webhook(State(state): State<AppState>, body: Bytes) -> Response {
    let adapter = state.cinc;
    process_webhook(&state, &adapter, &body).await
}

async fn process_webhook(
    state: &AppState,
    adapter: &dyn ProviderAdapter,
    body: &Bytes,
) -> Response {
    let payload: Value = match serde_json::from_slice(body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "webhook body is not valid JSON");
            let raw = String::from_utf8_lossy(body);
            state.pipeline.record_unparseable(adapter.provider(), &raw).await;
            return error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "request body is not valid JSON",
            );
        },
    };

    match state.pipeline.handle(adapter, payload).await {
        Ok(IngestOutcome::Processed(event)) => {
            info!(
                conversation_id = ?event.conversation_id,
                lead_id = ?event.lead_id,
                lead_created = event.lead_created,
                "webhook processed"
            );
            (
                StatusCode::OK,
                Json(ProcessedResponse {
                    success: true,
                    processed: true,
                    conversation_id: event.conversation_id,
                    lead_id: event.lead_id,
                    lead_created: event.lead_created,
                }),
            )
                .into_response()
        },
        Ok(IngestOutcome::Ignored { event_type }) => (
            StatusCode::OK,
            Json(IgnoredResponse { success: true, processed: false, event_type }),
        )
            .into_response(),
        Ok(IngestOutcome::Disabled { feature }) => (
            StatusCode::OK,
            Json(DisabledResponse { success: true, status: "disabled", feature }),
        )
            .into_response(),
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "rejecting malformed webhook payload");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        },
        Err(e) => {
            error!(error = %e, "webhook processing failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        },
    }
}

/// Creates the shared `{ success: false, error, timestamp }` envelope.
pub(crate) fn error_response(status: StatusCode, message: &str) -> Response {
    (
        status,
        Json(ErrorResponse {
            success: false,
            error: message.to_string(),
            timestamp: Utc::now(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_carries_message_and_status() {
        let response = error_response(StatusCode::BAD_REQUEST, "phone_number is required");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn processed_response_omits_absent_ids() {
        let body = serde_json::to_value(ProcessedResponse {
            success: true,
            processed: true,
            conversation_id: None,
            lead_id: Some(LeadId::new()),
            lead_created: true,
        })
        .unwrap();

        assert!(body.get("conversation_id").is_none());
        assert!(body.get("lead_id").is_some());
        assert_eq!(body["lead_created"], true);
    }
}
