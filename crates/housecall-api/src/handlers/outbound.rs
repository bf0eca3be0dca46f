//! Outbound endpoints: call provider proxy and SMS send.
//!
//! Both exist so browser clients never hold provider credentials. The
//! proxy forwards requests verbatim with the server-held bearer; the SMS
//! endpoint validates minimally and forwards to the gateway.

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use housecall_core::{phone, LeadId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::{handlers::webhooks::error_response, AppState};

/// Request body for `/proxy/call`.
#[derive(Debug, Deserialize)]
pub struct ProxyCallRequest {
    /// Provider API path to call, e.g. `/v2/create-phone-call`.
    pub endpoint: String,
    /// HTTP method to use. Defaults to POST.
    #[serde(default = "default_method")]
    pub method: String,
    /// Optional JSON body to forward.
    #[serde(default)]
    pub body: Option<Value>,
}

fn default_method() -> String {
    "POST".to_string()
}

/// Request body for `/sms/send`. Field names match the browser client.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSmsRequest {
    /// Recipient phone number, in any format.
    pub phone_number: String,
    /// Message text.
    pub message: String,
    /// Lead this message relates to, for log correlation.
    #[serde(default)]
    pub lead_id: Option<LeadId>,
    /// Pending action to mark completed once the message is accepted.
    #[serde(default)]
    pub action_id: Option<Uuid>,
}

/// Response for an accepted SMS.
#[derive(Debug, Serialize)]
pub struct SendSmsResponse {
    /// Always true for this shape.
    pub success: bool,
    /// Gateway message identifier, when the gateway returned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
}

/// Forwards a request to the voice call provider's REST API.
///
/// Successful upstream responses pass through with their original status
/// and body. Upstream failures are wrapped in the error envelope.
///
/// # Errors
///
/// - 400: method outside the allowed set
/// - 500: missing credentials, transport failure, or non-2xx upstream
#[instrument(name = "proxy_call", skip(state, request), fields(endpoint = %request.endpoint))]
pub async fn proxy_call(
    State(state): State<AppState>,
    Json(request): Json<ProxyCallRequest>,
) -> Response {
    debug!(method = %request.method, "forwarding call provider request");

    match state.call_client.forward(&request.method, &request.endpoint, request.body.as_ref()).await
    {
        Ok(upstream) => {
            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::OK);
            (status, [(header::CONTENT_TYPE, "application/json")], upstream.body).into_response()
        },
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "rejecting proxy request");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        },
        Err(e) => {
            error!(error = %e, "call provider request failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        },
    }
}

/// Sends an SMS through the gateway and optionally completes a pending
/// lead action.
///
/// The action update is best-effort: a failure there is logged and the
/// response still reports the accepted message.
///
/// # Errors
///
/// - 400: phone number under ten digits or empty message
/// - 500: missing credentials, transport failure, or gateway rejection
#[instrument(name = "send_sms", skip(state, request), fields(lead_id = ?request.lead_id))]
pub async fn send_sms(
    State(state): State<AppState>,
    Json(request): Json<SendSmsRequest>,
) -> Response {
    let digits = request.phone_number.chars().filter(char::is_ascii_digit).count();
    if digits < 10 {
        return error_response(StatusCode::BAD_REQUEST, "phoneNumber must have at least 10 digits");
    }
    if request.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "message is required");
    }

    let to = phone::normalize(&request.phone_number);

    match state.sms_client.send(&to, &request.message).await {
        Ok(receipt) => {
            info!(to = %to, sid = ?receipt.sid, "SMS accepted by gateway");

            if let Some(action_id) = request.action_id {
                complete_action(&state, action_id).await;
            }

            (StatusCode::OK, Json(SendSmsResponse { success: true, sid: receipt.sid }))
                .into_response()
        },
        Err(e) if e.is_client_error() => {
            warn!(error = %e, "rejecting SMS request");
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        },
        Err(e) => {
            error!(error = %e, "SMS send failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        },
    }
}

/// Marks the pending action completed. The SMS already went out, so a
/// failure here must not fail the request.
async fn complete_action(state: &AppState, action_id: Uuid) {
    match state.storage.lead_actions.mark_completed(action_id).await {
        Ok(true) => debug!(%action_id, "marked action completed"),
        Ok(false) => warn!(%action_id, "action missing or already completed"),
        Err(e) => warn!(%action_id, error = %e, "failed to mark action completed, continuing"),
    }
}
