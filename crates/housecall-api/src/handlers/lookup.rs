//! Caller lookup endpoints used by the voice agent and the dashboard.
//!
//! `/lookup/phone` answers "who is calling" with enough context for the
//! agent's opening line. `/lookup/lead` is a plain record fetch by phone.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use housecall_core::{phone, Lead, LeadId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use crate::{handlers::webhooks::error_response, AppState};

/// Request body for `/lookup/phone`.
#[derive(Debug, Deserialize)]
pub struct PhoneLookupRequest {
    /// Caller's phone number, in any format.
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Caller context returned to the voice agent.
#[derive(Debug, Serialize)]
pub struct PhoneLookupResponse {
    /// Always true for this shape.
    pub success: bool,
    /// Matched lead.
    pub lead_id: LeadId,
    /// Caller's first name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    /// Caller's last name, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    /// Canonical phone the match was made on.
    pub phone: String,
    /// Properties the caller has shown interest in.
    pub property_interests: Value,
    /// Buying timeline from the source CRM, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer_timeline: Option<String>,
    /// Suggested opening line for the agent.
    pub greeting: String,
}

/// Miss response for both lookup endpoints.
#[derive(Debug, Serialize)]
pub struct LookupMissResponse {
    /// Always false for this shape.
    pub success: bool,
    /// What was not found.
    pub message: String,
}

/// Query string for `/lookup/lead`.
#[derive(Debug, Deserialize)]
pub struct LeadLookupQuery {
    /// Phone number to search by, in any format.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Resolves a caller's phone number to lead context for the voice agent.
///
/// Checks the CRM-synced phone mapping first because it carries property
/// interests and timeline; falls back to the leads table for callers we
/// created ourselves.
///
/// # Errors
///
/// - 400: missing or empty `phone_number`
/// - 404: no mapping and no lead for the number
/// - 500: storage failure
#[instrument(name = "phone_lookup", skip(state, request))]
pub async fn phone_lookup(
    State(state): State<AppState>,
    Json(request): Json<PhoneLookupRequest>,
) -> Response {
    let Some(raw) = request.phone_number.filter(|p| !p.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "phone_number is required");
    };

    let canonical = phone::normalize(&raw);
    debug!(phone = %canonical, "looking up caller");

    match state.storage.phone_mappings.find_by_phone(&canonical).await {
        Ok(Some(mapping)) => {
            let greeting = build_greeting(
                mapping.first_name.as_deref(),
                &mapping.property_interests,
                mapping.buyer_timeline.as_deref(),
            );
            (
                StatusCode::OK,
                Json(PhoneLookupResponse {
                    success: true,
                    lead_id: mapping.lead_id,
                    first_name: mapping.first_name,
                    last_name: mapping.last_name,
                    phone: mapping.phone,
                    property_interests: mapping.property_interests,
                    buyer_timeline: mapping.buyer_timeline,
                    greeting,
                }),
            )
                .into_response()
        },
        Ok(None) => match state.storage.leads.find_by_phone(&canonical).await {
            Ok(Some(lead)) => {
                let greeting =
                    build_greeting(Some(&lead.first_name), &Value::Array(Vec::new()), None);
                (
                    StatusCode::OK,
                    Json(PhoneLookupResponse {
                        success: true,
                        lead_id: lead.id,
                        first_name: Some(lead.first_name),
                        last_name: lead.last_name,
                        phone: lead.phone,
                        property_interests: Value::Array(Vec::new()),
                        buyer_timeline: None,
                        greeting,
                    }),
                )
                    .into_response()
            },
            Ok(None) => {
                debug!(phone = %canonical, "no lead for caller");
                lookup_miss("no lead found for that phone number")
            },
            Err(e) => {
                error!(error = %e, "lead lookup failed");
                error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
            },
        },
        Err(e) => {
            error!(error = %e, "phone mapping lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
        },
    }
}

/// Fetches the lead record for a phone number.
///
/// # Errors
///
/// - 400: missing `phone` parameter, or a value that does not normalize
///   to a plausible number
/// - 404: no lead for the number
/// - 500: storage failure
#[instrument(name = "lead_lookup", skip(state, query))]
pub async fn lead_lookup(
    State(state): State<AppState>,
    Query(query): Query<LeadLookupQuery>,
) -> Response {
    let Some(raw) = query.phone.filter(|p| !p.trim().is_empty()) else {
        return error_response(StatusCode::BAD_REQUEST, "phone query parameter is required");
    };

    let canonical = phone::normalize(&raw);
    if !phone::is_e164(&canonical) {
        warn!(phone = %raw, "rejecting implausible phone number");
        return error_response(StatusCode::BAD_REQUEST, "phone is not a plausible number");
    }

    match find_lead(&state, &canonical).await {
        Ok(Some(lead)) => (StatusCode::OK, Json(lead)).into_response(),
        Ok(None) => lookup_miss("no lead found for that phone number"),
        Err(e) => {
            error!(error = %e, "lead lookup failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "lookup failed")
        },
    }
}

/// Probes the mapping first, then the leads table, mirroring the order
/// the call pipeline matches in.
async fn find_lead(state: &AppState, canonical: &str) -> housecall_core::Result<Option<Lead>> {
    if let Some(mapping) = state.storage.phone_mappings.find_by_phone(canonical).await? {
        if let Some(lead) = state.storage.leads.find_by_id(mapping.lead_id).await? {
            return Ok(Some(lead));
        }
    }
    state.storage.leads.find_by_phone(canonical).await
}

fn lookup_miss(message: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(LookupMissResponse { success: false, message: message.to_string() }),
    )
        .into_response()
}

/// Derives the agent's opening line from whatever context we hold.
///
/// Known name beats anonymous; a property interest beats a timeline;
/// with neither we fall back to a generic offer of help.
fn build_greeting(
    first_name: Option<&str>,
    property_interests: &Value,
    buyer_timeline: Option<&str>,
) -> String {
    let salutation = match first_name {
        Some(name) if !name.trim().is_empty() && name != "Unknown" => format!("Hi {name}!"),
        _ => "Hello!".to_string(),
    };

    if let Some(interest) = first_interest(property_interests) {
        return format!("{salutation} Are you calling about {interest}?");
    }

    if let Some(timeline) = buyer_timeline.filter(|t| !t.trim().is_empty()) {
        return format!("{salutation} Last time we spoke your timeline was {timeline}.");
    }

    format!("{salutation} How can I help you today?")
}

/// First usable property interest: a plain string entry, or an object's
/// `address` field.
fn first_interest(property_interests: &Value) -> Option<String> {
    let entries = property_interests.as_array()?;
    entries.iter().find_map(|entry| match entry {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Object(map) => {
            map.get("address").and_then(Value::as_str).map(ToString::to_string)
        },
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn greeting_uses_name_and_interest() {
        let interests = json!(["123 Main St"]);
        let greeting = build_greeting(Some("Sarah"), &interests, None);
        assert_eq!(greeting, "Hi Sarah! Are you calling about 123 Main St?");
    }

    #[test]
    fn greeting_reads_address_from_objects() {
        let interests = json!([{"address": "9 Elm Ave", "mls": "X1"}]);
        let greeting = build_greeting(Some("Lee"), &interests, Some("3 months"));
        assert_eq!(greeting, "Hi Lee! Are you calling about 9 Elm Ave?");
    }

    #[test]
    fn greeting_falls_back_to_timeline() {
        let greeting = build_greeting(Some("Lee"), &json!([]), Some("3-6 months"));
        assert_eq!(greeting, "Hi Lee! Last time we spoke your timeline was 3-6 months.");
    }

    #[test]
    fn placeholder_name_is_not_greeted_by_name() {
        let greeting = build_greeting(Some("Unknown"), &json!([]), None);
        assert_eq!(greeting, "Hello! How can I help you today?");
    }

    #[test]
    fn empty_interest_entries_are_skipped() {
        let interests = json!(["", {"mls": "X1"}, "44 Oak Ct"]);
        assert_eq!(first_interest(&interests).as_deref(), Some("44 Oak Ct"));
    }
}
