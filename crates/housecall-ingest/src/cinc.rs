//! Adapter for CINC lead-source webhooks.
//!
//! CINC posts flat JSON objects tagged with `event_type`. Only
//! `new_lead` is processed; a lead needs a phone to be matchable and at
//! least a name or email to be worth storing, and anything less is
//! rejected at parse time.

use serde_json::Value;

use crate::{
    adapter::{string_field, LeadEvent, ProviderAdapter, ProviderEvent},
    error::{IngestError, Result},
};

/// Adapter for CINC lead payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct CincAdapter;

impl CincAdapter {
    /// Creates a new adapter.
    pub fn new() -> Self {
        Self
    }
}

impl ProviderAdapter for CincAdapter {
    fn provider(&self) -> &'static str {
        "cinc"
    }

    fn feature_key(&self) -> &'static str {
        crate::FLAG_CINC_LEADS
    }

    fn event_type<'a>(&self, payload: &'a Value) -> Option<&'a str> {
        payload.get("event_type").and_then(Value::as_str)
    }

    fn event_id(&self, payload: &Value) -> Option<String> {
        string_field(payload, "lead_id")
    }

    fn parse(&self, payload: &Value) -> Result<ProviderEvent> {
        let Some(event_type) = self.event_type(payload) else {
            return Ok(ProviderEvent::Unknown { event_type: "unknown".to_string() });
        };
        if event_type != "new_lead" {
            return Ok(ProviderEvent::Unknown { event_type: event_type.to_string() });
        }

        let phone = string_field(payload, "phone")
            .ok_or_else(|| IngestError::validation("new_lead missing phone"))?;

        let first_name = string_field(payload, "first_name");
        let email = string_field(payload, "email");
        if first_name.is_none() && email.is_none() {
            return Err(IngestError::validation("new_lead needs a first_name or an email"));
        }

        Ok(ProviderEvent::Lead(LeadEvent {
            first_name,
            last_name: string_field(payload, "last_name"),
            email,
            phone,
            external_id: string_field(payload, "lead_id"),
            notes: string_field(payload, "notes"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(payload: Value) -> Result<ProviderEvent> {
        CincAdapter::new().parse(&payload)
    }

    #[test]
    fn parses_new_lead() {
        let event = parse(json!({
            "event_type": "new_lead",
            "first_name": "Jordan",
            "last_name": "Reyes",
            "email": "jordan@example.com",
            "phone": "(555) 123-4567",
            "lead_id": "cinc-8812",
            "notes": "Interested in Maple St listing"
        }))
        .unwrap();

        let ProviderEvent::Lead(lead) = event else {
            panic!("expected lead event");
        };
        assert_eq!(lead.first_name.as_deref(), Some("Jordan"));
        assert_eq!(lead.phone, "(555) 123-4567");
        assert_eq!(lead.external_id.as_deref(), Some("cinc-8812"));
    }

    #[test]
    fn phone_is_required() {
        let err = parse(json!({
            "event_type": "new_lead",
            "first_name": "Jordan"
        }))
        .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn needs_name_or_email() {
        let err = parse(json!({
            "event_type": "new_lead",
            "phone": "5551234567"
        }))
        .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));

        // Email alone is enough.
        let event = parse(json!({
            "event_type": "new_lead",
            "phone": "5551234567",
            "email": "anon@example.com"
        }))
        .unwrap();
        assert!(matches!(event, ProviderEvent::Lead(_)));
    }

    #[test]
    fn other_event_types_pass_through() {
        let event = parse(json!({"event_type": "lead_updated", "phone": "5551234567"})).unwrap();
        let ProviderEvent::Unknown { event_type } = event else {
            panic!("expected unknown event");
        };
        assert_eq!(event_type, "lead_updated");
    }

    #[test]
    fn untagged_payload_is_unknown() {
        let event = parse(json!({"phone": "5551234567"})).unwrap();
        assert!(matches!(event, ProviderEvent::Unknown { .. }));
    }
}
