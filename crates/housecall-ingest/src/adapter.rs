//! Provider adapter trait and the normalized event types it produces.
//!
//! Each webhook provider speaks its own JSON dialect; an adapter's whole
//! job is to translate that dialect into [`ProviderEvent`]. Everything
//! after parsing is shared, so adding a provider means writing one
//! adapter and one route, nothing else.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::Result;

/// Translates one provider's webhook payloads into normalized events.
///
/// Implementations are stateless and cheap to share; parsing is pure and
/// synchronous.
pub trait ProviderAdapter: Send + Sync {
    /// Provider tag recorded in audit rows and on created records.
    fn provider(&self) -> &'static str;

    /// Feature-flag key that gates this provider's processing.
    fn feature_key(&self) -> &'static str;

    /// Extracts the provider's event-type string, if the payload carries
    /// one. Used for audit rows even when processing is disabled.
    fn event_type<'a>(&self, payload: &'a Value) -> Option<&'a str>;

    /// Extracts the provider's own identifier for this event, if any.
    fn event_id(&self, payload: &Value) -> Option<String>;

    /// Parses the payload into a normalized event.
    ///
    /// # Errors
    ///
    /// Returns `IngestError::Validation` when a recognized event type is
    /// missing a required field. Unrecognized event types are not errors;
    /// they parse to [`ProviderEvent::Unknown`].
    fn parse(&self, payload: &Value) -> Result<ProviderEvent>;
}

/// A webhook payload after provider-specific parsing.
#[derive(Debug, Clone)]
pub enum ProviderEvent {
    /// A voice-call lifecycle event.
    Call(CallEvent),

    /// A lead payload from an external lead source.
    Lead(LeadEvent),

    /// An event type this adapter does not process.
    ///
    /// Acknowledged but otherwise ignored, so providers adding event
    /// types never see delivery failures from us.
    Unknown {
        /// The unrecognized event-type string.
        event_type: String,
    },
}

/// Which point in the call lifecycle an event marks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallEventKind {
    /// Call began; creates the conversation.
    Started,
    /// Call finished; completes the conversation.
    Ended,
    /// Post-call analysis arrived.
    Analyzed,
    /// Streaming transcript snapshot arrived.
    TranscriptUpdate,
}

/// A normalized voice-call event.
#[derive(Debug, Clone)]
pub struct CallEvent {
    /// Lifecycle stage.
    pub kind: CallEventKind,

    /// Provider's call identifier. Always present; its absence is a
    /// validation error at parse time.
    pub call_id: String,

    /// Call direction. Defaults to inbound when the provider omits it.
    pub direction: housecall_core::CallDirection,

    /// Phone numbers on the call, caller first. Raw provider values;
    /// normalization happens at matching time.
    pub phones: Vec<String>,

    /// When the call began.
    pub started_at: Option<DateTime<Utc>>,

    /// When the call ended.
    pub ended_at: Option<DateTime<Utc>>,

    /// Call length in seconds.
    pub duration_seconds: Option<i32>,

    /// Transcript text carried by this event.
    pub transcript: Option<String>,

    /// Recording URL carried by this event.
    pub recording_url: Option<String>,

    /// Sentiment in \[-1.0, 1.0\].
    pub sentiment_score: Option<f64>,
}

/// A normalized lead payload.
#[derive(Debug, Clone)]
pub struct LeadEvent {
    /// Given name, when provided.
    pub first_name: Option<String>,

    /// Family name, when provided.
    pub last_name: Option<String>,

    /// Contact email, when provided.
    pub email: Option<String>,

    /// Contact phone, raw as sent. Required; validated at parse time.
    pub phone: String,

    /// Identifier in the source system.
    pub external_id: Option<String>,

    /// Free-text notes from the source.
    pub notes: Option<String>,
}

/// Reads an optional non-empty string field from a JSON object.
///
/// Treats missing fields, non-strings, and empty strings alike as
/// absent; providers are inconsistent about which of those they send.
pub(crate) fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToOwned::to_owned)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn string_field_filters_empty_and_missing() {
        let payload = json!({"a": "x", "b": "", "c": "  ", "d": 7});
        assert_eq!(string_field(&payload, "a"), Some("x".to_string()));
        assert_eq!(string_field(&payload, "b"), None);
        assert_eq!(string_field(&payload, "c"), None);
        assert_eq!(string_field(&payload, "d"), None);
        assert_eq!(string_field(&payload, "e"), None);
    }

    #[test]
    fn string_field_trims_whitespace() {
        let payload = json!({"phone": "  +15551234567  "});
        assert_eq!(string_field(&payload, "phone"), Some("+15551234567".to_string()));
    }
}
