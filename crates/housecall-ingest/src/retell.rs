//! Adapter for Retell voice-agent webhooks.
//!
//! Retell wraps everything in `{"event": "...", "call": {...}}` with
//! millisecond epoch timestamps and sentiment as a textual label. Four
//! event types matter to us: `call_started`, `call_ended`,
//! `call_analyzed`, and `transcript_update`; anything else passes
//! through as unknown.

use chrono::{DateTime, TimeZone, Utc};
use housecall_core::CallDirection;
use serde_json::Value;

use crate::{
    adapter::{string_field, CallEvent, CallEventKind, ProviderAdapter, ProviderEvent},
    error::{IngestError, Result},
};

/// Adapter for Retell call-event payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetellAdapter;

impl RetellAdapter {
    /// Creates a new adapter.
    pub fn new() -> Self {
        Self
    }
}

impl ProviderAdapter for RetellAdapter {
    fn provider(&self) -> &'static str {
        "retell"
    }

    fn feature_key(&self) -> &'static str {
        crate::FLAG_RETELL_CALLS
    }

    fn event_type<'a>(&self, payload: &'a Value) -> Option<&'a str> {
        payload.get("event").and_then(Value::as_str)
    }

    fn event_id(&self, payload: &Value) -> Option<String> {
        payload.get("call").and_then(|call| string_field(call, "call_id"))
    }

    fn parse(&self, payload: &Value) -> Result<ProviderEvent> {
        let Some(event_type) = self.event_type(payload) else {
            return Ok(ProviderEvent::Unknown { event_type: "unknown".to_string() });
        };

        let kind = match event_type {
            "call_started" => CallEventKind::Started,
            "call_ended" => CallEventKind::Ended,
            "call_analyzed" => CallEventKind::Analyzed,
            "transcript_update" => CallEventKind::TranscriptUpdate,
            other => {
                return Ok(ProviderEvent::Unknown { event_type: other.to_string() });
            },
        };

        let call = payload
            .get("call")
            .filter(|c| c.is_object())
            .ok_or_else(|| IngestError::validation(format!("{event_type} missing call object")))?;

        let call_id = string_field(call, "call_id")
            .ok_or_else(|| IngestError::validation(format!("{event_type} missing call_id")))?;

        let direction = string_field(call, "direction")
            .and_then(|d| d.parse().ok())
            .unwrap_or(CallDirection::Inbound);

        let from_number = string_field(call, "from_number");
        let to_number = string_field(call, "to_number");

        // Lead-side number first: the caller for inbound, the callee for
        // outbound.
        let mut phones = Vec::new();
        let (lead_side, agent_side) = match direction {
            CallDirection::Inbound => (from_number, to_number),
            CallDirection::Outbound => (to_number, from_number),
        };
        phones.extend(lead_side);
        phones.extend(agent_side);

        let started_at = timestamp_ms(call, "start_timestamp");
        let ended_at = timestamp_ms(call, "end_timestamp");
        let duration_seconds = duration_seconds(call, started_at, ended_at);

        let transcript = string_field(call, "transcript");
        if kind == CallEventKind::TranscriptUpdate && transcript.is_none() {
            return Err(IngestError::validation("transcript_update missing transcript"));
        }

        Ok(ProviderEvent::Call(CallEvent {
            kind,
            call_id,
            direction,
            phones,
            started_at,
            ended_at,
            duration_seconds,
            transcript,
            recording_url: string_field(call, "recording_url"),
            sentiment_score: sentiment_score(call),
        }))
    }
}

/// Reads a millisecond epoch timestamp field.
fn timestamp_ms(call: &Value, key: &str) -> Option<DateTime<Utc>> {
    let ms = call.get(key)?.as_i64()?;
    Utc.timestamp_millis_opt(ms).single()
}

/// Call length in whole seconds, from the explicit field or the
/// timestamp pair.
fn duration_seconds(
    call: &Value,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
) -> Option<i32> {
    if let Some(ms) = call.get("duration_ms").and_then(Value::as_i64) {
        return i32::try_from(ms / 1000).ok();
    }
    let (start, end) = (started_at?, ended_at?);
    let secs = end.signed_duration_since(start).num_seconds();
    (secs >= 0).then(|| i32::try_from(secs).ok()).flatten()
}

/// Folds Retell's sentiment into a numeric score.
///
/// The analysis block usually carries a label; some agent versions send
/// a numeric `sentiment_score` instead. Labels map to the fixed points
/// of the \[-1.0, 1.0\] scale the dashboard charts on.
fn sentiment_score(call: &Value) -> Option<f64> {
    let analysis = call.get("call_analysis")?;

    if let Some(label) = analysis.get("user_sentiment").and_then(Value::as_str) {
        match label.to_ascii_lowercase().as_str() {
            "positive" => return Some(1.0),
            "neutral" => return Some(0.0),
            "negative" => return Some(-1.0),
            _ => {},
        }
    }

    analysis.get("sentiment_score").and_then(Value::as_f64).map(|s| s.clamp(-1.0, 1.0))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn parse(payload: Value) -> Result<ProviderEvent> {
        RetellAdapter::new().parse(&payload)
    }

    #[test]
    fn parses_call_started() {
        let event = parse(json!({
            "event": "call_started",
            "call": {
                "call_id": "call_123",
                "direction": "inbound",
                "from_number": "+15551234567",
                "to_number": "+15559876543",
                "start_timestamp": 1_700_000_000_000_i64
            }
        }))
        .unwrap();

        let ProviderEvent::Call(call) = event else {
            panic!("expected call event");
        };
        assert_eq!(call.kind, CallEventKind::Started);
        assert_eq!(call.call_id, "call_123");
        assert_eq!(call.direction, CallDirection::Inbound);
        assert_eq!(call.phones, vec!["+15551234567", "+15559876543"]);
        assert!(call.started_at.is_some());
        assert!(call.ended_at.is_none());
    }

    #[test]
    fn outbound_calls_put_callee_first() {
        let event = parse(json!({
            "event": "call_started",
            "call": {
                "call_id": "call_123",
                "direction": "outbound",
                "from_number": "+15559876543",
                "to_number": "+15551234567"
            }
        }))
        .unwrap();

        let ProviderEvent::Call(call) = event else {
            panic!("expected call event");
        };
        assert_eq!(call.phones[0], "+15551234567");
    }

    #[test]
    fn missing_call_id_is_validation_error() {
        let err = parse(json!({
            "event": "call_started",
            "call": {"from_number": "+15551234567"}
        }))
        .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn missing_call_object_is_validation_error() {
        let err = parse(json!({"event": "call_ended"})).unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));
    }

    #[test]
    fn unrecognized_event_passes_through() {
        let event = parse(json!({"event": "agent_interrupted", "call": {}})).unwrap();
        let ProviderEvent::Unknown { event_type } = event else {
            panic!("expected unknown event");
        };
        assert_eq!(event_type, "agent_interrupted");
    }

    #[test]
    fn payload_without_event_field_is_unknown() {
        let event = parse(json!({"call": {"call_id": "c1"}})).unwrap();
        assert!(matches!(event, ProviderEvent::Unknown { .. }));
    }

    #[test]
    fn call_ended_computes_duration_from_timestamps() {
        let event = parse(json!({
            "event": "call_ended",
            "call": {
                "call_id": "call_123",
                "start_timestamp": 1_700_000_000_000_i64,
                "end_timestamp": 1_700_000_090_000_i64
            }
        }))
        .unwrap();

        let ProviderEvent::Call(call) = event else {
            panic!("expected call event");
        };
        assert_eq!(call.kind, CallEventKind::Ended);
        assert_eq!(call.duration_seconds, Some(90));
    }

    #[test]
    fn explicit_duration_wins_over_timestamps() {
        let event = parse(json!({
            "event": "call_ended",
            "call": {
                "call_id": "call_123",
                "duration_ms": 45_000,
                "start_timestamp": 1_700_000_000_000_i64,
                "end_timestamp": 1_700_000_090_000_i64
            }
        }))
        .unwrap();

        let ProviderEvent::Call(call) = event else {
            panic!("expected call event");
        };
        assert_eq!(call.duration_seconds, Some(45));
    }

    #[test]
    fn sentiment_labels_fold_to_fixed_scores() {
        for (label, score) in
            [("Positive", 1.0), ("Neutral", 0.0), ("Negative", -1.0), ("negative", -1.0)]
        {
            let event = parse(json!({
                "event": "call_analyzed",
                "call": {
                    "call_id": "call_123",
                    "call_analysis": {"user_sentiment": label}
                }
            }))
            .unwrap();
            let ProviderEvent::Call(call) = event else {
                panic!("expected call event");
            };
            assert_eq!(call.sentiment_score, Some(score), "label {label}");
        }
    }

    #[test]
    fn numeric_sentiment_is_clamped() {
        let event = parse(json!({
            "event": "call_analyzed",
            "call": {
                "call_id": "call_123",
                "call_analysis": {"sentiment_score": 3.5}
            }
        }))
        .unwrap();
        let ProviderEvent::Call(call) = event else {
            panic!("expected call event");
        };
        assert_eq!(call.sentiment_score, Some(1.0));
    }

    #[test]
    fn transcript_update_requires_transcript() {
        let err = parse(json!({
            "event": "transcript_update",
            "call": {"call_id": "call_123"}
        }))
        .unwrap_err();
        assert!(matches!(err, IngestError::Validation(_)));

        let event = parse(json!({
            "event": "transcript_update",
            "call": {"call_id": "call_123", "transcript": "Agent: Hello"}
        }))
        .unwrap();
        let ProviderEvent::Call(call) = event else {
            panic!("expected call event");
        };
        assert_eq!(call.transcript.as_deref(), Some("Agent: Hello"));
    }

    #[test]
    fn event_id_reads_call_id() {
        let adapter = RetellAdapter::new();
        let payload = json!({"event": "call_started", "call": {"call_id": "call_9"}});
        assert_eq!(adapter.event_id(&payload), Some("call_9".to_string()));
        assert_eq!(adapter.event_id(&json!({"event": "ping"})), None);
    }
}
