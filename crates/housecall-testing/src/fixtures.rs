//! Provider payload builders for webhook tests.
//!
//! Builders produce the JSON shapes the real providers post, with
//! sensible defaults so a test only states what it cares about.

use serde_json::{json, Map, Value};

/// Builder for Retell call-event payloads.
///
/// One builder describes one call; the `started`/`ended`/`analyzed`/
/// `transcript_update` methods render the lifecycle events for it.
pub struct RetellCallBuilder {
    call_id: String,
    direction: String,
    from_number: String,
    to_number: String,
    start_timestamp: i64,
    end_timestamp: Option<i64>,
    duration_ms: Option<i64>,
    transcript: Option<String>,
    recording_url: Option<String>,
    sentiment: Option<String>,
}

impl RetellCallBuilder {
    /// Creates a builder for an inbound call with default numbers.
    pub fn new(call_id: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            direction: "inbound".to_string(),
            from_number: "+15551234567".to_string(),
            to_number: "+15559876543".to_string(),
            start_timestamp: 1_700_000_000_000,
            end_timestamp: None,
            duration_ms: None,
            transcript: None,
            recording_url: None,
            sentiment: None,
        }
    }

    /// Sets the call direction (`inbound` or `outbound`).
    #[must_use]
    pub fn direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = direction.into();
        self
    }

    /// Sets the calling number.
    #[must_use]
    pub fn from_number(mut self, number: impl Into<String>) -> Self {
        self.from_number = number.into();
        self
    }

    /// Sets the called number.
    #[must_use]
    pub fn to_number(mut self, number: impl Into<String>) -> Self {
        self.to_number = number.into();
        self
    }

    /// Sets the call start as a millisecond epoch timestamp.
    #[must_use]
    pub fn started_at_ms(mut self, timestamp: i64) -> Self {
        self.start_timestamp = timestamp;
        self
    }

    /// Sets the call end as a millisecond epoch timestamp.
    #[must_use]
    pub fn ended_at_ms(mut self, timestamp: i64) -> Self {
        self.end_timestamp = Some(timestamp);
        self
    }

    /// Sets the provider-reported call duration.
    #[must_use]
    pub fn duration_ms(mut self, duration: i64) -> Self {
        self.duration_ms = Some(duration);
        self
    }

    /// Sets the transcript text.
    #[must_use]
    pub fn transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(transcript.into());
        self
    }

    /// Sets the recording URL.
    #[must_use]
    pub fn recording_url(mut self, url: impl Into<String>) -> Self {
        self.recording_url = Some(url.into());
        self
    }

    /// Sets the analysis sentiment label (`positive`, `neutral`,
    /// `negative`).
    #[must_use]
    pub fn sentiment(mut self, label: impl Into<String>) -> Self {
        self.sentiment = Some(label.into());
        self
    }

    /// Renders a `call_started` payload.
    pub fn started(&self) -> Value {
        json!({
            "event": "call_started",
            "call": self.call_object(false),
        })
    }

    /// Renders a `call_ended` payload.
    pub fn ended(&self) -> Value {
        json!({
            "event": "call_ended",
            "call": self.call_object(true),
        })
    }

    /// Renders a `call_analyzed` payload with the analysis block.
    pub fn analyzed(&self) -> Value {
        let mut call = self.call_object(true);
        if let Some(call_map) = call.as_object_mut() {
            let mut analysis = Map::new();
            if let Some(sentiment) = &self.sentiment {
                analysis.insert("user_sentiment".to_string(), json!(sentiment));
            }
            call_map.insert("call_analysis".to_string(), Value::Object(analysis));
        }
        json!({
            "event": "call_analyzed",
            "call": call,
        })
    }

    /// Renders a `transcript_update` payload.
    pub fn transcript_update(&self) -> Value {
        json!({
            "event": "transcript_update",
            "call": {
                "call_id": self.call_id,
                "transcript": self.transcript,
            },
        })
    }

    fn call_object(&self, include_end: bool) -> Value {
        let mut call = Map::new();
        call.insert("call_id".to_string(), json!(self.call_id));
        call.insert("direction".to_string(), json!(self.direction));
        call.insert("from_number".to_string(), json!(self.from_number));
        call.insert("to_number".to_string(), json!(self.to_number));
        call.insert("start_timestamp".to_string(), json!(self.start_timestamp));

        if include_end {
            if let Some(end) = self.end_timestamp {
                call.insert("end_timestamp".to_string(), json!(end));
            }
            if let Some(duration) = self.duration_ms {
                call.insert("duration_ms".to_string(), json!(duration));
            }
            if let Some(url) = &self.recording_url {
                call.insert("recording_url".to_string(), json!(url));
            }
            if let Some(transcript) = &self.transcript {
                call.insert("transcript".to_string(), json!(transcript));
            }
        }

        Value::Object(call)
    }
}

/// Builder for CINC `new_lead` payloads.
pub struct CincLeadBuilder {
    first_name: Option<String>,
    last_name: Option<String>,
    email: Option<String>,
    phone: String,
    lead_id: Option<String>,
    notes: Option<String>,
}

impl CincLeadBuilder {
    /// Creates a builder for a lead with the given phone and default
    /// contact details.
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            first_name: Some("Jordan".to_string()),
            last_name: Some("Reyes".to_string()),
            email: Some("jordan@example.com".to_string()),
            phone: phone.into(),
            lead_id: Some("cinc-1001".to_string()),
            notes: None,
        }
    }

    /// Sets the first name; `None` drops the field.
    #[must_use]
    pub fn first_name(mut self, name: Option<&str>) -> Self {
        self.first_name = name.map(ToString::to_string);
        self
    }

    /// Sets the last name; `None` drops the field.
    #[must_use]
    pub fn last_name(mut self, name: Option<&str>) -> Self {
        self.last_name = name.map(ToString::to_string);
        self
    }

    /// Sets the email; `None` drops the field.
    #[must_use]
    pub fn email(mut self, email: Option<&str>) -> Self {
        self.email = email.map(ToString::to_string);
        self
    }

    /// Sets the source system's lead identifier.
    #[must_use]
    pub fn lead_id(mut self, id: impl Into<String>) -> Self {
        self.lead_id = Some(id.into());
        self
    }

    /// Sets free-text notes.
    #[must_use]
    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    /// Renders the `new_lead` payload, omitting unset optional fields.
    pub fn build(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("event_type".to_string(), json!("new_lead"));
        payload.insert("phone".to_string(), json!(self.phone));

        if let Some(first_name) = &self.first_name {
            payload.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = &self.last_name {
            payload.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(email) = &self.email {
            payload.insert("email".to_string(), json!(email));
        }
        if let Some(lead_id) = &self.lead_id {
            payload.insert("lead_id".to_string(), json!(lead_id));
        }
        if let Some(notes) = &self.notes {
            payload.insert("notes".to_string(), json!(notes));
        }

        Value::Object(payload)
    }
}
