//! Outbound HTTP clients for the Housecall service.
//!
//! Two upstreams: the voice-agent provider API, reached through an
//! authenticating proxy so the dashboard never holds the API key, and
//! the SMS gateway for agent-triggered messages. Both clients own their
//! credentials and timeouts; handlers only translate errors into HTTP
//! responses.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod sms;

pub use client::{CallProviderClient, CallProviderConfig, ProxyResponse};
pub use error::{OutboundError, Result};
pub use sms::{SmsClient, SmsConfig, SmsReceipt};
