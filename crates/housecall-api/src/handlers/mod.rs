//! HTTP request handlers for the Housecall API.
//!
//! Handlers follow a consistent pattern:
//! - Input validation with appropriate error codes
//! - Tracing for observability
//! - Standardized `{ success, ... }` response envelopes
//!
//! # Handler Organization
//!
//! - `webhooks` - Provider webhook intake
//! - `lookup` - Caller and lead lookup for the voice agent
//! - `outbound` - Call provider proxy and SMS send
//! - `health` - Health check and readiness probes

pub mod health;
pub mod lookup;
pub mod outbound;
pub mod webhooks;

// Re-export handlers for convenient access
pub use health::{health_check, liveness_check, readiness_check};
pub use lookup::{lead_lookup, phone_lookup};
pub use outbound::{proxy_call, send_sms};
pub use webhooks::{cinc_webhook, retell_webhook};
