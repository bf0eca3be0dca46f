//! Core domain types and storage layer for the Housecall ingestion service.
//!
//! Provides strongly-typed lead/conversation models, E.164 phone
//! normalization, error handling, and the PostgreSQL repository layer that
//! every other crate builds on.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod models;
pub mod phone;
pub mod storage;
pub mod time;

pub use error::{CoreError, Result};
pub use models::{
    ActionStatus, CallDirection, Conversation, ConversationId, ConversationStatus, FeatureFlag,
    Lead, LeadId, LeadStatus, PipelineVersion, WebhookEvent, WebhookEventId, WorkflowStatus,
};
pub use storage::Storage;
pub use time::{Clock, RealClock, TestClock};
