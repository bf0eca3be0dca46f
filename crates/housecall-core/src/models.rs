//! Domain models and strongly-typed identifiers.
//!
//! Defines leads, conversations, audit events, and the newtype ID wrappers
//! that keep them from being mixed up at compile time. Includes database
//! serialization traits and the lifecycle enums the ingestion pipeline
//! transitions through.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

type PgDb = sqlx::Postgres;
type PgValueRef<'r> = sqlx::postgres::PgValueRef<'r>;
type PgTypeInfo = sqlx::postgres::PgTypeInfo;
type PgArgumentBuffer = sqlx::postgres::PgArgumentBuffer;
type EncodeResult =
    Result<sqlx::encode::IsNull, Box<dyn std::error::Error + Send + Sync + 'static>>;
type BoxDynError = sqlx::error::BoxDynError;

/// Strongly-typed lead identifier.
///
/// Wraps a UUID to prevent mixing with conversation or event IDs.
///
/// # Example
///
/// ```
/// use housecall_core::models::LeadId;
/// let lead_id = LeadId::new();
/// println!("matched lead: {}", lead_id);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeadId(pub Uuid);

impl LeadId {
    /// Creates a new random lead ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LeadId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LeadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for LeadId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for LeadId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for LeadId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for LeadId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Strongly-typed conversation (call) identifier.
///
/// Internal identifier only; webhook events locate conversations by the
/// provider's own call ID, since providers never learn this one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub Uuid);

impl ConversationId {
    /// Creates a new random conversation ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for ConversationId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for ConversationId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for ConversationId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for ConversationId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Strongly-typed identifier for an audit-log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebhookEventId(pub Uuid);

impl WebhookEventId {
    /// Creates a new random event ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WebhookEventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WebhookEventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for WebhookEventId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl sqlx::Type<PgDb> for WebhookEventId {
    fn type_info() -> PgTypeInfo {
        <Uuid as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for WebhookEventId {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let uuid = <Uuid as sqlx::Decode<PgDb>>::decode(value)?;
        Ok(Self(uuid))
    }
}

impl sqlx::Encode<'_, PgDb> for WebhookEventId {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <Uuid as sqlx::Encode<PgDb>>::encode_by_ref(&self.0, buf)
    }
}

/// Lead lifecycle status.
///
/// Leads progress through a sales funnel; the pipeline itself only ever
/// creates leads in `New` (external lead sources) or `Contacted` (fallback
/// creation from a live call, since the call itself is contact):
///
/// ```text
/// New -> Contacted -> Qualified -> Proposal -> Converted
///                                          \-> Lost
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadStatus {
    /// Captured but not yet reached.
    New,
    /// At least one call or message exchanged.
    Contacted,
    /// Qualified as a real prospect.
    Qualified,
    /// Proposal or offer out.
    Proposal,
    /// Closed and won.
    Converted,
    /// Closed and lost.
    Lost,
}

impl fmt::Display for LeadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => write!(f, "new"),
            Self::Contacted => write!(f, "contacted"),
            Self::Qualified => write!(f, "qualified"),
            Self::Proposal => write!(f, "proposal"),
            Self::Converted => write!(f, "converted"),
            Self::Lost => write!(f, "lost"),
        }
    }
}

impl sqlx::Type<PgDb> for LeadStatus {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for LeadStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        match s {
            "new" => Ok(Self::New),
            "contacted" => Ok(Self::Contacted),
            "qualified" => Ok(Self::Qualified),
            "proposal" => Ok(Self::Proposal),
            "converted" => Ok(Self::Converted),
            "lost" => Ok(Self::Lost),
            _ => Err(format!("invalid lead status: {s}").into()),
        }
    }
}

impl sqlx::Encode<'_, PgDb> for LeadStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.to_string(), buf)
    }
}

/// Conversation (call) lifecycle status.
///
/// `call_started` creates the row in `Active`; `call_ended` moves it to
/// `Completed`. `Error` exists for calls whose payloads turned out to be
/// malformed mid-lifecycle; the pipeline never deletes rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    /// Call in progress.
    Active,
    /// Call finished; terminal.
    Completed,
    /// Lifecycle broken by a malformed payload; terminal.
    Error,
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Error => write!(f, "error"),
        }
    }
}

impl sqlx::Type<PgDb> for ConversationStatus {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for ConversationStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        match s {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "error" => Ok(Self::Error),
            _ => Err(format!("invalid conversation status: {s}").into()),
        }
    }
}

impl sqlx::Encode<'_, PgDb> for ConversationStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.to_string(), buf)
    }
}

/// Direction of a call relative to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallDirection {
    /// Caller dialed in.
    Inbound,
    /// Agent dialed out.
    Outbound,
}

impl fmt::Display for CallDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => write!(f, "inbound"),
            Self::Outbound => write!(f, "outbound"),
        }
    }
}

impl std::str::FromStr for CallDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "inbound" => Ok(Self::Inbound),
            "outbound" => Ok(Self::Outbound),
            _ => Err(format!("invalid call direction: {s}")),
        }
    }
}

impl sqlx::Type<PgDb> for CallDirection {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for CallDirection {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        s.parse().map_err(Into::into)
    }
}

impl sqlx::Encode<'_, PgDb> for CallDirection {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.to_string(), buf)
    }
}

/// Status of a downstream automation run.
///
/// The pipeline only ever inserts `Running`; completion is reported by the
/// external automation system through a separate path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    /// Handed to the automation system.
    Running,
    /// Reported finished.
    Completed,
    /// Reported failed.
    Failed,
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl sqlx::Type<PgDb> for WorkflowStatus {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for WorkflowStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        match s {
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("invalid workflow status: {s}").into()),
        }
    }
}

impl sqlx::Encode<'_, PgDb> for WorkflowStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.to_string(), buf)
    }
}

/// Status of a follow-up action attached to a lead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Not yet done.
    Pending,
    /// Done; `completed_at` records when.
    Completed,
}

impl fmt::Display for ActionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl sqlx::Type<PgDb> for ActionStatus {
    fn type_info() -> PgTypeInfo {
        <&str as sqlx::Type<PgDb>>::type_info()
    }
}

impl<'r> sqlx::Decode<'r, PgDb> for ActionStatus {
    fn decode(value: PgValueRef<'r>) -> Result<Self, BoxDynError> {
        let s = <&str as sqlx::Decode<PgDb>>::decode(value)?;
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("invalid action status: {s}").into()),
        }
    }
}

impl sqlx::Encode<'_, PgDb> for ActionStatus {
    fn encode_by_ref(&self, buf: &mut PgArgumentBuffer) -> EncodeResult {
        <String as sqlx::Encode<PgDb>>::encode_by_ref(&self.to_string(), buf)
    }
}

/// Target schema selector for the lead/conversation tables.
///
/// The CRM migration left two parallel table sets behind; which one this
/// process writes to is a deployment decision, not a code fork. Selected
/// once at startup from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineVersion {
    /// Original `leads` / `conversations` tables.
    Legacy,
    /// Migration-era `leads_v2` / `conversations_v2` tables.
    V2,
}

impl PipelineVersion {
    /// Table name for lead rows under this version.
    pub const fn leads_table(self) -> &'static str {
        match self {
            Self::Legacy => "leads",
            Self::V2 => "leads_v2",
        }
    }

    /// Table name for conversation rows under this version.
    pub const fn conversations_table(self) -> &'static str {
        match self {
            Self::Legacy => "conversations",
            Self::V2 => "conversations_v2",
        }
    }
}

impl fmt::Display for PipelineVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Legacy => write!(f, "legacy"),
            Self::V2 => write!(f, "v2"),
        }
    }
}

impl std::str::FromStr for PipelineVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "legacy" => Ok(Self::Legacy),
            "v2" => Ok(Self::V2),
            _ => Err(format!("invalid pipeline version: {s}")),
        }
    }
}

/// A contact/prospect record.
///
/// Created by the lead matcher (fallback from a live call) or from an
/// external lead-source payload; also edited by agents through the
/// dashboard, which is why pipeline updates never clobber fields with
/// nulls.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Lead {
    /// Unique identifier for this lead.
    pub id: LeadId,

    /// Given name. `"Unknown"` for fallback-created leads.
    pub first_name: String,

    /// Family name, when known.
    pub last_name: Option<String>,

    /// Contact email, when known.
    pub email: Option<String>,

    /// Canonical E.164 phone, or the raw input when normalization fell
    /// back.
    pub phone: String,

    /// Phone exactly as it arrived, for display and debugging.
    pub raw_phone: Option<String>,

    /// Funnel position.
    pub status: LeadStatus,

    /// Where this lead came from (provider tag such as `retell` or
    /// `cinc`, or a manual-entry tag from the dashboard).
    pub source: String,

    /// Identifier in the originating external system, when one exists.
    pub external_id: Option<String>,

    /// Free-text agent notes.
    pub notes: Option<String>,

    /// When this lead was created.
    pub created_at: DateTime<Utc>,

    /// Most recent call or message touching this lead.
    pub last_contact_at: Option<DateTime<Utc>>,

    /// When any field was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new lead.
#[derive(Debug, Clone)]
pub struct NewLead {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Canonical (or raw-fallback) phone.
    pub phone: String,
    /// Phone as originally received.
    pub raw_phone: Option<String>,
    /// Initial funnel position.
    pub status: LeadStatus,
    /// Originating provider tag.
    pub source: String,
    /// External system identifier.
    pub external_id: Option<String>,
    /// Free-text notes.
    pub notes: Option<String>,
}

/// A recorded call.
///
/// Keyed externally by `provider_call_id`: every webhook event after
/// `call_started` locates the row through that column, never through the
/// internal ID.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Conversation {
    /// Unique identifier for this conversation.
    pub id: ConversationId,

    /// Matched lead, if any. Nullable because matching is best-effort.
    pub lead_id: Option<LeadId>,

    /// The calling provider's own call identifier. Unique, which is what
    /// makes re-delivered `call_started` events idempotent.
    pub provider_call_id: String,

    /// Provider tag (`retell`).
    pub provider: String,

    /// Call direction.
    pub direction: CallDirection,

    /// Lifecycle state.
    pub status: ConversationStatus,

    /// When the call began.
    pub started_at: DateTime<Utc>,

    /// When the call ended; set by `call_ended`.
    pub ended_at: Option<DateTime<Utc>>,

    /// Call length in seconds; set by `call_ended`.
    pub duration_seconds: Option<i32>,

    /// Latest transcript text. Overwritten wholesale by
    /// `transcript_update`; last write wins.
    pub transcript: Option<String>,

    /// Recording URL from the provider.
    pub recording_url: Option<String>,

    /// Sentiment in \[-1.0, 1.0\]; textual provider labels are folded to
    /// fixed values.
    pub sentiment_score: Option<f64>,

    /// When this row was created.
    pub created_at: DateTime<Utc>,

    /// When this row was last modified.
    pub updated_at: DateTime<Utc>,
}

/// Fields for inserting a new conversation at call start.
#[derive(Debug, Clone)]
pub struct NewConversation {
    /// Matched lead, if matching succeeded.
    pub lead_id: Option<LeadId>,
    /// Provider's call identifier.
    pub provider_call_id: String,
    /// Provider tag.
    pub provider: String,
    /// Call direction.
    pub direction: CallDirection,
    /// Call start time.
    pub started_at: DateTime<Utc>,
}

/// Structured-data byproduct of a conversation.
///
/// One row per conversation, created empty at call start and populated by
/// an external extraction process.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ConversationExtraction {
    /// Unique identifier for this extraction.
    pub id: Uuid,

    /// Conversation this extraction belongs to.
    pub conversation_id: ConversationId,

    /// Lead snapshot at call start.
    pub lead_id: Option<LeadId>,

    /// Extracted data; `{}` until the external process fills it.
    pub data: serde_json::Value,

    /// When this row was created.
    pub created_at: DateTime<Utc>,

    /// When the extraction data was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Denormalized phone-to-lead cache maintained by the external CRM sync.
///
/// Read-only from this service's point of view; it also carries the
/// source-system context (property interests, buyer timeline) used to
/// prime voice-agent greetings.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PhoneLeadMapping {
    /// Unique identifier for this mapping row.
    pub id: Uuid,

    /// Canonical E.164 phone; unique.
    pub phone: String,

    /// Lead this phone belongs to.
    pub lead_id: LeadId,

    /// Given name snapshot from the source system.
    pub first_name: Option<String>,

    /// Family name snapshot from the source system.
    pub last_name: Option<String>,

    /// Properties the contact has shown interest in (JSON array).
    pub property_interests: serde_json::Value,

    /// Free-text buying timeline (for example "3-6 months").
    pub buyer_timeline: Option<String>,

    /// When this row was created.
    pub created_at: DateTime<Utc>,

    /// When the sync last refreshed this row.
    pub updated_at: DateTime<Utc>,
}

/// Append-only audit record of one inbound webhook delivery.
///
/// Written before any processing so a downstream failure never loses the
/// raw payload. Never mutated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WebhookEvent {
    /// Unique identifier for this audit entry.
    pub id: WebhookEventId,

    /// Provider tag (`retell`, `cinc`).
    pub provider: String,

    /// Provider-supplied event type, or `unknown` when absent.
    pub event_type: String,

    /// Provider's own event/call identifier, when one was present.
    pub provider_event_id: Option<String>,

    /// Full original payload.
    pub payload: serde_json::Value,

    /// When the delivery arrived.
    pub received_at: DateTime<Utc>,
}

/// A keyed boolean feature flag.
///
/// Read by the gate before any processing; written only through the
/// administrative dashboard. An absent row behaves as disabled.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeatureFlag {
    /// Unique identifier for this flag row.
    pub id: Uuid,

    /// Flag key, for example `retell_call_processing`.
    pub feature: String,

    /// Whether the gated path runs.
    pub enabled: bool,

    /// Operator-facing description.
    pub description: Option<String>,

    /// When this flag was created.
    pub created_at: DateTime<Utc>,

    /// When this flag was last toggled.
    pub updated_at: DateTime<Utc>,
}

/// Record of a downstream automation trigger.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkflowRun {
    /// Unique identifier for this run.
    pub id: Uuid,

    /// Automation name, for example `call_completed`.
    pub name: String,

    /// Conversation that triggered the run, if any.
    pub conversation_id: Option<ConversationId>,

    /// Lead involved, if any.
    pub lead_id: Option<LeadId>,

    /// Snapshot of the triggering payload.
    pub input: serde_json::Value,

    /// Run status.
    pub status: WorkflowStatus,

    /// When the run was enqueued.
    pub created_at: DateTime<Utc>,
}

/// A follow-up action attached to a lead (for example a scheduled SMS).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeadAction {
    /// Unique identifier for this action.
    pub id: Uuid,

    /// Lead the action belongs to.
    pub lead_id: LeadId,

    /// Action kind, for example `send_sms`.
    pub kind: String,

    /// Whether the action has been carried out.
    pub status: ActionStatus,

    /// When the action completed.
    pub completed_at: Option<DateTime<Utc>>,

    /// When the action was created.
    pub created_at: DateTime<Utc>,
}
