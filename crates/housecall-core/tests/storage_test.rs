//! Integration tests for storage repositories.
//!
//! Exercises the production repositories against a real PostgreSQL
//! database to verify SQL correctness, version-aware table routing, and
//! the idempotency guarantees the pipeline leans on.

#![cfg(feature = "docker")]

use chrono::Utc;
use housecall_core::{
    models::{
        ActionStatus, CallDirection, ConversationStatus, LeadId, LeadStatus, NewConversation,
        NewLead, PipelineVersion, WorkflowStatus,
    },
    storage::Storage,
};
use housecall_testing::TestEnv;
use serde_json::json;
use uuid::Uuid;

fn sample_lead(phone: &str) -> NewLead {
    NewLead {
        first_name: "Dana".into(),
        last_name: Some("Whitfield".into()),
        email: Some("dana@example.com".into()),
        phone: phone.into(),
        raw_phone: Some(phone.into()),
        status: LeadStatus::New,
        source: "cinc".into(),
        external_id: Some("cinc-lead-42".into()),
        notes: None,
    }
}

fn sample_call(call_id: &str, lead_id: Option<LeadId>) -> NewConversation {
    NewConversation {
        lead_id,
        provider_call_id: call_id.into(),
        provider: "retell".into(),
        direction: CallDirection::Inbound,
        started_at: Utc::now(),
    }
}

#[tokio::test]
async fn storage_health_check() {
    let env = TestEnv::new().await.unwrap();
    assert!(env.storage().health_check().await.is_ok());
}

#[tokio::test]
async fn lead_repository_crud_operations() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let created = storage.leads.create(&sample_lead("+15550001111")).await.unwrap();
    assert_eq!(created.first_name, "Dana");
    assert_eq!(created.status, LeadStatus::New);
    assert!(created.last_contact_at.is_none());

    // Find by ID
    let found = storage.leads.find_by_id(created.id).await.unwrap().unwrap();
    assert_eq!(found.id, created.id);
    assert_eq!(found.phone, "+15550001111");

    // Find by phone
    let by_phone = storage.leads.find_by_phone("+15550001111").await.unwrap().unwrap();
    assert_eq!(by_phone.id, created.id);
    assert!(storage.leads.find_by_phone("+19990000000").await.unwrap().is_none());

    // Contact touch stamps last_contact_at
    let at = Utc::now();
    storage.leads.touch_last_contact(created.id, at).await.unwrap();
    let touched = storage.leads.find_by_id(created.id).await.unwrap().unwrap();
    let stamped = touched.last_contact_at.unwrap();
    assert!((stamped - at).num_milliseconds().abs() < 5);

    // Funnel status is untouched by the timestamp write
    assert_eq!(touched.status, LeadStatus::New);
}

#[tokio::test]
async fn lead_contact_merge_keeps_absent_fields() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let created = storage.leads.create(&sample_lead("+15550002222")).await.unwrap();

    // Only the email arrives in the re-sent payload
    let merged = storage
        .leads
        .update_contact_fields(created.id, None, None, Some("new@example.com"), None, None)
        .await
        .unwrap();

    assert_eq!(merged.email.as_deref(), Some("new@example.com"));
    assert_eq!(merged.first_name, "Dana");
    assert_eq!(merged.last_name.as_deref(), Some("Whitfield"));
    assert_eq!(merged.external_id.as_deref(), Some("cinc-lead-42"));
}

#[tokio::test]
async fn lead_updates_surface_missing_rows() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let missing = LeadId::new();
    let err = storage.leads.touch_last_contact(missing, Utc::now()).await.unwrap_err();
    assert!(err.to_string().contains("not found"), "unexpected error: {err}");

    let err = storage
        .leads
        .update_contact_fields(missing, Some("Nobody"), None, None, None, None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"), "unexpected error: {err}");
}

#[tokio::test]
async fn newest_lead_wins_shared_phone() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let first = storage.leads.create(&sample_lead("+15550003333")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    let mut second_new = sample_lead("+15550003333");
    second_new.first_name = "Marguerite".into();
    let second = storage.leads.create(&second_new).await.unwrap();

    let matched = storage.leads.find_by_phone("+15550003333").await.unwrap().unwrap();
    assert_eq!(matched.id, second.id);
    assert_ne!(matched.id, first.id);
}

#[tokio::test]
async fn lead_creation_works_in_transaction() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let mut tx = env.pool().begin().await.unwrap();
    let created = storage.leads.create_in_tx(&mut tx, &sample_lead("+15550004444")).await.unwrap();

    // Invisible outside until commit
    assert!(storage.leads.find_by_id(created.id).await.unwrap().is_none());

    tx.commit().await.unwrap();
    assert!(storage.leads.find_by_id(created.id).await.unwrap().is_some());
}

#[tokio::test]
async fn conversation_lifecycle_operations() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let lead = storage.leads.create(&sample_lead("+15550005555")).await.unwrap();
    let created = storage
        .conversations
        .create_if_absent(&sample_call("call_life_1", Some(lead.id)))
        .await
        .unwrap();
    assert_eq!(created.status, ConversationStatus::Active);
    assert_eq!(created.lead_id, Some(lead.id));
    assert!(created.ended_at.is_none());

    // Completion stamps the terminal facts
    let ended_at = Utc::now();
    let completed = storage
        .conversations
        .complete("call_life_1", ended_at, Some(184), Some("https://recordings/1.mp3"), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(completed.status, ConversationStatus::Completed);
    assert_eq!(completed.duration_seconds, Some(184));
    assert_eq!(completed.recording_url.as_deref(), Some("https://recordings/1.mp3"));

    // Analysis merges without clobbering
    let analyzed = storage
        .conversations
        .merge_analysis("call_life_1", Some(0.8), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(analyzed.sentiment_score, Some(0.8));
    assert_eq!(analyzed.recording_url.as_deref(), Some("https://recordings/1.mp3"));

    // Transcript snapshots overwrite wholesale
    storage.conversations.set_transcript("call_life_1", "partial").await.unwrap().unwrap();
    let replaced = storage
        .conversations
        .set_transcript("call_life_1", "full transcript")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(replaced.transcript.as_deref(), Some("full transcript"));

    // Updates on unknown call IDs report the miss instead of erroring
    let completed =
        storage.conversations.complete("no_such_call", Utc::now(), None, None, None).await;
    assert!(completed.unwrap().is_none());
    let analyzed = storage.conversations.merge_analysis("no_such_call", Some(0.1), None).await;
    assert!(analyzed.unwrap().is_none());
    assert!(storage.conversations.set_transcript("no_such_call", "x").await.unwrap().is_none());
}

#[tokio::test]
async fn conversation_creation_is_idempotent() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let first =
        storage.conversations.create_if_absent(&sample_call("call_dup_1", None)).await.unwrap();
    let second =
        storage.conversations.create_if_absent(&sample_call("call_dup_1", None)).await.unwrap();
    assert_eq!(first.id, second.id);
    assert_eq!(storage.conversations.count().await.unwrap(), 1);

    // Concurrent duplicate deliveries converge on one row
    let call_a = sample_call("call_dup_2", None);
    let call_b = sample_call("call_dup_2", None);
    let (a, b) = tokio::join!(
        storage.conversations.create_if_absent(&call_a),
        storage.conversations.create_if_absent(&call_b),
    );
    assert_eq!(a.unwrap().id, b.unwrap().id);
    assert_eq!(storage.conversations.count().await.unwrap(), 2);
}

#[tokio::test]
async fn v2_tables_are_isolated_from_legacy() {
    let env = TestEnv::with_version(PipelineVersion::V2).await.unwrap();
    let v2 = env.storage();
    assert_eq!(env.version(), PipelineVersion::V2);

    let lead = v2.leads.create(&sample_lead("+15550006666")).await.unwrap();
    v2.conversations.create_if_absent(&sample_call("call_v2_1", Some(lead.id))).await.unwrap();

    // A legacy-targeted storage on the same database sees neither row
    let legacy = Storage::new(env.pool().clone(), PipelineVersion::Legacy);
    assert_eq!(legacy.leads.count().await.unwrap(), 0);
    assert_eq!(legacy.conversations.count().await.unwrap(), 0);
    assert_eq!(v2.leads.count().await.unwrap(), 1);
    assert_eq!(v2.conversations.count().await.unwrap(), 1);
}

#[tokio::test]
async fn audit_log_appends_and_lists_newest_first() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    storage
        .webhook_events
        .append("retell", "call_started", Some("call_a"), &json!({"seq": 1}))
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    storage
        .webhook_events
        .append("retell", "call_ended", Some("call_a"), &json!({"seq": 2}))
        .await
        .unwrap();
    storage.webhook_events.append("cinc", "new_lead", None, &json!({"seq": 3})).await.unwrap();

    let recent = storage.webhook_events.find_recent("retell", 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].event_type, "call_ended");
    assert_eq!(recent[1].event_type, "call_started");
    assert_eq!(recent[0].payload, json!({"seq": 2}));
    assert_eq!(recent[0].provider_event_id.as_deref(), Some("call_a"));

    assert_eq!(storage.webhook_events.count_by_type("retell", "call_started").await.unwrap(), 1);
    assert_eq!(storage.webhook_events.count_by_type("cinc", "new_lead").await.unwrap(), 1);
    assert_eq!(storage.webhook_events.count_by_type("cinc", "call_started").await.unwrap(), 0);
}

#[tokio::test]
async fn feature_flags_distinguish_absent_from_disabled() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    assert_eq!(storage.feature_flags.is_enabled("retell_call_processing").await.unwrap(), None);

    storage
        .feature_flags
        .upsert("retell_call_processing", true, Some("voice pipeline"))
        .await
        .unwrap();
    assert_eq!(
        storage.feature_flags.is_enabled("retell_call_processing").await.unwrap(),
        Some(true)
    );

    // Toggling without a description keeps the old one
    storage.feature_flags.upsert("retell_call_processing", false, None).await.unwrap();
    let flags = storage.feature_flags.list().await.unwrap();
    let flag = flags.iter().find(|f| f.feature == "retell_call_processing").unwrap();
    assert!(!flag.enabled);
    assert_eq!(flag.description.as_deref(), Some("voice pipeline"));
}

#[tokio::test]
async fn lead_actions_complete_exactly_once() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let lead = storage.leads.create(&sample_lead("+15550007777")).await.unwrap();
    let action_id = storage.lead_actions.create(lead.id, "send_sms").await.unwrap();

    assert!(storage.lead_actions.mark_completed(action_id).await.unwrap());
    assert!(!storage.lead_actions.mark_completed(action_id).await.unwrap());
    assert!(!storage.lead_actions.mark_completed(Uuid::new_v4()).await.unwrap());

    let action = storage.lead_actions.find_by_id(action_id).await.unwrap().unwrap();
    assert_eq!(action.status, ActionStatus::Completed);
    assert!(action.completed_at.is_some());
}

#[tokio::test]
async fn extraction_shells_are_one_per_conversation() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let conversation =
        storage.conversations.create_if_absent(&sample_call("call_shell_1", None)).await.unwrap();

    let first = storage.extractions.create_shell(conversation.id, None).await.unwrap();
    let second = storage.extractions.create_shell(conversation.id, None).await.unwrap();
    assert_eq!(first, second);

    let shell = storage.extractions.find_by_conversation(conversation.id).await.unwrap().unwrap();
    assert_eq!(shell.id, first);
    assert_eq!(shell.data, json!({}));
}

#[tokio::test]
async fn workflow_runs_record_automation_triggers() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let lead = storage.leads.create(&sample_lead("+15550008888")).await.unwrap();
    let conversation = storage
        .conversations
        .create_if_absent(&sample_call("call_wf_1", Some(lead.id)))
        .await
        .unwrap();

    let input = json!({"phone": "+15550008888", "duration_seconds": 90});
    storage
        .workflow_runs
        .create("call_completed", Some(conversation.id), Some(lead.id), &input)
        .await
        .unwrap();

    let runs = storage.workflow_runs.find_by_conversation(conversation.id).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].name, "call_completed");
    assert_eq!(runs[0].status, WorkflowStatus::Running);
    assert_eq!(runs[0].input, input);
    assert_eq!(runs[0].lead_id, Some(lead.id));
}

#[tokio::test]
async fn phone_mappings_key_on_canonical_form() {
    let env = TestEnv::new().await.unwrap();
    let storage = env.storage();

    let lead = env.insert_lead("Priya", "(555) 000-9999").await.unwrap();
    env.insert_mapping(
        "(555) 000-9999",
        lead.id,
        Some("Priya"),
        &json!([{"address": "12 Elm St"}]),
        Some("3-6 months"),
    )
    .await
    .unwrap();

    let mapping = storage.phone_mappings.find_by_phone("+15550009999").await.unwrap().unwrap();
    assert_eq!(mapping.lead_id, lead.id);
    assert_eq!(mapping.first_name.as_deref(), Some("Priya"));
    assert_eq!(mapping.buyer_timeline.as_deref(), Some("3-6 months"));

    // Only the canonical form is indexed
    assert!(storage.phone_mappings.find_by_phone("(555) 000-9999").await.unwrap().is_none());
}
