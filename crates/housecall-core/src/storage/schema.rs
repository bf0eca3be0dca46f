//! Schema bootstrap.
//!
//! Creates every table this service touches if it does not already
//! exist. Both the legacy and `_v2` lead/conversation tables are always
//! created, whichever version the process targets, so switching the
//! pipeline version never requires a migration step.
//!
//! Deliberately no foreign keys across the version split or into the
//! externally-synced mapping table: a stale reference from the CRM side
//! must not be able to fail a call-recording write.

use sqlx::PgPool;

use crate::{error::Result, models::PipelineVersion};

/// Creates all tables and indexes used by the service.
///
/// Idempotent; safe to run on every startup.
///
/// # Errors
///
/// Returns error if any DDL statement fails.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    for version in [PipelineVersion::Legacy, PipelineVersion::V2] {
        create_lead_tables(pool, version).await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS conversation_extractions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            conversation_id UUID NOT NULL UNIQUE,
            lead_id UUID,
            data JSONB NOT NULL DEFAULT '{}'::jsonb,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS phone_lead_mapping (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            phone TEXT NOT NULL UNIQUE,
            lead_id UUID NOT NULL,
            first_name TEXT,
            last_name TEXT,
            property_interests JSONB NOT NULL DEFAULT '[]'::jsonb,
            buyer_timeline TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS webhook_events (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            provider TEXT NOT NULL,
            event_type TEXT NOT NULL,
            provider_event_id TEXT,
            payload JSONB NOT NULL,
            received_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_webhook_events_provider
        ON webhook_events(provider, received_at DESC)
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS system_config (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            feature TEXT NOT NULL UNIQUE,
            enabled BOOLEAN NOT NULL DEFAULT FALSE,
            description TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS makecom_workflows (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            name TEXT NOT NULL,
            conversation_id UUID,
            lead_id UUID,
            input JSONB NOT NULL DEFAULT '{}'::jsonb,
            status TEXT NOT NULL DEFAULT 'running',
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS lead_actions (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            lead_id UUID NOT NULL,
            kind TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            completed_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_lead_tables(pool: &PgPool, version: PipelineVersion) -> Result<()> {
    let leads = version.leads_table();
    let conversations = version.conversations_table();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {leads} (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            first_name TEXT NOT NULL,
            last_name TEXT,
            email TEXT,
            phone TEXT NOT NULL,
            raw_phone TEXT,
            status TEXT NOT NULL DEFAULT 'new',
            source TEXT NOT NULL,
            external_id TEXT,
            notes TEXT,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            last_contact_at TIMESTAMPTZ,
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_{leads}_phone
        ON {leads}(phone)
        "#,
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {conversations} (
            id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
            lead_id UUID,
            provider_call_id TEXT NOT NULL UNIQUE,
            provider TEXT NOT NULL,
            direction TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'active',
            started_at TIMESTAMPTZ NOT NULL,
            ended_at TIMESTAMPTZ,
            duration_seconds INTEGER,
            transcript TEXT,
            recording_url TEXT,
            sentiment_score DOUBLE PRECISION,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
        "#,
    ))
    .execute(pool)
    .await?;

    sqlx::query(&format!(
        r#"
        CREATE INDEX IF NOT EXISTS idx_{conversations}_lead
        ON {conversations}(lead_id, started_at DESC)
        "#,
    ))
    .execute(pool)
    .await?;

    Ok(())
}
