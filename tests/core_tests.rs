//! EngagementCore wiring: configuration-driven assembly, startup recovery,
//! driver dispatch, webhook ingestion, and the exposed bulk/callback API.

mod common;

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use cadence_core::clients::LeadRepository;
use cadence_core::config::CadenceConfig;
use cadence_core::models::{BulkRequest, Lead, LeadUpdate};
use cadence_core::orchestration::{EngagementCore, WorkflowError};
use cadence_core::state_machine::EngagementStatus;

use common::{InMemoryLeadStore, MockCallProvider, MockFallbackGateway};

async fn core_with(
    dir: &tempfile::TempDir,
) -> anyhow::Result<(
    EngagementCore,
    Arc<InMemoryLeadStore>,
    Arc<MockCallProvider>,
)> {
    let mut config = CadenceConfig::default();
    config.database.url = format!("sqlite:{}", dir.path().join("core.db").display());
    // Tests mutate the lead store out-of-band, so the read cache would
    // serve stale snapshots
    config.cache.enabled = false;

    let leads = Arc::new(InMemoryLeadStore::new());
    let provider = Arc::new(MockCallProvider::new());
    let fallback = Arc::new(MockFallbackGateway::new());

    let core = EngagementCore::new(
        config,
        leads.clone(),
        provider.clone(),
        fallback.clone(),
    )
    .await?;
    Ok((core, leads, provider))
}

#[tokio::test]
async fn recovery_tick_and_webhook_complete_a_lead() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (core, leads, provider) = core_with(&dir).await?;

    // A due lead with no persisted job, as after a crash mid-reschedule
    let lead_id = Uuid::new_v4();
    leads.insert(Lead::new(lead_id, "Recovered", "+15550199"));
    leads
        .update(
            lead_id,
            LeadUpdate::new()
                .with_status(EngagementStatus::Missed)
                .with_retry_count(1)
                .with_next_retry_time(Utc::now() - Duration::minutes(5)),
        )
        .await?;

    assert_eq!(core.recover().await?, 1);
    assert_eq!(core.list_pending_jobs().await?.len(), 1);

    let driver = core.driver();
    assert_eq!(driver.tick().await?, 1);
    assert_eq!(provider.call_count(), 1);

    let call_id = leads.snapshot(lead_id).active_provider_call_id.unwrap();
    core.ingest_webhook(&json!({
        "event": "report",
        "provider_call_id": call_id,
        "native_reason": "completed",
        "structured_result": {"duration_seconds": 88},
    }))
    .await;

    let lead = leads.snapshot(lead_id);
    assert_eq!(lead.engagement_status, EngagementStatus::Completed);
    assert!(core.list_pending_jobs().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn bulk_and_callback_api_round_trip() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let (core, leads, _provider) = core_with(&dir).await?;

    let schedule_id = core
        .enqueue_bulk_schedule(
            BulkRequest::new(
                (0..3).map(|_| Uuid::new_v4()).collect(),
                Utc::now() + Duration::hours(1),
            )
            .with_parallel_calls(2)
            .with_batch_interval_seconds(60),
        )
        .await?;
    assert_eq!(core.list_pending_jobs().await?.len(), 3);

    core.cancel_bulk_schedule(schedule_id).await?;
    assert!(core.list_pending_jobs().await?.is_empty());

    let lead_id = Uuid::new_v4();
    leads.insert(Lead::new(lead_id, "Callback", "+15550188"));
    let job = core
        .schedule_callback(lead_id, Utc::now() + Duration::hours(2))
        .await?;
    assert_eq!(job.lead_id, lead_id);

    // A completed lead rejects further scheduling
    leads
        .update(
            lead_id,
            LeadUpdate::new().with_status(EngagementStatus::Completed),
        )
        .await?;
    assert!(matches!(
        core.force_retry_now(lead_id).await,
        Err(WorkflowError::TerminalLead(_))
    ));
    Ok(())
}
