//! Bulk batch scheduler: wave timing, validation, cancellation, and the
//! busy-lead skip path.

mod common;

use chrono::{Duration, Utc};
use uuid::Uuid;

use cadence_core::clients::LeadRepository;
use cadence_core::models::{BulkRequest, BulkScheduleStatus, JobKind, Lead, LeadUpdate};
use cadence_core::orchestration::{BulkBatchScheduler, BulkScheduleError, DispatchOutcome};
use cadence_core::state_machine::EngagementStatus;

use common::Harness;

fn bulk(harness: &Harness) -> BulkBatchScheduler {
    BulkBatchScheduler::new(
        harness.scheduler.clone(),
        harness.schedules.clone(),
        harness.publisher.clone(),
    )
}

#[tokio::test]
async fn eleven_leads_in_waves_of_five_every_120_seconds() -> anyhow::Result<()> {
    use chrono::TimeZone;

    let harness = Harness::new().await;
    let bulk = bulk(&harness);
    // Millisecond-exact start so run_at round-trips through the store intact
    let start = Utc.with_ymd_and_hms(2030, 1, 6, 9, 0, 0).unwrap();
    let lead_ids: Vec<Uuid> = (0..11).map(|_| Uuid::new_v4()).collect();

    let schedule_id = bulk
        .enqueue_bulk_schedule(
            BulkRequest::new(lead_ids.clone(), start)
                .with_parallel_calls(5)
                .with_batch_interval_seconds(120),
        )
        .await?;

    let pending = harness.scheduler.list_pending().await?;
    assert_eq!(pending.len(), 11);
    assert!(pending.iter().all(|j| j.kind == JobKind::BatchSlot));
    assert!(pending.iter().all(|j| j.schedule_id == Some(schedule_id)));

    // Wave boundaries land at T, T+120, T+240, in input order
    for (index, lead_id) in lead_ids.iter().enumerate() {
        let job = pending.iter().find(|j| j.lead_id == *lead_id).unwrap();
        let expected_wave = (index / 5) as i64;
        assert_eq!(job.run_at, start + Duration::seconds(expected_wave * 120));
        assert_eq!(job.payload["slot_index"], index as u64);
        assert_eq!(job.payload["wave_index"], (index / 5) as u64);
    }

    let schedule = bulk.get_schedule(schedule_id).await?.unwrap();
    assert_eq!(schedule.status, BulkScheduleStatus::Pending);
    assert_eq!(schedule.lead_count, 11);
    Ok(())
}

#[tokio::test]
async fn invalid_requests_are_rejected_before_any_job_exists() -> anyhow::Result<()> {
    let harness = Harness::new().await;
    let bulk = bulk(&harness);
    let start = Utc::now();

    let err = bulk
        .enqueue_bulk_schedule(BulkRequest::new(vec![], start).with_parallel_calls(5))
        .await
        .unwrap_err();
    assert!(matches!(err, BulkScheduleError::InvalidBulkRequest(_)));

    let err = bulk
        .enqueue_bulk_schedule(
            BulkRequest::new(vec![Uuid::new_v4()], start).with_parallel_calls(0),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, BulkScheduleError::InvalidBulkRequest(_)));

    assert!(harness.scheduler.list_pending().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn cancellation_removes_unclaimed_slots_only() -> anyhow::Result<()> {
    let harness = Harness::new().await;
    let bulk = bulk(&harness);
    let now = Utc::now();
    let lead_ids: Vec<Uuid> = (0..6).map(|_| Uuid::new_v4()).collect();

    let schedule_id = bulk
        .enqueue_bulk_schedule(
            BulkRequest::new(lead_ids, now - Duration::minutes(1))
                .with_parallel_calls(2)
                .with_batch_interval_seconds(0),
        )
        .await?;

    // Two slots already claimed by a poll; four still pending
    let claimed = harness.scheduler.claim_due(now, 2).await?;
    assert_eq!(claimed.len(), 2);

    bulk.cancel_bulk_schedule(schedule_id).await?;
    assert_eq!(
        harness
            .scheduler
            .count_pending_for_schedule(schedule_id)
            .await?,
        0
    );
    let schedule = bulk.get_schedule(schedule_id).await?.unwrap();
    assert_eq!(schedule.status, BulkScheduleStatus::Cancelled);
    Ok(())
}

#[tokio::test]
async fn cancelling_an_unknown_schedule_is_not_found() -> anyhow::Result<()> {
    let harness = Harness::new().await;
    let bulk = bulk(&harness);
    let err = bulk
        .cancel_bulk_schedule(Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(matches!(err, BulkScheduleError::NotFound(_)));
    Ok(())
}

#[tokio::test]
async fn busy_lead_is_skipped_without_failing_the_batch() -> anyhow::Result<()> {
    let harness = Harness::new().await;
    let bulk = bulk(&harness);
    let now = Utc::now();

    let free = Uuid::new_v4();
    let busy = Uuid::new_v4();
    harness.leads.insert(Lead::new(free, "Free", "+15550101"));
    harness.leads.insert(Lead::new(busy, "Busy", "+15550102"));
    harness
        .leads
        .update(
            busy,
            LeadUpdate::new()
                .with_status(EngagementStatus::Initiated)
                .with_active_call("CA-live"),
        )
        .await?;

    let schedule_id = bulk
        .enqueue_bulk_schedule(
            BulkRequest::new(vec![free, busy], now - Duration::minutes(1)).with_parallel_calls(2),
        )
        .await?;

    let jobs = harness.scheduler.claim_due(now, 10).await?;
    assert_eq!(jobs.len(), 2);
    for job in &jobs {
        let outcome = harness.engine.handle_job(job).await?;
        if job.lead_id == busy {
            assert_eq!(
                outcome,
                DispatchOutcome::Skipped {
                    reason: "call outstanding"
                }
            );
        } else {
            assert!(matches!(outcome, DispatchOutcome::CallPlaced { .. }));
        }
    }

    // The busy lead's outstanding call was untouched
    assert_eq!(
        harness.leads.snapshot(busy).active_provider_call_id.as_deref(),
        Some("CA-live")
    );
    // Every slot drained, so the schedule completed despite the skip
    let schedule = bulk.get_schedule(schedule_id).await?.unwrap();
    assert_eq!(schedule.status, BulkScheduleStatus::Completed);
    Ok(())
}

#[tokio::test]
async fn batch_slot_supersedes_a_scheduled_retry() -> anyhow::Result<()> {
    let harness = Harness::new().await;
    let bulk = bulk(&harness);
    let now = Utc::now();

    let lead_id = harness.seed_lead();
    harness
        .leads
        .update(
            lead_id,
            LeadUpdate::new()
                .with_status(EngagementStatus::Missed)
                .with_retry_count(1)
                .with_next_retry_time(now + Duration::hours(4)),
        )
        .await?;
    harness
        .scheduler
        .enqueue(cadence_core::models::NewJob::retry(
            lead_id,
            now + Duration::hours(4),
        ))
        .await?;

    bulk.enqueue_bulk_schedule(
        BulkRequest::new(vec![lead_id], now - Duration::minutes(1)).with_parallel_calls(1),
    )
    .await?;

    let jobs = harness.scheduler.claim_due(now, 10).await?;
    let slot = jobs.iter().find(|j| j.kind == JobKind::BatchSlot).unwrap();
    let outcome = harness.engine.handle_job(slot).await?;
    assert!(matches!(outcome, DispatchOutcome::CallPlaced { .. }));

    // The pending retry was cancelled before the call went out: one call in
    // flight, zero scheduled attempts
    assert!(harness.scheduler.pending_singleton(lead_id).await?.is_none());
    Ok(())
}
