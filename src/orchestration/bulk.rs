//! # Bulk Batch Scheduler
//!
//! Expands a bulk-call request (many leads, one requested start time, a
//! concurrency cap) into individually time-sliced BatchSlot jobs respecting
//! the provider's concurrency limit. Leads are partitioned into waves of
//! `parallel_calls` in input order; wave `i` runs at
//! `requested_start + i * batch_interval`.

use chrono::Utc;
use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use super::errors::BulkScheduleError;
use crate::constants::events;
use crate::events::EventPublisher;
use crate::models::{BulkRequest, BulkSchedule, BulkScheduleStatus, NewJob};
use crate::scheduler::{JobScheduler, ScheduleStore};

/// Expands and cancels bulk schedules
pub struct BulkBatchScheduler {
    scheduler: JobScheduler,
    schedules: ScheduleStore,
    publisher: EventPublisher,
}

impl BulkBatchScheduler {
    pub fn new(
        scheduler: JobScheduler,
        schedules: ScheduleStore,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            scheduler,
            schedules,
            publisher,
        }
    }

    /// Validate and persist a bulk schedule, enqueueing one BatchSlot job
    /// per lead. Validation failures reject the request before any job is
    /// created.
    #[instrument(skip(self, request), fields(leads = request.lead_ids.len()))]
    pub async fn enqueue_bulk_schedule(
        &self,
        request: BulkRequest,
    ) -> Result<Uuid, BulkScheduleError> {
        if request.lead_ids.is_empty() {
            return Err(BulkScheduleError::InvalidBulkRequest(
                "lead list is empty".into(),
            ));
        }
        if request.parallel_calls < 1 {
            return Err(BulkScheduleError::InvalidBulkRequest(
                "parallel_calls must be at least 1".into(),
            ));
        }

        let schedule = BulkSchedule {
            schedule_id: Uuid::new_v4(),
            requested_start: request.requested_start,
            parallel_calls: request.parallel_calls,
            batch_interval_seconds: request.batch_interval_seconds,
            lead_count: request.lead_ids.len() as u32,
            status: BulkScheduleStatus::Pending,
            created_at: Utc::now(),
        };
        self.schedules.insert(&schedule).await?;

        for (index, lead_id) in request.lead_ids.iter().enumerate() {
            self.scheduler
                .enqueue(NewJob::batch_slot(
                    *lead_id,
                    schedule.schedule_id,
                    request.wave_of(index),
                    index as u32,
                    request.run_at_for(index),
                ))
                .await?;
        }

        info!(
            schedule_id = %schedule.schedule_id,
            leads = request.lead_ids.len(),
            waves = request.total_waves(),
            start = %request.requested_start,
            "Bulk schedule enqueued"
        );
        self.publisher.publish(
            events::SCHEDULE_CREATED,
            json!({
                "schedule_id": schedule.schedule_id,
                "lead_count": schedule.lead_count,
                "waves": request.total_waves(),
                "requested_start": request.requested_start,
            }),
        );
        Ok(schedule.schedule_id)
    }

    /// Best-effort cancellation: removes all not-yet-claimed jobs belonging
    /// to the schedule and marks it cancelled. Calls already handed to the
    /// gateway are not recalled.
    #[instrument(skip(self))]
    pub async fn cancel_bulk_schedule(&self, schedule_id: Uuid) -> Result<(), BulkScheduleError> {
        if self.schedules.get(schedule_id).await?.is_none() {
            return Err(BulkScheduleError::NotFound(schedule_id));
        }

        let removed = self.scheduler.cancel_schedule(schedule_id).await?;
        self.schedules.mark_cancelled(schedule_id).await?;

        info!(schedule_id = %schedule_id, removed, "Bulk schedule cancelled");
        self.publisher.publish(
            events::SCHEDULE_CANCELLED,
            json!({ "schedule_id": schedule_id, "removed_jobs": removed }),
        );
        Ok(())
    }

    /// Look up a schedule for observability
    pub async fn get_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<Option<BulkSchedule>, BulkScheduleError> {
        Ok(self.schedules.get(schedule_id).await?)
    }
}
