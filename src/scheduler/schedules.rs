//! # Bulk Schedule Ledger
//!
//! Persistence for bulk schedules. Status transitions are conditional
//! updates, so concurrent dispatchers cannot move a schedule backwards or
//! resurrect a cancelled one.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;
use std::str::FromStr;
use uuid::Uuid;

use super::{SchedulerError, SchedulerStore};
use crate::models::{BulkSchedule, BulkScheduleStatus};

#[derive(Debug, FromRow)]
struct ScheduleRow {
    schedule_id: String,
    requested_start: i64,
    parallel_calls: i64,
    batch_interval_seconds: i64,
    lead_count: i64,
    status: String,
    created_at: i64,
}

impl ScheduleRow {
    fn into_schedule(self) -> Result<BulkSchedule, SchedulerError> {
        let parse_ts = |field: &str, value: i64| {
            DateTime::<Utc>::from_timestamp_millis(value)
                .ok_or_else(|| SchedulerError::CorruptRow(format!("{field} {value} out of range")))
        };
        Ok(BulkSchedule {
            schedule_id: Uuid::parse_str(&self.schedule_id)
                .map_err(|e| SchedulerError::CorruptRow(format!("schedule_id: {e}")))?,
            requested_start: parse_ts("requested_start", self.requested_start)?,
            parallel_calls: self.parallel_calls as u32,
            batch_interval_seconds: self.batch_interval_seconds as u64,
            lead_count: self.lead_count as u32,
            status: BulkScheduleStatus::from_str(&self.status)
                .map_err(SchedulerError::CorruptRow)?,
            created_at: parse_ts("created_at", self.created_at)?,
        })
    }
}

/// Persistence operations for the bulk schedule ledger
#[derive(Debug, Clone)]
pub struct ScheduleStore {
    pool: SqlitePool,
}

impl ScheduleStore {
    pub fn new(store: &SchedulerStore) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    pub async fn insert(&self, schedule: &BulkSchedule) -> Result<(), SchedulerError> {
        sqlx::query(
            "INSERT INTO cadence_bulk_schedules \
             (schedule_id, requested_start, parallel_calls, batch_interval_seconds, lead_count, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(schedule.schedule_id.to_string())
        .bind(schedule.requested_start.timestamp_millis())
        .bind(i64::from(schedule.parallel_calls))
        .bind(schedule.batch_interval_seconds as i64)
        .bind(i64::from(schedule.lead_count))
        .bind(schedule.status.to_string())
        .bind(schedule.created_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get(&self, schedule_id: Uuid) -> Result<Option<BulkSchedule>, SchedulerError> {
        let row: Option<ScheduleRow> = sqlx::query_as(
            "SELECT schedule_id, requested_start, parallel_calls, batch_interval_seconds, \
                    lead_count, status, created_at \
             FROM cadence_bulk_schedules WHERE schedule_id = ?1",
        )
        .bind(schedule_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(ScheduleRow::into_schedule).transpose()
    }

    /// Pending -> Running. Returns false if the schedule already left Pending.
    pub async fn mark_running(&self, schedule_id: Uuid) -> Result<bool, SchedulerError> {
        self.transition(schedule_id, BulkScheduleStatus::Running, &["pending"])
            .await
    }

    /// Running (or Pending, for a single-wave schedule drained in one poll)
    /// -> Completed.
    pub async fn mark_completed(&self, schedule_id: Uuid) -> Result<bool, SchedulerError> {
        self.transition(
            schedule_id,
            BulkScheduleStatus::Completed,
            &["pending", "running"],
        )
        .await
    }

    /// Pending or Running -> Cancelled. Idempotent from the caller's view:
    /// cancelling an already-cancelled schedule returns false.
    pub async fn mark_cancelled(&self, schedule_id: Uuid) -> Result<bool, SchedulerError> {
        self.transition(
            schedule_id,
            BulkScheduleStatus::Cancelled,
            &["pending", "running"],
        )
        .await
    }

    async fn transition(
        &self,
        schedule_id: Uuid,
        to: BulkScheduleStatus,
        from: &[&str],
    ) -> Result<bool, SchedulerError> {
        let placeholders = from
            .iter()
            .map(|s| format!("'{s}'"))
            .collect::<Vec<_>>()
            .join(", ");
        let result = sqlx::query(&format!(
            "UPDATE cadence_bulk_schedules SET status = ?1 \
             WHERE schedule_id = ?2 AND status IN ({placeholders})"
        ))
        .bind(to.to_string())
        .bind(schedule_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
