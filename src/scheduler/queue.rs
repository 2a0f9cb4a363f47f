//! # Job Queue
//!
//! Enqueue, claim, and cancel operations over the persisted job table.
//!
//! `claim_due` is the driver's sole source of work: it atomically removes up
//! to `limit` due jobs from the pending set and hands them to exactly one
//! caller. Enqueueing a singleton kind for a lead that already holds one
//! fails with [`SchedulerError::DuplicateJob`], enforcing the
//! at-most-one-pending-attempt invariant at the storage layer.

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::FromRow;
use std::str::FromStr;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::{SchedulerError, SchedulerStore};
use crate::models::{Job, JobKind, NewJob};

#[derive(Debug, FromRow)]
struct JobRow {
    job_id: String,
    kind: String,
    lead_id: String,
    run_at: i64,
    schedule_id: Option<String>,
    payload: String,
    created_at: i64,
}

impl JobRow {
    fn into_job(self) -> Result<Job, SchedulerError> {
        let parse_uuid = |field: &str, value: &str| {
            Uuid::parse_str(value)
                .map_err(|e| SchedulerError::CorruptRow(format!("{field} {value}: {e}")))
        };
        let parse_ts = |field: &str, value: i64| {
            DateTime::<Utc>::from_timestamp_millis(value)
                .ok_or_else(|| SchedulerError::CorruptRow(format!("{field} {value} out of range")))
        };
        Ok(Job {
            job_id: parse_uuid("job_id", &self.job_id)?,
            kind: JobKind::from_str(&self.kind).map_err(SchedulerError::CorruptRow)?,
            lead_id: parse_uuid("lead_id", &self.lead_id)?,
            run_at: parse_ts("run_at", self.run_at)?,
            schedule_id: self
                .schedule_id
                .as_deref()
                .map(|s| parse_uuid("schedule_id", s))
                .transpose()?,
            payload: serde_json::from_str(&self.payload)
                .map_err(|e| SchedulerError::CorruptRow(format!("payload: {e}")))?,
            created_at: parse_ts("created_at", self.created_at)?,
        })
    }
}

const SELECT_COLUMNS: &str =
    "job_id, kind, lead_id, run_at, schedule_id, payload, created_at";

/// Queue operations over the durable job table
#[derive(Debug, Clone)]
pub struct JobScheduler {
    pool: SqlitePool,
}

impl JobScheduler {
    pub fn new(store: &SchedulerStore) -> Self {
        Self {
            pool: store.pool().clone(),
        }
    }

    /// Durably enqueue a job. Fails with `DuplicateJob` if the job is a
    /// singleton kind and the lead already holds a retry or callback job.
    #[instrument(skip(self, new_job), fields(lead_id = %new_job.lead_id, kind = %new_job.kind))]
    pub async fn enqueue(&self, new_job: NewJob) -> Result<Job, SchedulerError> {
        let job = Job {
            job_id: Uuid::new_v4(),
            kind: new_job.kind,
            lead_id: new_job.lead_id,
            run_at: new_job.run_at,
            schedule_id: new_job.schedule_id,
            payload: new_job.payload,
            created_at: Utc::now(),
        };

        let result = sqlx::query(
            "INSERT INTO cadence_jobs (job_id, kind, lead_id, run_at, schedule_id, payload, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(job.job_id.to_string())
        .bind(job.kind.to_string())
        .bind(job.lead_id.to_string())
        .bind(job.run_at.timestamp_millis())
        .bind(job.schedule_id.map(|id| id.to_string()))
        .bind(job.payload.to_string())
        .bind(job.created_at.timestamp_millis())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {
                debug!(job_id = %job.job_id, run_at = %job.run_at, "Job enqueued");
                Ok(job)
            }
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(SchedulerError::DuplicateJob {
                    lead_id: job.lead_id,
                    kind: job.kind,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Atomically claim up to `limit` jobs with `run_at <= now`, removing
    /// them from the pending set. Only one caller ever receives a given job.
    #[instrument(skip(self))]
    pub async fn claim_due(
        &self,
        now: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<Job>, SchedulerError> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "DELETE FROM cadence_jobs \
             WHERE job_id IN ( \
                 SELECT job_id FROM cadence_jobs \
                 WHERE run_at <= ?1 \
                 ORDER BY run_at, created_at \
                 LIMIT ?2 \
             ) \
             RETURNING {SELECT_COLUMNS}"
        ))
        .bind(now.timestamp_millis())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        let jobs = rows
            .into_iter()
            .map(JobRow::into_job)
            .collect::<Result<Vec<_>, _>>()?;
        if !jobs.is_empty() {
            debug!(count = jobs.len(), "Claimed due jobs");
        }
        Ok(jobs)
    }

    /// Idempotently remove pending jobs of one kind for a lead. Returns the
    /// number of jobs removed (0 when nothing was scheduled).
    pub async fn cancel(&self, lead_id: Uuid, kind: JobKind) -> Result<u64, SchedulerError> {
        let result = sqlx::query("DELETE FROM cadence_jobs WHERE lead_id = ?1 AND kind = ?2")
            .bind(lead_id.to_string())
            .bind(kind.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove any pending singleton (retry or callback) job for a lead
    pub async fn cancel_singletons(&self, lead_id: Uuid) -> Result<u64, SchedulerError> {
        let result = sqlx::query(
            "DELETE FROM cadence_jobs WHERE lead_id = ?1 AND kind IN ('retry', 'callback')",
        )
        .bind(lead_id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Remove all not-yet-claimed jobs belonging to a bulk schedule
    pub async fn cancel_schedule(&self, schedule_id: Uuid) -> Result<u64, SchedulerError> {
        let result = sqlx::query("DELETE FROM cadence_jobs WHERE schedule_id = ?1")
            .bind(schedule_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// All pending jobs in run order, for observability
    pub async fn list_pending(&self) -> Result<Vec<Job>, SchedulerError> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM cadence_jobs ORDER BY run_at, created_at"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(JobRow::into_job).collect()
    }

    /// The pending singleton job for a lead, if any
    pub async fn pending_singleton(&self, lead_id: Uuid) -> Result<Option<Job>, SchedulerError> {
        let row: Option<JobRow> = sqlx::query_as(&format!(
            "SELECT {SELECT_COLUMNS} FROM cadence_jobs \
             WHERE lead_id = ?1 AND kind IN ('retry', 'callback')"
        ))
        .bind(lead_id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        row.map(JobRow::into_job).transpose()
    }

    /// Number of not-yet-claimed jobs for a bulk schedule
    pub async fn count_pending_for_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<i64, SchedulerError> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM cadence_jobs WHERE schedule_id = ?1")
                .bind(schedule_id.to_string())
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0)
    }
}
