//! # Persistent Job Scheduler
//!
//! Durable, time-ordered queue of pending work items (due retries, requested
//! callbacks, batched bulk-call slots) that survives process restarts.
//!
//! ## Architecture
//!
//! The scheduler owns a small embedded SQLite store. Claiming is a single
//! atomic `DELETE ... RETURNING` statement, so concurrent callers always
//! receive disjoint job sets, and a claimed job is gone from the pending set
//! the instant it is handed out. Jobs are deleted on claim-and-dispatch, not
//! on completion of the resulting action - the action's outcome is tracked on
//! the lead record.
//!
//! ## Mutual Exclusion
//!
//! Retry and Callback are singleton kinds: a partial unique index on
//! `lead_id` restricted to those kinds guarantees at most one of either may
//! exist per lead at a time. Violations surface as
//! [`SchedulerError::DuplicateJob`], which callers treat as "already
//! scheduled".

pub mod queue;
pub mod schedules;
pub mod store;

pub use queue::JobScheduler;
pub use schedules::ScheduleStore;
pub use store::SchedulerStore;

use uuid::Uuid;

use crate::models::JobKind;

/// Errors surfaced by the scheduler components
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// A singleton job (retry or callback) already exists for this lead.
    /// Callers must treat this as "already scheduled", not as a failure.
    #[error("a singleton {kind} job already exists for lead {lead_id}")]
    DuplicateJob { lead_id: Uuid, kind: JobKind },

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("corrupt persisted row: {0}")]
    CorruptRow(String),
}
