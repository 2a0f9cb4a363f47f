//! # Job Model
//!
//! A unit of deferred work owned by the persistent scheduler: a due retry, a
//! requested callback, or one slot of a bulk schedule. Jobs are claimed
//! exactly once and deleted on claim-and-dispatch; the outcome of the
//! resulting action is tracked on the lead, never on the job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Kind of deferred work a job represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// A retry attempt scheduled by the decision rule
    Retry,
    /// A lead-requested callback at a specific time
    Callback,
    /// One time-sliced slot of a bulk schedule
    BatchSlot,
}

impl JobKind {
    /// Singleton kinds participate in the per-lead mutual-exclusion
    /// invariant: at most one retry *or* callback job may exist per lead.
    pub fn is_singleton(&self) -> bool {
        matches!(self, Self::Retry | Self::Callback)
    }
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Retry => write!(f, "retry"),
            Self::Callback => write!(f, "callback"),
            Self::BatchSlot => write!(f, "batch_slot"),
        }
    }
}

impl std::str::FromStr for JobKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "retry" => Ok(Self::Retry),
            "callback" => Ok(Self::Callback),
            "batch_slot" => Ok(Self::BatchSlot),
            _ => Err(format!("Invalid job kind: {s}")),
        }
    }
}

/// A persisted job as returned by the scheduler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub job_id: Uuid,
    pub kind: JobKind,
    pub lead_id: Uuid,
    pub run_at: DateTime<Utc>,
    /// Bulk schedule this job belongs to (BatchSlot only)
    pub schedule_id: Option<Uuid>,
    /// Kind-specific payload, e.g. the batch slot index
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

/// A job about to be enqueued (without generated fields)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub kind: JobKind,
    pub lead_id: Uuid,
    pub run_at: DateTime<Utc>,
    pub schedule_id: Option<Uuid>,
    pub payload: Value,
}

impl NewJob {
    /// A retry attempt due at `run_at`
    pub fn retry(lead_id: Uuid, run_at: DateTime<Utc>) -> Self {
        Self {
            kind: JobKind::Retry,
            lead_id,
            run_at,
            schedule_id: None,
            payload: Value::Null,
        }
    }

    /// A lead-requested callback at `run_at`
    pub fn callback(lead_id: Uuid, run_at: DateTime<Utc>) -> Self {
        Self {
            kind: JobKind::Callback,
            lead_id,
            run_at,
            schedule_id: None,
            payload: Value::Null,
        }
    }

    /// One slot of a bulk schedule, due at its wave's start time
    pub fn batch_slot(
        lead_id: Uuid,
        schedule_id: Uuid,
        wave_index: u32,
        slot_index: u32,
        run_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: JobKind::BatchSlot,
            lead_id,
            run_at,
            schedule_id: Some(schedule_id),
            payload: serde_json::json!({
                "wave_index": wave_index,
                "slot_index": slot_index,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_kinds() {
        assert!(JobKind::Retry.is_singleton());
        assert!(JobKind::Callback.is_singleton());
        assert!(!JobKind::BatchSlot.is_singleton());
    }

    #[test]
    fn test_kind_string_round_trip() {
        for kind in [JobKind::Retry, JobKind::Callback, JobKind::BatchSlot] {
            assert_eq!(kind.to_string().parse::<JobKind>().unwrap(), kind);
        }
        assert!("priority".parse::<JobKind>().is_err());
    }

    #[test]
    fn test_batch_slot_payload() {
        let job = NewJob::batch_slot(Uuid::new_v4(), Uuid::new_v4(), 2, 11, Utc::now());
        assert_eq!(job.payload["wave_index"], 2);
        assert_eq!(job.payload["slot_index"], 11);
        assert!(job.schedule_id.is_some());
    }
}
