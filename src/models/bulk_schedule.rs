//! # Bulk Schedule Model
//!
//! A bulk-call request expanded into time-sliced waves sized to the
//! provider's concurrency cap. Leads are called in input order; wave `i`
//! runs at `requested_start + i * batch_interval`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Lifecycle status of a bulk schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkScheduleStatus {
    /// Created, no slot dispatched yet
    Pending,
    /// At least one slot dispatched
    Running,
    /// Every slot dispatched
    Completed,
    /// Cancelled; remaining slots removed, dispatched calls not recalled
    Cancelled,
}

impl BulkScheduleStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for BulkScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for BulkScheduleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "running" => Ok(Self::Running),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            _ => Err(format!("Invalid bulk schedule status: {s}")),
        }
    }
}

/// An incoming bulk-call request, validated before any job is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkRequest {
    /// Leads in call order; first-listed leads are called first
    pub lead_ids: Vec<Uuid>,
    pub requested_start: DateTime<Utc>,
    /// Concurrency width of one wave
    pub parallel_calls: u32,
    /// Spacing between waves, in seconds
    pub batch_interval_seconds: u64,
}

impl BulkRequest {
    pub fn new(lead_ids: Vec<Uuid>, requested_start: DateTime<Utc>) -> Self {
        Self {
            lead_ids,
            requested_start,
            parallel_calls: 1,
            batch_interval_seconds: 0,
        }
    }

    pub fn with_parallel_calls(mut self, parallel_calls: u32) -> Self {
        self.parallel_calls = parallel_calls;
        self
    }

    pub fn with_batch_interval_seconds(mut self, seconds: u64) -> Self {
        self.batch_interval_seconds = seconds;
        self
    }

    /// Wave the slot at `index` belongs to
    pub fn wave_of(&self, index: usize) -> u32 {
        (index as u32) / self.parallel_calls.max(1)
    }

    /// Dispatch time of the slot at `index`
    pub fn run_at_for(&self, index: usize) -> DateTime<Utc> {
        let wave = self.wave_of(index) as i64;
        self.requested_start + Duration::seconds(wave * self.batch_interval_seconds as i64)
    }

    /// Total number of waves this request expands into
    pub fn total_waves(&self) -> u32 {
        let width = self.parallel_calls.max(1) as usize;
        self.lead_ids.len().div_ceil(width) as u32
    }
}

/// A persisted bulk schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkSchedule {
    pub schedule_id: Uuid,
    pub requested_start: DateTime<Utc>,
    pub parallel_calls: u32,
    pub batch_interval_seconds: u64,
    pub lead_count: u32,
    pub status: BulkScheduleStatus,
    pub created_at: DateTime<Utc>,
}
