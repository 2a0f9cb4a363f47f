//! # System Constants
//!
//! Core constants that define the operational boundaries of the lead
//! engagement orchestrator.

// Re-export state types for convenience
pub use crate::state_machine::{CallOutcome, EngagementStatus, WorkflowState};

/// Lifecycle events published by the orchestrator
pub mod events {
    // Lead engagement events
    pub const LEAD_CALL_INITIATED: &str = "lead.call_initiated";
    pub const LEAD_CALL_ANSWERED: &str = "lead.call_answered";
    pub const LEAD_CALL_FAILED: &str = "lead.call_failed";
    pub const LEAD_RETRY_SCHEDULED: &str = "lead.retry_scheduled";
    pub const LEAD_CALLBACK_SCHEDULED: &str = "lead.callback_scheduled";
    pub const LEAD_FALLBACK_SENT: &str = "lead.fallback_sent";
    pub const LEAD_COMPLETED: &str = "lead.completed";
    pub const LEAD_SLOT_SKIPPED: &str = "lead.batch_slot_skipped";

    // Bulk schedule events
    pub const SCHEDULE_CREATED: &str = "schedule.created";
    pub const SCHEDULE_RUNNING: &str = "schedule.running";
    pub const SCHEDULE_COMPLETED: &str = "schedule.completed";
    pub const SCHEDULE_CANCELLED: &str = "schedule.cancelled";

    // Reconciliation events
    pub const SWEEP_STUCK_CALL: &str = "sweep.stuck_call_reconciled";
    pub const WEBHOOK_DISCARDED: &str = "webhook.event_discarded";
}

/// Default retry ladder, in seconds (1h, 4h, 24h)
pub const DEFAULT_RETRY_INTERVALS_SECONDS: [u64; 3] = [3_600, 14_400, 86_400];

/// Default maximum number of call attempts before falling back
pub const DEFAULT_MAX_RETRY_COUNT: u32 = 3;

/// Default bound on a single `place_call` gateway invocation, in seconds
pub const DEFAULT_CALL_TIMEOUT_SECONDS: u64 = 30;

/// Default provider-specific maximum call duration used by the stuck-call
/// sweep, in seconds (15 minutes)
pub const DEFAULT_MAX_CALL_DURATION_SECONDS: u64 = 900;

/// Default interval between reconciliation sweep passes, in seconds
pub const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 300;

/// Default driver poll interval, in seconds
pub const DEFAULT_POLL_INTERVAL_SECONDS: u64 = 5;

/// Default number of due jobs claimed per driver poll
pub const DEFAULT_CLAIM_BATCH_SIZE: u32 = 10;

/// Default provider concurrency cap for parallel dispatch
pub const DEFAULT_MAX_CONCURRENT_DISPATCHES: usize = 5;
