//! Error types for the orchestration components

use uuid::Uuid;

use crate::clients::{FallbackError, LeadStoreError};
use crate::scheduler::SchedulerError;

/// Errors surfaced by the workflow engine
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The lead already has an outstanding call or an imminent attempt;
    /// callers surface this as "already active", never as a failure
    #[error("lead {0} already has an active engagement attempt")]
    AlreadyActive(Uuid),

    /// The lead's engagement has ended (completed or fallback sent)
    #[error("lead {0} has finished engagement")]
    TerminalLead(Uuid),

    #[error(transparent)]
    LeadStore(#[from] LeadStoreError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Fallback(#[from] FallbackError),
}

/// Errors surfaced by the webhook reconciler. These never propagate back to
/// the provider as a delivery failure signal; `ingest` catches and logs them.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    LeadStore(#[from] LeadStoreError),
}

/// Errors surfaced by the bulk batch scheduler
#[derive(Debug, thiserror::Error)]
pub enum BulkScheduleError {
    /// Rejected synchronously, before any job is created
    #[error("invalid bulk request: {0}")]
    InvalidBulkRequest(String),

    #[error("bulk schedule {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
