//! # Startup Reconciliation
//!
//! On restart, the scheduler's persisted queue is the primary work source,
//! but the lead store is consulted independently to self-heal divergence:
//! any lead whose retry time has arrived without a corresponding job gets
//! one re-enqueued. A crash between the lead-store write and the job
//! enqueue (the one gap in the normal path) lands exactly here.

use chrono::{DateTime, Utc};
use tracing::{debug, info, instrument};

use super::errors::WorkflowError;
use crate::clients::LeadRepository;
use crate::models::NewJob;
use crate::scheduler::{JobScheduler, SchedulerError};

/// Re-enqueue a Retry job for every lead the store reports as due.
/// `DuplicateJob` means the scheduler already holds the attempt; that is the
/// common case and not an error. Returns the number of jobs enqueued.
#[instrument(skip(scheduler, lead_store))]
pub async fn recover_due_leads(
    scheduler: &JobScheduler,
    lead_store: &dyn LeadRepository,
    now: DateTime<Utc>,
) -> Result<u32, WorkflowError> {
    let due = lead_store.list_due_for_retry(now).await?;
    let mut enqueued = 0;

    for lead_id in due {
        match scheduler.enqueue(NewJob::retry(lead_id, now)).await {
            Ok(job) => {
                debug!(lead_id = %lead_id, job_id = %job.job_id, "Recovered dangling due lead");
                enqueued += 1;
            }
            Err(SchedulerError::DuplicateJob { .. }) => {}
            Err(e) => return Err(e.into()),
        }
    }

    if enqueued > 0 {
        info!(enqueued, "Startup reconciliation re-enqueued due leads");
    }
    Ok(enqueued)
}
