//! # Workflow Engine
//!
//! The per-lead state machine driver. Given a claimed job, it decides
//! whether to call, retry, fall back, or stop, and applies the shared
//! decision rule to every terminal outcome regardless of where the outcome
//! came from (webhook report, synchronous gateway failure, or sweep).
//!
//! ## The One Rule That Matters
//!
//! Reaching the retry branch never re-enters call initiation within the same
//! control-flow step. The retry branch writes `next_retry_time` and enqueues
//! a Retry job; the only path back to `place_call` is the driver claiming
//! that job once it is due. There is no direct edge - an immediate-retry
//! storm cannot be expressed in this code.
//!
//! ## Locking
//!
//! Every lead mutation happens under that lead's lock from [`LeadLocks`].
//! The driver's dispatch path and the reconciler's webhook path contend on
//! the same lock, so a webhook landing mid-dispatch can never interleave
//! with a new attempt for the same lead.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::errors::WorkflowError;
use crate::clients::{
    CallProviderError, CallProviderGateway, FallbackChannelGateway, LeadRepository, LeadStoreError,
};
use crate::constants::events;
use crate::events::EventPublisher;
use crate::models::{Job, JobKind, Lead, LeadUpdate, NewJob};
use crate::policy::RetryPolicy;
use crate::scheduler::{JobScheduler, ScheduleStore, SchedulerError};
use crate::state_machine::{
    decide, CallOutcome, EngagementDecision, EngagementStatus, OutcomeSource,
};

/// Per-lead critical sections. Work for distinct leads runs concurrently;
/// work for one lead is strictly serialized.
#[derive(Debug, Default)]
pub struct LeadLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl LeadLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, lead_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = self.locks.entry(lead_id).or_default().clone();
        lock.lock_owned().await
    }
}

/// How one claimed job was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// A call attempt was handed to the provider; the reconciler owns the
    /// rest of this attempt's lifecycle
    CallPlaced { provider_call_id: String },
    /// The gateway failed synchronously and the decision rule already ran
    OutcomeApplied { outcome: CallOutcome },
    /// The lead was not eligible; the job is consumed and nothing happened
    Skipped { reason: &'static str },
}

/// How a report-shaped outcome was resolved
#[derive(Debug, Clone, PartialEq)]
pub enum ReportDisposition {
    /// The outcome was fed through the decision rule
    Applied(EngagementDecision),
    /// No lead holds this call id (never known, or already reconciled)
    UnknownCallId,
    /// The lead exists but its outstanding call id changed underneath us
    StaleCallId,
}

/// Tunables the engine needs from configuration
#[derive(Debug, Clone)]
pub struct WorkflowEngineConfig {
    pub call_timeout: std::time::Duration,
    pub fallback_template_id: String,
}

/// The per-lead engagement state machine
pub struct WorkflowEngine {
    lead_store: Arc<dyn LeadRepository>,
    call_provider: Arc<dyn CallProviderGateway>,
    fallback: Arc<dyn FallbackChannelGateway>,
    scheduler: JobScheduler,
    schedules: ScheduleStore,
    publisher: EventPublisher,
    policy: RetryPolicy,
    config: WorkflowEngineConfig,
    locks: LeadLocks,
}

impl WorkflowEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lead_store: Arc<dyn LeadRepository>,
        call_provider: Arc<dyn CallProviderGateway>,
        fallback: Arc<dyn FallbackChannelGateway>,
        scheduler: JobScheduler,
        schedules: ScheduleStore,
        publisher: EventPublisher,
        policy: RetryPolicy,
        config: WorkflowEngineConfig,
    ) -> Self {
        Self {
            lead_store,
            call_provider,
            fallback,
            scheduler,
            schedules,
            publisher,
            policy,
            config,
            locks: LeadLocks::new(),
        }
    }

    /// Process one claimed job under the lead's lock
    #[instrument(skip(self, job), fields(job_id = %job.job_id, kind = %job.kind, lead_id = %job.lead_id))]
    pub async fn handle_job(&self, job: &Job) -> Result<DispatchOutcome, WorkflowError> {
        let _guard = self.locks.acquire(job.lead_id).await;
        let now = Utc::now();

        let outcome = match self.lead_store.get(job.lead_id).await {
            Ok(lead) => match job.kind {
                JobKind::Retry => self.dispatch_timed(&lead, now).await?,
                JobKind::Callback => self.dispatch_immediate(&lead, now).await?,
                JobKind::BatchSlot => self.dispatch_batch_slot(&lead, now).await?,
            },
            Err(LeadStoreError::NotFound(_)) => {
                warn!("Job references a deleted lead, consuming without dispatch");
                DispatchOutcome::Skipped {
                    reason: "lead deleted",
                }
            }
            Err(e) => return Err(e.into()),
        };

        // Batch slots move their schedule's ledger forward no matter how
        // the dispatch itself resolved
        if let Some(schedule_id) = job.schedule_id {
            self.settle_schedule_progress(schedule_id).await?;
        }
        Ok(outcome)
    }

    /// Retry path: the full `NeedsCall` entry condition applies
    async fn dispatch_timed(
        &self,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, WorkflowError> {
        if !lead.needs_call(now) {
            debug!(status = %lead.engagement_status, "Lead not eligible, consuming job");
            return Ok(DispatchOutcome::Skipped {
                reason: "not eligible",
            });
        }
        self.attempt_call(lead, now).await
    }

    /// Callback path: the requested time gates the attempt, not the retry
    /// ladder, but terminal and in-flight leads are still skipped
    async fn dispatch_immediate(
        &self,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, WorkflowError> {
        if lead.is_terminal() {
            return Ok(DispatchOutcome::Skipped {
                reason: "lead terminal",
            });
        }
        if lead.has_outstanding_call() {
            return Ok(DispatchOutcome::Skipped {
                reason: "call outstanding",
            });
        }
        self.attempt_call(lead, now).await
    }

    /// Batch slot path: bypasses the eligibility timing check but respects
    /// the mutual-exclusion invariant. A busy lead is a recorded skip, not a
    /// failure of the batch.
    async fn dispatch_batch_slot(
        &self,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, WorkflowError> {
        let skip_reason = if lead.is_terminal() {
            Some("lead terminal")
        } else if lead.has_outstanding_call() {
            Some("call outstanding")
        } else {
            None
        };
        if let Some(reason) = skip_reason {
            warn!(lead_id = %lead.lead_id, reason, "Batch slot skipped");
            self.publisher.publish_lead_event(
                events::LEAD_SLOT_SKIPPED,
                lead.lead_id,
                json!({ "reason": reason }),
            );
            return Ok(DispatchOutcome::Skipped { reason });
        }

        // The batch attempt supersedes any scheduled retry or callback, so
        // placing this call cannot leave a second pending attempt behind
        self.scheduler.cancel_singletons(lead.lead_id).await?;
        self.attempt_call(lead, now).await
    }

    /// Invoke the call provider with a bounded timeout. Synchronous failure
    /// (including timeout) proceeds directly to the retry-decision step
    /// without waiting for a webhook.
    async fn attempt_call(
        &self,
        lead: &Lead,
        now: DateTime<Utc>,
    ) -> Result<DispatchOutcome, WorkflowError> {
        let placed = match tokio::time::timeout(
            self.config.call_timeout,
            self.call_provider.place_call(lead),
        )
        .await
        {
            Ok(result) => result,
            Err(_elapsed) => Err(CallProviderError::Timeout),
        };

        match placed {
            Ok(provider_call_id) => {
                self.lead_store
                    .update(
                        lead.lead_id,
                        LeadUpdate::new()
                            .with_status(EngagementStatus::Initiated)
                            .with_active_call(provider_call_id.clone())
                            .clearing_next_retry_time()
                            .with_last_engagement_time(now),
                    )
                    .await?;
                info!(lead_id = %lead.lead_id, provider_call_id = %provider_call_id, "Call initiated");
                self.publisher.publish_lead_event(
                    events::LEAD_CALL_INITIATED,
                    lead.lead_id,
                    json!({ "provider_call_id": provider_call_id }),
                );
                Ok(DispatchOutcome::CallPlaced { provider_call_id })
            }
            Err(e) => {
                warn!(lead_id = %lead.lead_id, error = %e, "Call attempt failed synchronously");
                self.publisher.publish_lead_event(
                    events::LEAD_CALL_FAILED,
                    lead.lead_id,
                    json!({ "error": e.to_string() }),
                );
                let outcome = if e.is_permanent() {
                    CallOutcome::Failed
                } else {
                    CallOutcome::Missed
                };
                self.apply_outcome_locked(lead, outcome, OutcomeSource::SyncFailure, now)
                    .await?;
                Ok(DispatchOutcome::OutcomeApplied { outcome })
            }
        }
    }

    /// Feed a report-shaped outcome through the decision rule, deduplicated
    /// by call id: the lead is re-read under its lock and the outcome only
    /// applies while `active_provider_call_id` still matches. Clearing the
    /// id inside the same critical section makes re-delivery a no-op.
    #[instrument(skip(self))]
    pub async fn apply_report_outcome(
        &self,
        provider_call_id: &str,
        outcome: CallOutcome,
        source: OutcomeSource,
    ) -> Result<ReportDisposition, WorkflowError> {
        let Some(candidate) = self
            .lead_store
            .find_by_provider_call_id(provider_call_id)
            .await?
        else {
            return Ok(ReportDisposition::UnknownCallId);
        };

        let _guard = self.locks.acquire(candidate.lead_id).await;
        let lead = self.lead_store.get(candidate.lead_id).await?;
        if lead.active_provider_call_id.as_deref() != Some(provider_call_id) {
            return Ok(ReportDisposition::StaleCallId);
        }

        let decision = self
            .apply_outcome_locked(&lead, outcome, source, Utc::now())
            .await?;
        Ok(ReportDisposition::Applied(decision))
    }

    /// The shared decision step. Caller must hold the lead's lock.
    ///
    /// Writes to the lead store happen before the retry job is enqueued; a
    /// crash in between leaves `next_retry_time` set with no job, which
    /// startup reconciliation heals from the lead store.
    async fn apply_outcome_locked(
        &self,
        lead: &Lead,
        outcome: CallOutcome,
        source: OutcomeSource,
        now: DateTime<Utc>,
    ) -> Result<EngagementDecision, WorkflowError> {
        let decision = decide(outcome, lead.retry_count, lead.max_retry_count, now, &self.policy);

        match &decision {
            EngagementDecision::Complete => {
                self.lead_store
                    .update(
                        lead.lead_id,
                        LeadUpdate::new()
                            .with_status(EngagementStatus::Completed)
                            .clearing_active_call()
                            .clearing_next_retry_time()
                            .with_last_engagement_time(now)
                            .with_terminal_outcome(CallOutcome::Completed),
                    )
                    .await?;
                info!(lead_id = %lead.lead_id, source = source.as_str(), "Lead completed");
                self.publisher.publish_lead_event(
                    events::LEAD_COMPLETED,
                    lead.lead_id,
                    json!({ "source": source.as_str(), "retry_count": lead.retry_count }),
                );
            }

            EngagementDecision::ScheduleRetry {
                retry_count,
                next_retry_time,
                status,
            } => {
                self.lead_store
                    .update(
                        lead.lead_id,
                        LeadUpdate::new()
                            .with_status(*status)
                            .with_retry_count(*retry_count)
                            .with_next_retry_time(*next_retry_time)
                            .clearing_active_call()
                            .with_last_engagement_time(now),
                    )
                    .await?;

                match self
                    .scheduler
                    .enqueue(NewJob::retry(lead.lead_id, *next_retry_time))
                    .await
                {
                    Ok(job) => {
                        info!(
                            lead_id = %lead.lead_id,
                            retry_count,
                            run_at = %next_retry_time,
                            job_id = %job.job_id,
                            "Retry scheduled"
                        );
                        self.publisher.publish_lead_event(
                            events::LEAD_RETRY_SCHEDULED,
                            lead.lead_id,
                            json!({
                                "retry_count": retry_count,
                                "next_retry_time": next_retry_time,
                                "source": source.as_str(),
                            }),
                        );
                    }
                    // A pending callback already covers the next attempt
                    Err(SchedulerError::DuplicateJob { .. }) => {
                        debug!(lead_id = %lead.lead_id, "Singleton job already pending, retry not enqueued");
                    }
                    Err(e) => return Err(e.into()),
                }
            }

            EngagementDecision::Fallback {
                retry_count,
                status,
            } => {
                if lead.fallback_sent {
                    debug!(lead_id = %lead.lead_id, "Fallback already sent, ignoring");
                } else {
                    // fallback_sent flips before the send so a crash cannot
                    // produce a second message on recovery
                    self.lead_store
                        .update(
                            lead.lead_id,
                            LeadUpdate::new()
                                .with_status(*status)
                                .with_retry_count(*retry_count)
                                .clearing_active_call()
                                .clearing_next_retry_time()
                                .with_fallback_sent()
                                .with_last_engagement_time(now)
                                .with_terminal_outcome(outcome),
                        )
                        .await?;

                    if let Err(e) = self
                        .fallback
                        .send(lead, &self.config.fallback_template_id)
                        .await
                    {
                        // Fire-and-forget channel; delivery receipts are out
                        // of scope
                        warn!(lead_id = %lead.lead_id, error = %e, "Fallback send failed");
                    }
                    info!(lead_id = %lead.lead_id, retry_count, "Retries exhausted, fallback sent");
                    self.publisher.publish_lead_event(
                        events::LEAD_FALLBACK_SENT,
                        lead.lead_id,
                        json!({ "retry_count": retry_count, "source": source.as_str() }),
                    );
                }
            }
        }

        Ok(decision)
    }

    /// Immediately reschedule a lead's next attempt, replacing any pending
    /// retry or callback job. Fails with `AlreadyActive` while a call is
    /// outstanding.
    pub async fn force_retry_now(&self, lead_id: Uuid) -> Result<(), WorkflowError> {
        let _guard = self.locks.acquire(lead_id).await;
        let lead = self.lead_store.get(lead_id).await?;

        if lead.has_outstanding_call() {
            return Err(WorkflowError::AlreadyActive(lead_id));
        }
        if lead.is_terminal() {
            return Err(WorkflowError::TerminalLead(lead_id));
        }

        let now = Utc::now();
        self.scheduler.cancel_singletons(lead_id).await?;
        // Pull the eligibility window forward so the claimed job passes the
        // NeedsCall gate
        if lead.next_retry_time.is_some_and(|t| t > now) {
            self.lead_store
                .update(lead_id, LeadUpdate::new().with_next_retry_time(now))
                .await?;
        }

        match self.scheduler.enqueue(NewJob::retry(lead_id, now)).await {
            Ok(_) => {
                info!(lead_id = %lead_id, "Immediate retry forced");
                self.publisher.publish_lead_event(
                    events::LEAD_RETRY_SCHEDULED,
                    lead_id,
                    json!({ "forced": true }),
                );
                Ok(())
            }
            Err(SchedulerError::DuplicateJob { .. }) => Err(WorkflowError::AlreadyActive(lead_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Schedule (or reschedule) a lead-requested callback. The callback
    /// replaces any pending retry job, keeping the singleton discipline.
    pub async fn schedule_callback(
        &self,
        lead_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<Job, WorkflowError> {
        let _guard = self.locks.acquire(lead_id).await;
        let lead = self.lead_store.get(lead_id).await?;

        if lead.has_outstanding_call() {
            return Err(WorkflowError::AlreadyActive(lead_id));
        }
        if lead.is_terminal() {
            return Err(WorkflowError::TerminalLead(lead_id));
        }

        self.scheduler.cancel_singletons(lead_id).await?;
        match self.scheduler.enqueue(NewJob::callback(lead_id, at)).await {
            Ok(job) => {
                info!(lead_id = %lead_id, run_at = %at, "Callback scheduled");
                self.publisher.publish_lead_event(
                    events::LEAD_CALLBACK_SCHEDULED,
                    lead_id,
                    json!({ "run_at": at }),
                );
                Ok(job)
            }
            Err(SchedulerError::DuplicateJob { .. }) => Err(WorkflowError::AlreadyActive(lead_id)),
            Err(e) => Err(e.into()),
        }
    }

    /// Move the schedule ledger forward as slots drain
    async fn settle_schedule_progress(&self, schedule_id: Uuid) -> Result<(), WorkflowError> {
        if self.schedules.mark_running(schedule_id).await? {
            self.publisher.publish(
                events::SCHEDULE_RUNNING,
                json!({ "schedule_id": schedule_id }),
            );
        }
        let remaining = self
            .scheduler
            .count_pending_for_schedule(schedule_id)
            .await?;
        if remaining == 0 && self.schedules.mark_completed(schedule_id).await? {
            info!(schedule_id = %schedule_id, "Bulk schedule completed");
            self.publisher.publish(
                events::SCHEDULE_COMPLETED,
                json!({ "schedule_id": schedule_id }),
            );
        }
        Ok(())
    }

    /// Transient status progress from the provider (never a terminal
    /// decision): update the lead's in-flight status if the call id still
    /// matches.
    pub async fn apply_status_update(
        &self,
        provider_call_id: &str,
        status: EngagementStatus,
    ) -> Result<bool, WorkflowError> {
        let Some(candidate) = self
            .lead_store
            .find_by_provider_call_id(provider_call_id)
            .await?
        else {
            return Ok(false);
        };

        let _guard = self.locks.acquire(candidate.lead_id).await;
        let lead = self.lead_store.get(candidate.lead_id).await?;
        if lead.active_provider_call_id.as_deref() != Some(provider_call_id) {
            return Ok(false);
        }

        // Answered never regresses to Initiated on out-of-order delivery
        if lead.engagement_status == EngagementStatus::Answered
            && status == EngagementStatus::Initiated
        {
            return Ok(false);
        }

        let now = Utc::now();
        self.lead_store
            .update(
                lead.lead_id,
                LeadUpdate::new()
                    .with_status(status)
                    .with_last_engagement_time(now),
            )
            .await?;
        if status == EngagementStatus::Answered {
            self.publisher.publish_lead_event(
                events::LEAD_CALL_ANSWERED,
                lead.lead_id,
                json!({ "provider_call_id": provider_call_id }),
            );
        }
        Ok(true)
    }
}
