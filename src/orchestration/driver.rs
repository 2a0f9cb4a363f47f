//! # Orchestrator Driver
//!
//! The top-level polling loop: a single recurring poll, independent of
//! request traffic, claims due jobs and dispatches each to the workflow
//! engine. Distinct leads dispatch concurrently on a worker pool bounded by
//! the provider's concurrency cap; same-lead work is serialized by the
//! engine's per-lead locks. A second, coarser timer drives the
//! reconciliation sweep.
//!
//! `tick()` is one complete poll and is directly callable, which keeps the
//! claim/dispatch path deterministic under test without running the loop.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, error, info, instrument};

use super::reconciler::WebhookReconciler;
use super::workflow::WorkflowEngine;
use crate::config::{DriverConfig, SweepConfig};
use crate::scheduler::{JobScheduler, SchedulerError};

/// The polling loop that turns due jobs into workflow dispatches
pub struct Driver {
    engine: Arc<WorkflowEngine>,
    reconciler: Arc<WebhookReconciler>,
    scheduler: JobScheduler,
    driver_config: DriverConfig,
    sweep_config: SweepConfig,
    dispatch_permits: Arc<Semaphore>,
}

impl Driver {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        reconciler: Arc<WebhookReconciler>,
        scheduler: JobScheduler,
        driver_config: DriverConfig,
        sweep_config: SweepConfig,
    ) -> Self {
        let permits = driver_config.max_concurrent_dispatches;
        Self {
            engine,
            reconciler,
            scheduler,
            driver_config,
            sweep_config,
            dispatch_permits: Arc::new(Semaphore::new(permits)),
        }
    }

    /// One complete poll: claim due jobs, dispatch them on the bounded
    /// worker pool, wait for the batch to settle. Returns the number of
    /// jobs claimed.
    #[instrument(skip(self))]
    pub async fn tick(&self) -> Result<usize, SchedulerError> {
        let jobs = self
            .scheduler
            .claim_due(Utc::now(), self.driver_config.claim_batch_size)
            .await?;
        if jobs.is_empty() {
            return Ok(0);
        }
        debug!(count = jobs.len(), "Dispatching claimed jobs");

        let mut handles = Vec::with_capacity(jobs.len());
        for job in jobs {
            let Ok(permit) = self.dispatch_permits.clone().acquire_owned().await else {
                break;
            };
            let engine = self.engine.clone();
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                if let Err(e) = engine.handle_job(&job).await {
                    error!(job_id = %job.job_id, lead_id = %job.lead_id, error = %e, "Job dispatch failed");
                }
            }));
        }

        let count = handles.len();
        futures::future::join_all(handles).await;
        Ok(count)
    }

    /// Run the polling loop until the shutdown signal flips to `true` (or
    /// its sender is dropped). The sweep timer rides alongside the poll.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut poll = tokio::time::interval(self.driver_config.poll_interval());
        poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut sweep = tokio::time::interval(self.sweep_config.interval());
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            poll_interval_seconds = self.driver_config.poll_interval_seconds,
            sweep_interval_seconds = self.sweep_config.interval_seconds,
            "Driver started"
        );

        loop {
            tokio::select! {
                _ = poll.tick() => {
                    if let Err(e) = self.tick().await {
                        error!(error = %e, "Driver poll failed");
                    }
                }
                _ = sweep.tick() => {
                    if let Err(e) = self.reconciler.sweep(Utc::now()).await {
                        error!(error = %e, "Reconciliation sweep failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Driver shutting down");
                        break;
                    }
                }
            }
        }
    }
}
