//! # Engagement Core
//!
//! Single-source-of-truth wiring for the orchestrator: opens the durable
//! store, builds the workflow engine, reconciler, bulk scheduler, and
//! driver from one validated configuration, and exposes the operations the
//! API layer consumes.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use super::bootstrap;
use super::bulk::BulkBatchScheduler;
use super::driver::Driver;
use super::errors::{BulkScheduleError, WorkflowError};
use super::reconciler::WebhookReconciler;
use super::workflow::{WorkflowEngine, WorkflowEngineConfig};
use crate::clients::{
    CachedLeadStore, CallProviderGateway, FallbackChannelGateway, LeadRepository,
};
use crate::config::CadenceConfig;
use crate::error::{CadenceError, Result};
use crate::events::{EventPublisher, PublishedEvent};
use crate::models::{BulkRequest, BulkSchedule, Job};
use crate::scheduler::{JobScheduler, ScheduleStore, SchedulerError, SchedulerStore};

/// The assembled orchestrator
pub struct EngagementCore {
    config: CadenceConfig,
    scheduler: JobScheduler,
    lead_store: Arc<dyn LeadRepository>,
    publisher: EventPublisher,
    engine: Arc<WorkflowEngine>,
    reconciler: Arc<WebhookReconciler>,
    bulk: BulkBatchScheduler,
}

impl EngagementCore {
    /// Build the orchestrator from validated configuration and the three
    /// external collaborators. Opens (creating if missing) the durable
    /// scheduler store named by `config.database.url`.
    pub async fn new(
        config: CadenceConfig,
        lead_store: Arc<dyn LeadRepository>,
        call_provider: Arc<dyn CallProviderGateway>,
        fallback: Arc<dyn FallbackChannelGateway>,
    ) -> Result<Self> {
        config
            .validate()
            .map_err(|e| CadenceError::ConfigurationError(e.to_string()))?;

        let store = SchedulerStore::open(&config.database.url)
            .await
            .map_err(|e| CadenceError::SchedulerError(e.to_string()))?;
        let scheduler = JobScheduler::new(&store);
        let schedules = ScheduleStore::new(&store);
        let publisher = EventPublisher::default();

        // The read cache sits in front of the lead store seam; correctness
        // never depends on it
        let lead_store: Arc<dyn LeadRepository> = if config.cache.enabled {
            Arc::new(CachedLeadStore::new(lead_store, config.cache.ttl()))
        } else {
            lead_store
        };

        let engine = Arc::new(WorkflowEngine::new(
            lead_store.clone(),
            call_provider,
            fallback,
            scheduler.clone(),
            schedules.clone(),
            publisher.clone(),
            config.retry_policy(),
            WorkflowEngineConfig {
                call_timeout: config.provider.call_timeout(),
                fallback_template_id: config.fallback.template_id.clone(),
            },
        ));

        let reconciler = Arc::new(WebhookReconciler::new(
            engine.clone(),
            lead_store.clone(),
            publisher.clone(),
            config.provider.max_call_duration(),
        ));

        let bulk = BulkBatchScheduler::new(scheduler.clone(), schedules, publisher.clone());

        info!(database = %config.database.url, "Engagement core assembled");
        Ok(Self {
            config,
            scheduler,
            lead_store,
            publisher,
            engine,
            reconciler,
            bulk,
        })
    }

    /// Startup reconciliation against the lead store
    pub async fn recover(&self) -> Result<u32> {
        bootstrap::recover_due_leads(&self.scheduler, self.lead_store.as_ref(), Utc::now())
            .await
            .map_err(|e| CadenceError::WorkflowError(e.to_string()))
    }

    /// Build the polling driver for this core
    pub fn driver(&self) -> Driver {
        Driver::new(
            self.engine.clone(),
            self.reconciler.clone(),
            self.scheduler.clone(),
            self.config.driver.clone(),
            self.config.sweep.clone(),
        )
    }

    /// Validate and enqueue a bulk-call schedule
    pub async fn enqueue_bulk_schedule(
        &self,
        request: BulkRequest,
    ) -> std::result::Result<Uuid, BulkScheduleError> {
        self.bulk.enqueue_bulk_schedule(request).await
    }

    /// Best-effort cancellation of a bulk schedule
    pub async fn cancel_bulk_schedule(
        &self,
        schedule_id: Uuid,
    ) -> std::result::Result<(), BulkScheduleError> {
        self.bulk.cancel_bulk_schedule(schedule_id).await
    }

    /// Look up a bulk schedule
    pub async fn get_bulk_schedule(
        &self,
        schedule_id: Uuid,
    ) -> std::result::Result<Option<BulkSchedule>, BulkScheduleError> {
        self.bulk.get_schedule(schedule_id).await
    }

    /// Replace a lead's pending attempt with an immediate retry
    pub async fn force_retry_now(
        &self,
        lead_id: Uuid,
    ) -> std::result::Result<(), WorkflowError> {
        self.engine.force_retry_now(lead_id).await
    }

    /// Schedule (or reschedule) a lead-requested callback
    pub async fn schedule_callback(
        &self,
        lead_id: Uuid,
        at: DateTime<Utc>,
    ) -> std::result::Result<Job, WorkflowError> {
        self.engine.schedule_callback(lead_id, at).await
    }

    /// All pending jobs in run order, for observability
    pub async fn list_pending_jobs(&self) -> std::result::Result<Vec<Job>, SchedulerError> {
        self.scheduler.list_pending().await
    }

    /// Webhook entry point; always acknowledges
    pub async fn ingest_webhook(&self, payload: &Value) {
        self.reconciler.ingest(payload).await;
    }

    /// Subscribe to lifecycle events
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<PublishedEvent> {
        self.publisher.subscribe()
    }

    /// The reconciler, for hosts that wire webhook routes directly
    pub fn reconciler(&self) -> Arc<WebhookReconciler> {
        self.reconciler.clone()
    }

    /// The workflow engine, for hosts that dispatch manually
    pub fn engine(&self) -> Arc<WorkflowEngine> {
        self.engine.clone()
    }
}
