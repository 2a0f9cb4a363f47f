//! Shared fixtures for the integration suite: in-memory collaborator mocks
//! and a fully wired engine/reconciler harness over a scheduler store.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use cadence_core::clients::{
    CallProviderError, CallProviderGateway, FallbackChannelGateway, FallbackError, LeadRepository,
    LeadStoreError, ProviderCallId,
};
use cadence_core::events::EventPublisher;
use cadence_core::models::{Lead, LeadUpdate};
use cadence_core::orchestration::{WebhookReconciler, WorkflowEngine, WorkflowEngineConfig};
use cadence_core::policy::RetryPolicy;
use cadence_core::scheduler::{JobScheduler, ScheduleStore, SchedulerStore};

/// In-memory stand-in for the spreadsheet-backed lead store
#[derive(Default)]
pub struct InMemoryLeadStore {
    leads: Mutex<HashMap<Uuid, Lead>>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, lead: Lead) {
        self.leads.lock().unwrap().insert(lead.lead_id, lead);
    }

    /// Synchronous snapshot for assertions
    pub fn snapshot(&self, lead_id: Uuid) -> Lead {
        self.leads
            .lock()
            .unwrap()
            .get(&lead_id)
            .cloned()
            .expect("lead not in store")
    }
}

#[async_trait]
impl LeadRepository for InMemoryLeadStore {
    async fn get(&self, lead_id: Uuid) -> Result<Lead, LeadStoreError> {
        self.leads
            .lock()
            .unwrap()
            .get(&lead_id)
            .cloned()
            .ok_or(LeadStoreError::NotFound(lead_id))
    }

    async fn update(&self, lead_id: Uuid, update: LeadUpdate) -> Result<(), LeadStoreError> {
        let mut leads = self.leads.lock().unwrap();
        let lead = leads
            .get_mut(&lead_id)
            .ok_or(LeadStoreError::NotFound(lead_id))?;
        update.apply_to(lead);
        Ok(())
    }

    async fn list_due_for_retry(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, LeadStoreError> {
        Ok(self
            .leads
            .lock()
            .unwrap()
            .values()
            .filter(|lead| {
                !lead.is_terminal()
                    && !lead.has_outstanding_call()
                    && lead.engagement_status.is_callable()
                    && lead.retry_count < lead.max_retry_count
                    && lead.next_retry_time.is_some_and(|t| t <= now)
            })
            .map(|lead| lead.lead_id)
            .collect())
    }

    async fn find_by_provider_call_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<Lead>, LeadStoreError> {
        Ok(self
            .leads
            .lock()
            .unwrap()
            .values()
            .find(|lead| lead.active_provider_call_id.as_deref() == Some(provider_call_id))
            .cloned())
    }

    async fn list_initiated_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Lead>, LeadStoreError> {
        Ok(self
            .leads
            .lock()
            .unwrap()
            .values()
            .filter(|lead| {
                lead.engagement_status.is_in_flight()
                    && lead.last_engagement_time.is_some_and(|t| t < cutoff)
            })
            .cloned()
            .collect())
    }
}

/// Scriptable call provider that records every attempt with its timestamp
#[derive(Default)]
pub struct MockCallProvider {
    script: Mutex<VecDeque<Result<ProviderCallId, CallProviderError>>>,
    calls: Mutex<Vec<(Uuid, DateTime<Utc>)>>,
    counter: AtomicUsize,
}

impl MockCallProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the result of the next `place_call`; unscripted calls succeed
    /// with a generated call id
    pub fn push_result(&self, result: Result<ProviderCallId, CallProviderError>) {
        self.script.lock().unwrap().push_back(result);
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn calls_for(&self, lead_id: Uuid) -> Vec<DateTime<Utc>> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == lead_id)
            .map(|(_, at)| *at)
            .collect()
    }
}

#[async_trait]
impl CallProviderGateway for MockCallProvider {
    async fn place_call(&self, lead: &Lead) -> Result<ProviderCallId, CallProviderError> {
        self.calls.lock().unwrap().push((lead.lead_id, Utc::now()));
        if let Some(scripted) = self.script.lock().unwrap().pop_front() {
            return scripted;
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        Ok(format!("CA-{n}"))
    }
}

/// Counting fallback gateway
#[derive(Default)]
pub struct MockFallbackGateway {
    sends: Mutex<Vec<(Uuid, String)>>,
    fail_next: AtomicBool,
}

impl MockFallbackGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn send_count(&self) -> usize {
        self.sends.lock().unwrap().len()
    }

    pub fn sends_for(&self, lead_id: Uuid) -> usize {
        self.sends
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == lead_id)
            .count()
    }
}

#[async_trait]
impl FallbackChannelGateway for MockFallbackGateway {
    async fn send(&self, lead: &Lead, template_id: &str) -> Result<(), FallbackError> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(FallbackError("scripted failure".into()));
        }
        self.sends
            .lock()
            .unwrap()
            .push((lead.lead_id, template_id.to_string()));
        Ok(())
    }
}

/// A fully wired engine + reconciler over an in-memory scheduler store
pub struct Harness {
    pub scheduler: JobScheduler,
    pub schedules: ScheduleStore,
    pub leads: Arc<InMemoryLeadStore>,
    pub provider: Arc<MockCallProvider>,
    pub fallback: Arc<MockFallbackGateway>,
    pub publisher: EventPublisher,
    pub engine: Arc<WorkflowEngine>,
    pub reconciler: Arc<WebhookReconciler>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_policy(RetryPolicy::default()).await
    }

    pub async fn with_policy(policy: RetryPolicy) -> Self {
        let store = SchedulerStore::in_memory().await.unwrap();
        Self::build(store, policy).await
    }

    pub async fn with_store(store: SchedulerStore) -> Self {
        Self::build(store, RetryPolicy::default()).await
    }

    async fn build(store: SchedulerStore, policy: RetryPolicy) -> Self {
        let scheduler = JobScheduler::new(&store);
        let schedules = ScheduleStore::new(&store);
        let leads = Arc::new(InMemoryLeadStore::new());
        let provider = Arc::new(MockCallProvider::new());
        let fallback = Arc::new(MockFallbackGateway::new());
        let publisher = EventPublisher::default();

        let engine = Arc::new(WorkflowEngine::new(
            leads.clone(),
            provider.clone(),
            fallback.clone(),
            scheduler.clone(),
            schedules.clone(),
            publisher.clone(),
            policy,
            WorkflowEngineConfig {
                call_timeout: std::time::Duration::from_secs(5),
                fallback_template_id: "missed-call-followup".to_string(),
            },
        ));

        let reconciler = Arc::new(WebhookReconciler::new(
            engine.clone(),
            leads.clone() as Arc<dyn LeadRepository>,
            publisher.clone(),
            chrono::Duration::minutes(15),
        ));

        Self {
            scheduler,
            schedules,
            leads,
            provider,
            fallback,
            publisher,
            engine,
            reconciler,
        }
    }

    /// Insert a fresh pending lead and return its id
    pub fn seed_lead(&self) -> Uuid {
        let lead_id = Uuid::new_v4();
        self.leads
            .insert(Lead::new(lead_id, "Test Lead", "+15550100"));
        lead_id
    }
}
