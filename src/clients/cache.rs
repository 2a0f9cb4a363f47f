//! # Cached Lead Store
//!
//! Short-TTL read cache sitting in front of a [`LeadRepository`],
//! invalidated on every write-through. Scoped entirely to this collaborator
//! seam; the orchestrator's own state never lives here. Lookups that feed
//! correctness-critical decisions (`find_by_provider_call_id`, the retry and
//! sweep listings) always pass through to the backing store.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::lead_store::{LeadRepository, LeadStoreError};
use crate::models::{Lead, LeadUpdate};

struct CacheEntry {
    lead: Lead,
    fetched_at: Instant,
}

/// TTL read cache over any lead repository
pub struct CachedLeadStore<R> {
    inner: R,
    ttl: Duration,
    entries: RwLock<HashMap<Uuid, CacheEntry>>,
}

impl<R: LeadRepository> CachedLeadStore<R> {
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn cached(&self, lead_id: Uuid) -> Option<Lead> {
        let entries = self.entries.read();
        entries
            .get(&lead_id)
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.lead.clone())
    }

    fn store(&self, lead: Lead) {
        self.entries.write().insert(
            lead.lead_id,
            CacheEntry {
                lead,
                fetched_at: Instant::now(),
            },
        );
    }

    fn invalidate(&self, lead_id: Uuid) {
        self.entries.write().remove(&lead_id);
    }
}

#[async_trait]
impl<R: LeadRepository> LeadRepository for CachedLeadStore<R> {
    async fn get(&self, lead_id: Uuid) -> Result<Lead, LeadStoreError> {
        if let Some(lead) = self.cached(lead_id) {
            return Ok(lead);
        }
        let lead = self.inner.get(lead_id).await?;
        self.store(lead.clone());
        Ok(lead)
    }

    async fn update(&self, lead_id: Uuid, update: LeadUpdate) -> Result<(), LeadStoreError> {
        // Invalidate before and after the write: a concurrent reader must
        // not repopulate the entry from a pre-write snapshot it already
        // holds, and the entry must not outlive the write either way.
        self.invalidate(lead_id);
        let result = self.inner.update(lead_id, update).await;
        self.invalidate(lead_id);
        result
    }

    async fn list_due_for_retry(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, LeadStoreError> {
        self.inner.list_due_for_retry(now).await
    }

    async fn find_by_provider_call_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<Lead>, LeadStoreError> {
        self.inner.find_by_provider_call_id(provider_call_id).await
    }

    async fn list_initiated_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Lead>, LeadStoreError> {
        self.inner.list_initiated_before(cutoff).await
    }
}
