//! # Lead Record Accessor
//!
//! Read/write access to a lead's mutable fields by stable identifier. The
//! production implementation is spreadsheet-backed; the orchestrator only
//! relies on the operations below and on `lead_id` being immutable (never a
//! row position, which is unstable under concurrent edits).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Lead, LeadUpdate};

/// Errors surfaced by a lead store implementation
#[derive(Debug, Clone, thiserror::Error)]
pub enum LeadStoreError {
    #[error("lead {0} not found")]
    NotFound(Uuid),

    #[error("lead store unavailable: {0}")]
    Unavailable(String),
}

/// The narrow interface the orchestrator consumes from the lead store
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Fetch a lead by its stable identifier
    async fn get(&self, lead_id: Uuid) -> Result<Lead, LeadStoreError>;

    /// Write a partial field set. The orchestrator is the sole writer of the
    /// engagement fields carried by [`LeadUpdate`].
    async fn update(&self, lead_id: Uuid, update: LeadUpdate) -> Result<(), LeadStoreError>;

    /// Leads whose `next_retry_time` has arrived, used as a startup
    /// reconciliation source independent of the scheduler's persisted state
    async fn list_due_for_retry(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, LeadStoreError>;

    /// Resolve a lead from an outstanding provider call id. Returns `None`
    /// when no lead currently holds that call id (unknown or already
    /// cleared), which is how duplicate reports are detected.
    async fn find_by_provider_call_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<Lead>, LeadStoreError>;

    /// Leads whose attempt has been in flight (`Initiated` or `Answered`)
    /// since before `cutoff`, the reconciliation sweep's source
    async fn list_initiated_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Lead>, LeadStoreError>;
}

#[async_trait]
impl<T: LeadRepository + ?Sized> LeadRepository for std::sync::Arc<T> {
    async fn get(&self, lead_id: Uuid) -> Result<Lead, LeadStoreError> {
        (**self).get(lead_id).await
    }

    async fn update(&self, lead_id: Uuid, update: LeadUpdate) -> Result<(), LeadStoreError> {
        (**self).update(lead_id, update).await
    }

    async fn list_due_for_retry(&self, now: DateTime<Utc>) -> Result<Vec<Uuid>, LeadStoreError> {
        (**self).list_due_for_retry(now).await
    }

    async fn find_by_provider_call_id(
        &self,
        provider_call_id: &str,
    ) -> Result<Option<Lead>, LeadStoreError> {
        (**self).find_by_provider_call_id(provider_call_id).await
    }

    async fn list_initiated_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Lead>, LeadStoreError> {
        (**self).list_initiated_before(cutoff).await
    }
}
