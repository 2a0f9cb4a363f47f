//! # Lead Model
//!
//! A contact entity being engaged. Leads are owned by the external lead
//! store; this core is the sole writer of the engagement fields
//! (`engagement_status`, `retry_count`, `next_retry_time`,
//! `active_provider_call_id`, `fallback_sent`, `last_engagement_time`,
//! `terminal_outcome`) and reads everything else.
//!
//! Leads are addressed by `lead_id` - a stable identifier, never a row
//! position in any storage, which is unstable under concurrent edits.
//!
//! ## Mutual-Exclusion Invariant
//!
//! At most one of {an outstanding call, a scheduled retry job, a scheduled
//! callback job} may exist for a lead at any instant. The lead side of that
//! invariant is `active_provider_call_id`: set exactly while an attempt is
//! outstanding, cleared exactly once when its terminal outcome is applied.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::state_machine::{CallOutcome, EngagementStatus};

/// A lead as read from the lead store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub lead_id: Uuid,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    /// Address on the secondary channel used after retries are exhausted
    pub fallback_address: Option<String>,
    pub engagement_status: EngagementStatus,
    pub retry_count: u32,
    pub next_retry_time: Option<DateTime<Utc>>,
    pub max_retry_count: u32,
    /// Set exactly while a call attempt is outstanding
    pub active_provider_call_id: Option<String>,
    /// Monotonic false -> true
    pub fallback_sent: bool,
    pub last_engagement_time: Option<DateTime<Utc>>,
    /// Set once, never overwritten
    pub terminal_outcome: Option<CallOutcome>,
}

impl Lead {
    /// Create a fresh lead with engagement fields at their initial values
    pub fn new(lead_id: Uuid, name: impl Into<String>, phone: impl Into<String>) -> Self {
        Self {
            lead_id,
            name: name.into(),
            phone: phone.into(),
            email: None,
            fallback_address: None,
            engagement_status: EngagementStatus::default(),
            retry_count: 0,
            next_retry_time: None,
            max_retry_count: crate::constants::DEFAULT_MAX_RETRY_COUNT,
            active_provider_call_id: None,
            fallback_sent: false,
            last_engagement_time: None,
            terminal_outcome: None,
        }
    }

    /// Check if a call attempt is outstanding at the provider
    pub fn has_outstanding_call(&self) -> bool {
        self.active_provider_call_id.is_some()
    }

    /// Check if this lead's active engagement has ended (successful
    /// completion or exhausted retries with fallback sent)
    pub fn is_terminal(&self) -> bool {
        self.engagement_status.is_terminal() || self.fallback_sent
    }

    /// Entry condition for the call-initiation step: pending, or a
    /// missed/failed lead whose retry time has arrived with attempts left
    pub fn needs_call(&self, now: DateTime<Utc>) -> bool {
        if self.is_terminal() || self.has_outstanding_call() {
            return false;
        }
        match self.engagement_status {
            EngagementStatus::Pending => true,
            EngagementStatus::Missed | EngagementStatus::Failed => {
                self.retry_count < self.max_retry_count
                    && self.next_retry_time.is_some_and(|t| t <= now)
            }
            _ => false,
        }
    }
}

/// Partial update of a lead's engagement fields. Only fields that are
/// `Some` are written; `clear_*` flags express writing a NULL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadUpdate {
    pub engagement_status: Option<EngagementStatus>,
    pub retry_count: Option<u32>,
    pub next_retry_time: Option<DateTime<Utc>>,
    pub clear_next_retry_time: bool,
    pub active_provider_call_id: Option<String>,
    pub clear_active_provider_call_id: bool,
    pub fallback_sent: Option<bool>,
    pub last_engagement_time: Option<DateTime<Utc>>,
    pub terminal_outcome: Option<CallOutcome>,
}

impl LeadUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: EngagementStatus) -> Self {
        self.engagement_status = Some(status);
        self
    }

    pub fn with_retry_count(mut self, count: u32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn with_next_retry_time(mut self, at: DateTime<Utc>) -> Self {
        self.next_retry_time = Some(at);
        self
    }

    pub fn clearing_next_retry_time(mut self) -> Self {
        self.clear_next_retry_time = true;
        self
    }

    pub fn with_active_call(mut self, provider_call_id: impl Into<String>) -> Self {
        self.active_provider_call_id = Some(provider_call_id.into());
        self
    }

    pub fn clearing_active_call(mut self) -> Self {
        self.clear_active_provider_call_id = true;
        self
    }

    pub fn with_fallback_sent(mut self) -> Self {
        self.fallback_sent = Some(true);
        self
    }

    pub fn with_last_engagement_time(mut self, at: DateTime<Utc>) -> Self {
        self.last_engagement_time = Some(at);
        self
    }

    pub fn with_terminal_outcome(mut self, outcome: CallOutcome) -> Self {
        self.terminal_outcome = Some(outcome);
        self
    }

    /// Apply this update to an owned lead value, the way a store impl would
    pub fn apply_to(&self, lead: &mut Lead) {
        if let Some(status) = self.engagement_status {
            lead.engagement_status = status;
        }
        if let Some(count) = self.retry_count {
            lead.retry_count = count;
        }
        if let Some(at) = self.next_retry_time {
            lead.next_retry_time = Some(at);
        }
        if self.clear_next_retry_time {
            lead.next_retry_time = None;
        }
        if let Some(ref call_id) = self.active_provider_call_id {
            lead.active_provider_call_id = Some(call_id.clone());
        }
        if self.clear_active_provider_call_id {
            lead.active_provider_call_id = None;
        }
        if let Some(sent) = self.fallback_sent {
            // fallback_sent is monotonic; a true value never reverts
            lead.fallback_sent = lead.fallback_sent || sent;
        }
        if let Some(at) = self.last_engagement_time {
            lead.last_engagement_time = Some(at);
        }
        if let Some(outcome) = self.terminal_outcome {
            // set once, never overwritten
            lead.terminal_outcome.get_or_insert(outcome);
        }
    }
}
