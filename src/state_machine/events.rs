use serde::{Deserialize, Serialize};

use super::states::CallOutcome;

/// Where a terminal outcome came from. The decision rule is identical for
/// every source; the distinction exists for logging and event context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeSource {
    /// Provider report event delivered over the webhook path
    Webhook,
    /// `place_call` rejected or timed out synchronously
    SyncFailure,
    /// Periodic reconciliation sweep synthesized the outcome
    Sweep,
}

impl OutcomeSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Webhook => "webhook",
            Self::SyncFailure => "sync_failure",
            Self::Sweep => "sweep",
        }
    }
}

/// Events that drive engagement workflow transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EngagementEvent {
    /// A call attempt was handed to the provider
    CallInitiated { provider_call_id: String },
    /// A terminal outcome was reached for the outstanding attempt
    OutcomeReached {
        outcome: CallOutcome,
        source: OutcomeSource,
    },
}

impl EngagementEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CallInitiated { .. } => "call_initiated",
            Self::OutcomeReached { .. } => "outcome_reached",
        }
    }

    /// Extract the outcome if this event carries one
    pub fn outcome(&self) -> Option<CallOutcome> {
        match self {
            Self::OutcomeReached { outcome, .. } => Some(*outcome),
            _ => None,
        }
    }
}
