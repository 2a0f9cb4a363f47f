use serde::{Deserialize, Serialize};
use std::fmt;

/// Engagement status of a lead, as stored in the lead record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngagementStatus {
    /// Lead has never been engaged
    Pending,
    /// A call attempt is outstanding at the provider
    Initiated,
    /// Provider reported the lead picked up (transient, call still live)
    Answered,
    /// Last attempt ended without reaching the lead
    Missed,
    /// Last attempt ended with a provider or carrier error
    Failed,
    /// Lead was successfully engaged
    Completed,
}

impl EngagementStatus {
    /// Check if a lead in this status has an attempt outstanding
    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Initiated | Self::Answered)
    }

    /// Check if this status ends the lead's active engagement
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Check if a lead in this status is eligible for another call attempt
    pub fn is_callable(&self) -> bool {
        matches!(self, Self::Pending | Self::Missed | Self::Failed)
    }
}

impl fmt::Display for EngagementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Initiated => write!(f, "initiated"),
            Self::Answered => write!(f, "answered"),
            Self::Missed => write!(f, "missed"),
            Self::Failed => write!(f, "failed"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl std::str::FromStr for EngagementStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "initiated" => Ok(Self::Initiated),
            "answered" => Ok(Self::Answered),
            "missed" => Ok(Self::Missed),
            "failed" => Ok(Self::Failed),
            "completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid engagement status: {s}")),
        }
    }
}

impl Default for EngagementStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Terminal outcome of a single call attempt, as decided by the report
/// mapping table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallOutcome {
    /// Conversation happened; the lead is done
    Completed,
    /// No answer, busy, timeout - the lead was not reached
    Missed,
    /// Carrier or provider error ended the attempt
    Failed,
}

impl CallOutcome {
    /// The engagement status a lead carries after this outcome
    pub fn as_status(&self) -> EngagementStatus {
        match self {
            Self::Completed => EngagementStatus::Completed,
            Self::Missed => EngagementStatus::Missed,
            Self::Failed => EngagementStatus::Failed,
        }
    }

    /// Check if this outcome ends the lead's engagement without retry
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "completed"),
            Self::Missed => write!(f, "missed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for CallOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(Self::Completed),
            "missed" => Ok(Self::Missed),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid call outcome: {s}")),
        }
    }
}

/// Workflow node a lead occupies between decision steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    /// Lead is eligible for a call attempt
    NeedsCall,
    /// A call attempt is in flight; the workflow waits on the reconciler
    Calling,
    /// A retry job is enqueued; the scheduler drives the next attempt
    RetryScheduled,
    /// Retries exhausted, fallback message sent
    FallbackSent,
    /// Lead finished engagement
    Done,
}

impl WorkflowState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::FallbackSent | Self::Done)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NeedsCall => write!(f, "needs_call"),
            Self::Calling => write!(f, "calling"),
            Self::RetryScheduled => write!(f, "retry_scheduled"),
            Self::FallbackSent => write!(f, "fallback_sent"),
            Self::Done => write!(f, "done"),
        }
    }
}
