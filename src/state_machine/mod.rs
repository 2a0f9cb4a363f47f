// State machine module for lead engagement workflows
//
// The engagement workflow is an explicit finite state machine: a tagged union
// of states plus one pure decision function shared by the synchronous-failure
// path, the webhook path, and the reconciliation sweep.

pub mod decision;
pub mod events;
pub mod states;

// Re-export main types for convenient access
pub use decision::{decide, EngagementDecision};
pub use events::{EngagementEvent, OutcomeSource};
pub use states::{CallOutcome, EngagementStatus, WorkflowState};
