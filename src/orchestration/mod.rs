//! # Orchestration Engine
//!
//! The lead engagement orchestrator: makes correct retry/fallback decisions
//! under partial, delayed, and out-of-order information while guaranteeing
//! at-most-one active engagement attempt per lead and never silently losing
//! a lead.
//!
//! ## Core Components
//!
//! - **WorkflowEngine**: the per-lead state machine that decides, given
//!   current lead state, whether to call, retry, fall back, or stop
//! - **WebhookReconciler**: ingests asynchronous provider events and runs
//!   the periodic stuck-call sweep
//! - **BulkBatchScheduler**: expands bulk-call requests into time-sliced
//!   waves under the provider concurrency cap
//! - **Driver**: the polling loop claiming due jobs from the persistent
//!   scheduler and dispatching them on a bounded worker pool
//! - **EngagementCore**: configuration-driven wiring and the exposed API
//!
//! ## Data Flow
//!
//! ```text
//! Driver polls Scheduler -> due job -> WorkflowEngine
//!     -> Lead Record Accessor -> Call Provider / Fallback Gateway
//!     -> (later) provider events -> WebhookReconciler -> decision rule
//!     -> next Scheduler job if a retry is due
//! ```

pub mod bootstrap;
pub mod bulk;
pub mod core;
pub mod driver;
pub mod errors;
pub mod reconciler;
pub mod workflow;

// Re-export core types and components for easy access
pub use self::core::EngagementCore;
pub use bulk::BulkBatchScheduler;
pub use driver::Driver;
pub use errors::{BulkScheduleError, ReconcileError, WorkflowError};
pub use reconciler::{DiscardReason, ReconcileOutcome, WebhookReconciler};
pub use workflow::{
    DispatchOutcome, LeadLocks, ReportDisposition, WorkflowEngine, WorkflowEngineConfig,
};
