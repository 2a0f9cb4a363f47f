#![allow(clippy::doc_markdown)] // Allow technical terms like SQLite, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Cadence Core
//!
//! Rust core for outbound lead engagement: place a voice call, react to its
//! outcome, retry on failure with backoff, and fall back to another channel
//! after exhausting retries - all driven by asynchronous webhook events
//! rather than synchronous responses.
//!
//! ## Architecture
//!
//! A call's terminal outcome arrives minutes after initiation, possibly
//! after the process has restarted. The orchestrator therefore splits into:
//!
//! - a durable, time-ordered **job scheduler** that survives restarts
//! - a pure **decision rule** deciding retry vs fallback vs done, shared by
//!   every path that learns an outcome
//! - a **webhook reconciler** that tolerates duplicated, delayed, and
//!   out-of-order provider events, with a periodic sweep bounding the
//!   lifetime of any stuck lead
//! - a **bulk batch scheduler** expanding many-lead call requests into
//!   waves sized to the provider's concurrency cap
//! - a polling **driver** with a bounded dispatch pool and strict per-lead
//!   serialization
//!
//! The external collaborators (lead store, call provider, fallback channel)
//! are consumed through narrow async traits in [`clients`].
//!
//! ## Correctness Properties
//!
//! - At most one of {outstanding call, scheduled retry, scheduled callback}
//!   exists per lead at any instant
//! - A failed attempt never triggers another call in the same control-flow
//!   step; the scheduler firing a due job is the only call-initiation path
//! - Report events apply exactly once per provider call id; duplicates are
//!   discarded, never reprocessed
//! - Exhausted retries send the fallback message exactly once
//!
//! ## Module Organization
//!
//! - [`models`] - leads, jobs, bulk schedules
//! - [`state_machine`] - engagement states and the pure decision rule
//! - [`policy`] - the retry interval ladder
//! - [`scheduler`] - the durable job queue and bulk schedule ledger
//! - [`clients`] - external collaborator seams and the lead read cache
//! - [`orchestration`] - workflow engine, reconciler, bulk scheduler, driver
//! - [`events`] - lifecycle event publishing and webhook payload parsing
//! - [`config`] - explicit, validated configuration
//! - [`error`] - crate-level error handling

pub mod clients;
pub mod config;
pub mod constants;
pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod policy;
pub mod scheduler;
pub mod state_machine;

pub use config::{CadenceConfig, ConfigManager};
pub use constants::events as system_events;
pub use error::{CadenceError, Result};
pub use events::EventPublisher;
pub use logging::init_structured_logging;
pub use models::{BulkRequest, BulkSchedule, Job, JobKind, Lead, LeadUpdate, NewJob};
pub use orchestration::{Driver, EngagementCore, WebhookReconciler, WorkflowEngine};
pub use policy::RetryPolicy;
pub use scheduler::{JobScheduler, SchedulerError, SchedulerStore};
pub use state_machine::{CallOutcome, EngagementStatus, WorkflowState};
