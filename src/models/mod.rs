pub mod bulk_schedule;
pub mod job;
pub mod lead;

// Re-export core models for easy access
pub use bulk_schedule::{BulkRequest, BulkSchedule, BulkScheduleStatus};
pub use job::{Job, JobKind, NewJob};
pub use lead::{Lead, LeadUpdate};
