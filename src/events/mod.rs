pub mod provider_payload;
pub mod publisher;

// Re-export key types for convenience
pub use provider_payload::{
    map_native_status, map_report_reason, parse_provider_event, PayloadError, ProviderEvent,
};
pub use publisher::{EventPublisher, PublishError, PublishedEvent};
