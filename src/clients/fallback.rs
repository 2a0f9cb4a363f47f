//! # Fallback Channel Gateway
//!
//! Sends a single templated message over the secondary channel once a lead's
//! retries are exhausted. Fire-and-forget from the orchestrator's
//! perspective; delivery receipts are out of scope.

use async_trait::async_trait;

use crate::models::Lead;

#[derive(Debug, Clone, thiserror::Error)]
#[error("fallback send failed: {0}")]
pub struct FallbackError(pub String);

/// The narrow interface the orchestrator consumes from the fallback sender
#[async_trait]
pub trait FallbackChannelGateway: Send + Sync {
    /// Send the templated message to the lead's fallback address
    async fn send(&self, lead: &Lead, template_id: &str) -> Result<(), FallbackError>;
}
