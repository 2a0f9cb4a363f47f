//! # Call Provider Gateway
//!
//! Places one outbound call and returns a provider call identifier or an
//! immediate failure. Terminal outcomes never come back from this call; they
//! arrive minutes later as webhook events handled by the reconciler.

use async_trait::async_trait;

use crate::models::Lead;

/// Provider-assigned identifier of one call attempt
pub type ProviderCallId = String;

/// Synchronous failures from `place_call`
#[derive(Debug, Clone, thiserror::Error)]
pub enum CallProviderError {
    /// The provider rejected the request outright (malformed number,
    /// blocked destination). Retrying the same request cannot succeed,
    /// but the lead still flows through the normal retry/fallback rule.
    #[error("call rejected by provider: {0}")]
    Rejected(String),

    /// Provider outage or rate limit. Retried at the normal cadence,
    /// never instantly.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The bounded gateway timeout elapsed with no response
    #[error("provider call timed out")]
    Timeout,
}

impl CallProviderError {
    /// Rejections cannot succeed on retry of the same request
    pub fn is_permanent(&self) -> bool {
        matches!(self, Self::Rejected(_))
    }
}

/// The narrow interface the orchestrator consumes from the voice provider
#[async_trait]
pub trait CallProviderGateway: Send + Sync {
    /// Place one outbound call to the lead's phone. Bounded latency is the
    /// caller's responsibility (the workflow engine wraps this in a timeout).
    async fn place_call(&self, lead: &Lead) -> Result<ProviderCallId, CallProviderError>;
}
