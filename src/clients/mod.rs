//! # External Collaborator Seams
//!
//! The orchestrator consumes three narrow interfaces and is otherwise
//! ignorant of their implementations: the lead store (spreadsheet-backed in
//! production), the voice call provider, and the fallback message channel.
//! Each seam is an async trait; production adapters live outside this crate.

pub mod cache;
pub mod call_provider;
pub mod fallback;
pub mod lead_store;

pub use cache::CachedLeadStore;
pub use call_provider::{CallProviderError, CallProviderGateway, ProviderCallId};
pub use fallback::{FallbackChannelGateway, FallbackError};
pub use lead_store::{LeadRepository, LeadStoreError};
