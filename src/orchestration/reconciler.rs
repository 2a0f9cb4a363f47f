//! # Webhook Reconciler
//!
//! Ingests provider status/report events asynchronously and reconciles lead
//! state through the workflow engine's shared decision rule. Also runs the
//! periodic sweep that bounds the lifetime of any stuck lead when the
//! provider's webhook never arrives.
//!
//! Delivery is at-least-once: events may be duplicated, delayed, or (for
//! distinct leads) out of order. Everything here is defensive - duplicate
//! and unknown call ids are logged and discarded, and processing errors are
//! swallowed at the `ingest` boundary so they are never surfaced to the
//! provider as a delivery failure (provider-side retry-on-error would itself
//! create duplicate events).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};

use super::errors::ReconcileError;
use super::workflow::{ReportDisposition, WorkflowEngine};
use crate::clients::LeadRepository;
use crate::constants::events;
use crate::events::{
    map_native_status, map_report_reason, parse_provider_event, EventPublisher, ProviderEvent,
};
use crate::state_machine::{EngagementDecision, OutcomeSource};

/// Why an inbound event was discarded instead of applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// No lead holds the event's call id
    UnknownCallId,
    /// The lead's outstanding call id no longer matches (duplicate or
    /// superseded delivery)
    StaleCallId,
    /// The native status has no mapping; transient progress we don't track
    UnmappedStatus,
}

/// Result of processing one validated provider event
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// Transient status progress applied to the lead
    StatusApplied,
    /// Terminal outcome fed through the decision rule
    OutcomeApplied(EngagementDecision),
    /// Event logged and dropped
    Discarded(DiscardReason),
}

/// Reconciles asynchronous provider events with lead and workflow state
pub struct WebhookReconciler {
    engine: Arc<WorkflowEngine>,
    lead_store: Arc<dyn LeadRepository>,
    publisher: EventPublisher,
    max_call_duration: chrono::Duration,
}

impl WebhookReconciler {
    pub fn new(
        engine: Arc<WorkflowEngine>,
        lead_store: Arc<dyn LeadRepository>,
        publisher: EventPublisher,
        max_call_duration: chrono::Duration,
    ) -> Self {
        Self {
            engine,
            lead_store,
            publisher,
            max_call_duration,
        }
    }

    /// Webhook entry point: parse, validate, apply. Always acknowledges -
    /// malformed payloads and processing failures are logged, never
    /// propagated back to the delivery path.
    pub async fn ingest(&self, payload: &Value) {
        let event = match parse_provider_event(payload) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Discarding malformed provider payload");
                self.publisher.publish(
                    events::WEBHOOK_DISCARDED,
                    json!({ "reason": e.to_string() }),
                );
                return;
            }
        };

        if let Err(e) = self.handle_event(event).await {
            error!(error = %e, "Webhook processing failed; event acknowledged anyway");
        }
    }

    /// Apply one validated provider event
    #[instrument(skip(self, event), fields(provider_call_id = event.provider_call_id()))]
    pub async fn handle_event(
        &self,
        event: ProviderEvent,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        match event {
            ProviderEvent::Status {
                provider_call_id,
                native_status,
            } => {
                let Some(status) = map_native_status(&native_status) else {
                    debug!(%native_status, "No mapping for native status, ignoring");
                    return Ok(ReconcileOutcome::Discarded(DiscardReason::UnmappedStatus));
                };
                if self
                    .engine
                    .apply_status_update(&provider_call_id, status)
                    .await?
                {
                    Ok(ReconcileOutcome::StatusApplied)
                } else {
                    debug!("Status event for unknown or cleared call id, discarding");
                    Ok(ReconcileOutcome::Discarded(DiscardReason::StaleCallId))
                }
            }

            ProviderEvent::Report {
                provider_call_id,
                native_reason,
                structured_result: _,
            } => {
                let outcome = map_report_reason(&native_reason);
                match self
                    .engine
                    .apply_report_outcome(&provider_call_id, outcome, OutcomeSource::Webhook)
                    .await?
                {
                    ReportDisposition::Applied(decision) => {
                        Ok(ReconcileOutcome::OutcomeApplied(decision))
                    }
                    ReportDisposition::UnknownCallId => {
                        info!(%native_reason, "Report for unknown call id, discarding");
                        Ok(ReconcileOutcome::Discarded(DiscardReason::UnknownCallId))
                    }
                    ReportDisposition::StaleCallId => {
                        info!(%native_reason, "Duplicate or stale report, discarding");
                        Ok(ReconcileOutcome::Discarded(DiscardReason::StaleCallId))
                    }
                }
            }
        }
    }

    /// Periodic reconciliation sweep: any lead in flight longer than the
    /// provider's maximum call duration with no report is treated as a
    /// missed event and fed a synthetic `Missed` outcome through the normal
    /// decision rule. Clearing the call id inside that step makes each stuck
    /// attempt reconcile exactly once even if a late report arrives after.
    #[instrument(skip(self))]
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<u32, ReconcileError> {
        let cutoff = now - self.max_call_duration;
        let stuck = self.lead_store.list_initiated_before(cutoff).await?;
        let mut reconciled = 0;

        for lead in stuck {
            let Some(call_id) = lead.active_provider_call_id.clone() else {
                continue;
            };
            match self
                .engine
                .apply_report_outcome(
                    &call_id,
                    crate::state_machine::CallOutcome::Missed,
                    OutcomeSource::Sweep,
                )
                .await?
            {
                ReportDisposition::Applied(_) => {
                    warn!(lead_id = %lead.lead_id, provider_call_id = %call_id, "Stuck call reconciled as missed");
                    self.publisher.publish_lead_event(
                        events::SWEEP_STUCK_CALL,
                        lead.lead_id,
                        json!({ "provider_call_id": call_id }),
                    );
                    reconciled += 1;
                }
                // A report landed between the listing and the lock; the
                // webhook path already settled this attempt
                ReportDisposition::UnknownCallId | ReportDisposition::StaleCallId => {}
            }
        }

        if reconciled > 0 {
            info!(reconciled, "Sweep pass reconciled stuck calls");
        }
        Ok(reconciled)
    }
}
