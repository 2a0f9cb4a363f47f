//! Provider webhook payload parsing
//!
//! The call provider delivers loosely-typed JSON at arbitrary times,
//! at-least-once, possibly duplicated and out of order. This module parses
//! those payloads into a closed set of validated event variants at the
//! boundary; unrecognized shapes are rejected here and never reach the state
//! machine.
//!
//! Two event categories exist:
//! - **Status events** carry transient progress (ringing, answered). They
//!   never decide a terminal outcome.
//! - **Report events** arrive once per call attempt after it ends and carry
//!   the provider-native terminal reason. The reason-to-outcome table below
//!   is the sole authority for terminal outcomes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state_machine::{CallOutcome, EngagementStatus};

/// A validated inbound provider event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProviderEvent {
    /// Transient call progress
    Status {
        provider_call_id: String,
        native_status: String,
    },
    /// Terminal per-attempt report
    Report {
        provider_call_id: String,
        native_reason: String,
        /// Structured result attached by the provider (transcript summary,
        /// duration); passed through to event subscribers, never inspected
        #[serde(default, skip_serializing_if = "Option::is_none")]
        structured_result: Option<Value>,
    },
}

impl ProviderEvent {
    pub fn provider_call_id(&self) -> &str {
        match self {
            Self::Status {
                provider_call_id, ..
            }
            | Self::Report {
                provider_call_id, ..
            } => provider_call_id,
        }
    }
}

/// Rejection reasons for malformed payloads
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing or non-string field '{0}'")]
    MissingField(&'static str),

    #[error("unrecognized event shape '{0}'")]
    UnknownEventType(String),
}

/// Parse a raw webhook payload into a validated event variant.
///
/// Expected shapes:
/// ```json
/// {"event": "status", "provider_call_id": "CA..", "native_status": "ringing"}
/// {"event": "report", "provider_call_id": "CA..", "native_reason": "no-answer", "structured_result": {...}}
/// ```
pub fn parse_provider_event(payload: &Value) -> Result<ProviderEvent, PayloadError> {
    let object = payload.as_object().ok_or(PayloadError::NotAnObject)?;

    let string_field = |name: &'static str| -> Result<String, PayloadError> {
        object
            .get(name)
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(PayloadError::MissingField(name))
    };

    match object.get("event").and_then(Value::as_str) {
        Some("status") => Ok(ProviderEvent::Status {
            provider_call_id: string_field("provider_call_id")?,
            native_status: string_field("native_status")?,
        }),
        Some("report") => Ok(ProviderEvent::Report {
            provider_call_id: string_field("provider_call_id")?,
            native_reason: string_field("native_reason")?,
            structured_result: object.get("structured_result").cloned(),
        }),
        Some(other) => Err(PayloadError::UnknownEventType(other.to_string())),
        None => Err(PayloadError::MissingField("event")),
    }
}

/// Map a provider-native call status to a transient engagement status.
/// Unknown statuses map to `None` and are ignored upstream.
pub fn map_native_status(native_status: &str) -> Option<EngagementStatus> {
    match native_status {
        "queued" | "initiated" | "ringing" => Some(EngagementStatus::Initiated),
        "answered" | "in-progress" => Some(EngagementStatus::Answered),
        _ => None,
    }
}

/// The fixed report-reason mapping table: the sole authority for a call
/// attempt's terminal outcome. Reasons this table does not recognize are
/// treated as provider-side failures.
pub fn map_report_reason(native_reason: &str) -> CallOutcome {
    match native_reason {
        "completed" | "conversation-ended" => CallOutcome::Completed,
        "no-answer" | "busy" | "timeout" | "voicemail" | "cancelled" => CallOutcome::Missed,
        _ => CallOutcome::Failed,
    }
}
