//! # Engagement Decision Rule
//!
//! The single authoritative decision function shared by the immediate-failure
//! path, the webhook report path, and the stuck-call sweep. Pure: it never
//! touches the lead store, the scheduler, or a gateway, and it never loops
//! back into call initiation. Reaching the retry branch only *describes* a
//! future attempt; the scheduler firing that job later is the only way a new
//! call starts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::states::{CallOutcome, EngagementStatus};
use crate::policy::RetryPolicy;

/// What the workflow must do after a call attempt reached a terminal outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum EngagementDecision {
    /// Lead engaged successfully; record the terminal outcome and stop
    Complete,
    /// Count the failed attempt and enqueue a retry job at `next_retry_time`
    ScheduleRetry {
        retry_count: u32,
        next_retry_time: DateTime<Utc>,
        status: EngagementStatus,
    },
    /// Retries exhausted; send the fallback message once and stop
    Fallback {
        retry_count: u32,
        status: EngagementStatus,
    },
}

/// Decide the next workflow step for a lead whose outstanding attempt ended
/// with `outcome`.
///
/// `retry_count` is the lead's count *before* this outcome is applied; the
/// returned decision carries the incremented count for failure outcomes.
pub fn decide(
    outcome: CallOutcome,
    retry_count: u32,
    max_retry_count: u32,
    now: DateTime<Utc>,
    policy: &RetryPolicy,
) -> EngagementDecision {
    match outcome {
        CallOutcome::Completed => EngagementDecision::Complete,
        CallOutcome::Missed | CallOutcome::Failed => {
            let attempts = retry_count + 1;
            if attempts < max_retry_count {
                let delay = policy
                    .delay_for(attempts)
                    .unwrap_or_else(|| chrono::Duration::seconds(0));
                EngagementDecision::ScheduleRetry {
                    retry_count: attempts,
                    next_retry_time: now + delay,
                    status: outcome.as_status(),
                }
            } else {
                EngagementDecision::Fallback {
                    retry_count: attempts,
                    status: outcome.as_status(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(vec![3_600, 14_400, 86_400], 3)
    }

    #[test]
    fn test_completed_outcome_is_terminal() {
        let now = Utc::now();
        let decision = decide(CallOutcome::Completed, 0, 3, now, &policy());
        assert_eq!(decision, EngagementDecision::Complete);

        // Completion wins regardless of how many attempts were spent
        let decision = decide(CallOutcome::Completed, 2, 3, now, &policy());
        assert_eq!(decision, EngagementDecision::Complete);
    }

    #[test]
    fn test_first_failure_schedules_retry_on_first_rung() {
        let now = Utc::now();
        let decision = decide(CallOutcome::Missed, 0, 3, now, &policy());
        assert_eq!(
            decision,
            EngagementDecision::ScheduleRetry {
                retry_count: 1,
                next_retry_time: now + Duration::hours(1),
                status: EngagementStatus::Missed,
            }
        );
    }

    #[test]
    fn test_second_failure_climbs_the_ladder() {
        let now = Utc::now();
        let decision = decide(CallOutcome::Failed, 1, 3, now, &policy());
        assert_eq!(
            decision,
            EngagementDecision::ScheduleRetry {
                retry_count: 2,
                next_retry_time: now + Duration::hours(4),
                status: EngagementStatus::Failed,
            }
        );
    }

    #[test]
    fn test_exhaustion_falls_back() {
        let now = Utc::now();
        let decision = decide(CallOutcome::Missed, 2, 3, now, &policy());
        assert_eq!(
            decision,
            EngagementDecision::Fallback {
                retry_count: 3,
                status: EngagementStatus::Missed,
            }
        );
    }

    #[test]
    fn test_max_retry_count_one_never_retries() {
        let now = Utc::now();
        let decision = decide(CallOutcome::Failed, 0, 1, now, &policy());
        assert_eq!(
            decision,
            EngagementDecision::Fallback {
                retry_count: 1,
                status: EngagementStatus::Failed,
            }
        );
    }

    #[test]
    fn test_retry_time_is_strictly_later_than_now() {
        // The retry branch must never describe an immediate re-attempt
        let now = Utc::now();
        for (count, outcome) in [(0, CallOutcome::Missed), (1, CallOutcome::Failed)] {
            match decide(outcome, count, 3, now, &policy()) {
                EngagementDecision::ScheduleRetry {
                    next_retry_time, ..
                } => {
                    assert!(next_retry_time > now);
                }
                other => panic!("expected retry, got {other:?}"),
            }
        }
    }
}
