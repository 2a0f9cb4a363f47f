//! Property tests for the pure core: wave partitioning arithmetic, the
//! retry ladder, and the decision rule.

use chrono::{Duration, TimeZone, Utc};
use proptest::prelude::*;
use uuid::Uuid;

use cadence_core::models::BulkRequest;
use cadence_core::policy::RetryPolicy;
use cadence_core::state_machine::{decide, CallOutcome, EngagementDecision};

fn outcome_strategy() -> impl Strategy<Value = CallOutcome> {
    prop_oneof![
        Just(CallOutcome::Completed),
        Just(CallOutcome::Missed),
        Just(CallOutcome::Failed),
    ]
}

proptest! {
    /// Property: every lead lands in the wave its index dictates, spaced by
    /// whole batch intervals from the requested start
    #[test]
    fn wave_partitioning_is_exhaustive_and_ordered(
        lead_count in 1usize..200,
        parallel_calls in 1u32..20,
        interval_seconds in 0u64..3_600,
    ) {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let request = BulkRequest::new(
            (0..lead_count).map(|_| Uuid::new_v4()).collect(),
            start,
        )
        .with_parallel_calls(parallel_calls)
        .with_batch_interval_seconds(interval_seconds);

        prop_assert_eq!(
            request.total_waves() as usize,
            lead_count.div_ceil(parallel_calls as usize)
        );

        for index in 0..lead_count {
            let wave = request.wave_of(index);
            // The wave holds exactly the indices in its window
            prop_assert!((wave * parallel_calls) as usize <= index);
            prop_assert!(index < ((wave + 1) * parallel_calls) as usize);
            prop_assert_eq!(
                request.run_at_for(index),
                start + Duration::seconds(wave as i64 * interval_seconds as i64)
            );
        }
    }

    /// Property: the ladder yields a delay exactly while attempts remain,
    /// clamped to its last rung
    #[test]
    fn retry_ladder_delay_matches_rungs(
        intervals in prop::collection::vec(1u64..100_000, 1..6),
        max_attempts in 1u32..10,
        retry_count in 0u32..12,
    ) {
        let policy = RetryPolicy::new(intervals.clone(), max_attempts);

        match policy.delay_for(retry_count) {
            Some(delay) => {
                prop_assert!(retry_count > 0 && retry_count < max_attempts);
                let rung = (retry_count as usize - 1).min(intervals.len() - 1);
                prop_assert_eq!(delay, Duration::seconds(intervals[rung] as i64));
            }
            None => {
                prop_assert!(retry_count == 0 || retry_count >= max_attempts);
            }
        }
    }

    /// Property: the decision rule is total and never skips the ladder -
    /// completion ends the lead, failures retry until the ceiling, the
    /// ceiling falls back, and retry times never precede `now`
    #[test]
    fn decision_rule_is_total_and_never_immediate(
        outcome in outcome_strategy(),
        retry_count in 0u32..10,
        max_retry_count in 1u32..10,
    ) {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
        let policy = RetryPolicy::new(vec![3_600, 14_400, 86_400], max_retry_count);

        match decide(outcome, retry_count, max_retry_count, now, &policy) {
            EngagementDecision::Complete => {
                prop_assert_eq!(outcome, CallOutcome::Completed);
            }
            EngagementDecision::ScheduleRetry { retry_count: next, next_retry_time, status } => {
                prop_assert_ne!(outcome, CallOutcome::Completed);
                prop_assert_eq!(next, retry_count + 1);
                prop_assert!(next < max_retry_count);
                prop_assert!(next_retry_time > now);
                prop_assert_eq!(status, outcome.as_status());
            }
            EngagementDecision::Fallback { retry_count: next, .. } => {
                prop_assert_ne!(outcome, CallOutcome::Completed);
                prop_assert_eq!(next, retry_count + 1);
                prop_assert!(next >= max_retry_count);
            }
        }
    }
}
