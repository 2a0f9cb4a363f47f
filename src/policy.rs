//! # Retry Policy
//!
//! Pure mapping from retry count to the next-eligible time, plus the
//! maximum-attempts threshold. No IO and no clock access; callers pass `now`.

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAX_RETRY_COUNT, DEFAULT_RETRY_INTERVALS_SECONDS};

/// A fixed ordered ladder of retry intervals indexed by retry count.
///
/// `retry_count >= max_attempts` means retries are exhausted. The interval
/// for the n-th retry (1-based, i.e. the value of `retry_count` after the
/// failed attempt was counted) is `intervals[n - 1]`, clamped to the last
/// rung when the ladder is shorter than the attempt ceiling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    intervals_seconds: Vec<u64>,
    max_attempts: u32,
}

impl RetryPolicy {
    /// Build a policy from an interval ladder and an attempt ceiling.
    /// An empty ladder or a zero ceiling is rejected by config validation
    /// before a policy is ever constructed.
    pub fn new(intervals_seconds: Vec<u64>, max_attempts: u32) -> Self {
        Self {
            intervals_seconds,
            max_attempts,
        }
    }

    /// Maximum number of call attempts before fallback
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before the retry that would bring the lead to `retry_count`
    /// attempts. Returns `None` once the ladder says retries are exhausted.
    pub fn delay_for(&self, retry_count: u32) -> Option<Duration> {
        if retry_count == 0 || retry_count >= self.max_attempts {
            return None;
        }
        if self.intervals_seconds.is_empty() {
            return Some(Duration::zero());
        }
        let index = (retry_count as usize - 1).min(self.intervals_seconds.len() - 1);
        Some(Duration::seconds(self.intervals_seconds[index] as i64))
    }

    /// Check whether a lead at `retry_count` attempts has exhausted retries
    pub fn is_exhausted(&self, retry_count: u32) -> bool {
        retry_count >= self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            intervals_seconds: DEFAULT_RETRY_INTERVALS_SECONDS.to_vec(),
            max_attempts: DEFAULT_MAX_RETRY_COUNT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ladder() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts(), 3);
        assert_eq!(policy.delay_for(1), Some(Duration::hours(1)));
        assert_eq!(policy.delay_for(2), Some(Duration::hours(4)));
        assert_eq!(policy.delay_for(3), None);
    }

    #[test]
    fn test_ladder_shorter_than_ceiling_clamps_to_last_rung() {
        let policy = RetryPolicy::new(vec![60, 300], 5);
        assert_eq!(policy.delay_for(1), Some(Duration::seconds(60)));
        assert_eq!(policy.delay_for(2), Some(Duration::seconds(300)));
        assert_eq!(policy.delay_for(3), Some(Duration::seconds(300)));
        assert_eq!(policy.delay_for(4), Some(Duration::seconds(300)));
        assert_eq!(policy.delay_for(5), None);
    }

    #[test]
    fn test_exhaustion_threshold() {
        let policy = RetryPolicy::new(vec![60], 2);
        assert!(!policy.is_exhausted(0));
        assert!(!policy.is_exhausted(1));
        assert!(policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
    }

    #[test]
    fn test_zero_retry_count_has_no_delay() {
        // retry_count 0 means no failed attempt has been counted yet
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), None);
    }
}
