//! Bounded retry of failed loads.

use std::time::Duration;

use crate::backend::VideoError;

/// What to do about a playback error.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RetryDecision {
    /// Schedule a retry attempt.
    Retry,
    /// The retry budget is spent; the counter was reset.
    GiveUp,
    /// The error is permanent; the counter was reset.
    Permanent,
}

/// Counts consecutive transient errors and spaces out retry attempts.
///
/// The counter never exceeds the configured maximum: the error that would
/// push it past the maximum resets it to zero instead, so a later error
/// starts counting afresh.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    max_retries: u32,
    retry_after: Duration,
    count: u32,
}

impl RetryPolicy {
    #[must_use]
    pub fn new(max_retries: u32, retry_after: Duration) -> Self {
        Self {
            max_retries,
            retry_after,
            count: 0,
        }
    }

    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    #[must_use]
    pub fn retry_after(&self) -> Duration {
        self.retry_after
    }

    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Changes the budget and spacing, keeping the running count within it.
    pub fn set_limits(&mut self, max_retries: u32, retry_after: Duration) {
        self.max_retries = max_retries;
        self.retry_after = retry_after;
        self.count = self.count.min(max_retries);
    }

    /// Classifies `error` and updates the counter.
    pub fn register(&mut self, error: VideoError) -> RetryDecision {
        if error.is_permanent() {
            self.count = 0;
            return RetryDecision::Permanent;
        }

        if self.count < self.max_retries {
            self.count += 1;
            RetryDecision::Retry
        } else {
            self.count = 0;
            RetryDecision::GiveUp
        }
    }

    /// Whether enough time has passed since the last load attempt for a
    /// retry to go ahead.
    #[must_use]
    pub fn is_due(&self, now: Duration, last_loaded: Option<Duration>) -> bool {
        last_loaded.is_none_or(|at| now.saturating_sub(at) >= self.retry_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counter_resets_after_budget() {
        let mut policy = RetryPolicy::new(3, Duration::from_secs(5));
        for expected in 1..=3 {
            assert_eq!(policy.register(VideoError::PlayerError), RetryDecision::Retry);
            assert_eq!(policy.count(), expected);
        }

        assert_eq!(policy.register(VideoError::PlayerError), RetryDecision::GiveUp);
        assert_eq!(policy.count(), 0);

        assert_eq!(policy.register(VideoError::Unknown), RetryDecision::Retry);
        assert_eq!(policy.count(), 1);
    }

    #[test]
    fn permanent_errors_reset() {
        let mut policy = RetryPolicy::new(5, Duration::from_secs(5));
        policy.register(VideoError::RateLimited);
        assert_eq!(
            policy.register(VideoError::AccessDenied),
            RetryDecision::Permanent
        );
        assert_eq!(policy.count(), 0);
    }

    #[test]
    fn spacing() {
        let policy = RetryPolicy::new(5, Duration::from_secs(5));
        let loaded = Some(Duration::from_secs(10));
        assert!(policy.is_due(Duration::from_secs(1), None));
        assert!(!policy.is_due(Duration::from_millis(14_999), loaded));
        assert!(policy.is_due(Duration::from_secs(15), loaded));
    }
}
