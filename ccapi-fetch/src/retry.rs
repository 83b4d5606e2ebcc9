//! Retry policy for the request executor.

use std::time::Duration;

/// Statuses that are retried while the budget lasts.
///
/// Timeouts, contention (409), rate limiting and transient gateway/server
/// failures.
pub const RETRYABLE_STATUSES: &[u16] = &[408, 409, 429, 500, 502, 503, 504];

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default backoff base.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(300);

/// Retry budget and exponential backoff for one logical request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubles for every later one.
    pub backoff_base: Duration,
}

impl RetryPolicy {
    /// Creates a policy.
    pub fn new(max_retries: u32, backoff_base: Duration) -> Self {
        Self {
            max_retries,
            backoff_base,
        }
    }

    /// Disables retries.
    pub fn no_retry() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Returns true if attempt `attempt` (0-based) may be followed by a retry.
    pub fn can_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }

    /// Returns true if `status` is in the retryable set.
    pub fn is_retryable_status(status: u16) -> bool {
        RETRYABLE_STATUSES.contains(&status)
    }

    /// Returns the pause after attempt `attempt` (0-based): `base * 2^attempt`.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.backoff_base.saturating_mul(factor)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RETRIES, DEFAULT_BACKOFF_BASE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for_attempt(0), Duration::from_millis(300));
        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(600));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(1200));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(2400));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(100, Duration::from_secs(1));
        assert!(policy.delay_for_attempt(64) >= policy.delay_for_attempt(31));
    }

    #[test]
    fn test_budget() {
        let policy = RetryPolicy::default();
        assert!(policy.can_retry(0));
        assert!(policy.can_retry(1));
        assert!(!policy.can_retry(2));

        assert!(!RetryPolicy::no_retry().can_retry(0));
    }

    #[test]
    fn test_retryable_statuses() {
        for status in [408, 409, 429, 500, 502, 503, 504] {
            assert!(RetryPolicy::is_retryable_status(status), "{status}");
        }
        for status in [400, 401, 403, 404, 422, 501] {
            assert!(!RetryPolicy::is_retryable_status(status), "{status}");
        }
    }
}
