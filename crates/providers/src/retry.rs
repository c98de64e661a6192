//! Shared retry policy for provider HTTP calls.
//!
//! Transient failures (network errors, 408/429/5xx/529, and 2xx responses
//! whose body can't be parsed) are retried with jittered exponential
//! backoff. Everything else returns immediately.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base,
        }
    }

    /// Backoff before attempt `attempt + 1`: `base × 2^attempt × (0.5 + rand)`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2f64.powi(attempt as i32);
        let jitter = 0.5 + rand::random::<f64>();
        self.base.mul_f64(factor * jitter)
    }
}

/// Whether a response status warrants another attempt. `None` means the
/// request never produced a status (network failure) — always retryable.
pub fn should_retry(status: Option<u16>) -> bool {
    match status {
        None => true,
        Some(408) | Some(429) | Some(529) => true,
        Some(code) => code >= 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_and_throttle_statuses_retry() {
        assert!(should_retry(Some(529)));
        assert!(should_retry(Some(429)));
        assert!(should_retry(Some(408)));
        assert!(should_retry(Some(500)));
        assert!(should_retry(Some(503)));
        assert!(should_retry(None));
    }

    #[test]
    fn terminal_statuses_do_not_retry() {
        assert!(!should_retry(Some(400)));
        assert!(!should_retry(Some(401)));
        assert!(!should_retry(Some(403)));
        assert!(!should_retry(Some(404)));
        assert!(!should_retry(Some(422)));
    }

    #[test]
    fn backoff_grows_with_jitter_bounds() {
        let policy = RetryPolicy::new(5, Duration::from_secs(2));
        for attempt in 0..4u32 {
            let d = policy.backoff(attempt);
            let base = 2f64 * 2f64.powi(attempt as i32);
            assert!(d >= Duration::from_secs_f64(base * 0.5));
            assert!(d <= Duration::from_secs_f64(base * 1.5));
        }
    }

    #[test]
    fn at_least_one_attempt() {
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).max_attempts, 1);
    }
}
