use rand::Rng;
use std::time::Duration;
use tracing::warn;

use crate::metrics;
use crate::types::Feed;

/// A failed fetch attempt. `retryable` is false for failures another attempt
/// cannot fix, such as a 404.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub message: String,
    pub retryable: bool,
}

impl FetchFailure {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: true,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            retryable: false,
        }
    }
}

/// Bounded retry with exponential backoff and jitter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// No retries; a single attempt
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 0,
        }
    }

    /// Delay before the attempt following `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if self.base_delay_ms == 0 {
            return Duration::ZERO;
        }
        let exp = attempt.saturating_sub(1).min(10);
        let backoff = self.base_delay_ms.saturating_mul(1u64 << exp);
        let jitter = rand::thread_rng().gen_range(0..=self.base_delay_ms / 2);
        Duration::from_millis(backoff.saturating_add(jitter))
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    /// The last failure is returned.
    pub fn run<T, F>(&self, feed: Feed, mut op: F) -> Result<T, FetchFailure>
    where
        F: FnMut(u32) -> Result<T, FetchFailure>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(failure) if failure.retryable && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    warn!(
                        feed = %feed,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        "Fetch failed, retrying: {}",
                        failure.message
                    );
                    metrics::record_fetch_retry(feed);
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(failure) => return Err(failure),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 0,
        }
    }

    #[test]
    fn test_succeeds_after_transient_failures() {
        let mut calls = 0;
        let result = instant().run(Feed::Confirmed, |attempt| {
            calls += 1;
            if attempt < 3 {
                Err(FetchFailure::transient("connection reset"))
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(result, Ok(3));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_gives_up_after_max_attempts() {
        let mut calls = 0;
        let result: Result<(), _> = instant().run(Feed::Deaths, |_| {
            calls += 1;
            Err(FetchFailure::transient("timed out"))
        });
        assert_eq!(result.unwrap_err().message, "timed out");
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_permanent_failure_is_not_retried() {
        let mut calls = 0;
        let result: Result<(), _> = instant().run(Feed::Snapshot, |_| {
            calls += 1;
            Err(FetchFailure::permanent("HTTP 404"))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_backoff_grows_exponentially() {
        let policy = RetryPolicy {
            max_attempts: 5,
            base_delay_ms: 100,
        };
        let first = policy.delay_for(1).as_millis();
        let third = policy.delay_for(3).as_millis();
        assert!((100..=150).contains(&first));
        assert!((400..=450).contains(&third));
        assert_eq!(RetryPolicy::none().delay_for(1), Duration::ZERO);
    }

    #[test]
    fn test_none_makes_a_single_attempt() {
        let mut calls = 0;
        let result: Result<(), _> = RetryPolicy::none().run(Feed::Continents, |_| {
            calls += 1;
            Err(FetchFailure::transient("file busy"))
        });
        assert_eq!(result.unwrap_err().message, "file busy");
        assert_eq!(calls, 1);
    }
}
