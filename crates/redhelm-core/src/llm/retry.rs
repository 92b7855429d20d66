//! Retry policy for model requests.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::{RedhelmError, RedhelmResult};

/// Default total number of attempts per request.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 2;

/// How many times, and how patiently, a request is retried.
///
/// Only errors for which [`RedhelmError::is_transient`] holds are retried.
/// The delay after attempt `n` is `initial_backoff * 2^(n-1)`, capped at
/// `max_backoff`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Treated as at least 1.
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Policy with the default backoff and the given attempt ceiling.
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay before the attempt following `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }

    /// Run `op` until it succeeds, fails permanently, or the budget runs out.
    ///
    /// `op` receives the 1-based attempt number. A rate-limit response on the
    /// final attempt becomes [`RedhelmError::RateLimited`]; any other
    /// transient failure becomes [`RedhelmError::RetriesExhausted`].
    pub async fn run<T, F, Fut>(&self, mut op: F) -> RedhelmResult<T>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = RedhelmResult<T>>,
    {
        let attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            let err = match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_transient() {
                return Err(err);
            }

            if attempt >= attempts {
                warn!(attempts, error = %err, "Model request failed; retry budget exhausted");
                if err.is_rate_limit() {
                    return Err(RedhelmError::RateLimited { attempts });
                }
                return Err(RedhelmError::RetriesExhausted {
                    attempts,
                    source: Box::new(err),
                });
            }

            let delay = self.backoff(attempt);
            warn!(attempt, ?delay, error = %err, "Transient model error, retrying");
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instant(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::ZERO,
        }
    }

    fn api(status: u16) -> RedhelmError {
        RedhelmError::Api {
            status,
            body: "boom".to_string(),
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.initial_backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
        assert_eq!(policy.backoff(10), Duration::from_secs(8));
        assert_eq!(policy.backoff(u32::MAX), Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_success_on_first_attempt() {
        let mut seen = Vec::new();
        let result = instant(2)
            .run(|attempt| {
                seen.push(attempt);
                async move { Ok::<_, RedhelmError>("done") }
            })
            .await;
        assert_eq!(result.unwrap(), "done");
        assert_eq!(seen, vec![1]);
    }

    #[tokio::test]
    async fn test_retries_transient_then_succeeds() {
        let mut seen = Vec::new();
        let result = instant(2)
            .run(|attempt| {
                seen.push(attempt);
                async move {
                    if attempt == 1 {
                        Err(api(503))
                    } else {
                        Ok("recovered")
                    }
                }
            })
            .await;
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let mut seen = Vec::new();
        let result: RedhelmResult<()> = instant(5)
            .run(|attempt| {
                seen.push(attempt);
                async move { Err(api(401)) }
            })
            .await;
        assert!(matches!(result, Err(RedhelmError::Api { status: 401, .. })));
        assert_eq!(seen, vec![1]);
    }

    #[tokio::test]
    async fn test_exhausted_budget_wraps_last_error() {
        let mut seen = Vec::new();
        let result: RedhelmResult<()> = instant(2)
            .run(|attempt| {
                seen.push(attempt);
                async move { Err(api(500)) }
            })
            .await;
        match result {
            Err(RedhelmError::RetriesExhausted { attempts, source }) => {
                assert_eq!(attempts, 2);
                assert!(matches!(*source, RedhelmError::Api { status: 500, .. }));
            }
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_rate_limit_on_last_attempt() {
        let result: RedhelmResult<()> = instant(2).run(|_| async { Err(api(429)) }).await;
        assert!(matches!(result, Err(RedhelmError::RateLimited { attempts: 2 })));
    }

    #[tokio::test]
    async fn test_zero_attempts_still_tries_once() {
        let mut seen = Vec::new();
        let result: RedhelmResult<()> = instant(0)
            .run(|attempt| {
                seen.push(attempt);
                async move { Err(api(502)) }
            })
            .await;
        assert!(matches!(result, Err(RedhelmError::RetriesExhausted { attempts: 1, .. })));
        assert_eq!(seen, vec![1]);
    }
}
