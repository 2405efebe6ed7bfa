use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::ReelReplyError;

/// Fixed-delay retry budget for calls against external services.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(10))
    }
}

/// Runs `op` until it succeeds, fails with a non-transient error, or the
/// attempt budget is spent. Each retry is a full re-invocation.
pub async fn retry_transient<T, F, Fut>(
    policy: RetryPolicy,
    label: &str,
    mut op: F,
) -> Result<T, ReelReplyError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ReelReplyError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                warn!("{label} failed (attempt {attempt}/{attempts}): {e}");
                if attempt >= attempts {
                    return Err(e);
                }
                tokio::time::sleep(policy.delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn instant_policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = retry_transient(instant_policy(3), "op", || async {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(ReelReplyError::Messaging("flaky".into()))
            } else {
                Ok(n)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up_after_budget() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(instant_policy(3), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ReelReplyError::RateLimited)
        })
        .await;
        assert!(matches!(result, Err(ReelReplyError::RateLimited)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_stops_on_non_transient_error() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = retry_transient(instant_policy(3), "op", || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(ReelReplyError::State("broken".into()))
        })
        .await;
        assert!(matches!(result, Err(ReelReplyError::State(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_zero_attempts_means_one() {
        assert_eq!(instant_policy(0).attempts, 1);
        assert_eq!(RetryPolicy::default().attempts, 3);
        assert_eq!(RetryPolicy::default().delay, Duration::from_secs(10));
    }
}
