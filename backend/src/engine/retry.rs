use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::error::{EngineError, EngineResult, StoreError};

/// Bounded retry with exponential backoff for transient store failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_backoff_ms: u64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff_ms,
        }
    }

    /// Delay before retry number `attempt` (0-indexed).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
        Duration::from_millis(self.base_backoff_ms.saturating_mul(factor))
    }

    /// Runs `op` until it succeeds or attempts are exhausted. Exhaustion is
    /// surfaced as `EngineError::Transient` so callers can try again later.
    pub async fn run<T, F, Fut>(&self, mut op: F) -> EngineResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < self.max_attempts => {
                    let backoff = self.backoff_for_attempt(attempt);
                    warn!("Store call failed (attempt {}/{}): {}, retrying in {:?}", attempt + 1, self.max_attempts, e, backoff);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(EngineError::Transient {
                        attempts: self.max_attempts,
                        source: e,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(3, 100);
        assert_eq!(policy.backoff_for_attempt(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_millis(400));
    }

    #[tokio::test]
    async fn test_retry_success_on_eventual_availability() {
        let policy = RetryPolicy::new(3, 0);
        let calls = AtomicU32::new(0);
        let calls = &calls;
        let result = policy
            .run(|| async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Unavailable("down".to_string()))
                } else {
                    Ok(7)
                }
            })
            .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_exhaustion_is_transient() {
        let policy = RetryPolicy::new(2, 0);
        let result: EngineResult<()> = policy
            .run(|| async { Err(StoreError::Unavailable("down".to_string())) })
            .await;
        match result {
            Err(EngineError::Transient { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected transient error, got {:?}", other),
        }
    }
}
