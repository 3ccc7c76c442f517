//! Retry wrapper for operations that may hit a transient database failure.

use std::{future::Future, time::Duration};

use crate::EngineError;

/// How many times to try and how long to wait between attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero behaves like one.
    pub attempts: u32,
    /// Delay before the second attempt; doubled for each further attempt.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
    }
}

/// Run `op`, retrying database errors according to `policy`.
///
/// Domain errors (insufficient funds, not found, ...) are returned on the
/// first occurrence. Every engine operation runs in its own DB transaction,
/// so a failed attempt leaves nothing behind.
pub async fn with_retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> Result<T, EngineError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, EngineError>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < attempts => {
                let delay = policy.delay_for(attempt);
                tracing::warn!("database error on attempt {attempt}/{attempts}, retrying in {delay:?}: {err}");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use sea_orm::DbErr;

    use super::*;

    fn fast(attempts: u32) -> RetryPolicy {
        RetryPolicy {
            attempts,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_database_errors_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retry(fast(3), || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(EngineError::Database(DbErr::Custom("busy".to_string())))
            } else {
                Ok(7)
            }
        })
        .await;

        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_last_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(fast(2), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::Database(DbErr::Custom("busy".to_string())))
        })
        .await;

        assert!(matches!(result, Err(EngineError::Database(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn domain_errors_are_not_retried() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_retry(fast(5), || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(EngineError::InsufficientFunds("alice".to_string()))
        })
        .await;

        assert_eq!(result, Err(EngineError::InsufficientFunds("alice".to_string())));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn delay_doubles() {
        let policy = RetryPolicy {
            attempts: 4,
            base_delay: Duration::from_millis(10),
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(10));
        assert_eq!(policy.delay_for(2), Duration::from_millis(20));
        assert_eq!(policy.delay_for(3), Duration::from_millis(40));
    }
}
