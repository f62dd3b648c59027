//! Database lock retry
//!
//! SQLite allows one writer at a time. Under concurrent engagement a write can still
//! fail with `database is locked` after `busy_timeout`; those failures are retried with
//! exponential backoff until a time budget runs out.

use std::future::Future;
use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Default total time budget for lock retries
pub const DEFAULT_MAX_LOCK_WAIT_MS: u64 = 5000;

const INITIAL_BACKOFF_MS: u64 = 10;
const MAX_BACKOFF_MS: u64 = 1000;

/// Exponential backoff state: 10ms doubling, capped at 1s
#[derive(Debug, Clone)]
pub struct LockBackoff {
    started: Instant,
    max_wait: Duration,
    next_ms: u64,
    pub attempt: u32,
}

impl LockBackoff {
    pub fn new(max_wait_ms: u64) -> Self {
        Self {
            started: Instant::now(),
            max_wait: Duration::from_millis(max_wait_ms),
            next_ms: INITIAL_BACKOFF_MS,
            attempt: 0,
        }
    }

    /// Sleep before the next attempt, or return false once the budget is spent
    pub async fn wait(&mut self, operation: &str) -> bool {
        let elapsed = self.started.elapsed();
        if elapsed >= self.max_wait {
            tracing::error!(
                operation,
                attempt = self.attempt,
                elapsed_ms = elapsed.as_millis(),
                "Database still locked, giving up"
            );
            return false;
        }

        let delay_ms = self.next_ms.min(MAX_BACKOFF_MS);
        tracing::warn!(
            operation,
            attempt = self.attempt,
            backoff_ms = delay_ms,
            remaining_ms = self.max_wait.saturating_sub(elapsed).as_millis(),
            "Database locked, will retry after backoff"
        );
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        self.next_ms = (self.next_ms * 2).min(MAX_BACKOFF_MS);
        true
    }
}

/// Retry `operation` while it fails with lock contention
///
/// Any other error is returned immediately without retrying.
pub async fn retry_on_lock<F, Fut, T>(operation_name: &str, max_wait_ms: u64, mut operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut backoff = LockBackoff::new(max_wait_ms);

    loop {
        backoff.attempt += 1;
        match operation().await {
            Ok(value) => {
                if backoff.attempt > 1 {
                    tracing::debug!(
                        operation = operation_name,
                        attempt = backoff.attempt,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(value);
            }
            Err(err) if err.is_lock_contention() => {
                if !backoff.wait(operation_name).await {
                    return Err(Error::Internal(format!(
                        "{}: database locked after {} attempts",
                        operation_name, backoff.attempt
                    )));
                }
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_succeeds_first_attempt() {
        let result = retry_on_lock("test_op", 1000, || async { Ok::<i32, Error>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_other_errors_fail_immediately() {
        let mut attempts = 0;
        let result = retry_on_lock("test_op", 1000, || {
            attempts += 1;
            async { Err::<i32, Error>(Error::report_not_found("x")) }
        })
        .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_backoff_budget_expires() {
        let mut backoff = LockBackoff::new(0);
        assert!(!backoff.wait("test_op").await);

        let mut backoff = LockBackoff::new(1000);
        assert!(backoff.wait("test_op").await);
    }
}
