use std::future::Future;
use std::time::Duration;

use rocket::tokio::time::{sleep, timeout};
use serde::Deserialize;

use crate::model::store::{StoreError, StoreResult};

/// Bounds on every store call: a timeout per attempt, and for calls that are
/// safe to repeat, a number of attempts with exponential backoff.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
pub struct RetryPolicy {
    #[serde(rename = "store_timeout_ms", default = "default_timeout_ms")]
    timeout_ms: u64,
    #[serde(rename = "store_retries", default = "default_attempts")]
    attempts: u32,
    #[serde(rename = "store_backoff_ms", default = "default_backoff_ms")]
    backoff_ms: u64,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_attempts() -> u32 {
    3
}

fn default_backoff_ms() -> u64 {
    100
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(default_timeout_ms(), default_attempts(), default_backoff_ms())
    }
}

impl RetryPolicy {
    pub fn new(timeout_ms: u64, attempts: u32, backoff_ms: u64) -> Self {
        Self {
            timeout_ms,
            attempts: attempts.max(1),
            backoff_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Run a single attempt, failing with [`StoreError::Unavailable`] if it
    /// does not finish in time.
    pub async fn once<T, Fut>(&self, what: &str, fut: Fut) -> StoreResult<T>
    where
        Fut: Future<Output = StoreResult<T>>,
    {
        match timeout(self.timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Unavailable(format!(
                "{what} timed out after {}ms",
                self.timeout_ms
            ))),
        }
    }

    /// Run `op` until it succeeds, fails with something other than
    /// [`StoreError::Unavailable`], or runs out of attempts.
    /// Only use this for reads and idempotent writes.
    pub async fn retry<T, F, Fut>(&self, what: &str, mut op: F) -> StoreResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = StoreResult<T>>,
    {
        let mut delay = Duration::from_millis(self.backoff_ms);
        let mut attempt = 1;
        loop {
            match self.once(what, op()).await {
                Err(StoreError::Unavailable(msg)) if attempt < self.attempts => {
                    warn!(
                        "{what} failed (attempt {attempt}/{}): {msg}; retrying in {}ms",
                        self.attempts,
                        delay.as_millis()
                    );
                    sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[rocket::async_test]
    async fn retries_until_success() {
        let policy = RetryPolicy::new(1000, 3, 1);
        let calls = AtomicU32::new(0);
        let result = policy
            .retry("flaky read", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::Unavailable("down".to_string()))
                } else {
                    Ok(42)
                }
            })
            .await;
        assert_eq!(result, Ok(42));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[rocket::async_test]
    async fn gives_up_after_the_last_attempt() {
        let policy = RetryPolicy::new(1000, 2, 1);
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = policy
            .retry("dead read", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Unavailable("down".to_string()))
            })
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[rocket::async_test]
    async fn duplicates_are_not_retried() {
        let policy = RetryPolicy::new(1000, 5, 1);
        let calls = AtomicU32::new(0);
        let result: StoreResult<()> = policy
            .retry("write", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::Duplicate("key".to_string()))
            })
            .await;
        assert!(matches!(result, Err(StoreError::Duplicate(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[rocket::async_test]
    async fn slow_calls_time_out() {
        let policy = RetryPolicy::new(10, 1, 1);
        let result: StoreResult<()> = policy
            .once("slow read", async {
                sleep(Duration::from_secs(5)).await;
                Ok(())
            })
            .await;
        match result {
            Err(StoreError::Unavailable(msg)) => assert!(msg.contains("timed out")),
            other => panic!("expected a timeout, got {other:?}"),
        }
    }
}
