use std::{future::Future, time::Duration};

use crate::error::{AppError, AppResult};

/// Attempt budget and base delay for transport-level retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first; values below 1 are treated as 1
    pub retries: u32,
    /// Delay before attempt `n + 1` is `delay * n`
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(retries: u32, delay: Duration) -> Self {
        Self { retries, delay }
    }

    /// A single attempt with no retries
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    fn attempts(&self) -> u32 {
        self.retries.max(1)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(1000))
    }
}

/// Runs `op` until it succeeds, fails permanently, or the attempt budget is spent
///
/// Backoff is linear: the wait grows by `policy.delay` after each failure.
/// Errors that are not [`AppError::is_transient`] end the loop at once. The
/// last error is returned unchanged.
pub async fn retry<T, F, Fut>(policy: RetryPolicy, mut op: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let attempts = policy.attempts();
    let mut attempt = 0;

    loop {
        attempt += 1;
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < attempts && e.is_transient() => {
                let wait = policy.delay * attempt;
                tracing::warn!(
                    attempt,
                    max_attempts = attempts,
                    wait_ms = wait.as_millis() as u64,
                    error = %e,
                    "Backend request failed, retrying"
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => return Err(e),
        }
    }
}
