use albumlink_photos::error::{ErrorKind as PhotoErrorKind, Result as PhotoResult};
use std::future::Future;
use std::time::Duration;

/// Bounded exponential backoff for remote calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one.
    pub attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}
impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}
impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn none() -> Self {
        Self { attempts: 1, ..Self::default() }
    }

    /// Delay after the `attempt`-th failure (1-based): doubles every time,
    /// capped at `max_backoff`.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial_backoff.saturating_mul(factor).min(self.max_backoff)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's attempts are used up. The last error is returned.
pub(crate) async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> PhotoResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = PhotoResult<T>>,
{
    let attempts = policy.attempts.max(1);
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = policy.backoff(attempt);
                let kind: &PhotoErrorKind = &e;
                tracing::warn!(what, attempt, attempts, ?delay, error = %kind, "Remote call failed; retrying");
                tokio::time::sleep(delay).await;
                attempt += 1;
            },
            Err(e) => return Err(e),
        }
    }
}
