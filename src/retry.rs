use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::warn;

/// Whether a failed attempt is worth repeating.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

/// Bounded retry around a single request. `max_retries = 0` means one
/// attempt only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Multiplied by the attempt number before each retry, saturating at
    /// `Duration::MAX`
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            backoff: Duration::ZERO,
        }
    }

    fn wait_before(&self, attempt: u32) -> Duration {
        self.backoff.saturating_mul(attempt)
    }

    pub async fn run<T, E, F, Fut>(&self, what: &str, mut op: F) -> Result<T, E>
    where
        E: Display + Retryable,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt < self.max_retries && e.is_retryable() => {
                    attempt += 1;
                    let wait = self.wait_before(attempt);
                    warn!(attempt, max = self.max_retries, error = %e, "{} failed, retrying in {:?}", what, wait);
                    tokio::time::sleep(wait).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}
