//! Retry with exponential backoff.

use std::future::Future;
use std::time::Duration;

use crate::RpcError;

/// How often and how patiently a request is retried.
#[derive(Clone, Debug)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub base_delay: Duration,
    /// Factor applied to the delay after every further attempt.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            base_delay: Duration::from_secs(1),
            multiplier: 1.5,
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (0-based). The first attempt is immediate.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        let exponent = i32::try_from(attempt - 1).unwrap_or(i32::MAX);
        self.base_delay.mul_f64(self.multiplier.powi(exponent))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or the
    /// attempts are used up.
    pub async fn run<T, F, Fut>(&self, method: &str, mut op: F) -> Result<T, RpcError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, RpcError>>,
    {
        let mut last = None;
        for attempt in 0..self.max_attempts.max(1) {
            let delay = self.delay_before(attempt);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() => {
                    tracing::error!(method, attempt = attempt + 1, error = %e, "RPC attempt failed");
                    last = Some(e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(RpcError::Exhausted {
            method: method.to_string(),
            attempts: self.max_attempts.max(1),
            last: Box::new(last.unwrap_or_else(|| RpcError::Transport("no attempt made".into()))),
        })
    }
}
