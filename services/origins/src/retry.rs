//! Fixed-delay retries for idempotent chain reads

use crate::context::FetchContext;
use crate::error::Result;
use node_config::RetryConfig;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    attempts: u32,
    delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// `attempts` counts the first try; zero is treated as one
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            delay,
        }
    }

    /// Single attempt
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.attempts, config.delay())
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error or runs out
    /// of attempts
    ///
    /// Every attempt and every delay is bounded by `ctx`, so cancellation ends the loop
    /// immediately.
    pub async fn run<T, F, Fut>(&self, ctx: &FetchContext, operation: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match ctx.run(call()).await? {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.attempts => {
                    warn!(
                        operation,
                        attempt,
                        attempts = self.attempts,
                        error = %err,
                        "Chain read failed, retrying in {:?}",
                        self.delay
                    );
                    ctx.run(tokio::time::sleep(self.delay)).await?;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
