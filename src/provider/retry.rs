//! Bounded retry for provider calls

use crate::core::config::EngineConfig;
use crate::core::error::Result;
use std::future::Future;
use std::time::Duration;

/// Fixed attempt budget with a constant delay between attempts
///
/// Only retryable errors (malformed output, transport failures) are retried.
/// The last error is returned once the budget is spent; callers convert it
/// into the failure kind that fits their granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// No retries, no delay
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    pub fn for_decisions(config: &EngineConfig) -> Self {
        Self::new(config.max_attempts, config.decision_retry_delay())
    }

    pub fn for_world_updates(config: &EngineConfig) -> Self {
        Self::new(config.max_attempts, config.world_retry_delay())
    }

    pub async fn run<T, F, Fut>(&self, label: &str, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        call = label,
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %err,
                        "provider call failed, retrying"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if attempt > 1 {
                        tracing::warn!(call = label, attempt, error = %err, "retry budget spent");
                    }
                    return Err(err);
                }
            }
        }
    }
}
