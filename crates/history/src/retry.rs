//! Exponential backoff for append retries.

use std::time::Duration;

use crate::config::HistoryConfig;

/// Upper bound on a single retry delay.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(2);

/// How often and how patiently a lost append race is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &HistoryConfig) -> Self {
        Self {
            max_retries: config.append_max_retries,
            initial_delay: config.append_retry_backoff,
        }
    }

    /// Delay before retry number `attempt` (0-based): the initial delay
    /// doubled per attempt, clamped to [`MAX_RETRY_DELAY`].
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .saturating_mul(factor)
            .min(MAX_RETRY_DELAY)
    }
}
