// Queue Configuration

use crate::application::queue::constants::*;
use crate::application::retry::RetryPolicy;
use std::time::Duration;

/// Tuning knobs for the command queue
///
/// Defaults add no artificial delay anywhere: no pacing between commands
/// and no sleep between retries.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueConfig {
    /// Pause a worker takes after each command before dequeuing the next
    pub pacing: Duration,
    /// Retries allowed per command on top of the first attempt
    pub max_retries: u32,
    /// Generic failures sleep `backoff_base * attempt` before retrying
    pub backoff_base: Duration,
    /// Wait timeout used when neither the command nor the caller sets one
    pub default_wait_timeout: Duration,
    /// Upper bound on how long `stop()` lets workers drain; `None` waits
    /// for every queued command
    pub drain_timeout: Option<Duration>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            pacing: DEFAULT_PACING,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff_base: DEFAULT_BACKOFF_BASE,
            default_wait_timeout: DEFAULT_WAIT_TIMEOUT,
            drain_timeout: None,
        }
    }
}

impl QueueConfig {
    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    pub fn with_default_wait_timeout(mut self, timeout: Duration) -> Self {
        self.default_wait_timeout = timeout;
        self
    }

    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = Some(timeout);
        self
    }

    /// Retry policy derived from this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.backoff_base)
    }
}
