//! Execution timing knobs.

use std::time::Duration;

pub const DEFAULT_CONFIRM_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);
pub const DEFAULT_BATCH_DELAY: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// How long to wait for a submitted transaction to reach a terminal state.
    pub confirm_timeout: Duration,
    pub poll_interval: Duration,
    /// Minimum pause between the end of one batch case and the start of the next.
    pub batch_delay: Duration,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            confirm_timeout: DEFAULT_CONFIRM_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            batch_delay: DEFAULT_BATCH_DELAY,
        }
    }
}

impl ExecutionConfig {
    pub fn with_confirm_timeout(mut self, timeout: Duration) -> Self {
        self.confirm_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_batch_delay(mut self, delay: Duration) -> Self {
        self.batch_delay = delay;
        self
    }
}
