use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retry_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub startup_grace: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retry_attempts: 5,
            initial_backoff: Duration::from_millis(1_000),
            max_backoff: Duration::from_millis(60_000),
            startup_grace: Duration::from_millis(2_000),
        }
    }
}

impl RetryPolicy {
    /// `initial * 2^attempts`, capped at `max_backoff`.
    pub fn backoff_for(&self, attempts: u32) -> Duration {
        let factor = 1u32.checked_shl(attempts).unwrap_or(u32::MAX);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}
