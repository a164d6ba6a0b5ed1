//! Retry policy for optimistic balance updates.

use std::time::Duration;

use rand::Rng;
use tally_shared::LedgerConfig;

/// Immutable retry settings handed to the coordinator at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per update call, at least 1.
    pub max_attempts: u32,
    /// Linear growth of the base delay per attempt.
    pub backoff_step: Duration,
    /// Exclusive upper bound of the uniform jitter added to each delay.
    pub jitter: Duration,
    /// Cap applied to every delay.
    pub max_backoff: Duration,
    /// Optional overall time budget for one update call.
    pub deadline: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            backoff_step: Duration::from_millis(10),
            jitter: Duration::from_millis(20),
            max_backoff: Duration::from_millis(400),
            deadline: None,
        }
    }
}

impl From<&LedgerConfig> for RetryPolicy {
    fn from(config: &LedgerConfig) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            backoff_step: Duration::from_millis(config.backoff_step_ms),
            jitter: Duration::from_millis(config.jitter_ms),
            max_backoff: Duration::from_millis(config.max_backoff_ms),
            deadline: config.deadline_ms.map(Duration::from_millis),
        }
    }
}

impl RetryPolicy {
    /// Returns a copy with the given overall time budget.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Delay before the attempt following `attempt` (0-based):
    /// `min(attempt * step + uniform[0, jitter), max_backoff)`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let base = self.backoff_step.saturating_mul(attempt);
        base.saturating_add(self.sample_jitter())
            .min(self.max_backoff)
    }

    fn sample_jitter(&self) -> Duration {
        let max_micros = u64::try_from(self.jitter.as_micros()).unwrap_or(u64::MAX);
        if max_micros == 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(rand::rng().random_range(0..max_micros))
    }
}
