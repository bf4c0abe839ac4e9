//! Reconnect delay policy

use std::time::Duration;

pub const DEFAULT_RETRY_STEP: Duration = Duration::from_millis(20_000);
pub const DEFAULT_RETRY_CEILING: Duration = Duration::from_millis(300_000);
pub const DEFAULT_KICK_DELAY: Duration = Duration::from_millis(20_000);

/// Linear backoff with a ceiling, plus a fixed delay after kicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub step: Duration,
    pub ceiling: Duration,
    pub kick_delay: Duration,
}

impl Backoff {
    /// Delay after an ordinary disconnect: `min(ceiling, attempts * step)`.
    pub fn delay_for(&self, attempts: u32) -> Duration {
        self.step
            .checked_mul(attempts)
            .map_or(self.ceiling, |d| d.min(self.ceiling))
    }

    pub fn kick_delay(&self) -> Duration {
        self.kick_delay
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            step: DEFAULT_RETRY_STEP,
            ceiling: DEFAULT_RETRY_CEILING,
            kick_delay: DEFAULT_KICK_DELAY,
        }
    }
}

/// Attempt counter kept across sessions for the lifetime of the process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryState {
    pub attempts: u32,
    pub last_delay: Duration,
}

impl RetryState {
    pub fn record_failure(&mut self) -> u32 {
        self.attempts = self.attempts.saturating_add(1);
        self.attempts
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }
}
