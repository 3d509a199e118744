//! Backoff schedule used while waiting for burst budget.

use std::time::Duration;

/// Exponential backoff between reservation attempts: `base * factor^attempt`,
/// capped at `max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Backoff {
    pub base: Duration,
    pub factor: f64,
    pub max: Duration,
    /// Apply +/- 50% random jitter.
    pub jitter: bool,
}

impl Backoff {
    /// Delay before retry number `attempt` (0-based).
    pub fn delay(self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let seconds = self.base.as_secs_f64() * self.factor.powi(exponent);
        let capped_seconds = seconds.min(self.max.as_secs_f64());
        let delay = Duration::from_secs_f64(capped_seconds.max(0.0));

        if !self.jitter {
            return delay;
        }

        let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = delay_ms / 2;
        let offset = fastrand::u64(0..=jitter_ms.saturating_mul(2));
        Duration::from_millis((delay_ms - jitter_ms).saturating_add(offset))
    }
}
