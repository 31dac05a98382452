//! Bounded pause with jitter between selection passes.

use rand::Rng;
use std::time::Duration;

/// Pause schedule for a coordinator waiting on health data or a failing backend.
///
/// Each consecutive pass doubles the pause from `base`, capped at `max`,
/// with up to 10% jitter so concurrent requests do not wake in lockstep.
#[derive(Debug, Clone)]
pub struct IdleBackoff {
    base: Duration,
    max: Duration,
    passes: u32,
}

impl IdleBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            passes: 0,
        }
    }

    /// Pause before the next pass, never longer than `remaining`.
    pub fn next_delay(&mut self, remaining: Duration) -> Duration {
        let factor = 1u32.checked_shl(self.passes.min(16)).unwrap_or(u32::MAX);
        self.passes = self.passes.saturating_add(1);

        let capped = self.base.saturating_mul(factor).min(self.max);
        let jitter_range = capped.as_millis() as u64 / 10;
        let jitter = if jitter_range > 0 {
            Duration::from_millis(rand::thread_rng().gen_range(0..jitter_range))
        } else {
            Duration::ZERO
        };

        (capped + jitter).min(remaining)
    }
}
