use rand::Rng;
use std::time::Duration;

/// Doubling delay between retries of a rate-limited request.
///
/// The delay for attempt `n` is `base_ms * 2^n`, moved by up to
/// `jitter_percent` in either direction and never above `max_ms`.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base_ms: u64,
    max_ms: u64,
    jitter_percent: u64,
}

impl ExponentialBackoff {
    pub const fn new(base_ms: u64, max_ms: u64) -> Self {
        Self {
            base_ms,
            max_ms,
            jitter_percent: 10,
        }
    }

    pub fn with_jitter(self, jitter_percent: u64) -> Self {
        Self {
            jitter_percent: jitter_percent.min(100),
            ..self
        }
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        let nominal = self
            .base_ms
            .saturating_mul(1u64 << attempt.min(20))
            .min(self.max_ms);
        let spread = nominal.saturating_mul(self.jitter_percent) / 100;
        let ms = if spread == 0 {
            nominal
        } else {
            let low = nominal - spread;
            let high = nominal.saturating_add(spread).min(self.max_ms);
            rand::thread_rng().gen_range(low..=high)
        };
        Duration::from_millis(ms)
    }
}
