use std::time::Duration;

const GROWTH_FACTOR: f64 = 1.5;
const FAULT_PENALTY: u32 = 2;

/// Reconnect delay of `min(base * 1.5^attempt, max)`.
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            current: base.min(max),
            attempt: 0,
        }
    }

    /// Returns the delay for the next attempt and grows the following one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.mul_f64(GROWTH_FACTOR).min(self.max);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Doubles the pending delay, used when the server refuses the connection count.
    pub fn penalize(&mut self) {
        self.current = self.current.saturating_mul(FAULT_PENALTY).min(self.max);
    }

    pub fn reset(&mut self) {
        self.current = self.base.min(self.max);
        self.attempt = 0;
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
