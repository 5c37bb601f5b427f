//! Exponential backoff law shared by step retries, the reachability probe
//! and the sensor's broker reconnect schedule.
//!
//! The sequence starts at `initial_delay` and each following delay is
//! `min(previous * factor, max_delay)`. With 5s, x2.0 and a 60s cap the
//! delays are 5, 10, 20, 40, 60, 60, ...

use std::time::Duration;

/// Backoff parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied after each delay
    pub factor: f64,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            factor: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl BackoffConfig {
    pub fn new(initial_delay: Duration, factor: f64, max_delay: Duration) -> Self {
        Self {
            initial_delay,
            factor,
            max_delay,
        }
    }

    /// Iterator over successive delays. Never ends.
    pub fn delays(&self) -> Backoff {
        Backoff {
            next: self.initial_delay,
            factor: self.factor,
            max_delay: self.max_delay,
        }
    }

    /// Delay used after the given failed attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.delays()
            .nth(attempt as usize)
            .unwrap_or(self.max_delay)
    }
}

/// Infinite iterator of backoff delays.
#[derive(Debug, Clone)]
pub struct Backoff {
    next: Duration,
    factor: f64,
    max_delay: Duration,
}

impl Iterator for Backoff {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        let current = self.next;
        // Overflow or a non-finite factor saturates at the cap.
        let grown = Duration::try_from_secs_f64(current.as_secs_f64() * self.factor)
            .unwrap_or(self.max_delay);
        self.next = grown.min(self.max_delay);
        Some(current)
    }
}
