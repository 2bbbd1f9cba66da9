use embassy_time::{Duration, Instant};

use crate::DEFAULT_DEBOUNCE;

/// Debounce state of a single digital input.
///
/// The stable level follows the raw level only after the raw level stayed unchanged
/// for the whole debounce interval. Every raw change restarts the interval, so a line
/// that keeps bouncing never transitions.
#[derive(Copy, Clone, Debug)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DebouncedInput {
    /// Last sampled level
    raw: bool,
    /// Level that was last accepted
    stable: bool,
    /// When `raw` last changed
    last_change: Instant,
    interval: Duration,
}

impl Default for DebouncedInput {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl DebouncedInput {
    /// Create a released input with the given settle time
    pub const fn new(interval: Duration) -> Self {
        Self {
            raw: false,
            stable: false,
            last_change: Instant::from_ticks(0),
            interval,
        }
    }

    /// Feed one sample. Returns the new stable level when a transition is accepted.
    pub fn sample(&mut self, level: bool, now: Instant) -> Option<bool> {
        if level != self.raw {
            self.raw = level;
            self.last_change = now;
        }

        if self.raw != self.stable && now.saturating_duration_since(self.last_change) >= self.interval {
            self.stable = self.raw;
            return Some(self.stable);
        }

        None
    }

    /// The accepted level
    pub fn is_active(&self) -> bool {
        self.stable
    }

    /// Change the settle time. An in-flight transition is judged against the new value.
    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }
}
