//! Fixed-step monotonic tick clock.
//!
//! All action timing (start delays, settle delays, timeouts) is measured
//! against this clock, never against the wall clock, so a run behaves the
//! same whether ticks are paced in real time or executed back to back.

use std::time::Duration;

use thiserror::Error;

/// Errors from constructing or advancing the tick clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ClockError {
    /// The configured tick step was zero.
    #[error("tick step must be non-zero")]
    ZeroStep,
    /// The tick counter overflowed.
    #[error("tick counter overflowed")]
    TickOverflow,
    /// The monotonic time accumulator overflowed.
    #[error("monotonic time overflowed")]
    TimeOverflow,
}

/// Monotonic clock that advances by a fixed step once per engine tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    tick: u64,
    now: Duration,
    step: Duration,
}

impl TickClock {
    /// Create a clock at tick zero with the given per-tick step.
    pub const fn new(step: Duration) -> Result<Self, ClockError> {
        if step.is_zero() {
            return Err(ClockError::ZeroStep);
        }
        Ok(Self {
            tick: 0,
            now: Duration::ZERO,
            step,
        })
    }

    /// Advance one tick.
    pub fn advance(&mut self) -> Result<(), ClockError> {
        self.tick = self.tick.checked_add(1).ok_or(ClockError::TickOverflow)?;
        self.now = self
            .now
            .checked_add(self.step)
            .ok_or(ClockError::TimeOverflow)?;
        Ok(())
    }

    /// Monotonic time since the clock was created.
    pub const fn now(&self) -> Duration {
        self.now
    }

    /// Number of completed ticks.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// The fixed per-tick step.
    pub const fn step(&self) -> Duration {
        self.step
    }
}
