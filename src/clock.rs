//! Monotonic cycle-counter time source
//!
//! The sampler does all elapsed-time math in raw cycle units; converting to
//! milliseconds or Hz is left to the renderer via `cycles_per_usec`. The
//! trait seam exists so tests can script the clock.

use std::time::Instant;

/// A monotonic high-resolution time source.
pub trait Clock {
    /// Current reading in cycle units. Monotonically non-decreasing.
    fn now_cycles(&self) -> u64;

    /// Conversion factor from cycle units to microseconds.
    fn cycles_per_usec(&self) -> f64;
}

/// Production clock: anchors an `Instant` at construction and reports
/// elapsed nanoseconds as cycle units (1000 cycles per microsecond).
#[derive(Debug, Clone)]
pub struct CycleClock {
    anchor: Instant,
}

impl CycleClock {
    pub fn new() -> Self {
        Self {
            anchor: Instant::now(),
        }
    }
}

impl Default for CycleClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for CycleClock {
    fn now_cycles(&self) -> u64 {
        // u64 nanoseconds covers ~584 years of session time.
        self.anchor.elapsed().as_nanos() as u64
    }

    fn cycles_per_usec(&self) -> f64 {
        1000.0
    }
}
