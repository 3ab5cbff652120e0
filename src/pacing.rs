//! Fixed-interval cycle pacing.
//!
//! Each pipeline cycle captures a deadline up front and sleeps away whatever
//! budget remains once its work is done. Overruns are absorbed, never
//! compensated: the next deadline is computed fresh from the new now, so the
//! frame rate degrades gracefully under load instead of stacking catch-up
//! work.

use std::thread;
use std::time::{Duration, Instant};

/// When the next cycle should begin. Lives exactly one cycle.
#[derive(Clone, Copy, Debug)]
pub struct CycleDeadline(Instant);

/// Enforces a fixed wall-clock interval between inference cycles.
pub struct PacingController {
    interval: Duration,
}

impl PacingController {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Capture `now + interval` as the deadline for the cycle starting now.
    pub fn begin_cycle(&self) -> CycleDeadline {
        CycleDeadline(Instant::now() + self.interval)
    }

    /// Block until the deadline. Returns immediately when the cycle's own
    /// work already exceeded the interval.
    pub fn wait_until(&self, deadline: CycleDeadline) {
        if let Some(remaining) = deadline.0.checked_duration_since(Instant::now()) {
            if remaining > Duration::ZERO {
                thread::sleep(remaining);
            }
        }
    }
}
