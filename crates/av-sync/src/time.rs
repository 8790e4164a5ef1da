//! Monotonic time sources
//!
//! All timing in the synchronizer (clock anchors, jitter arrival times, drift
//! regression x-axis) goes through a [`TimeSource`] so tests can drive time
//! by hand instead of sleeping.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

/// Monotonic microsecond clock
pub trait TimeSource: Send + Sync + fmt::Debug {
    /// Microseconds elapsed since an arbitrary, fixed origin
    fn now_us(&self) -> i64;
}

/// [`TimeSource`] backed by [`Instant`]
#[derive(Debug, Clone, Copy)]
pub struct MonotonicTimeSource {
    origin: Instant,
}

impl MonotonicTimeSource {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for MonotonicTimeSource {
    fn now_us(&self) -> i64 {
        self.origin.elapsed().as_micros() as i64
    }
}

/// Manually advanced [`TimeSource`] for deterministic tests and simulations
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now_us: AtomicI64,
}

impl ManualTimeSource {
    pub fn new(start_us: i64) -> Self {
        Self {
            now_us: AtomicI64::new(start_us),
        }
    }

    /// Move time forward by `delta_us`
    pub fn advance(&self, delta_us: i64) {
        self.now_us.fetch_add(delta_us, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set(&self, now_us: i64) {
        self.now_us.store(now_us, Ordering::SeqCst);
    }
}

impl TimeSource for ManualTimeSource {
    fn now_us(&self) -> i64 {
        self.now_us.load(Ordering::SeqCst)
    }
}
