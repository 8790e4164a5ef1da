//! Master playback clock
//!
//! A single authoritative "now" on the media timeline. The clock is an
//! anchor `(base_pts, base_time)` plus a speed factor:
//!
//! ```text
//! time = base_pts + (now - base_time) * speed
//! ```
//!
//! Speed changes re-anchor first, so the reported time never jumps; only its
//! rate changes.

use crate::frame::Pts;
use crate::time::TimeSource;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Slowest playback speed the clock accepts
pub const MIN_SPEED: f64 = 0.9;

/// Fastest playback speed the clock accepts
pub const MAX_SPEED: f64 = 1.1;

#[derive(Debug, Clone, Copy)]
struct ClockAnchor {
    base_pts: Pts,
    base_time_us: i64,
    speed: f64,
}

impl ClockAnchor {
    fn at(now_us: i64) -> Self {
        Self {
            base_pts: 0,
            base_time_us: now_us,
            speed: 1.0,
        }
    }

    fn time_at(&self, now_us: i64) -> Pts {
        let elapsed = (now_us - self.base_time_us) as f64;
        self.base_pts + (elapsed * self.speed).round() as i64
    }
}

/// Rebase-able, speed-adjustable media clock
#[derive(Debug)]
pub struct MasterClock {
    time: Arc<dyn TimeSource>,
    anchor: Mutex<ClockAnchor>,
}

impl MasterClock {
    pub fn new(time: Arc<dyn TimeSource>) -> Self {
        let anchor = ClockAnchor::at(time.now_us());
        Self {
            time,
            anchor: Mutex::new(anchor),
        }
    }

    /// Anchor the clock so it reads `pts` now
    ///
    /// The current speed is kept; only [`reset`](Self::reset) restores 1.0.
    pub fn set_time(&self, pts: Pts) {
        let now = self.time.now_us();
        let mut anchor = self.anchor.lock();
        anchor.base_pts = pts;
        anchor.base_time_us = now;
    }

    /// Current media time in microseconds
    pub fn time_us(&self) -> Pts {
        let now = self.time.now_us();
        self.anchor.lock().time_at(now)
    }

    /// Change the playback rate, clamped to [`MIN_SPEED`, `MAX_SPEED`]
    ///
    /// Elapsed time at the old rate is folded into the anchor first.
    /// Returns the speed actually applied. Non-finite factors are ignored.
    pub fn adjust_speed(&self, factor: f64) -> f64 {
        let now = self.time.now_us();
        let mut anchor = self.anchor.lock();
        if !factor.is_finite() {
            warn!(factor, "Ignoring non-finite clock speed factor");
            return anchor.speed;
        }
        anchor.base_pts = anchor.time_at(now);
        anchor.base_time_us = now;
        anchor.speed = factor.clamp(MIN_SPEED, MAX_SPEED);
        anchor.speed
    }

    /// Current speed factor
    pub fn speed(&self) -> f64 {
        self.anchor.lock().speed
    }

    /// Zero the anchor and restore speed 1.0
    pub fn reset(&self) {
        let now = self.time.now_us();
        *self.anchor.lock() = ClockAnchor::at(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualTimeSource;

    fn manual_clock() -> (Arc<ManualTimeSource>, MasterClock) {
        let time = Arc::new(ManualTimeSource::new(5_000_000));
        let clock = MasterClock::new(time.clone());
        (time, clock)
    }

    #[test]
    fn test_set_time_reads_back() {
        let (time, clock) = manual_clock();
        clock.set_time(1_234_567);
        assert_eq!(clock.time_us(), 1_234_567);

        time.advance(20_000);
        assert_eq!(clock.time_us(), 1_254_567);
    }

    #[test]
    fn test_get_time_has_no_side_effects() {
        let (time, clock) = manual_clock();
        clock.set_time(100);
        time.advance(50);
        assert_eq!(clock.time_us(), clock.time_us());
    }

    #[test]
    fn test_adjust_speed_changes_rate_without_jump() {
        let (time, clock) = manual_clock();
        clock.set_time(0);
        time.advance(1_000_000);
        assert_eq!(clock.time_us(), 1_000_000);

        let applied = clock.adjust_speed(1.05);
        assert!((applied - 1.05).abs() < 1e-12);
        // No discontinuity at the moment of adjustment
        assert_eq!(clock.time_us(), 1_000_000);

        time.advance(1_000_000);
        assert_eq!(clock.time_us(), 2_050_000);
    }

    #[test]
    fn test_adjust_speed_clamps() {
        let (_time, clock) = manual_clock();
        assert_eq!(clock.adjust_speed(2.0), MAX_SPEED);
        assert_eq!(clock.adjust_speed(0.1), MIN_SPEED);
        assert_eq!(clock.adjust_speed(-3.0), MIN_SPEED);
        assert_eq!(clock.adjust_speed(1.0), 1.0);
    }

    #[test]
    fn test_non_finite_speed_ignored() {
        let (_time, clock) = manual_clock();
        clock.adjust_speed(0.95);
        assert_eq!(clock.adjust_speed(f64::NAN), 0.95);
        assert_eq!(clock.adjust_speed(f64::INFINITY), 0.95);
        assert_eq!(clock.speed(), 0.95);
    }

    #[test]
    fn test_set_time_keeps_speed() {
        let (time, clock) = manual_clock();
        clock.adjust_speed(0.9);
        clock.set_time(10_000);
        time.advance(100_000);
        assert_eq!(clock.time_us(), 100_000);
        assert_eq!(clock.speed(), 0.9);
    }

    #[test]
    fn test_reset() {
        let (time, clock) = manual_clock();
        clock.set_time(9_999_999);
        clock.adjust_speed(1.1);
        clock.reset();
        assert_eq!(clock.time_us(), 0);
        assert_eq!(clock.speed(), 1.0);

        time.advance(40);
        assert_eq!(clock.time_us(), 40);
    }

    #[test]
    fn test_wall_clock_source() {
        let clock = MasterClock::new(Arc::new(crate::time::MonotonicTimeSource::new()));
        clock.set_time(500_000);
        let t = clock.time_us();
        // Immediately after anchoring, within scheduling jitter
        assert!((500_000..500_000 + 50_000).contains(&t), "t={t}");
    }
}
