//! Interarrival jitter estimation
//!
//! RFC 3550 style: for consecutive samples the transit difference
//! `|(arrival[i] - arrival[i-1]) - (pts[i] - pts[i-1])|` is folded into an
//! exponential moving average with a new-sample weight of 1/16.
//!
//! The average is recomputed from zero over the retained window on every
//! sample, so the window size bounds how long a burst is remembered.

use crate::frame::Pts;
use std::collections::VecDeque;
use tracing::warn;

/// New-sample weight of the moving average
const JITTER_GAIN: f64 = 1.0 / 16.0;

/// PTS or arrival steps larger than this restart the window (seek, stall)
pub const DISCONTINUITY_THRESHOLD_US: i64 = 1_000_000;

/// One (pts, arrival) observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JitterSample {
    pub pts_us: Pts,
    pub arrival_us: i64,
}

/// Per-stream jitter filter over a bounded sample ring
#[derive(Debug, Clone)]
pub struct JitterEstimator {
    samples: VecDeque<JitterSample>,
    capacity: usize,
    estimate_us: f64,
    discontinuities: u64,
}

fn deviation_us(prev: &JitterSample, next: &JitterSample) -> f64 {
    let pts_delta = next.pts_us.saturating_sub(prev.pts_us);
    let arrival_delta = next.arrival_us.saturating_sub(prev.arrival_us);
    arrival_delta.saturating_sub(pts_delta).saturating_abs() as f64
}

impl JitterEstimator {
    /// Create an estimator keeping at most `capacity` samples (min 2)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            estimate_us: 0.0,
            discontinuities: 0,
        }
    }

    /// Record a frame's PTS together with its local arrival time
    pub fn add_sample(&mut self, pts_us: Pts, arrival_us: i64) {
        if let Some(prev) = self.samples.back() {
            let pts_delta = pts_us.saturating_sub(prev.pts_us);
            let arrival_delta = arrival_us.saturating_sub(prev.arrival_us);

            if pts_delta.saturating_abs() > DISCONTINUITY_THRESHOLD_US
                || arrival_delta.saturating_abs() > DISCONTINUITY_THRESHOLD_US
            {
                warn!(
                    pts_delta,
                    arrival_delta, "Timing discontinuity, restarting jitter window"
                );
                self.samples.clear();
                self.discontinuities += 1;
            }
        }

        if self.samples.len() >= self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(JitterSample { pts_us, arrival_us });
        self.recompute();
    }

    fn recompute(&mut self) {
        let mut estimate = 0.0;
        for (prev, next) in self.samples.iter().zip(self.samples.iter().skip(1)) {
            estimate += (deviation_us(prev, next) - estimate) * JITTER_GAIN;
        }
        self.estimate_us = estimate;
    }

    /// Current jitter estimate in microseconds
    pub fn jitter_us(&self) -> i64 {
        self.estimate_us.round() as i64
    }

    /// Extra buffering that absorbs the estimated jitter (2x jitter)
    pub fn optimal_buffer_delay_us(&self) -> i64 {
        self.jitter_us() * 2
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Number of window restarts caused by timing discontinuities
    pub fn discontinuities(&self) -> u64 {
        self.discontinuities
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.estimate_us = 0.0;
        self.discontinuities = 0;
    }
}
