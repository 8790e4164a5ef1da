//! Lip-sync quality monitor
//!
//! Rolling average of |A/V offset| for user-facing quality signaling.
//! ITU-R BT.1359-1 puts detectability around ±40ms and acceptability
//! around ±80ms; the monitor reports against the latter. It never drives
//! correction.

use std::collections::VecDeque;

/// Rolling window size
pub const MAX_MEASUREMENTS: usize = 100;

/// Average |offset| below which sync is considered acceptable (µs)
pub const ACCEPTABLE_SYNC_US: i64 = 80_000;

#[derive(Debug, Clone, Default)]
pub struct LipSyncMonitor {
    measurements: VecDeque<i64>,
    sum: i128,
}

impl LipSyncMonitor {
    pub fn new() -> Self {
        Self {
            measurements: VecDeque::with_capacity(MAX_MEASUREMENTS),
            sum: 0,
        }
    }

    /// Record one A/V offset measurement (sign ignored)
    pub fn add_measurement(&mut self, av_offset_us: i64) {
        let magnitude = av_offset_us.saturating_abs();
        if self.measurements.len() >= MAX_MEASUREMENTS {
            if let Some(oldest) = self.measurements.pop_front() {
                self.sum -= i128::from(oldest);
            }
        }
        self.measurements.push_back(magnitude);
        self.sum += i128::from(magnitude);
    }

    /// Average |offset| over the window, 0 when empty
    pub fn average_drift_us(&self) -> i64 {
        if self.measurements.is_empty() {
            return 0;
        }
        (self.sum / self.measurements.len() as i128) as i64
    }

    /// Whether the rolling average is within the acceptable-sync threshold
    pub fn is_acceptable(&self) -> bool {
        self.average_drift_us() < ACCEPTABLE_SYNC_US
    }

    pub fn measurement_count(&self) -> usize {
        self.measurements.len()
    }

    pub fn reset(&mut self) {
        self.measurements.clear();
        self.sum = 0;
    }
}
