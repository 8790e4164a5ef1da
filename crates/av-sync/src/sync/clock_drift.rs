//! Clock drift estimation
//!
//! Relates local elapsed time to stream PTS with an ordinary least-squares
//! fit. A stream whose PTS advances faster than the local clock has a slope
//! above 1.0:
//!
//! ```text
//! drift_ppm = (slope - 1.0) * 1_000_000
//! ```
//!
//! The estimate is diagnostic; correction policies consume it but the
//! estimator never touches the clock itself.

use crate::frame::{MediaKind, Pts};
use std::collections::VecDeque;

/// Minimum observations required before drift can be estimated
pub const MIN_DRIFT_SAMPLES: usize = 10;

/// One (local elapsed, stream PTS) observation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriftObservation {
    /// Local time since the synchronizer started (µs)
    pub local_us: i64,
    /// Stream PTS observed at that moment (µs)
    pub pts_us: Pts,
}

/// Recommended action based on drift analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriftAction {
    /// No action needed - drift is minimal
    None,
    /// Monitor drift - within acceptable range but trending
    Monitor,
    /// Apply correction - drift exceeds threshold
    Adjust,
    /// Investigate - drift is erratic or unreliable
    Investigate,
}

/// Clock drift estimate result
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClockDriftEstimate {
    /// Estimated drift in parts per million (PPM)
    /// Positive = stream clock runs faster than the local clock
    pub drift_ppm: f64,
    /// Number of samples used in estimation
    pub sample_count: usize,
    /// Correction factor to apply to timestamps (1.0 + drift_ppm/1_000_000)
    pub correction_factor: f64,
    /// Confidence in the estimate (0.0 to 1.0), |r| of the regression
    pub confidence: f64,
    /// Recommended action based on drift magnitude
    pub recommended_action: DriftAction,
}

/// Per-stream drift estimator over a bounded observation window
#[derive(Debug, Clone)]
pub struct DriftEstimator {
    kind: MediaKind,
    observations: VecDeque<DriftObservation>,
    capacity: usize,
    drift_threshold_ppm: f64,
}

impl DriftEstimator {
    /// Create an estimator for one stream
    ///
    /// # Arguments
    /// * `kind` - Stream this estimator tracks
    /// * `capacity` - Observations kept (at least [`MIN_DRIFT_SAMPLES`])
    /// * `drift_threshold_ppm` - Threshold above which correction is recommended
    pub fn new(kind: MediaKind, capacity: usize, drift_threshold_ppm: f64) -> Self {
        let capacity = capacity.max(MIN_DRIFT_SAMPLES);
        Self {
            kind,
            observations: VecDeque::with_capacity(capacity),
            capacity,
            drift_threshold_ppm,
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Record a stream PTS against local elapsed time
    pub fn add_observation(&mut self, local_us: i64, pts_us: Pts) {
        if self.observations.len() >= self.capacity {
            self.observations.pop_front();
        }
        self.observations
            .push_back(DriftObservation { local_us, pts_us });
    }

    /// Estimate clock drift using linear regression
    ///
    /// # Returns
    /// `None` with fewer than [`MIN_DRIFT_SAMPLES`] observations or when all
    /// observations share one local timestamp.
    pub fn estimate_drift(&self) -> Option<ClockDriftEstimate> {
        if self.observations.len() < MIN_DRIFT_SAMPLES {
            return None;
        }

        // Offsets from the first observation keep the sums well-conditioned
        let first = self.observations.front()?;
        let n = self.observations.len() as f64;

        let (mut sum_x, mut sum_y) = (0.0f64, 0.0f64);
        for obs in &self.observations {
            sum_x += obs.local_us.saturating_sub(first.local_us) as f64;
            sum_y += obs.pts_us.saturating_sub(first.pts_us) as f64;
        }
        let mean_x = sum_x / n;
        let mean_y = sum_y / n;

        let (mut s_xx, mut s_xy, mut s_yy) = (0.0f64, 0.0f64, 0.0f64);
        for obs in &self.observations {
            let dx = obs.local_us.saturating_sub(first.local_us) as f64 - mean_x;
            let dy = obs.pts_us.saturating_sub(first.pts_us) as f64 - mean_y;
            s_xx += dx * dx;
            s_xy += dx * dy;
            s_yy += dy * dy;
        }

        if s_xx.abs() < 1e-10 {
            return None; // Degenerate case
        }

        let slope = s_xy / s_xx;
        let drift_ppm = (slope - 1.0) * 1_000_000.0;

        let confidence = if s_yy.abs() > 1e-10 {
            (s_xy / (s_xx * s_yy).sqrt()).abs().clamp(0.0, 1.0)
        } else {
            0.0 // PTS never moved, nothing to trust
        };

        let action = if confidence < 0.5 {
            DriftAction::Investigate
        } else if drift_ppm.abs() < self.drift_threshold_ppm / 2.0 {
            DriftAction::None
        } else if drift_ppm.abs() < self.drift_threshold_ppm {
            DriftAction::Monitor
        } else {
            DriftAction::Adjust
        };

        Some(ClockDriftEstimate {
            drift_ppm,
            sample_count: self.observations.len(),
            correction_factor: 1.0 + drift_ppm / 1_000_000.0,
            confidence,
            recommended_action: action,
        })
    }

    /// Get number of observations collected
    pub fn observation_count(&self) -> usize {
        self.observations.len()
    }

    /// Check if sufficient observations exist for estimation
    pub fn can_estimate(&self) -> bool {
        self.observations.len() >= MIN_DRIFT_SAMPLES
    }

    /// Clear all observations
    pub fn reset(&mut self) {
        self.observations.clear();
    }
}
