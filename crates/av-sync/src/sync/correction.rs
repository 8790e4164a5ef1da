//! Drift correction policies
//!
//! A policy turns the measured A/V offset and the per-stream drift estimates
//! into a target playback speed for the [`MasterClock`]. The clock clamps
//! whatever comes out to its own [0.9, 1.1] range.
//!
//! Sign convention: a positive offset means video is ahead of audio, which
//! calls for a speed below 1.0.
//!
//! [`MasterClock`]: super::MasterClock

use super::clock_drift::ClockDriftEstimate;
use crate::config::CorrectionConfig;
use std::fmt;

/// Drift estimates below this confidence are not acted on
const MIN_DRIFT_CONFIDENCE: f64 = 0.5;

/// Everything a policy may look at for one correction cycle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionInput {
    /// Video PTS minus audio PTS (µs)
    pub av_offset_us: i64,
    /// In-sync window; offsets inside it need no offset correction
    pub sync_threshold_us: i64,
    pub video_drift: Option<ClockDriftEstimate>,
    pub audio_drift: Option<ClockDriftEstimate>,
}

impl CorrectionInput {
    pub fn out_of_sync(&self) -> bool {
        self.av_offset_us.abs() > self.sync_threshold_us
    }

    /// Video drift minus audio drift, when both estimates are trustworthy
    pub fn relative_drift_ppm(&self) -> Option<f64> {
        match (self.video_drift, self.audio_drift) {
            (Some(v), Some(a))
                if v.confidence >= MIN_DRIFT_CONFIDENCE && a.confidence >= MIN_DRIFT_CONFIDENCE =>
            {
                Some(v.drift_ppm - a.drift_ppm)
            }
            _ => None,
        }
    }
}

/// Strategy mapping sync measurements to a master clock speed
pub trait CorrectionPolicy: Send + Sync + fmt::Debug {
    /// Short identifier for logs
    fn name(&self) -> &'static str;

    /// Speed the master clock should run at for this cycle
    fn target_speed(&self, input: &CorrectionInput) -> f64;
}

/// ±`step` while out of sync, 1.0 otherwise
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepCorrection {
    pub step: f64,
}

impl Default for FixedStepCorrection {
    fn default() -> Self {
        Self { step: 0.02 }
    }
}

impl CorrectionPolicy for FixedStepCorrection {
    fn name(&self) -> &'static str {
        "fixed_step"
    }

    fn target_speed(&self, input: &CorrectionInput) -> f64 {
        if !input.out_of_sync() {
            1.0
        } else if input.av_offset_us > 0 {
            1.0 - self.step
        } else {
            1.0 + self.step
        }
    }
}

/// Offset-proportional correction plus regression drift compensation
///
/// ```text
/// speed = 1 - clamp(gain * offset_s + relative_drift_ppm / 1e6, ±max_step)
/// ```
///
/// The offset term only applies outside the sync window; the drift term
/// applies whenever both drift estimates are trustworthy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProportionalCorrection {
    pub gain: f64,
    pub max_step: f64,
}

impl Default for ProportionalCorrection {
    fn default() -> Self {
        Self {
            gain: 0.5,
            max_step: 0.05,
        }
    }
}

impl CorrectionPolicy for ProportionalCorrection {
    fn name(&self) -> &'static str {
        "proportional"
    }

    fn target_speed(&self, input: &CorrectionInput) -> f64 {
        let offset_term = if input.out_of_sync() {
            input.av_offset_us as f64 / 1_000_000.0 * self.gain
        } else {
            0.0
        };
        let drift_term = input.relative_drift_ppm().unwrap_or(0.0) / 1_000_000.0;

        1.0 - (offset_term + drift_term).clamp(-self.max_step, self.max_step)
    }
}

/// Build the policy selected in configuration
pub fn policy_from_config(config: &CorrectionConfig) -> Box<dyn CorrectionPolicy> {
    match *config {
        CorrectionConfig::FixedStep { step } => Box::new(FixedStepCorrection { step }),
        CorrectionConfig::Proportional { gain, max_step } => {
            Box::new(ProportionalCorrection { gain, max_step })
        }
    }
}
