//! Configuration for the audio/video synchronizer
//!
//! Configuration can be loaded from a TOML file and/or environment variables.
//! Every constructor in this crate runs [`SyncConfig::validate`] first, so an
//! inconsistent threshold set is rejected at session start rather than
//! producing odd drop behavior mid-stream.
//!
//! # Thresholds
//!
//! Three independent lateness constants are used:
//!
//! ```text
//!   hard_drop_threshold_us  >=  max_desync_us  >=  repeat_threshold_us
//!   (drop fast path)            (sync window)      (repeat hint)
//! ```
//!
//! `max_desync_us` is the window both the pairing engine and
//! `PlaybackGate::check_video_sync` decide against. None may exceed
//! [`MAX_THRESHOLD_US`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment variable overrides
pub const ENV_PREFIX: &str = "STREAMSYNC_";

/// Upper bound for any lateness threshold (10 seconds)
pub const MAX_THRESHOLD_US: i64 = 10_000_000;

/// Which stream drives the master clock on the receiver side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockSource {
    /// Audio PTS re-anchors the master clock (default, audio glitches are
    /// more noticeable than a repeated video frame)
    #[default]
    Audio,
    /// Video PTS re-anchors the master clock
    Video,
    /// Caller drives the clock through `PlaybackGate::set_master_time`
    External,
}

impl std::str::FromStr for ClockSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "audio" => Ok(ClockSource::Audio),
            "video" => Ok(ClockSource::Video),
            "external" => Ok(ClockSource::External),
            other => Err(Error::InvalidConfig(format!(
                "clock_source must be one of audio, video, external, got {other}"
            ))),
        }
    }
}

/// Drift correction policy selection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum CorrectionConfig {
    /// Nudge playback speed by a fixed step while out of sync
    FixedStep {
        /// Speed delta applied while |offset| exceeds the sync threshold
        step: f64,
    },
    /// Speed delta proportional to the measured offset plus regression drift
    Proportional {
        /// Fraction of the offset (in seconds) corrected per unit of speed
        gain: f64,
        /// Largest speed delta the policy may request
        max_step: f64,
    },
}

impl Default for CorrectionConfig {
    fn default() -> Self {
        CorrectionConfig::FixedStep { step: 0.02 }
    }
}

impl CorrectionConfig {
    fn validate(&self) -> Result<()> {
        let (name, value) = match *self {
            CorrectionConfig::FixedStep { step } => ("step", step),
            CorrectionConfig::Proportional { gain, max_step } => {
                if !gain.is_finite() || gain <= 0.0 {
                    return Err(Error::InvalidConfig(format!(
                        "correction gain must be > 0, got {gain}"
                    )));
                }
                ("max_step", max_step)
            }
        };
        if !value.is_finite() || value <= 0.0 || value > 0.1 {
            return Err(Error::InvalidConfig(format!(
                "correction {name} must be in range (0, 0.1], got {value}"
            )));
        }
        Ok(())
    }
}

/// Main configuration for a [`Synchronizer`](crate::Synchronizer) session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    /// In-sync window around the presentation time, in microseconds
    #[serde(default = "default_max_desync_us")]
    pub max_desync_us: i64,

    /// Lateness beyond which `should_drop_frame` reports a video frame
    #[serde(default = "default_hard_drop_threshold_us")]
    pub hard_drop_threshold_us: i64,

    /// Earliness beyond which `should_repeat_frame` asks the renderer to
    /// repeat the previous frame
    #[serde(default = "default_repeat_threshold_us")]
    pub repeat_threshold_us: i64,

    /// Jitter compensation subtracted from the presentation time
    #[serde(default = "default_jitter_buffer_ms")]
    pub jitter_buffer_ms: u32,

    /// Manual offset added to the presentation time (negative holds frames longer)
    #[serde(default)]
    pub target_offset_us: i64,

    /// Run drift estimation and playback-speed correction
    #[serde(default = "default_true")]
    pub enable_drift_correction: bool,

    /// Video queue capacity (~0.5s at 60fps)
    #[serde(default = "default_video_queue_capacity")]
    pub video_queue_capacity: usize,

    /// Audio queue capacity (~1s of 20ms frames)
    #[serde(default = "default_audio_queue_capacity")]
    pub audio_queue_capacity: usize,

    /// Samples kept by the video jitter estimator
    #[serde(default = "default_video_jitter_window")]
    pub video_jitter_window: usize,

    /// Samples kept by the audio jitter estimator
    #[serde(default = "default_audio_jitter_window")]
    pub audio_jitter_window: usize,

    /// Samples kept by each drift estimator
    #[serde(default = "default_drift_window")]
    pub drift_window: usize,

    /// Drift above which the estimator recommends correction (PPM)
    #[serde(default = "default_drift_threshold_ppm")]
    pub drift_threshold_ppm: f64,

    /// Stream that re-anchors the master clock on the receiver side
    #[serde(default)]
    pub clock_source: ClockSource,

    /// Drift correction policy
    #[serde(default)]
    pub correction: CorrectionConfig,

    /// Let network conditions move `jitter_buffer_ms`
    #[serde(default)]
    pub adaptive_buffering: bool,
}

fn default_max_desync_us() -> i64 {
    40_000
}

fn default_hard_drop_threshold_us() -> i64 {
    100_000
}

fn default_repeat_threshold_us() -> i64 {
    30_000
}

fn default_jitter_buffer_ms() -> u32 {
    50
}

fn default_true() -> bool {
    true
}

fn default_video_queue_capacity() -> usize {
    30
}

fn default_audio_queue_capacity() -> usize {
    50
}

fn default_video_jitter_window() -> usize {
    20
}

fn default_audio_jitter_window() -> usize {
    50
}

fn default_drift_window() -> usize {
    100
}

fn default_drift_threshold_ppm() -> f64 {
    100.0
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_desync_us: default_max_desync_us(),
            hard_drop_threshold_us: default_hard_drop_threshold_us(),
            repeat_threshold_us: default_repeat_threshold_us(),
            jitter_buffer_ms: default_jitter_buffer_ms(),
            target_offset_us: 0,
            enable_drift_correction: true,
            video_queue_capacity: default_video_queue_capacity(),
            audio_queue_capacity: default_audio_queue_capacity(),
            video_jitter_window: default_video_jitter_window(),
            audio_jitter_window: default_audio_jitter_window(),
            drift_window: default_drift_window(),
            drift_threshold_ppm: default_drift_threshold_ppm(),
            clock_source: ClockSource::default(),
            correction: CorrectionConfig::default(),
            adaptive_buffering: false,
        }
    }
}

impl SyncConfig {
    /// Validate configuration parameters
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - any threshold is not positive
    /// - `hard_drop_threshold_us >= max_desync_us >= repeat_threshold_us` does not hold
    /// - `hard_drop_threshold_us` exceeds [`MAX_THRESHOLD_US`]
    /// - a queue capacity is zero
    /// - a jitter window holds fewer than 2 samples
    /// - `drift_window` holds fewer than 10 samples
    /// - `jitter_buffer_ms` exceeds 1000
    /// - the correction policy step is outside (0, 0.1]
    pub fn validate(&self) -> Result<()> {
        if self.repeat_threshold_us <= 0 {
            return Err(Error::InvalidConfig(format!(
                "repeat_threshold_us must be > 0, got {}",
                self.repeat_threshold_us
            )));
        }
        if self.max_desync_us < self.repeat_threshold_us {
            return Err(Error::InvalidConfig(format!(
                "max_desync_us ({}) must be >= repeat_threshold_us ({})",
                self.max_desync_us, self.repeat_threshold_us
            )));
        }
        if self.hard_drop_threshold_us < self.max_desync_us {
            return Err(Error::InvalidConfig(format!(
                "hard_drop_threshold_us ({}) must be >= max_desync_us ({})",
                self.hard_drop_threshold_us, self.max_desync_us
            )));
        }
        if self.hard_drop_threshold_us > MAX_THRESHOLD_US {
            return Err(Error::InvalidConfig(format!(
                "hard_drop_threshold_us must be <= {}, got {}",
                MAX_THRESHOLD_US, self.hard_drop_threshold_us
            )));
        }
        if self.video_queue_capacity == 0 || self.audio_queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "queue capacities must be at least 1".to_string(),
            ));
        }
        if self.video_jitter_window < 2 || self.audio_jitter_window < 2 {
            return Err(Error::InvalidConfig(
                "jitter windows must hold at least 2 samples".to_string(),
            ));
        }
        if self.drift_window < crate::sync::MIN_DRIFT_SAMPLES {
            return Err(Error::InvalidConfig(format!(
                "drift_window must be >= {}, got {}",
                crate::sync::MIN_DRIFT_SAMPLES,
                self.drift_window
            )));
        }
        if self.jitter_buffer_ms > 1000 {
            return Err(Error::InvalidConfig(format!(
                "jitter_buffer_ms must be in range 0-1000, got {}",
                self.jitter_buffer_ms
            )));
        }
        if !self.drift_threshold_ppm.is_finite() || self.drift_threshold_ppm <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "drift_threshold_ppm must be > 0, got {}",
                self.drift_threshold_ppm
            )));
        }
        self.correction.validate()
    }

    /// Jitter compensation expressed in microseconds
    pub fn jitter_buffer_us(&self) -> i64 {
        i64::from(self.jitter_buffer_ms) * 1000
    }

    /// Create a configuration preset optimized for low latency
    ///
    /// Settings:
    /// - Jitter buffer: 20ms
    /// - Shallow queues (10 video / 25 audio)
    /// - Adaptive buffering enabled so the buffer grows only when needed
    ///
    /// # Example
    ///
    /// ```
    /// use streamsync_av::SyncConfig;
    ///
    /// let config = SyncConfig::low_latency_preset();
    /// assert_eq!(config.jitter_buffer_ms, 20);
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn low_latency_preset() -> Self {
        Self {
            jitter_buffer_ms: 20,
            video_queue_capacity: 10,
            audio_queue_capacity: 25,
            adaptive_buffering: true,
            ..Self::default()
        }
    }

    /// Create a configuration preset favoring smooth playback over latency
    ///
    /// Settings:
    /// - Jitter buffer: 120ms
    /// - Wider in-sync window (60ms) and hard-drop cutoff (150ms)
    /// - Proportional drift correction
    ///
    /// # Example
    ///
    /// ```
    /// use streamsync_av::{CorrectionConfig, SyncConfig};
    ///
    /// let config = SyncConfig::smooth_playback_preset();
    /// assert_eq!(config.jitter_buffer_ms, 120);
    /// assert!(matches!(config.correction, CorrectionConfig::Proportional { .. }));
    /// ```
    pub fn smooth_playback_preset() -> Self {
        Self {
            max_desync_us: 60_000,
            hard_drop_threshold_us: 150_000,
            repeat_threshold_us: 40_000,
            jitter_buffer_ms: 120,
            correction: CorrectionConfig::Proportional {
                gain: 0.5,
                max_step: 0.05,
            },
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: SyncConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables, falling back to defaults
    ///
    /// Recognized variables (all prefixed with `STREAMSYNC_`): `MAX_DESYNC_US`,
    /// `HARD_DROP_US`, `REPEAT_US`, `JITTER_BUFFER_MS`, `TARGET_OFFSET_US`,
    /// `DRIFT_CORRECTION`, `CLOCK_SOURCE`, `ADAPTIVE_BUFFERING`.
    /// Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration from file if it exists, otherwise from environment
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        if let Some(p) = path {
            if p.as_ref().exists() {
                return Self::from_file(p);
            }
        }
        let config = Self::from_env();
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));

        if let Some(v) = var("MAX_DESYNC_US").and_then(|v| v.parse().ok()) {
            self.max_desync_us = v;
        }
        if let Some(v) = var("HARD_DROP_US").and_then(|v| v.parse().ok()) {
            self.hard_drop_threshold_us = v;
        }
        if let Some(v) = var("REPEAT_US").and_then(|v| v.parse().ok()) {
            self.repeat_threshold_us = v;
        }
        if let Some(v) = var("JITTER_BUFFER_MS").and_then(|v| v.parse().ok()) {
            self.jitter_buffer_ms = v;
        }
        if let Some(v) = var("TARGET_OFFSET_US").and_then(|v| v.parse().ok()) {
            self.target_offset_us = v;
        }
        if let Some(v) = var("DRIFT_CORRECTION").and_then(|v| v.parse().ok()) {
            self.enable_drift_correction = v;
        }
        if let Some(v) = var("CLOCK_SOURCE").and_then(|v| v.parse().ok()) {
            self.clock_source = v;
        }
        if let Some(v) = var("ADAPTIVE_BUFFERING").and_then(|v| v.parse().ok()) {
            self.adaptive_buffering = v;
        }
    }
}
