//! Receiver-side per-frame admission
//!
//! The decode/render loop reports decoded PTS values and asks, frame by
//! frame, whether to show a video frame now. Decisions are made against the
//! master clock, which the configured [`ClockSource`] keeps anchored:
//!
//! ```text
//! offset = pts - master_time
//!
//! |offset| <  max_desync_us  -> Display
//!  offset  < -max_desync_us  -> Drop
//! otherwise                  -> Delay
//! ```
//!
//! This is the same window the pairing engine applies to video heads.
//! [`PlaybackGate::should_drop_frame`] is a cheaper cutoff at
//! `hard_drop_threshold_us`, and [`PlaybackGate::should_repeat_frame`] flags
//! frames early enough (`repeat_threshold_us`) that the renderer should keep
//! showing the previous one.

use super::synchronizer::SyncCore;
use crate::config::{ClockSource, SyncConfig};
use crate::error::Result;
use crate::frame::{MediaKind, Pts};
use crate::stats::SyncStats;
use crate::time::{MonotonicTimeSource, TimeSource};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, trace};

/// What the renderer should do with a decoded video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDecision {
    /// Present now
    Display,
    /// Too late to be useful; discard
    Drop,
    /// Early; hold it and keep showing the previous frame
    Delay,
}

impl SyncDecision {
    fn for_offset(offset_us: i64, config: &SyncConfig) -> Self {
        let window = config.max_desync_us;
        if offset_us.saturating_abs() < window {
            SyncDecision::Display
        } else if offset_us < -window {
            SyncDecision::Drop
        } else {
            SyncDecision::Delay
        }
    }
}

/// Receiver-side synchronization API
///
/// Either standalone (via [`PlaybackGate::new`]) or sharing a
/// [`Synchronizer`](crate::Synchronizer)'s state through
/// [`Synchronizer::playback_gate`](crate::Synchronizer::playback_gate).
#[derive(Clone)]
pub struct PlaybackGate {
    core: Arc<SyncCore>,
}

impl fmt::Debug for PlaybackGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackGate")
            .field("core", &self.core)
            .finish()
    }
}

impl PlaybackGate {
    pub fn new(config: SyncConfig) -> Result<Self> {
        Self::with_time_source(config, Arc::new(MonotonicTimeSource::new()))
    }

    pub fn with_time_source(config: SyncConfig, time: Arc<dyn TimeSource>) -> Result<Self> {
        Ok(Self::from_core(SyncCore::new(config, time)?))
    }

    pub(crate) fn from_core(core: Arc<SyncCore>) -> Self {
        Self { core }
    }

    /// Choose which stream re-anchors the master clock
    pub fn set_clock_source(&self, source: ClockSource) {
        self.core.state.lock().config.clock_source = source;
        info!(?source, "Clock source changed");
    }

    pub fn clock_source(&self) -> ClockSource {
        self.core.state.lock().config.clock_source
    }

    /// Report the PTS of a decoded video frame
    pub fn update_video_time(&self, pts: Pts) {
        self.update_time(MediaKind::Video, pts);
    }

    /// Report the PTS of decoded audio handed to the output device
    pub fn update_audio_time(&self, pts: Pts) {
        self.update_time(MediaKind::Audio, pts);
    }

    fn update_time(&self, kind: MediaKind, pts: Pts) {
        let now = self.core.time.now_us();
        let mut state = self.core.state.lock();
        state.observe(kind, pts, now);

        let drives_clock = matches!(
            (state.config.clock_source, kind),
            (ClockSource::Video, MediaKind::Video) | (ClockSource::Audio, MediaKind::Audio)
        );
        if drives_clock {
            self.core.clock.set_time(pts);
        }

        if let (Some(video), Some(audio)) =
            (state.stats.last_video_pts_us, state.stats.last_audio_pts_us)
        {
            state.record_av_offset(video.saturating_sub(audio));
        }
        state.refresh_stats();
    }

    /// Decide what to do with a decoded video frame
    ///
    /// Drops and delays are counted in the stats.
    pub fn check_video_sync(&self, pts: Pts) -> SyncDecision {
        let offset = self.offset_from_master(pts);
        let mut state = self.core.state.lock();
        let decision = SyncDecision::for_offset(offset, &state.config);
        match decision {
            SyncDecision::Drop => {
                state.stats.record_late(MediaKind::Video);
                debug!(pts_us = pts, offset_us = offset, "Dropping late video frame");
            }
            SyncDecision::Delay => {
                state.stats.frames_delayed += 1;
                trace!(pts_us = pts, offset_us = offset, "Delaying early video frame");
            }
            SyncDecision::Display => {}
        }
        decision
    }

    /// How long to wait before presenting `pts`
    ///
    /// Zero when the frame is already due; otherwise the distance to the
    /// master clock plus the video jitter allowance.
    pub fn calculate_video_delay(&self, pts: Pts) -> Duration {
        let diff = self.offset_from_master(pts);
        if diff <= 0 {
            return Duration::ZERO;
        }
        let allowance = self
            .core
            .state
            .lock()
            .video
            .jitter
            .optimal_buffer_delay_us();
        Duration::from_micros(diff.saturating_add(allowance) as u64)
    }

    /// Fast path: is `pts` past the hard-drop cutoff?
    pub fn should_drop_frame(&self, pts: Pts) -> bool {
        let hard_drop = self.core.state.lock().config.hard_drop_threshold_us;
        self.offset_from_master(pts) < -hard_drop
    }

    /// Is `pts` early enough that the previous frame should be repeated?
    ///
    /// Uncounted hint for renderers that present on a fixed refresh.
    pub fn should_repeat_frame(&self, pts: Pts) -> bool {
        let repeat = self.core.state.lock().config.repeat_threshold_us;
        self.offset_from_master(pts) > repeat
    }

    fn offset_from_master(&self, pts: Pts) -> i64 {
        pts.saturating_sub(self.core.clock.time_us())
    }

    /// Run one correction cycle against the measured A/V offset
    ///
    /// Returns the playback speed applied to the master clock.
    pub fn correct_drift(&self) -> f64 {
        let mut state = self.core.state.lock();
        self.core.apply_correction(&mut state)
    }

    /// Anchor the master clock directly (external clock source, seeks)
    pub fn set_master_time(&self, pts: Pts) {
        self.core.clock.set_time(pts);
    }

    pub fn master_time_us(&self) -> Pts {
        self.core.clock.time_us()
    }

    /// Last measured video-minus-audio offset (µs)
    pub fn av_offset_us(&self) -> i64 {
        self.core.state.lock().stats.audio_video_offset_us
    }

    pub fn stats(&self) -> SyncStats {
        self.core.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorrectionConfig;
    use crate::time::ManualTimeSource;

    fn manual_gate(config: SyncConfig) -> (Arc<ManualTimeSource>, PlaybackGate) {
        let time = Arc::new(ManualTimeSource::new(2_000_000));
        let gate = PlaybackGate::with_time_source(config, time.clone()).unwrap();
        (time, gate)
    }

    #[test]
    fn test_audio_source_anchors_clock() {
        let (time, gate) = manual_gate(SyncConfig::default());
        assert_eq!(gate.clock_source(), ClockSource::Audio);

        gate.update_audio_time(1_000_000);
        assert_eq!(gate.master_time_us(), 1_000_000);
        time.advance(10_000);
        assert_eq!(gate.master_time_us(), 1_010_000);

        // Video does not move an audio-driven clock
        gate.update_video_time(5_000_000);
        assert_eq!(gate.master_time_us(), 1_010_000);
    }

    #[test]
    fn test_video_source_anchors_clock() {
        let (_time, gate) = manual_gate(SyncConfig::default());
        gate.set_clock_source(ClockSource::Video);
        gate.update_audio_time(1_000_000);
        gate.update_video_time(3_000_000);
        assert_eq!(gate.master_time_us(), 3_000_000);
    }

    #[test]
    fn test_external_source_ignores_updates() {
        let (_time, gate) = manual_gate(SyncConfig::default());
        gate.set_clock_source(ClockSource::External);
        gate.set_master_time(42_000);
        gate.update_audio_time(1_000_000);
        gate.update_video_time(1_000_000);
        assert_eq!(gate.master_time_us(), 42_000);
    }

    #[test]
    fn test_check_video_sync_decisions() {
        let (_time, gate) = manual_gate(SyncConfig::default());
        gate.update_audio_time(1_000_000);

        assert_eq!(gate.check_video_sync(1_000_000), SyncDecision::Display);
        assert_eq!(gate.check_video_sync(1_035_000), SyncDecision::Display);
        assert_eq!(gate.check_video_sync(960_001), SyncDecision::Display);
        assert_eq!(gate.check_video_sync(1_040_000), SyncDecision::Delay);
        assert_eq!(gate.check_video_sync(1_050_000), SyncDecision::Delay);
        // Outside the sync window but inside the hard-drop cutoff
        assert_eq!(gate.check_video_sync(959_999), SyncDecision::Drop);
        assert_eq!(gate.check_video_sync(920_000), SyncDecision::Drop);
        assert_eq!(gate.check_video_sync(850_000), SyncDecision::Drop);

        let stats = gate.stats();
        assert_eq!(stats.frames_delayed, 2);
        assert_eq!(stats.video_late_drops, 3);
        assert_eq!(stats.frames_dropped, 3);
    }

    #[test]
    fn test_decisions_follow_max_desync() {
        let config = SyncConfig {
            max_desync_us: 60_000,
            ..SyncConfig::default()
        };
        let (_time, gate) = manual_gate(config);
        gate.update_audio_time(1_000_000);

        assert_eq!(gate.check_video_sync(945_000), SyncDecision::Display);
        assert_eq!(gate.check_video_sync(1_055_000), SyncDecision::Display);
        assert_eq!(gate.check_video_sync(930_000), SyncDecision::Drop);
        assert_eq!(gate.check_video_sync(1_070_000), SyncDecision::Delay);
    }

    #[test]
    fn test_should_repeat_frame() {
        let (_time, gate) = manual_gate(SyncConfig::default());
        gate.update_audio_time(1_000_000);
        assert!(!gate.should_repeat_frame(1_030_000));
        assert!(gate.should_repeat_frame(1_030_001));
        assert!(!gate.should_repeat_frame(900_000));
        assert_eq!(gate.stats().frames_delayed, 0);
    }

    #[test]
    fn test_extreme_pts_does_not_overflow() {
        let (_time, gate) = manual_gate(SyncConfig::default());
        gate.update_audio_time(1_000_000);
        assert_eq!(gate.check_video_sync(i64::MIN), SyncDecision::Drop);
        assert_eq!(gate.check_video_sync(i64::MAX), SyncDecision::Delay);
        assert!(gate.should_drop_frame(i64::MIN));
        assert!(gate.should_repeat_frame(i64::MAX));
        assert!(gate.calculate_video_delay(i64::MAX) > Duration::ZERO);
    }

    #[test]
    fn test_calculate_video_delay() {
        let (_time, gate) = manual_gate(SyncConfig::default());
        gate.update_audio_time(1_000_000);

        assert_eq!(gate.calculate_video_delay(1_050_000), Duration::from_millis(50));
        assert_eq!(gate.calculate_video_delay(1_000_000), Duration::ZERO);
        assert_eq!(gate.calculate_video_delay(900_000), Duration::ZERO);
    }

    #[test]
    fn test_delay_includes_jitter_allowance() {
        let (time, gate) = manual_gate(SyncConfig::default());
        gate.set_clock_source(ClockSource::External);
        gate.set_master_time(0);

        // Frames 16ms apart arriving alternately 6ms and 26ms apart
        let mut pts = 0;
        for i in 0..40 {
            gate.update_video_time(pts);
            pts += 16_000;
            time.advance(if i % 2 == 0 { 6_000 } else { 26_000 });
        }
        let jitter = gate.stats().video_jitter_us;
        assert!(jitter > 0);

        let now = gate.master_time_us();
        let delay = gate.calculate_video_delay(now + 10_000);
        assert_eq!(delay, Duration::from_micros((10_000 + 2 * jitter) as u64));
    }

    #[test]
    fn test_should_drop_frame() {
        let (_time, gate) = manual_gate(SyncConfig::default());
        gate.update_audio_time(1_000_000);
        assert!(!gate.should_drop_frame(1_000_000));
        assert!(!gate.should_drop_frame(900_000));
        assert!(gate.should_drop_frame(899_999));

        // Fast path does not count anything
        assert_eq!(gate.stats().frames_dropped, 0);
    }

    #[test]
    fn test_av_offset_and_lip_sync() {
        let (_time, gate) = manual_gate(SyncConfig::default());
        gate.update_audio_time(100_000);
        gate.update_video_time(250_000);
        assert_eq!(gate.av_offset_us(), 150_000);

        let stats = gate.stats();
        assert_eq!(stats.audio_video_offset_us, 150_000);
        assert!(!stats.lip_sync_acceptable);
    }

    #[test]
    fn test_correct_drift_fixed_step() {
        let (_time, gate) = manual_gate(SyncConfig::default());
        gate.update_audio_time(100_000);
        gate.update_video_time(160_000);
        assert!((gate.correct_drift() - 0.98).abs() < 1e-12);

        gate.update_video_time(50_000);
        assert!((gate.correct_drift() - 1.02).abs() < 1e-12);

        gate.update_audio_time(60_000);
        assert_eq!(gate.correct_drift(), 1.0);
        assert_eq!(gate.stats().playback_speed, 1.0);
    }

    #[test]
    fn test_correct_drift_proportional() {
        let config = SyncConfig {
            correction: CorrectionConfig::Proportional {
                gain: 0.5,
                max_step: 0.05,
            },
            ..SyncConfig::default()
        };
        let (_time, gate) = manual_gate(config);
        gate.update_audio_time(0);
        gate.update_video_time(60_000);
        assert!((gate.correct_drift() - 0.97).abs() < 1e-9);
    }
}
