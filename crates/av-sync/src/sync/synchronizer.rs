//! Sender-side pairing engine
//!
//! Producers push encoded frames into one bounded FIFO per stream; a
//! consumer pulls with [`Synchronizer::get_next`], which admits the head of
//! each queue against a presentation window:
//!
//! ```text
//! presentation_time = max(last_video_pts, last_audio_pts)
//!                     - jitter_buffer_ms * 1000
//!                     + target_offset_us
//!
//! video: |pts - presentation_time| <  max_desync_us  or keyframe -> emit
//!         pts - presentation_time  < -max_desync_us              -> drop (late)
//!         otherwise                                               -> keep (early)
//! audio: same, with a 2 * max_desync_us window and no keyframe override
//! ```
//!
//! The queues, estimators, stats and clock live in one shared core, also
//! used by the receiver-side [`PlaybackGate`].

use super::adaptive_buffer::{AdaptiveBufferManager, MAX_BUFFER_MS, MIN_BUFFER_MS};
use super::clock_drift::{ClockDriftEstimate, DriftEstimator};
use super::correction::{policy_from_config, CorrectionInput, CorrectionPolicy};
use super::frame_buffer::{Admission, BufferedFrame, FrameBuffer};
use super::jitter::JitterEstimator;
use super::lip_sync::LipSyncMonitor;
use super::master_clock::MasterClock;
use super::playback_gate::PlaybackGate;
use crate::config::SyncConfig;
use crate::error::Result;
use crate::frame::{EncodedAudioFrame, EncodedVideoFrame, MediaKind, Pts, SyncedFrames};
use crate::stats::SyncStats;
use crate::time::{MonotonicTimeSource, TimeSource};
use parking_lot::{Condvar, Mutex};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, trace};

/// Push-style consumer of emitted frames
pub type OutputCallback = Arc<dyn Fn(&SyncedFrames) + Send + Sync>;

/// Jitter and drift estimators for one stream
#[derive(Debug)]
pub(crate) struct StreamTiming {
    pub(crate) jitter: JitterEstimator,
    pub(crate) drift: DriftEstimator,
}

impl StreamTiming {
    fn new(kind: MediaKind, jitter_window: usize, config: &SyncConfig) -> Self {
        Self {
            jitter: JitterEstimator::new(jitter_window),
            drift: DriftEstimator::new(kind, config.drift_window, config.drift_threshold_ppm),
        }
    }

    fn observe(&mut self, pts: Pts, now_us: i64, base_time_us: i64) {
        let restarts = self.jitter.discontinuities();
        self.jitter.add_sample(pts, now_us);
        if self.jitter.discontinuities() != restarts {
            // A seek or stall invalidates the regression too
            self.drift.reset();
        }
        self.drift.add_observation(now_us.saturating_sub(base_time_us), pts);
    }

    fn reset(&mut self) {
        self.jitter.reset();
        self.drift.reset();
    }
}

/// Mutable session state, guarded by [`SyncCore::state`]
#[derive(Debug)]
pub(crate) struct SyncState {
    pub(crate) config: SyncConfig,
    video_queue: FrameBuffer<EncodedVideoFrame>,
    audio_queue: FrameBuffer<EncodedAudioFrame>,
    pub(crate) video: StreamTiming,
    pub(crate) audio: StreamTiming,
    adaptive: AdaptiveBufferManager,
    lip_sync: LipSyncMonitor,
    base_time_us: i64,
    pub(crate) stats: SyncStats,
}

impl SyncState {
    fn new(config: SyncConfig, now_us: i64) -> Self {
        let stats = SyncStats {
            jitter_buffer_ms: config.jitter_buffer_ms,
            ..SyncStats::default()
        };
        Self {
            video_queue: FrameBuffer::new(config.video_queue_capacity),
            audio_queue: FrameBuffer::new(config.audio_queue_capacity),
            video: StreamTiming::new(MediaKind::Video, config.video_jitter_window, &config),
            audio: StreamTiming::new(MediaKind::Audio, config.audio_jitter_window, &config),
            adaptive: AdaptiveBufferManager::with_bounds(
                MIN_BUFFER_MS,
                MAX_BUFFER_MS,
                config.jitter_buffer_ms,
            ),
            lip_sync: LipSyncMonitor::new(),
            base_time_us: now_us,
            stats,
            config,
        }
    }

    /// Feed one stream's timing estimators and remember its latest PTS
    pub(crate) fn observe(&mut self, kind: MediaKind, pts: Pts, now_us: i64) {
        match kind {
            MediaKind::Video => {
                self.video.observe(pts, now_us, self.base_time_us);
                self.stats.last_video_pts_us = Some(pts);
            }
            MediaKind::Audio => {
                self.audio.observe(pts, now_us, self.base_time_us);
                self.stats.last_audio_pts_us = Some(pts);
            }
        }
    }

    /// Record a measured video-minus-audio offset
    pub(crate) fn record_av_offset(&mut self, offset_us: i64) {
        self.stats.audio_video_offset_us = offset_us;
        self.lip_sync.add_measurement(offset_us);
    }

    pub(crate) fn can_estimate_drift(&self) -> bool {
        self.video.drift.can_estimate() && self.audio.drift.can_estimate()
    }

    /// Current per-stream drift estimates, mirrored into the stats
    pub(crate) fn drift_estimates(
        &mut self,
    ) -> (Option<ClockDriftEstimate>, Option<ClockDriftEstimate>) {
        let video = self.video.drift.estimate_drift();
        let audio = self.audio.drift.estimate_drift();
        if let Some(estimate) = video {
            self.stats.video_drift_ppm = estimate.drift_ppm;
        }
        if let Some(estimate) = audio {
            self.stats.audio_drift_ppm = estimate.drift_ppm;
        }
        (video, audio)
    }

    /// Bring derived stats fields in line with the current state
    pub(crate) fn refresh_stats(&mut self) {
        let stats = &mut self.stats;
        stats.video_queue_len = self.video_queue.len();
        stats.audio_queue_len = self.audio_queue.len();
        stats.video_jitter_us = self.video.jitter.jitter_us();
        stats.audio_jitter_us = self.audio.jitter.jitter_us();
        stats.jitter_us = stats.video_jitter_us.max(stats.audio_jitter_us);
        stats.jitter_buffer_ms = self.config.jitter_buffer_ms;
        stats.lip_sync_acceptable = self.lip_sync.is_acceptable();
        stats.average_lip_sync_error_us = self.lip_sync.average_drift_us();
    }

    fn queues_empty(&self) -> bool {
        self.video_queue.is_empty() && self.audio_queue.is_empty()
    }

    fn presentation_time(&self) -> Pts {
        let latest = self
            .stats
            .last_video_pts_us
            .into_iter()
            .chain(self.stats.last_audio_pts_us)
            .max()
            .unwrap_or(0);
        latest
            .saturating_sub(self.config.jitter_buffer_us())
            .saturating_add(self.config.target_offset_us)
    }

    /// One pairing round over the queue heads
    fn select_frames(&mut self) -> Option<SyncedFrames> {
        let presentation_time_us = self.presentation_time();
        let max_desync = self.config.max_desync_us;

        let video = admit_head(
            &mut self.video_queue,
            &mut self.stats,
            MediaKind::Video,
            presentation_time_us,
            max_desync,
        );
        let audio = admit_head(
            &mut self.audio_queue,
            &mut self.stats,
            MediaKind::Audio,
            presentation_time_us,
            max_desync.saturating_mul(2),
        );

        if video.is_none() && audio.is_none() {
            return None;
        }

        let frames = SyncedFrames {
            video,
            audio,
            presentation_time_us,
        };
        if let Some(offset) = frames.av_offset_us() {
            self.record_av_offset(offset);
        }
        self.stats.pairs_emitted += 1;

        trace!(
            presentation_time_us,
            video_pts_us = frames.video.as_ref().map(|f| f.pts_us),
            audio_pts_us = frames.audio.as_ref().map(|f| f.pts_us),
            "Emitting frames"
        );
        Some(frames)
    }

    fn clear(&mut self, now_us: i64) {
        self.video_queue.clear();
        self.audio_queue.clear();
        self.video.reset();
        self.audio.reset();
        self.lip_sync.reset();
        if self.config.adaptive_buffering {
            self.adaptive.reset();
            self.config.jitter_buffer_ms = self.adaptive.buffer_ms();
        }
        self.base_time_us = now_us;
        self.stats = SyncStats {
            jitter_buffer_ms: self.config.jitter_buffer_ms,
            ..SyncStats::default()
        };
    }
}

/// Admit the head of `queue`, discarding any stale frames in front of it
fn admit_head<T: BufferedFrame>(
    queue: &mut FrameBuffer<T>,
    stats: &mut SyncStats,
    kind: MediaKind,
    presentation_time_us: Pts,
    tolerance_us: i64,
) -> Option<T> {
    loop {
        match queue.admit_front(presentation_time_us, tolerance_us) {
            Admission::Emit(frame) => {
                if (frame.pts_us() - presentation_time_us).abs() >= tolerance_us {
                    debug!(
                        %kind,
                        pts_us = frame.pts_us(),
                        presentation_time_us,
                        "Keyframe emitted outside sync window"
                    );
                }
                return Some(frame);
            }
            Admission::Late(frame) => {
                stats.record_late(kind);
                debug!(
                    %kind,
                    pts_us = frame.pts_us(),
                    presentation_time_us,
                    "Dropped late frame"
                );
            }
            Admission::Early | Admission::Empty => return None,
        }
    }
}

/// State shared by a [`Synchronizer`] and its [`PlaybackGate`]s
pub(crate) struct SyncCore {
    pub(crate) state: Mutex<SyncState>,
    ready: Condvar,
    running: AtomicBool,
    pub(crate) clock: MasterClock,
    pub(crate) time: Arc<dyn TimeSource>,
    policy: Box<dyn CorrectionPolicy>,
    callback: Mutex<Option<OutputCallback>>,
}

impl SyncCore {
    pub(crate) fn new(config: SyncConfig, time: Arc<dyn TimeSource>) -> Result<Arc<Self>> {
        config.validate()?;

        let now = time.now_us();
        let policy = policy_from_config(&config.correction);
        Ok(Arc::new(Self {
            state: Mutex::new(SyncState::new(config, now)),
            ready: Condvar::new(),
            running: AtomicBool::new(false),
            clock: MasterClock::new(time.clone()),
            time,
            policy,
            callback: Mutex::new(None),
        }))
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one correction cycle with the state lock held
    pub(crate) fn apply_correction(&self, state: &mut SyncState) -> f64 {
        let (video_drift, audio_drift) = if state.config.enable_drift_correction {
            state.drift_estimates()
        } else {
            (None, None)
        };
        let input = CorrectionInput {
            av_offset_us: state.stats.audio_video_offset_us,
            sync_threshold_us: state.config.max_desync_us,
            video_drift,
            audio_drift,
        };

        let previous = self.clock.speed();
        let speed = self.clock.adjust_speed(self.policy.target_speed(&input));
        state.stats.playback_speed = speed;
        if (speed - previous).abs() > f64::EPSILON {
            debug!(
                policy = self.policy.name(),
                av_offset_us = input.av_offset_us,
                from = previous,
                to = speed,
                "Adjusted playback speed"
            );
        }
        speed
    }

    pub(crate) fn snapshot(&self) -> SyncStats {
        let state = self.state.lock();
        let mut stats = state.stats.clone();
        stats.playback_speed = self.clock.speed();
        stats
    }
}

/// Audio/video pairing engine for one streaming session
///
/// Cheap to clone; clones share the same queues and clock so producers and
/// the consumer can live on different threads.
#[derive(Clone)]
pub struct Synchronizer {
    core: Arc<SyncCore>,
}

impl fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Synchronizer")
            .field("running", &self.core.is_running())
            .field("policy", &self.core.policy)
            .finish_non_exhaustive()
    }
}

impl Synchronizer {
    /// Create a stopped synchronizer on the monotonic system clock
    pub fn new(config: SyncConfig) -> Result<Self> {
        Self::with_time_source(config, Arc::new(MonotonicTimeSource::new()))
    }

    /// Create a stopped synchronizer on a caller-provided clock
    pub fn with_time_source(config: SyncConfig, time: Arc<dyn TimeSource>) -> Result<Self> {
        Ok(Self {
            core: SyncCore::new(config, time)?,
        })
    }

    /// Start the session: anchors drift measurements and resets the clock
    pub fn start(&self) {
        if self.core.running.swap(true, Ordering::AcqRel) {
            return;
        }
        let now = self.core.time.now_us();
        self.core.state.lock().base_time_us = now;
        self.core.clock.reset();
        info!("Synchronizer started");
    }

    /// Stop the session and wake any blocked [`get_next`](Self::get_next)
    pub fn stop(&self) {
        if !self.core.running.swap(false, Ordering::AcqRel) {
            return;
        }
        {
            // Taking the lock orders the flag change against waiters
            let _state = self.core.state.lock();
            self.core.ready.notify_all();
        }
        self.core.clock.reset();
        info!("Synchronizer stopped");
    }

    pub fn is_running(&self) -> bool {
        self.core.is_running()
    }

    /// Clear queues, estimators, stats and the clock anchor
    ///
    /// The running state is left unchanged.
    pub fn reset(&self) {
        let now = self.core.time.now_us();
        self.core.state.lock().clear(now);
        self.core.clock.reset();
        info!("Synchronizer reset");
    }

    /// Queue an encoded video frame; never blocks
    ///
    /// When the queue is full the oldest frame is evicted and counted.
    pub fn push_video(&self, frame: EncodedVideoFrame) {
        let now = self.core.time.now_us();
        let mut state = self.core.state.lock();
        state.observe(MediaKind::Video, frame.pts_us, now);
        if let Some(evicted) = state.video_queue.push(frame) {
            state.stats.record_overflow(MediaKind::Video);
            debug!(pts_us = evicted.pts_us, "Video queue full, dropped oldest frame");
        }
        state.refresh_stats();
        drop(state);
        self.core.ready.notify_one();
    }

    /// Queue an encoded audio frame; never blocks
    pub fn push_audio(&self, frame: EncodedAudioFrame) {
        let now = self.core.time.now_us();
        let mut state = self.core.state.lock();
        state.observe(MediaKind::Audio, frame.pts_us, now);
        if let Some(evicted) = state.audio_queue.push(frame) {
            state.stats.record_overflow(MediaKind::Audio);
            debug!(pts_us = evicted.pts_us, "Audio queue full, dropped oldest frame");
        }
        state.refresh_stats();
        drop(state);
        self.core.ready.notify_one();
    }

    /// Pull the next set of frames to present
    ///
    /// Blocks until a queue holds a frame, `timeout` elapses or the
    /// synchronizer stops. Returns `None` on timeout, when stopped, or when
    /// every buffered frame is still early. The output callback, if any, is
    /// invoked with the result after the internal lock is released.
    pub fn get_next(&self, timeout: Duration) -> Option<SyncedFrames> {
        let core = &self.core;
        let deadline = Instant::now().checked_add(timeout);

        let mut state = core.state.lock();
        loop {
            if !core.is_running() {
                return None;
            }
            if !state.queues_empty() {
                break;
            }
            let timed_out = match deadline {
                Some(deadline) => core.ready.wait_until(&mut state, deadline).timed_out(),
                None => {
                    core.ready.wait(&mut state);
                    false
                }
            };
            if timed_out && state.queues_empty() {
                return None;
            }
        }

        let output = state.select_frames();
        if state.config.enable_drift_correction && state.can_estimate_drift() {
            core.apply_correction(&mut state);
        }
        state.refresh_stats();
        drop(state);

        let frames = output?;
        let callback = core.callback.lock().clone();
        if let Some(callback) = callback {
            callback(&frames);
        }
        Some(frames)
    }

    /// Snapshot of the current counters and estimates
    pub fn get_stats(&self) -> SyncStats {
        self.core.snapshot()
    }

    /// Register a callback invoked with every emitted [`SyncedFrames`]
    ///
    /// The callback runs on the thread calling `get_next`, outside the
    /// internal lock, so it may call back into the synchronizer.
    pub fn set_output_callback<F>(&self, callback: F)
    where
        F: Fn(&SyncedFrames) + Send + Sync + 'static,
    {
        *self.core.callback.lock() = Some(Arc::new(callback));
    }

    pub fn clear_output_callback(&self) {
        *self.core.callback.lock() = None;
    }

    /// Shift the presentation window by `offset_us` (negative holds frames longer)
    pub fn adjust_offset(&self, offset_us: i64) {
        let mut state = self.core.state.lock();
        let previous = state.config.target_offset_us;
        state.config.target_offset_us = offset_us;
        info!(from = previous, to = offset_us, "Adjusted A/V target offset");
    }

    /// Feed network conditions to the adaptive jitter buffer
    ///
    /// Returns the jitter buffer (ms) now applied. Without
    /// `adaptive_buffering` this is a no-op returning the configured value.
    pub fn update_network_conditions(&self, packet_loss_percent: f64) -> u32 {
        let mut state = self.core.state.lock();
        if !state.config.adaptive_buffering {
            return state.config.jitter_buffer_ms;
        }
        let jitter_us = state.video.jitter.jitter_us().max(state.audio.jitter.jitter_us());
        let buffer_ms = state.adaptive.update(jitter_us, packet_loss_percent);
        state.config.jitter_buffer_ms = buffer_ms;
        state.refresh_stats();
        buffer_ms
    }

    /// Receiver-side admission API sharing this synchronizer's state
    pub fn playback_gate(&self) -> PlaybackGate {
        PlaybackGate::from_core(self.core.clone())
    }

    /// Current master clock time (µs)
    pub fn master_time_us(&self) -> Pts {
        self.core.clock.time_us()
    }

    /// Copy of the active configuration, including runtime adjustments
    pub fn config(&self) -> SyncConfig {
        self.core.state.lock().config.clone()
    }
}

impl fmt::Debug for SyncCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncCore")
            .field("running", &self.is_running())
            .field("clock", &self.clock)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorrectionConfig;
    use crate::time::ManualTimeSource;

    const FRAME_US: i64 = 16_667;

    fn manual_sync(config: SyncConfig) -> (Arc<ManualTimeSource>, Synchronizer) {
        let time = Arc::new(ManualTimeSource::new(1_000_000));
        let sync = Synchronizer::with_time_source(config, time.clone()).unwrap();
        sync.start();
        (time, sync)
    }

    fn video(pts: Pts, key: bool) -> EncodedVideoFrame {
        EncodedVideoFrame::new(vec![0u8; 64], pts, pts, key)
    }

    fn audio(pts: Pts) -> EncodedAudioFrame {
        EncodedAudioFrame::new(vec![0u8; 16], pts)
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = SyncConfig {
            hard_drop_threshold_us: 10_000,
            ..SyncConfig::default()
        };
        assert!(Synchronizer::new(config).is_err());
    }

    #[test]
    fn test_get_next_when_stopped() {
        let sync = Synchronizer::new(SyncConfig::default()).unwrap();
        sync.push_video(video(0, true));
        assert!(!sync.is_running());
        assert!(sync.get_next(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn test_get_next_times_out_when_empty() {
        let (_time, sync) = manual_sync(SyncConfig::default());
        let started = Instant::now();
        assert!(sync.get_next(Duration::from_millis(20)).is_none());
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn test_video_overflow_drops_oldest() {
        let (time, sync) = manual_sync(SyncConfig::default());
        for i in 0..40 {
            sync.push_video(video(i * FRAME_US, false));
            time.advance(FRAME_US);
        }

        let stats = sync.get_stats();
        assert_eq!(stats.video_queue_len, 30);
        assert_eq!(stats.video_overflow_drops, 10);
        assert!(stats.frames_dropped >= 10);
        assert_eq!(stats.audio_queue_len, 0);
    }

    #[test]
    fn test_paired_emission() {
        let config = SyncConfig {
            jitter_buffer_ms: 0,
            ..SyncConfig::default()
        };
        let (_time, sync) = manual_sync(config);
        sync.push_audio(audio(100_000));
        sync.push_video(video(120_000, false));

        let frames = sync.get_next(Duration::from_millis(10)).unwrap();
        assert!(frames.is_paired());
        assert_eq!(frames.presentation_time_us, 120_000);
        assert_eq!(frames.av_offset_us(), Some(20_000));

        let stats = sync.get_stats();
        assert_eq!(stats.audio_video_offset_us, 20_000);
        assert_eq!(stats.pairs_emitted, 1);
        assert_eq!(stats.frames_dropped, 0);
    }

    #[test]
    fn test_keyframe_overrides_lateness() {
        let (_time, sync) = manual_sync(SyncConfig::default());
        sync.push_video(video(0, true));
        sync.push_audio(audio(10_000_000));

        let frames = sync.get_next(Duration::from_millis(10)).unwrap();
        assert_eq!(frames.video.map(|f| f.pts_us), Some(0));
        assert_eq!(sync.get_stats().frames_dropped, 0);
    }

    #[test]
    fn test_late_video_dropped_and_counted() {
        let config = SyncConfig {
            jitter_buffer_ms: 0,
            ..SyncConfig::default()
        };
        let (_time, sync) = manual_sync(config);
        sync.push_video(video(0, false));
        sync.push_video(video(200_000, false));
        sync.push_audio(audio(200_000));

        let frames = sync.get_next(Duration::from_millis(10)).unwrap();
        assert_eq!(frames.video.map(|f| f.pts_us), Some(200_000));
        let stats = sync.get_stats();
        assert_eq!(stats.video_late_drops, 1);
        assert_eq!(stats.frames_dropped, 1);
        assert_eq!(stats.overflow_drops(), 0);
    }

    #[test]
    fn test_early_frames_stay_buffered() {
        let config = SyncConfig {
            jitter_buffer_ms: 0,
            ..SyncConfig::default()
        };
        let (_time, sync) = manual_sync(config);
        sync.adjust_offset(-500_000);
        sync.push_video(video(0, false));

        assert!(sync.get_next(Duration::from_millis(5)).is_none());
        let stats = sync.get_stats();
        assert_eq!(stats.video_queue_len, 1);
        assert_eq!(stats.frames_dropped, 0);

        sync.adjust_offset(0);
        assert!(sync.get_next(Duration::from_millis(5)).is_some());
    }

    #[test]
    fn test_extreme_offsets_saturate() {
        let (_time, sync) = manual_sync(SyncConfig::default());
        sync.push_video(video(0, false));

        // Presentation time pinned at i64::MIN: the frame is far early
        sync.adjust_offset(i64::MIN);
        assert!(sync.get_next(Duration::from_millis(5)).is_none());
        assert_eq!(sync.get_stats().video_queue_len, 1);

        // Pinned near i64::MAX: the frame is far late
        sync.adjust_offset(i64::MAX);
        assert!(sync.get_next(Duration::from_millis(5)).is_none());
        assert_eq!(sync.get_stats().video_late_drops, 1);
    }

    #[test]
    fn test_stats_are_stable_between_calls() {
        let (time, sync) = manual_sync(SyncConfig::default());
        for i in 0..5 {
            sync.push_video(video(i * FRAME_US, false));
            sync.push_audio(audio(i * 20_000));
            time.advance(FRAME_US);
        }
        sync.get_next(Duration::from_millis(5));

        time.advance(123_456);
        assert_eq!(sync.get_stats(), sync.get_stats());
    }

    #[test]
    fn test_reset_clears_everything() {
        let (time, sync) = manual_sync(SyncConfig::default());
        for i in 0..40 {
            sync.push_video(video(i * FRAME_US, false));
            time.advance(FRAME_US);
        }
        sync.reset();

        let stats = sync.get_stats();
        assert_eq!(
            stats,
            SyncStats {
                jitter_buffer_ms: 50,
                ..SyncStats::default()
            }
        );
        assert!(sync.is_running());
        assert!(sync.get_next(Duration::from_millis(5)).is_none());
    }

    #[test]
    fn test_drift_correction_runs_with_enough_samples() {
        let config = SyncConfig {
            jitter_buffer_ms: 0,
            correction: CorrectionConfig::FixedStep { step: 0.02 },
            ..SyncConfig::default()
        };
        let (time, sync) = manual_sync(config);

        // Video runs 60ms ahead of audio on a steady cadence
        for i in 0..12 {
            let pts = i * 20_000;
            sync.push_audio(audio(pts));
            sync.push_video(video(pts + 60_000, false));
            time.advance(20_000);
            sync.get_next(Duration::from_millis(5));
        }

        let stats = sync.get_stats();
        assert_eq!(stats.audio_video_offset_us, 60_000);
        assert!((stats.playback_speed - 0.98).abs() < 1e-9);
        assert!(stats.video_drift_ppm.abs() < 1.0);
    }

    #[test]
    fn test_drift_correction_disabled() {
        let config = SyncConfig {
            jitter_buffer_ms: 0,
            enable_drift_correction: false,
            ..SyncConfig::default()
        };
        let (time, sync) = manual_sync(config);
        for i in 0..12 {
            let pts = i * 20_000;
            sync.push_audio(audio(pts));
            sync.push_video(video(pts + 60_000, false));
            time.advance(20_000);
            sync.get_next(Duration::from_millis(5));
        }
        assert_eq!(sync.get_stats().playback_speed, 1.0);
    }

    #[test]
    fn test_adaptive_buffering() {
        let config = SyncConfig {
            adaptive_buffering: true,
            ..SyncConfig::default()
        };
        let (_time, sync) = manual_sync(config);
        assert_eq!(sync.update_network_conditions(5.0), 60);
        assert_eq!(sync.update_network_conditions(5.0), 70);
        assert_eq!(sync.get_stats().jitter_buffer_ms, 70);
        assert_eq!(sync.config().jitter_buffer_ms, 70);
    }

    #[test]
    fn test_network_conditions_ignored_without_adaptive_buffering() {
        let (_time, sync) = manual_sync(SyncConfig::default());
        assert_eq!(sync.update_network_conditions(50.0), 50);
        assert_eq!(sync.get_stats().jitter_buffer_ms, 50);
    }

    #[test]
    fn test_callback_receives_output() {
        let (_time, sync) = manual_sync(SyncConfig::default());
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        sync.set_output_callback(move |frames| {
            sink.lock().push(frames.presentation_time_us);
        });

        sync.push_video(video(100_000, true));
        let frames = sync.get_next(Duration::from_millis(5)).unwrap();
        assert_eq!(*seen.lock(), vec![frames.presentation_time_us]);

        sync.clear_output_callback();
        sync.push_video(video(116_667, true));
        sync.get_next(Duration::from_millis(5)).unwrap();
        assert_eq!(seen.lock().len(), 1);
    }
}
