//! Synchronization statistics snapshot

use crate::frame::{MediaKind, Pts};
use serde::Serialize;

/// Point-in-time view of a synchronizer's counters and estimates
///
/// Returned by value from `get_stats()`; two calls with no intervening
/// push/pull/update return identical snapshots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncStats {
    /// PTS of the most recently pushed/observed video frame
    pub last_video_pts_us: Option<Pts>,
    /// PTS of the most recently pushed/observed audio frame
    pub last_audio_pts_us: Option<Pts>,
    /// Last measured video PTS minus audio PTS (positive = video ahead)
    pub audio_video_offset_us: i64,
    /// Worst of the per-stream jitter estimates
    pub jitter_us: i64,
    pub video_jitter_us: i64,
    pub audio_jitter_us: i64,
    /// All drops: overflow evictions plus stale frames
    pub frames_dropped: u64,
    pub video_overflow_drops: u64,
    pub audio_overflow_drops: u64,
    pub video_late_drops: u64,
    pub audio_late_drops: u64,
    /// Receiver-side frames held back because they were early
    pub frames_delayed: u64,
    /// Rounds of get_next that emitted at least one frame
    pub pairs_emitted: u64,
    pub video_drift_ppm: f64,
    pub audio_drift_ppm: f64,
    /// Current master clock speed factor
    pub playback_speed: f64,
    pub video_queue_len: usize,
    pub audio_queue_len: usize,
    /// Jitter compensation currently applied to the presentation time
    pub jitter_buffer_ms: u32,
    /// Rolling lip-sync verdict (average |offset| under 80ms)
    pub lip_sync_acceptable: bool,
    pub average_lip_sync_error_us: i64,
}

impl Default for SyncStats {
    fn default() -> Self {
        Self {
            last_video_pts_us: None,
            last_audio_pts_us: None,
            audio_video_offset_us: 0,
            jitter_us: 0,
            video_jitter_us: 0,
            audio_jitter_us: 0,
            frames_dropped: 0,
            video_overflow_drops: 0,
            audio_overflow_drops: 0,
            video_late_drops: 0,
            audio_late_drops: 0,
            frames_delayed: 0,
            pairs_emitted: 0,
            video_drift_ppm: 0.0,
            audio_drift_ppm: 0.0,
            playback_speed: 1.0,
            video_queue_len: 0,
            audio_queue_len: 0,
            jitter_buffer_ms: 0,
            lip_sync_acceptable: true,
            average_lip_sync_error_us: 0,
        }
    }
}

impl SyncStats {
    /// Total overflow evictions across both streams
    pub fn overflow_drops(&self) -> u64 {
        self.video_overflow_drops + self.audio_overflow_drops
    }

    /// Total stale-frame drops across both streams
    pub fn late_drops(&self) -> u64 {
        self.video_late_drops + self.audio_late_drops
    }

    pub(crate) fn record_overflow(&mut self, kind: MediaKind) {
        match kind {
            MediaKind::Video => self.video_overflow_drops += 1,
            MediaKind::Audio => self.audio_overflow_drops += 1,
        }
        self.frames_dropped += 1;
    }

    pub(crate) fn record_late(&mut self, kind: MediaKind) {
        match kind {
            MediaKind::Video => self.video_late_drops += 1,
            MediaKind::Audio => self.audio_late_drops += 1,
        }
        self.frames_dropped += 1;
    }
}
