//! Audio/video synchronization
//!
//! Master clock, per-stream timing estimators, bounded frame queues and the
//! two entry points built on them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         SyncCore                              │
//! │  ┌────────────────┐   ┌────────────────┐                     │
//! │  │  Video FIFO    │   │  Audio FIFO    │   (drop-oldest)     │
//! │  └───────┬────────┘   └───────┬────────┘                     │
//! │          │ push               │ push                          │
//! │          ▼                    ▼                               │
//! │  ┌─────────────────────────────────────────┐                 │
//! │  │ Jitter (RFC 3550 EMA) + Drift (OLS ppm) │  per stream     │
//! │  └────────────────────┬────────────────────┘                 │
//! │                       ▼                                       │
//! │  ┌─────────────────────────────────────────┐                 │
//! │  │ CorrectionPolicy → MasterClock [0.9,1.1]│                 │
//! │  └─────────────────────────────────────────┘                 │
//! └──────────────┬────────────────────────────────┬──────────────┘
//!                │                                │
//!     Synchronizer::get_next()        PlaybackGate::check_video_sync()
//!     (sender-side pairing)           (receiver-side admission)
//! ```
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use streamsync_av::{EncodedAudioFrame, EncodedVideoFrame, SyncConfig, Synchronizer};
//!
//! let sync = Synchronizer::new(SyncConfig::default()).unwrap();
//! sync.start();
//!
//! sync.push_video(EncodedVideoFrame::new(vec![0u8; 1200], 120_000, 120_000, true));
//! sync.push_audio(EncodedAudioFrame::new(vec![0u8; 160], 100_000));
//!
//! if let Some(frames) = sync.get_next(Duration::from_millis(10)) {
//!     assert!(frames.video.is_some() || frames.audio.is_some());
//! }
//! sync.stop();
//! ```

mod adaptive_buffer;
mod clock_drift;
mod correction;
mod frame_buffer;
mod jitter;
mod lip_sync;
mod master_clock;
mod playback_gate;
mod synchronizer;

pub use adaptive_buffer::{AdaptiveBufferManager, MAX_BUFFER_MS, MIN_BUFFER_MS, TARGET_BUFFER_MS};
pub use clock_drift::{
    ClockDriftEstimate, DriftAction, DriftEstimator, DriftObservation, MIN_DRIFT_SAMPLES,
};
pub use correction::{
    policy_from_config, CorrectionInput, CorrectionPolicy, FixedStepCorrection,
    ProportionalCorrection,
};
pub use frame_buffer::{Admission, BufferedFrame, FrameBuffer};
pub use jitter::{JitterEstimator, JitterSample, DISCONTINUITY_THRESHOLD_US};
pub use lip_sync::{LipSyncMonitor, ACCEPTABLE_SYNC_US};
pub use master_clock::{MasterClock, MAX_SPEED, MIN_SPEED};
pub use playback_gate::{PlaybackGate, SyncDecision};
pub use synchronizer::{OutputCallback, Synchronizer};
