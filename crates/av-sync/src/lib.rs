//! Audio/video synchronization core for low-latency desktop streaming
//!
//! Keeps two independently encoded, independently delivered streams
//! presented in time with each other despite variable encode time, network
//! jitter and clock-rate drift, with bounded memory and bounded added
//! latency.
//!
//! # Features
//!
//! - **Master clock**: rebase-able, speed-adjustable playback "now"
//! - **Jitter estimation**: RFC 3550 style interarrival jitter per stream
//! - **Drift estimation**: least-squares PPM drift per stream
//! - **Pairing engine**: bounded drop-oldest queues and windowed admission
//! - **Playback gate**: per-frame display/drop/delay decisions for renderers
//! - **Pluggable correction**: fixed-step or proportional speed correction
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────┐
//! │  Encoders (video / audio)                              │
//! │  ↓ push_video / push_audio (never blocks)              │
//! │  Synchronizer                                          │
//! │  ├─ FrameBuffer × 2 (drop-oldest on overflow)          │
//! │  ├─ JitterEstimator + DriftEstimator per stream        │
//! │  ├─ MasterClock ← CorrectionPolicy                     │
//! │  └─ get_next() → SyncedFrames → transport              │
//! │                      └─ OutputPump → tokio mpsc        │
//! │                                                        │
//! │  Decoder → PlaybackGate::check_video_sync()            │
//! │            → Display / Drop / Delay                    │
//! └────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use streamsync_av::{EncodedAudioFrame, EncodedVideoFrame, SyncConfig, Synchronizer};
//!
//! let config = SyncConfig {
//!     jitter_buffer_ms: 0,
//!     ..SyncConfig::default()
//! };
//! assert!(config.validate().is_ok());
//!
//! let sync = Synchronizer::new(config).unwrap();
//! sync.start();
//! sync.push_audio(EncodedAudioFrame::new(vec![0u8; 160], 100_000));
//! sync.push_video(EncodedVideoFrame::new(vec![0u8; 4096], 120_000, 120_000, false));
//!
//! let frames = sync.get_next(Duration::from_millis(10)).unwrap();
//! assert!(frames.is_paired());
//! assert_eq!(sync.get_stats().audio_video_offset_us, 20_000);
//! ```

#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod frame;
pub mod pump;
pub mod stats;
pub mod sync;
pub mod time;

pub use config::{ClockSource, CorrectionConfig, SyncConfig};
pub use error::{Error, Result};
pub use frame::{EncodedAudioFrame, EncodedVideoFrame, MediaKind, Pts, SyncedFrames};
pub use pump::OutputPump;
pub use stats::SyncStats;
pub use sync::{PlaybackGate, SyncDecision, Synchronizer};
pub use time::{ManualTimeSource, MonotonicTimeSource, TimeSource};

/// Get the version of this crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        let ver = version();
        assert!(!ver.is_empty());
    }
}
