//! Shared helpers for integration tests

#![allow(dead_code)]

use std::sync::Arc;
use streamsync_av::{
    EncodedAudioFrame, EncodedVideoFrame, ManualTimeSource, Pts, SyncConfig, Synchronizer,
};

/// 60fps frame interval (µs)
pub const VIDEO_FRAME_US: i64 = 16_667;

/// 20ms audio packet interval (µs)
pub const AUDIO_FRAME_US: i64 = 20_000;

/// Install a test subscriber once; honors RUST_LOG
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn video(pts: Pts) -> EncodedVideoFrame {
    EncodedVideoFrame::new(vec![0u8; 512], pts, pts, false)
}

pub fn keyframe(pts: Pts) -> EncodedVideoFrame {
    EncodedVideoFrame::new(vec![0u8; 4096], pts, pts, true)
}

pub fn audio(pts: Pts) -> EncodedAudioFrame {
    EncodedAudioFrame::new(vec![0u8; 160], pts)
}

/// Started synchronizer on a manual clock
pub fn manual_synchronizer(config: SyncConfig) -> (Arc<ManualTimeSource>, Synchronizer) {
    init_tracing();
    let time = Arc::new(ManualTimeSource::new(10_000_000));
    let sync = Synchronizer::with_time_source(config, time.clone()).unwrap();
    sync.start();
    (time, sync)
}
