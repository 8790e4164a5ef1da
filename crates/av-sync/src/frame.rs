//! Encoded media frames flowing through the synchronizer
//!
//! PTS values are microseconds on a stream-local, monotonic timeline. The
//! synchronizer only reads `pts_us`, `keyframe` and the payload size; the
//! payload itself is carried through untouched.

use crate::sync::BufferedFrame;
use bytes::Bytes;
use std::fmt;

/// Presentation timestamp in microseconds
pub type Pts = i64;

/// Stream kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Video,
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Audio => f.write_str("audio"),
        }
    }
}

/// Encoded video access unit from the encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedVideoFrame {
    /// Encoded bitstream
    pub data: Bytes,
    /// Presentation timestamp (µs)
    pub pts_us: Pts,
    /// Decode timestamp (µs)
    pub dts_us: Pts,
    /// Self-contained frame usable as a sync reset point
    pub keyframe: bool,
}

impl EncodedVideoFrame {
    pub fn new(data: impl Into<Bytes>, pts_us: Pts, dts_us: Pts, keyframe: bool) -> Self {
        Self {
            data: data.into(),
            pts_us,
            dts_us,
            keyframe,
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl BufferedFrame for EncodedVideoFrame {
    fn pts_us(&self) -> Pts {
        self.pts_us
    }

    fn is_keyframe(&self) -> bool {
        self.keyframe
    }
}

/// Encoded audio packet from the encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedAudioFrame {
    /// Encoded payload
    pub data: Bytes,
    /// Presentation timestamp (µs)
    pub pts_us: Pts,
}

impl EncodedAudioFrame {
    pub fn new(data: impl Into<Bytes>, pts_us: Pts) -> Self {
        Self {
            data: data.into(),
            pts_us,
        }
    }

    /// Payload size in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl BufferedFrame for EncodedAudioFrame {
    fn pts_us(&self) -> Pts {
        self.pts_us
    }
}

/// Output of one pairing round
///
/// At least one of `video`/`audio` is present whenever the synchronizer
/// hands one of these out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncedFrames {
    pub video: Option<EncodedVideoFrame>,
    pub audio: Option<EncodedAudioFrame>,
    /// Presentation time both frames were admitted against (µs)
    pub presentation_time_us: Pts,
}

impl SyncedFrames {
    /// Both a video and an audio frame were emitted
    pub fn is_paired(&self) -> bool {
        self.video.is_some() && self.audio.is_some()
    }

    /// Video PTS minus audio PTS, when paired (positive = video ahead)
    pub fn av_offset_us(&self) -> Option<i64> {
        match (&self.video, &self.audio) {
            (Some(v), Some(a)) => Some(v.pts_us.saturating_sub(a.pts_us)),
            _ => None,
        }
    }
}
