//! Bounded per-stream frame queue
//!
//! Strict FIFO in push order, capped at a fixed number of entries. When full,
//! the oldest frame is evicted so producers never block and memory stays
//! bounded.

use crate::frame::Pts;
use std::collections::VecDeque;

/// Trait for frames that can be held in a [`FrameBuffer`]
pub trait BufferedFrame: Send {
    /// Presentation timestamp in microseconds
    fn pts_us(&self) -> Pts;

    /// Keyframes are never dropped for lateness
    fn is_keyframe(&self) -> bool {
        false
    }
}

/// Outcome of offering the head of a buffer to the presentation window
#[derive(Debug, PartialEq, Eq)]
pub enum Admission<T> {
    /// Within tolerance (or a keyframe): popped for output
    Emit(T),
    /// Behind the window: popped and discarded by the caller
    Late(T),
    /// Ahead of the window: left buffered
    Early,
    /// Nothing buffered
    Empty,
}

/// Bounded FIFO of frames for one stream
#[derive(Debug)]
pub struct FrameBuffer<T: BufferedFrame> {
    frames: VecDeque<T>,
    capacity: usize,
    overflow_count: u64,
    peak_len: usize,
}

impl<T: BufferedFrame> FrameBuffer<T> {
    /// Create a buffer holding at most `capacity` frames (min 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
            overflow_count: 0,
            peak_len: 0,
        }
    }

    /// Append a frame, evicting and returning the oldest one when full
    pub fn push(&mut self, frame: T) -> Option<T> {
        let evicted = if self.frames.len() >= self.capacity {
            self.overflow_count += 1;
            self.frames.pop_front()
        } else {
            None
        };

        self.frames.push_back(frame);
        self.peak_len = self.peak_len.max(self.frames.len());
        evicted
    }

    /// Offer the head frame to a presentation window
    ///
    /// `offset = pts - presentation_time`. The head is emitted when
    /// `|offset| < tolerance_us` or it is a keyframe, reported late when
    /// `offset < -tolerance_us`, and otherwise stays buffered.
    pub fn admit_front(&mut self, presentation_time_us: Pts, tolerance_us: i64) -> Admission<T> {
        let Some(head) = self.frames.front() else {
            return Admission::Empty;
        };

        let offset = head.pts_us().saturating_sub(presentation_time_us);
        if offset.saturating_abs() < tolerance_us || head.is_keyframe() {
            self.frames.pop_front().map_or(Admission::Empty, Admission::Emit)
        } else if offset < -tolerance_us {
            self.frames.pop_front().map_or(Admission::Empty, Admission::Late)
        } else {
            Admission::Early
        }
    }

    pub fn front(&self) -> Option<&T> {
        self.frames.front()
    }

    pub fn pop_front(&mut self) -> Option<T> {
        self.frames.pop_front()
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames evicted because the buffer was full
    pub fn overflow_count(&self) -> u64 {
        self.overflow_count
    }

    /// Largest number of frames ever held at once
    pub fn peak_len(&self) -> usize {
        self.peak_len
    }

    /// Drop all buffered frames and counters
    pub fn clear(&mut self) {
        self.frames.clear();
        self.overflow_count = 0;
        self.peak_len = 0;
    }
}
