//! Adaptive jitter-buffer sizing
//!
//! Dead-banded additive control: grow quickly (+10ms) when jitter or loss
//! rise, shrink slowly (-5ms) when the link is clean, and hold steady in
//! between so the target does not oscillate.

use tracing::debug;

/// Smallest buffer target (ms)
pub const MIN_BUFFER_MS: u32 = 20;

/// Largest buffer target (ms)
pub const MAX_BUFFER_MS: u32 = 200;

/// Starting buffer target (ms)
pub const TARGET_BUFFER_MS: u32 = 50;

const INCREASE_STEP_MS: u32 = 10;
const DECREASE_STEP_MS: u32 = 5;

/// Jitter above which the buffer grows (µs)
const HIGH_JITTER_US: i64 = 20_000;

/// Jitter below which a loss-free link lets the buffer shrink (µs)
const LOW_JITTER_US: i64 = 5_000;

/// Loss percentage above which the buffer grows
const HIGH_LOSS_PERCENT: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct AdaptiveBufferManager {
    buffer_ms: u32,
    min_ms: u32,
    max_ms: u32,
    initial_ms: u32,
}

impl Default for AdaptiveBufferManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AdaptiveBufferManager {
    pub fn new() -> Self {
        Self::with_bounds(MIN_BUFFER_MS, MAX_BUFFER_MS, TARGET_BUFFER_MS)
    }

    /// Create a manager with custom bounds; `initial_ms` is clamped into them
    pub fn with_bounds(min_ms: u32, max_ms: u32, initial_ms: u32) -> Self {
        let max_ms = max_ms.max(min_ms);
        let initial_ms = initial_ms.clamp(min_ms, max_ms);
        Self {
            buffer_ms: initial_ms,
            min_ms,
            max_ms,
            initial_ms,
        }
    }

    /// Feed current network conditions, returning the new target (ms)
    ///
    /// # Arguments
    /// * `jitter_us` - Current jitter estimate in microseconds
    /// * `packet_loss_percent` - Recent packet loss, 0.0-100.0
    pub fn update(&mut self, jitter_us: i64, packet_loss_percent: f64) -> u32 {
        let previous = self.buffer_ms;

        if jitter_us > HIGH_JITTER_US || packet_loss_percent > HIGH_LOSS_PERCENT {
            self.buffer_ms = (self.buffer_ms + INCREASE_STEP_MS).min(self.max_ms);
        } else if jitter_us < LOW_JITTER_US && packet_loss_percent <= 0.0 {
            self.buffer_ms = self
                .buffer_ms
                .saturating_sub(DECREASE_STEP_MS)
                .max(self.min_ms);
        }

        if self.buffer_ms != previous {
            debug!(
                jitter_us,
                packet_loss_percent,
                from_ms = previous,
                to_ms = self.buffer_ms,
                "Adjusted jitter buffer target"
            );
        }
        self.buffer_ms
    }

    /// Current buffer target in milliseconds
    pub fn buffer_ms(&self) -> u32 {
        self.buffer_ms
    }

    /// Current buffer target in microseconds
    pub fn buffer_us(&self) -> i64 {
        i64::from(self.buffer_ms) * 1000
    }

    pub fn reset(&mut self) {
        self.buffer_ms = self.initial_ms;
    }
}
