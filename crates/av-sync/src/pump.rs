//! Bridge from the blocking pull API to async consumers
//!
//! [`OutputPump`] owns a worker thread that loops on
//! [`Synchronizer::get_next`] and forwards every emitted [`SyncedFrames`]
//! into a bounded tokio channel, so an async transport can `recv().await`
//! instead of parking a runtime thread on the condition variable.

use crate::error::{Error, Result};
use crate::frame::SyncedFrames;
use crate::sync::Synchronizer;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info};

/// Pause between retries when the channel is full or nothing was due
const IDLE_BACKOFF: Duration = Duration::from_millis(1);

/// Worker thread forwarding synchronizer output into a tokio channel
#[derive(Debug)]
pub struct OutputPump {
    worker: Option<JoinHandle<Result<u64>>>,
    shutdown: Arc<AtomicBool>,
    forwarded: Arc<AtomicU64>,
}

impl OutputPump {
    /// Start pumping `synchronizer` output into a channel of `capacity`
    ///
    /// # Errors
    /// * [`Error::Stopped`] if the synchronizer has not been started
    /// * [`Error::InvalidConfig`] if `capacity` is zero
    pub fn spawn(
        synchronizer: Synchronizer,
        poll_timeout: Duration,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<SyncedFrames>)> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "output pump capacity must be > 0".to_string(),
            ));
        }
        if !synchronizer.is_running() {
            return Err(Error::Stopped);
        }

        let (tx, rx) = mpsc::channel(capacity);
        let shutdown = Arc::new(AtomicBool::new(false));
        let forwarded = Arc::new(AtomicU64::new(0));

        let worker = {
            let shutdown = Arc::clone(&shutdown);
            let forwarded = Arc::clone(&forwarded);
            thread::spawn(move || pump_loop(synchronizer, tx, poll_timeout, &shutdown, &forwarded))
        };

        info!(capacity, ?poll_timeout, "Output pump started");
        Ok((
            Self {
                worker: Some(worker),
                shutdown,
                forwarded,
            },
            rx,
        ))
    }

    /// Frames handed to the channel so far
    pub fn forwarded(&self) -> u64 {
        self.forwarded.load(Ordering::Relaxed)
    }

    /// Whether the worker thread has exited on its own
    pub fn is_finished(&self) -> bool {
        self.worker.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Stop the worker and wait for it
    ///
    /// Returns the number of frames forwarded, or [`Error::ChannelClosed`]
    /// if the worker had already exited because the receiver was dropped.
    pub fn shutdown(mut self) -> Result<u64> {
        self.stop_worker().unwrap_or(Ok(0))
    }

    fn stop_worker(&mut self) -> Option<Result<u64>> {
        self.shutdown.store(true, Ordering::Release);
        let worker = self.worker.take()?;
        match worker.join() {
            Ok(result) => Some(result),
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

impl Drop for OutputPump {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop_worker();
        }
    }
}

fn pump_loop(
    synchronizer: Synchronizer,
    tx: mpsc::Sender<SyncedFrames>,
    poll_timeout: Duration,
    shutdown: &AtomicBool,
    forwarded: &AtomicU64,
) -> Result<u64> {
    while !shutdown.load(Ordering::Acquire) && synchronizer.is_running() {
        let Some(mut frames) = synchronizer.get_next(poll_timeout) else {
            thread::sleep(IDLE_BACKOFF);
            continue;
        };

        // Backpressure: hold the frame until there is room or we are told to stop
        loop {
            match tx.try_send(frames) {
                Ok(()) => {
                    forwarded.fetch_add(1, Ordering::Relaxed);
                    break;
                }
                Err(TrySendError::Full(pending)) => {
                    if shutdown.load(Ordering::Acquire) {
                        return Ok(forwarded.load(Ordering::Relaxed));
                    }
                    frames = pending;
                    thread::sleep(IDLE_BACKOFF);
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("Output receiver dropped, stopping pump");
                    return Err(Error::ChannelClosed);
                }
            }
        }
    }

    let total = forwarded.load(Ordering::Relaxed);
    info!(forwarded = total, "Output pump stopped");
    Ok(total)
}
