use std::time::Instant;

use serlink_transport::ByteTransport;
use tracing::{debug, warn};

use crate::codec::{Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::reassembler::{ReadOutcome, Reassembler, ReassemblerStats};

/// Reads frames from any [`ByteTransport`].
///
/// Each reader owns its own [`Reassembler`]; independent streams need
/// independent readers.
pub struct FrameReader<T> {
    inner: T,
    reassembler: Reassembler,
    config: FrameConfig,
}

impl<T: ByteTransport> FrameReader<T> {
    /// Create a new frame reader with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame reader with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            reassembler: Reassembler::with_config(&config),
            config,
        }
    }

    /// Advance by at most one transport byte (non-blocking).
    pub fn poll(&mut self) -> Result<ReadOutcome> {
        self.reassembler.poll(&mut self.inner)
    }

    /// Poll until a frame completes or fails.
    ///
    /// Sleeps `poll_interval` whenever the transport is idle. Returns
    /// `Err(FrameError::Timeout)` once `idle_timeout` elapses with no byte.
    /// Check failures and overflow are returned as errors; the reassembler
    /// keeps its state so the caller can decide how to continue.
    pub fn read_frame(&mut self) -> Result<Frame> {
        let mut last_byte = Instant::now();
        loop {
            match self.poll()? {
                ReadOutcome::Frame(frame) => return Ok(frame),
                ReadOutcome::Error(err) => return Err(err),
                ReadOutcome::Incomplete => last_byte = Instant::now(),
                ReadOutcome::NoByte => {
                    if let Some(timeout) = self.config.idle_timeout {
                        if last_byte.elapsed() >= timeout {
                            return Err(FrameError::Timeout(timeout));
                        }
                    }
                    if !self.config.poll_interval.is_zero() {
                        std::thread::sleep(self.config.poll_interval);
                    }
                }
            }
        }
    }

    /// Like [`read_frame`](Self::read_frame), but skips invalid frames.
    ///
    /// Check failures are logged and dropped (the desync latch stays in
    /// effect). An overflow resets the reassembler before continuing.
    pub fn read_valid_frame(&mut self) -> Result<Frame> {
        loop {
            match self.read_frame() {
                Ok(frame) => return Ok(frame),
                Err(err) if err.is_check_failure() => {
                    debug!(error = %err, "skipping invalid frame");
                }
                Err(FrameError::FrameTooLarge { capacity }) => {
                    warn!(capacity, "receive buffer overflow, resetting");
                    self.reassembler.reset();
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Discard any partial frame.
    pub fn reset(&mut self) {
        self.reassembler.reset();
    }

    /// Counters from the underlying reassembler.
    pub fn stats(&self) -> ReassemblerStats {
        self.reassembler.stats()
    }

    /// Borrow the reassembler.
    pub fn reassembler(&self) -> &Reassembler {
        &self.reassembler
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the reader and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Current frame reader configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
