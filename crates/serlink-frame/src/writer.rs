use bytes::{Bytes, BytesMut};
use serlink_transport::ByteTransport;
use tracing::debug;

use crate::codec::{serialize_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};

/// Writes complete frames to any [`ByteTransport`].
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
    config: FrameConfig,
    frames_written: u64,
}

impl<T: ByteTransport> FrameWriter<T> {
    /// Create a new frame writer with default configuration.
    pub fn new(inner: T) -> Self {
        Self::with_config(inner, FrameConfig::default())
    }

    /// Create a new frame writer with explicit configuration.
    pub fn with_config(inner: T, config: FrameConfig) -> Self {
        Self {
            inner,
            buf: BytesMut::new(),
            config,
            frames_written: 0,
        }
    }

    /// Write a complete frame (blocking). Returns the number of wire bytes.
    pub fn write_frame(&mut self, frame: &Frame) -> Result<usize> {
        if frame.payload().len() > self.config.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: frame.payload().len(),
                max: self.config.max_payload_size,
            });
        }

        self.buf.clear();
        serialize_frame(frame, &mut self.buf);

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write_bytes(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::ConnectionClosed),
                Ok(n) => offset += n,
                Err(err) if err.is_would_block() => continue,
                Err(err) => return Err(err.into()),
            }
        }

        self.flush()?;
        self.frames_written += 1;
        debug!(
            address = frame.address(),
            control = frame.control(),
            size = frame.payload().len(),
            wire = offset,
            "frame sent"
        );
        Ok(offset)
    }

    /// Build and send a frame. Returns the number of wire bytes.
    pub fn send(&mut self, control: u8, address: u8, payload: impl Into<Bytes>) -> Result<usize> {
        let frame = Frame::try_encode(control, address, payload, self.config.max_payload_size)?;
        self.write_frame(&frame)
    }

    /// Flush the underlying transport.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.is_would_block() => continue,
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Frames fully written so far.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the writer and return the inner transport.
    pub fn into_inner(self) -> T {
        self.inner
    }

    /// Update maximum payload size for subsequent frames.
    pub fn set_max_payload_size(&mut self, max_payload_size: usize) {
        self.config.max_payload_size = max_payload_size;
    }

    /// Current frame writer configuration.
    pub fn config(&self) -> &FrameConfig {
        &self.config
    }
}
