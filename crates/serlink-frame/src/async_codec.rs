//! `tokio_util` codec over the same reassembler and serializer.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::codec::{serialize_frame, Frame, FrameConfig};
use crate::error::FrameError;
use crate::reassembler::{ReadOutcome, Reassembler, ReassemblerStats};

/// Frame codec for `FramedRead` / `FramedWrite`.
///
/// A decode error ends a `Framed` stream, so invalid frames are logged
/// and skipped here instead of being surfaced. An overflow resets the
/// reassembler. The counters in [`LinkCodec::stats`] record what was
/// dropped.
#[derive(Debug)]
pub struct LinkCodec {
    reassembler: Reassembler,
    max_payload_size: usize,
}

impl LinkCodec {
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            reassembler: Reassembler::with_config(config),
            max_payload_size: config.max_payload_size,
        }
    }

    pub fn stats(&self) -> ReassemblerStats {
        self.reassembler.stats()
    }
}

impl Default for LinkCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LinkCodec {
    type Item = Frame;
    type Error = FrameError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, FrameError> {
        while src.has_remaining() {
            match self.reassembler.push(src.get_u8()) {
                ReadOutcome::Frame(frame) => return Ok(Some(frame)),
                ReadOutcome::Error(FrameError::FrameTooLarge { capacity }) => {
                    warn!(capacity, "receive buffer overflow, resetting");
                    self.reassembler.reset();
                }
                ReadOutcome::Error(err) => {
                    warn!(error = %err, "dropping invalid frame");
                }
                ReadOutcome::Incomplete | ReadOutcome::NoByte => {}
            }
        }
        Ok(None)
    }
}

impl Encoder<Frame> for LinkCodec {
    type Error = FrameError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        Encoder::<&Frame>::encode(self, &item, dst)
    }
}

impl Encoder<&Frame> for LinkCodec {
    type Error = FrameError;

    fn encode(&mut self, item: &Frame, dst: &mut BytesMut) -> Result<(), FrameError> {
        if item.payload().len() > self.max_payload_size {
            return Err(FrameError::PayloadTooLarge {
                size: item.payload().len(),
                max: self.max_payload_size,
            });
        }
        serialize_frame(item, dst);
        Ok(())
    }
}
