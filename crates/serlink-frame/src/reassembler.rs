use bytes::{BufMut, BytesMut};
use serlink_transport::ByteTransport;
use tracing::{debug, error, trace, warn};

use crate::codec::{decode_frame, Frame, FrameConfig};
use crate::error::{FrameError, Result};
use crate::stuffing::{destuff_into, FLAG};

/// Stuffed bytes needed before a flag is taken as an end marker.
const MIN_BUFFERED: usize = 2;

/// Result of advancing the reassembler by (at most) one byte.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The transport had no byte to offer.
    NoByte,
    /// A byte was consumed; no frame completed.
    Incomplete,
    /// An end marker completed a valid frame.
    Frame(Frame),
    /// An end marker completed an invalid frame, or the buffer overflowed.
    Error(FrameError),
}

impl ReadOutcome {
    /// The completed frame, if any.
    pub fn into_frame(self) -> Option<Frame> {
        match self {
            ReadOutcome::Frame(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn is_frame(&self) -> bool {
        matches!(self, ReadOutcome::Frame(_))
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, ReadOutcome::Incomplete)
    }
}

/// Frame boundary state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// Waiting for a start marker; other bytes are dropped.
    Idle,
    /// Between a start marker and an end marker.
    Accumulating,
}

/// Running counters kept by a [`Reassembler`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReassemblerStats {
    pub frames: u64,
    pub header_check_failures: u64,
    pub payload_check_failures: u64,
    pub truncated: u64,
    pub overflows: u64,
    pub resyncs: u64,
    pub ignored_bytes: u64,
}

/// Incremental frame reassembler for one byte stream.
///
/// Fed one byte at a time, it finds frame boundaries, buffers the stuffed
/// frame content and decodes it when the end marker arrives. After a check
/// failure the next byte is inspected: if it is one of the configured
/// resync bytes, the end marker of the failed frame was probably lost and
/// that byte starts a new frame.
///
/// A buffer overflow does not reset the state. The caller decides whether
/// to [`reset`](Reassembler::reset) or to let the next marker close the
/// (invalid) frame.
#[derive(Debug)]
pub struct Reassembler {
    state: LinkState,
    buffer: BytesMut,
    scratch: BytesMut,
    capacity: usize,
    resync_bytes: Vec<u8>,
    check_failed: bool,
    stats: ReassemblerStats,
}

impl Default for Reassembler {
    fn default() -> Self {
        Self::new()
    }
}

impl Reassembler {
    /// Create a reassembler with default configuration.
    pub fn new() -> Self {
        Self::with_config(&FrameConfig::default())
    }

    /// Create a reassembler with explicit configuration.
    pub fn with_config(config: &FrameConfig) -> Self {
        Self {
            state: LinkState::Idle,
            buffer: BytesMut::with_capacity(config.buffer_capacity),
            scratch: BytesMut::with_capacity(config.buffer_capacity),
            capacity: config.buffer_capacity,
            resync_bytes: config.resync_bytes.clone(),
            check_failed: false,
            stats: ReassemblerStats::default(),
        }
    }

    /// Read one byte from `transport` and advance.
    pub fn poll<T: ByteTransport + ?Sized>(&mut self, transport: &mut T) -> Result<ReadOutcome> {
        match transport.read_byte()? {
            Some(byte) => Ok(self.push(byte)),
            None => Ok(ReadOutcome::NoByte),
        }
    }

    /// Advance by one received byte. Never returns [`ReadOutcome::NoByte`].
    pub fn push(&mut self, byte: u8) -> ReadOutcome {
        if std::mem::take(&mut self.check_failed) && self.resync_bytes.contains(&byte) {
            warn!(
                byte = format_args!("0x{byte:02x}"),
                discarded = self.buffer.len(),
                "likely lost frame marker, resynchronizing"
            );
            self.stats.resyncs += 1;
            self.buffer.clear();
            self.buffer.put_u8(byte);
            self.state = LinkState::Accumulating;
            return ReadOutcome::Incomplete;
        }

        match (byte == FLAG, self.state) {
            (true, LinkState::Idle) => {
                trace!("start marker");
                self.buffer.clear();
                self.state = LinkState::Accumulating;
                ReadOutcome::Incomplete
            }
            (true, LinkState::Accumulating) if self.buffer.len() < MIN_BUFFERED => {
                trace!(buffered = self.buffer.len(), "marker too early, ignoring");
                ReadOutcome::Incomplete
            }
            (true, LinkState::Accumulating) => {
                self.state = LinkState::Idle;
                self.complete()
            }
            (false, LinkState::Accumulating) => {
                if self.buffer.len() >= self.capacity {
                    self.stats.overflows += 1;
                    error!(capacity = self.capacity, "frame too large");
                    return ReadOutcome::Error(FrameError::FrameTooLarge {
                        capacity: self.capacity,
                    });
                }
                self.buffer.put_u8(byte);
                ReadOutcome::Incomplete
            }
            (false, LinkState::Idle) => {
                self.stats.ignored_bytes += 1;
                ReadOutcome::Incomplete
            }
        }
    }

    /// Drop any partial frame and the pending check failure.
    pub fn reset(&mut self) {
        debug!(discarded = self.buffer.len(), "reassembler reset");
        self.state = LinkState::Idle;
        self.buffer.clear();
        self.scratch.clear();
        self.check_failed = false;
    }

    pub fn state(&self) -> LinkState {
        self.state
    }

    /// Stuffed bytes buffered for the frame in progress.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    /// True if the last completed frame failed validation and no byte has
    /// been consumed since.
    pub fn check_failed(&self) -> bool {
        self.check_failed
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> ReassemblerStats {
        self.stats
    }

    fn complete(&mut self) -> ReadOutcome {
        self.scratch.clear();
        destuff_into(&self.buffer, &mut self.scratch);
        self.buffer.clear();

        match decode_frame(&self.scratch) {
            Ok(frame) => {
                self.stats.frames += 1;
                debug!(
                    address = frame.address(),
                    control = frame.control(),
                    size = frame.payload().len(),
                    "frame received"
                );
                ReadOutcome::Frame(frame)
            }
            Err(err) => {
                match &err {
                    FrameError::HeaderChecksumMismatch { .. } => {
                        self.stats.header_check_failures += 1
                    }
                    FrameError::PayloadChecksumMismatch { .. } => {
                        self.stats.payload_check_failures += 1
                    }
                    FrameError::Truncated { .. } => self.stats.truncated += 1,
                    _ => {}
                }
                self.check_failed = err.is_check_failure();
                warn!(error = %err, "discarding invalid frame");
                ReadOutcome::Error(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serlink_transport::LoopbackTransport;

    use super::*;
    use crate::codec::DEFAULT_MAX_PAYLOAD;
    use crate::stuffing::ESCAPE;

    fn feed(reassembler: &mut Reassembler, bytes: &[u8]) -> Vec<ReadOutcome> {
        bytes.iter().map(|&b| reassembler.push(b)).collect()
    }

    fn frames(outcomes: Vec<ReadOutcome>) -> Vec<Frame> {
        outcomes.into_iter().filter_map(ReadOutcome::into_frame).collect()
    }

    #[test]
    fn control_frame_byte_by_byte() {
        let mut r = Reassembler::new();
        let outcomes = feed(&mut r, &[FLAG, 0x01, 0x03, 0x02, FLAG]);

        assert!(outcomes[..4].iter().all(ReadOutcome::is_incomplete));
        let frame = outcomes.into_iter().last().unwrap().into_frame().unwrap();
        assert_eq!(frame.address(), 0x01);
        assert_eq!(frame.control(), 0x03);
        assert!(frame.is_control_frame());
        assert_eq!(r.state(), LinkState::Idle);
    }

    #[test]
    fn stuffed_flag_payload_byte_by_byte() {
        let wire = [FLAG, 0x03, 0x00, 0x03, ESCAPE, 0x5E, ESCAPE, 0x5E, FLAG];
        let mut r = Reassembler::new();
        let outcomes = feed(&mut r, &wire);

        let (last, rest) = outcomes.split_last().unwrap();
        assert!(rest.iter().all(ReadOutcome::is_incomplete));
        match last {
            ReadOutcome::Frame(frame) => {
                assert_eq!(frame.address(), 0x03);
                assert_eq!(frame.control(), 0x00);
                assert_eq!(frame.payload().as_ref(), &[FLAG]);
            }
            other => panic!("expected frame, got {other:?}"),
        }
    }

    #[test]
    fn bytes_before_start_marker_are_ignored() {
        let mut r = Reassembler::new();
        let outcomes = feed(&mut r, &[0x55, 0xAA, FLAG, 0x01, 0x07, 0x06, FLAG]);
        assert_eq!(frames(outcomes).len(), 1);
        assert_eq!(r.stats().ignored_bytes, 2);
    }

    #[test]
    fn early_marker_is_noise() {
        let mut r = Reassembler::new();
        // Repeated flags and a single byte between flags do not close a frame.
        let outcomes = feed(&mut r, &[FLAG, FLAG, 0x01, FLAG, 0x07, 0x06, FLAG]);
        let got = frames(outcomes);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].control(), 0x07);
    }

    #[test]
    fn back_to_back_frames() {
        let mut wire = Frame::control_frame(0x03, 0x03).to_wire().to_vec();
        wire.extend_from_slice(
            &Frame::encode(0x40, 0x03, &b"data"[..], DEFAULT_MAX_PAYLOAD).to_wire(),
        );
        wire.extend_from_slice(&Frame::control_frame(0x0B, 0x03).to_wire());

        let mut r = Reassembler::new();
        let got = frames(feed(&mut r, &wire));
        assert_eq!(got.len(), 3);
        assert_eq!(got[1].payload().as_ref(), b"data");
        assert_eq!(got[2].control(), 0x0B);
        assert_eq!(r.stats().frames, 3);
    }

    #[test]
    fn header_failure_is_reported_and_latched() {
        let mut r = Reassembler::new();
        let outcomes = feed(&mut r, &[FLAG, 0x01, 0x03, 0x05, FLAG]);
        assert!(matches!(
            outcomes.last(),
            Some(ReadOutcome::Error(FrameError::HeaderChecksumMismatch { .. }))
        ));
        assert!(r.check_failed());
        assert_eq!(r.state(), LinkState::Idle);
        assert_eq!(r.stats().header_check_failures, 1);
    }

    #[test]
    fn resync_after_payload_failure() {
        let mut r = Reassembler::new();
        let outcomes = feed(&mut r, &[FLAG, 0x03, 0x00, 0x03, 0x10, 0x11, FLAG]);
        assert!(matches!(
            outcomes.last(),
            Some(ReadOutcome::Error(FrameError::PayloadChecksumMismatch { .. }))
        ));

        // The next frame lost its start marker; its address arrives first.
        assert!(r.push(0x03).is_incomplete());
        assert_eq!(r.state(), LinkState::Accumulating);
        assert_eq!(r.buffered(), &[0x03]);
        assert!(!r.check_failed());
        assert_eq!(r.stats().resyncs, 1);

        let got = frames(feed(&mut r, &[0x07, 0x04, FLAG]));
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].control(), 0x07);
    }

    #[test]
    fn flag_after_failure_starts_frame_normally() {
        let mut r = Reassembler::new();
        feed(&mut r, &[FLAG, 0x03, 0x00, 0x07, FLAG]);
        assert!(r.check_failed());
        // A flag is not a resync byte: it clears the latch and opens a frame.
        assert!(r.push(FLAG).is_incomplete());
        assert!(!r.check_failed());
        assert!(r.push(0x01).is_incomplete());
        assert_eq!(r.buffered(), &[0x01]);
        assert_eq!(r.stats().resyncs, 0);
    }

    #[test]
    fn non_resync_byte_clears_latch() {
        let mut r = Reassembler::new();
        feed(&mut r, &[FLAG, 0x01, 0x03, 0x05, FLAG]);
        assert!(r.check_failed());

        assert!(r.push(0x42).is_incomplete());
        assert!(!r.check_failed());
        assert_eq!(r.state(), LinkState::Idle);
        // A resync byte now is just idle noise.
        r.push(0x03);
        assert_eq!(r.state(), LinkState::Idle);
    }

    #[test]
    fn custom_resync_bytes() {
        let cfg = FrameConfig {
            resync_bytes: vec![0x42],
            ..FrameConfig::default()
        };
        let mut r = Reassembler::with_config(&cfg);
        feed(&mut r, &[FLAG, 0x01, 0x03, 0x05, FLAG]);
        r.push(0x42);
        assert_eq!(r.buffered(), &[0x42]);
        assert_eq!(r.state(), LinkState::Accumulating);
    }

    #[test]
    fn truncated_frame_latches() {
        let mut r = Reassembler::new();
        let outcomes = feed(&mut r, &[FLAG, 0x01, ESCAPE, FLAG]);
        assert!(matches!(
            outcomes.last(),
            Some(ReadOutcome::Error(FrameError::Truncated { len: 1 }))
        ));
        assert!(r.check_failed());
        assert_eq!(r.stats().truncated, 1);
    }

    #[test]
    fn overflow_reports_without_reset() {
        let cfg = FrameConfig {
            buffer_capacity: 4,
            ..FrameConfig::default()
        };
        let mut r = Reassembler::with_config(&cfg);
        let outcomes = feed(&mut r, &[FLAG, 1, 2, 3, 4, 5]);
        assert!(outcomes[..5].iter().all(ReadOutcome::is_incomplete));
        assert!(matches!(
            outcomes[5],
            ReadOutcome::Error(FrameError::FrameTooLarge { capacity: 4 })
        ));
        assert_eq!(r.state(), LinkState::Accumulating);
        assert_eq!(r.buffered(), &[1, 2, 3, 4]);
        assert_eq!(r.stats().overflows, 1);

        r.reset();
        assert_eq!(r.state(), LinkState::Idle);
        assert!(r.buffered().is_empty());
        let got = frames(feed(&mut r, &[FLAG, 0x01, 0x03, 0x02, FLAG]));
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn frame_exactly_at_capacity_is_accepted() {
        let cfg = FrameConfig {
            buffer_capacity: 3,
            ..FrameConfig::default()
        };
        let mut r = Reassembler::with_config(&cfg);
        let got = frames(feed(&mut r, &[FLAG, 0x01, 0x03, 0x02, FLAG]));
        assert_eq!(got.len(), 1);
    }

    #[test]
    fn poll_reports_no_byte() {
        let mut transport = LoopbackTransport::with_input([FLAG, 0x01, 0x03, 0x02, FLAG]);
        let mut r = Reassembler::new();

        let mut got = None;
        for _ in 0..5 {
            if let ReadOutcome::Frame(frame) = r.poll(&mut transport).unwrap() {
                got = Some(frame);
            }
        }
        assert_eq!(got.unwrap().control(), 0x03);
        assert!(matches!(
            r.poll(&mut transport).unwrap(),
            ReadOutcome::NoByte
        ));
    }

    #[test]
    fn independent_instances() {
        let mut a = Reassembler::new();
        let mut b = Reassembler::new();
        a.push(FLAG);
        a.push(0x01);
        assert_eq!(b.state(), LinkState::Idle);
        b.push(FLAG);
        assert_eq!(a.buffered(), &[0x01]);
        assert!(b.buffered().is_empty());
    }
}
