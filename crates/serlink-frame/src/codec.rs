use bytes::{BufMut, Bytes, BytesMut};
use tracing::error;

use crate::checksum::{header_check, xor};
use crate::control::{ADDRESS_RX, ADDRESS_TX};
use crate::error::{FrameError, Result};
use crate::stuffing::{stuff_into, stuffed_len, FLAG};

/// Raw header: address (1) + control (1) + header check (1) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Default maximum payload size accepted at encode time.
pub const DEFAULT_MAX_PAYLOAD: usize = 1024;

/// Default receive buffer capacity (stuffed bytes between markers).
///
/// Large enough for a worst-case stuffed frame carrying
/// [`DEFAULT_MAX_PAYLOAD`] bytes.
pub const DEFAULT_BUFFER_CAPACITY: usize = 2 * (HEADER_SIZE + DEFAULT_MAX_PAYLOAD + 1);

/// Default bytes that signal a likely lost marker after a check failure.
pub const DEFAULT_RESYNC_BYTES: [u8; 2] = [ADDRESS_RX, ADDRESS_TX];

/// A logical link frame.
///
/// The check bytes are always consistent with the fields they cover:
/// frames are only built through [`Frame::try_encode`], [`Frame::encode`]
/// or [`decode_frame`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Frame {
    address: u8,
    control: u8,
    header_check: u8,
    payload: Bytes,
    payload_check: Option<u8>,
}

impl Frame {
    /// Build a frame, failing if the payload exceeds `max_payload`.
    pub fn try_encode(
        control: u8,
        address: u8,
        payload: impl Into<Bytes>,
        max_payload: usize,
    ) -> Result<Self> {
        let payload = payload.into();
        if payload.len() > max_payload {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: max_payload,
            });
        }

        let payload_check = (!payload.is_empty()).then(|| xor(&payload));
        Ok(Self {
            address,
            control,
            header_check: header_check(address, control),
            payload,
            payload_check,
        })
    }

    /// Build a frame, yielding the empty [`Frame::sentinel`] if the payload
    /// exceeds `max_payload`. The failure is logged at error level.
    pub fn encode(control: u8, address: u8, payload: impl Into<Bytes>, max_payload: usize) -> Self {
        Self::try_encode(control, address, payload, max_payload).unwrap_or_else(|err| {
            error!(control, address, error = %err, "frame construction aborted");
            Self::sentinel()
        })
    }

    /// A payload-less link control frame. Never fails.
    pub fn control_frame(control: u8, address: u8) -> Self {
        Self {
            address,
            control,
            header_check: header_check(address, control),
            payload: Bytes::new(),
            payload_check: None,
        }
    }

    /// The all-zero frame returned when construction is aborted.
    pub fn sentinel() -> Self {
        Self::default()
    }

    /// True if this is the all-zero sentinel.
    pub fn is_sentinel(&self) -> bool {
        *self == Self::sentinel()
    }

    pub fn address(&self) -> u8 {
        self.address
    }

    pub fn control(&self) -> u8 {
        self.control
    }

    pub fn header_check(&self) -> u8 {
        self.header_check
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Present iff the payload is non-empty.
    pub fn payload_check(&self) -> Option<u8> {
        self.payload_check
    }

    /// A frame with no payload.
    pub fn is_control_frame(&self) -> bool {
        self.payload.is_empty()
    }

    /// Consume the frame and return its payload.
    pub fn into_payload(self) -> Bytes {
        self.payload
    }

    /// Unstuffed frame content, without markers.
    pub fn raw_len(&self) -> usize {
        HEADER_SIZE + self.payload.len() + usize::from(self.payload_check.is_some())
    }

    /// Append the unstuffed frame content (no markers) to `dst`.
    pub fn write_raw(&self, dst: &mut BytesMut) {
        dst.reserve(self.raw_len());
        dst.put_u8(self.address);
        dst.put_u8(self.control);
        dst.put_u8(self.header_check);
        if let Some(check) = self.payload_check {
            dst.put_slice(&self.payload);
            dst.put_u8(check);
        }
    }

    /// The unstuffed frame content as a new buffer.
    pub fn to_raw(&self) -> Bytes {
        let mut dst = BytesMut::with_capacity(self.raw_len());
        self.write_raw(&mut dst);
        dst.freeze()
    }

    /// Total size on the wire: markers plus stuffed content.
    pub fn wire_size(&self) -> usize {
        2 + stuffed_len(&self.to_raw())
    }

    /// The complete wire form as a new buffer.
    pub fn to_wire(&self) -> Bytes {
        let mut dst = BytesMut::new();
        serialize_frame(self, &mut dst);
        dst.freeze()
    }
}

/// Serialize a frame into its wire form and append it to `dst`.
///
/// Wire format:
/// ```text
/// ┌──────┬─────────┬─────────┬──────────┬──────────────┬───────────┬──────┐
/// │ 0x7E │ Address │ Control │ Addr^Ctl │ Payload ...  │ XOR(pay.) │ 0x7E │
/// │ flag │  (1B)   │  (1B)   │   (1B)   │ (0..N bytes) │ (1B, iff  │ flag │
/// │      │         │         │          │              │  N > 0)   │      │
/// └──────┴─────────┴─────────┴──────────┴──────────────┴───────────┴──────┘
/// ```
/// Everything between the two flags is byte-stuffed; the flags are not.
pub fn serialize_frame(frame: &Frame, dst: &mut BytesMut) {
    let raw = frame.to_raw();
    dst.reserve(2 + stuffed_len(&raw));
    dst.put_u8(FLAG);
    stuff_into(&raw, dst);
    dst.put_u8(FLAG);
}

/// Parse destuffed frame content (no markers) into a frame.
///
/// The header check is verified before the payload is looked at.
pub fn decode_frame(raw: &[u8]) -> Result<Frame> {
    if raw.len() < HEADER_SIZE {
        return Err(FrameError::Truncated { len: raw.len() });
    }

    let address = raw[0];
    let control = raw[1];
    let computed_header = header_check(address, control);
    if raw[2] != computed_header {
        return Err(FrameError::HeaderChecksumMismatch {
            computed: computed_header,
            received: raw[2],
        });
    }

    if raw.len() == HEADER_SIZE {
        return Ok(Frame::control_frame(control, address));
    }

    let (payload, trailer) = raw[HEADER_SIZE..].split_at(raw.len() - HEADER_SIZE - 1);
    let received = trailer[0];
    let computed = xor(payload);
    if received != computed {
        return Err(FrameError::PayloadChecksumMismatch { computed, received });
    }

    Ok(Frame {
        address,
        control,
        header_check: computed_header,
        payload: Bytes::copy_from_slice(payload),
        payload_check: (!payload.is_empty()).then_some(received),
    })
}

/// Configuration for framing and reassembly.
#[derive(Debug, Clone)]
pub struct FrameConfig {
    /// Maximum payload size accepted at encode time. Default: 1024 bytes.
    pub max_payload_size: usize,
    /// Receive buffer capacity in stuffed bytes. Default: 2056 bytes.
    pub buffer_capacity: usize,
    /// Bytes treated as a resync signal right after a check failure.
    pub resync_bytes: Vec<u8>,
    /// Sleep between polls when the transport has no byte available.
    pub poll_interval: std::time::Duration,
    /// Give up a blocking read after this long without any byte.
    pub idle_timeout: Option<std::time::Duration>,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            max_payload_size: DEFAULT_MAX_PAYLOAD,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            resync_bytes: DEFAULT_RESYNC_BYTES.to_vec(),
            poll_interval: std::time::Duration::from_millis(1),
            idle_timeout: None,
        }
    }
}
