//! HDLC-style framing for byte streams such as serial lines.
//!
//! Every frame on the wire looks like:
//! - a `0x7E` flag
//! - address, control and their XOR (the header check)
//! - for data frames, the payload followed by its XOR (the payload check)
//! - a closing `0x7E` flag
//!
//! Everything between the flags is byte-stuffed so the flag never appears
//! inside a frame. Reception is incremental, one byte at a time, and
//! recovers from lost flags without external help.

#[cfg(feature = "async")]
pub mod async_codec;
pub mod checksum;
pub mod codec;
pub mod control;
pub mod error;
pub mod reader;
pub mod reassembler;
pub mod stuffing;
pub mod writer;

#[cfg(feature = "async")]
pub use async_codec::LinkCodec;
pub use checksum::checksum;
pub use codec::{
    decode_frame, serialize_frame, Frame, FrameConfig, DEFAULT_BUFFER_CAPACITY,
    DEFAULT_MAX_PAYLOAD, DEFAULT_RESYNC_BYTES, HEADER_SIZE,
};
pub use control::{control_name, ADDRESS_RX, ADDRESS_TX};
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use reassembler::{LinkState, ReadOutcome, Reassembler, ReassemblerStats};
pub use stuffing::{destuff, stuff, ESCAPE, FLAG};
pub use writer::FrameWriter;
