//! HDLC-style link framing for serial lines.
//!
//! serlink turns logical frames (address, control, payload) into
//! flag-delimited, byte-stuffed wire bytes with XOR check bytes, and
//! reassembles them from a raw byte stream one byte at a time.
//!
//! # Crate Structure
//!
//! - [`transport`]: The byte transport seam (any `Read + Write`, device paths, loopback)
//! - [`frame`]: Byte stuffing, check bytes, frame codec and the stream reassembler

/// Re-export transport types.
pub mod transport {
    pub use serlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use serlink_frame::*;
}
