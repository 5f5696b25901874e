//! Byte-at-a-time transport abstraction for serial links.
//!
//! The framer never talks to a device directly. It only needs two
//! primitives, captured by [`ByteTransport`]:
//! - read one byte, reporting whether one was available
//! - write a buffer, reporting how many bytes were accepted
//!
//! Implementations provided here:
//! - [`IoTransport`] adapts any `Read + Write` stream
//! - [`SerialDevice`] opens a tty through `serialport` (or any other node
//!   non-blocking) by path
//! - [`LoopbackTransport`] is an in-memory pair for tests and simulation

pub mod device;
pub mod error;
pub mod loopback;
pub mod traits;

pub use device::{DeviceConfig, SerialDevice, DEFAULT_BAUD_RATE};
pub use error::{Result, TransportError};
pub use loopback::LoopbackTransport;
pub use traits::{ByteTransport, IoTransport};
