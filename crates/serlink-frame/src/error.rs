use std::time::Duration;

use serlink_transport::TransportError;

/// Errors that can occur during frame encoding, decoding and reassembly.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The header check byte does not equal `address ^ control`.
    #[error("header check mismatch (computed 0x{computed:02x}, received 0x{received:02x})")]
    HeaderChecksumMismatch { computed: u8, received: u8 },

    /// The payload check byte does not equal the XOR of the payload.
    #[error("payload check mismatch (computed 0x{computed:02x}, received 0x{received:02x})")]
    PayloadChecksumMismatch { computed: u8, received: u8 },

    /// A delimited frame destuffed to fewer bytes than a header.
    #[error("frame truncated ({len} bytes, need at least 3)")]
    Truncated { len: usize },

    /// The receive buffer filled before an end marker arrived.
    #[error("frame too large (receive buffer capacity {capacity} bytes)")]
    FrameTooLarge { capacity: usize },

    /// The payload exceeds the configured maximum at encode time.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The byte transport failed.
    #[error("transport error: {0}")]
    Transport(#[source] TransportError),

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The transport stopped accepting or producing bytes.
    #[error("connection closed")]
    ConnectionClosed,

    /// No byte arrived within the configured idle timeout.
    #[error("no data received for {0:?}")]
    Timeout(Duration),
}

impl FrameError {
    /// True for integrity failures that feed the desync heuristic.
    pub fn is_check_failure(&self) -> bool {
        matches!(
            self,
            FrameError::HeaderChecksumMismatch { .. }
                | FrameError::PayloadChecksumMismatch { .. }
                | FrameError::Truncated { .. }
        )
    }
}

impl From<TransportError> for FrameError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Closed => FrameError::ConnectionClosed,
            TransportError::Io(io) => FrameError::Io(io),
            other => FrameError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, FrameError>;
