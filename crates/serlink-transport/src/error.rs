use std::path::PathBuf;

/// Errors that can occur in byte transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the device at the specified path.
    #[error("failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the underlying stream.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The remote end is gone; no further bytes will arrive.
    #[error("transport closed")]
    Closed,
}

impl TransportError {
    /// True when the error only means "try again later".
    pub fn is_would_block(&self) -> bool {
        matches!(
            self,
            TransportError::Io(err) if err.kind() == std::io::ErrorKind::WouldBlock
        )
    }
}

pub type Result<T> = std::result::Result<T, TransportError>;
