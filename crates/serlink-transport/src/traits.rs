use std::io::{ErrorKind, Read, Write};

use crate::error::{Result, TransportError};

/// The two primitives a link framer needs from the wire.
///
/// `read_byte` must not block indefinitely when the transport has a
/// non-blocking contract: `Ok(None)` means "nothing yet, poll again".
pub trait ByteTransport {
    /// Read a single byte if one is available.
    fn read_byte(&mut self) -> Result<Option<u8>>;

    /// Write as much of `buf` as the transport accepts, returning the count.
    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize>;

    /// Flush buffered output, if the transport buffers at all.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for &mut T {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write_bytes(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

impl<T: ByteTransport + ?Sized> ByteTransport for Box<T> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        (**self).read_byte()
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        (**self).write_bytes(buf)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Adapts any `Read + Write` stream to [`ByteTransport`].
///
/// A serial line configured for non-blocking reads returns `Ok(0)` when
/// idle, so by default a zero-length read is "no byte available". Streams
/// where zero means end-of-stream (sockets, pipes) should be wrapped with
/// [`IoTransport::closing_on_eof`] instead.
pub struct IoTransport<T> {
    inner: T,
    eof_closes: bool,
}

impl<T: Read + Write> IoTransport<T> {
    /// Wrap a stream whose zero-length reads mean "idle".
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            eof_closes: false,
        }
    }

    /// Wrap a stream whose zero-length reads mean the peer is gone.
    pub fn closing_on_eof(inner: T) -> Self {
        Self {
            inner,
            eof_closes: true,
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Mutably borrow the underlying stream.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.inner
    }

    /// Consume the adapter and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

impl<T: Read + Write> ByteTransport for IoTransport<T> {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        let mut byte = [0u8; 1];
        loop {
            match self.inner.read(&mut byte) {
                Ok(0) if self.eof_closes => return Err(TransportError::Closed),
                Ok(0) => return Ok(None),
                Ok(_) => return Ok(Some(byte[0])),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err)
                    if matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
                {
                    return Ok(None)
                }
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        loop {
            match self.inner.write(buf) {
                Ok(n) => return Ok(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }

    fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(TransportError::Io(err)),
            }
        }
    }
}

impl<T> std::fmt::Debug for IoTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IoTransport")
            .field("eof_closes", &self.eof_closes)
            .finish_non_exhaustive()
    }
}
