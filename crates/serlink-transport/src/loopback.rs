use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, TransportError};
use crate::traits::ByteTransport;

type Queue = Arc<Mutex<VecDeque<u8>>>;

/// An in-memory byte transport.
///
/// [`LoopbackTransport::pair`] returns two ends wired back to back: bytes
/// written on one end are read from the other. Useful for exercising a
/// writer and a reader without a device, and for injecting line noise by
/// pushing bytes directly with [`LoopbackTransport::inject`].
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    rx: Queue,
    tx: Queue,
    max_write: Option<usize>,
    closed: bool,
}

impl LoopbackTransport {
    /// Two connected ends.
    pub fn pair() -> (Self, Self) {
        let a: Queue = Arc::default();
        let b: Queue = Arc::default();
        (
            Self {
                rx: Arc::clone(&a),
                tx: Arc::clone(&b),
                max_write: None,
                closed: false,
            },
            Self {
                rx: b,
                tx: a,
                max_write: None,
                closed: false,
            },
        )
    }

    /// A single end whose receive side is preloaded with `bytes`.
    pub fn with_input(bytes: impl AsRef<[u8]>) -> Self {
        let (near, _far) = Self::pair();
        near.inject(bytes.as_ref());
        near
    }

    /// Accept at most `limit` bytes per `write_bytes` call.
    pub fn with_max_write(mut self, limit: usize) -> Self {
        self.max_write = Some(limit);
        self
    }

    /// Append bytes to this end's receive queue.
    pub fn inject(&self, bytes: &[u8]) {
        lock(&self.rx).extend(bytes.iter().copied());
    }

    /// Drain everything written from this end that the peer has not read.
    pub fn take_written(&self) -> Vec<u8> {
        lock(&self.tx).drain(..).collect()
    }

    /// Number of bytes waiting to be read on this end.
    pub fn pending(&self) -> usize {
        lock(&self.rx).len()
    }

    /// Refuse all further writes with [`TransportError::Closed`].
    pub fn close(&mut self) {
        self.closed = true;
    }
}

impl ByteTransport for LoopbackTransport {
    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(lock(&self.rx).pop_front())
    }

    fn write_bytes(&mut self, buf: &[u8]) -> Result<usize> {
        if self.closed {
            return Err(TransportError::Closed);
        }
        let n = self.max_write.map_or(buf.len(), |limit| limit.min(buf.len()));
        lock(&self.tx).extend(buf[..n].iter().copied());
        Ok(n)
    }
}

fn lock(queue: &Queue) -> MutexGuard<'_, VecDeque<u8>> {
    queue.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_is_cross_wired() {
        let (mut left, mut right) = LoopbackTransport::pair();
        left.write_bytes(b"ab").unwrap();
        assert_eq!(right.read_byte().unwrap(), Some(b'a'));
        assert_eq!(right.read_byte().unwrap(), Some(b'b'));
        assert_eq!(right.read_byte().unwrap(), None);
        assert_eq!(left.read_byte().unwrap(), None);
    }

    #[test]
    fn preloaded_input() {
        let mut end = LoopbackTransport::with_input([1, 2]);
        assert_eq!(end.pending(), 2);
        assert_eq!(end.read_byte().unwrap(), Some(1));
        assert_eq!(end.pending(), 1);
    }

    #[test]
    fn partial_writes() {
        let (left, right) = LoopbackTransport::pair();
        let mut left = left.with_max_write(2);
        assert_eq!(left.write_bytes(&[1, 2, 3, 4, 5]).unwrap(), 2);
        assert_eq!(left.take_written(), vec![1, 2]);
        assert_eq!(right.pending(), 0);
    }

    #[test]
    fn closed_end_rejects_writes() {
        let (mut left, _right) = LoopbackTransport::pair();
        left.close();
        assert!(matches!(
            left.write_bytes(&[1]),
            Err(TransportError::Closed)
        ));
    }

    #[test]
    fn works_across_threads() {
        let (mut left, mut right) = LoopbackTransport::pair();
        let handle = std::thread::spawn(move || {
            left.write_bytes(&[0x7E; 16]).unwrap();
        });
        handle.join().unwrap();

        let mut count = 0;
        while right.read_byte().unwrap().is_some() {
            count += 1;
        }
        assert_eq!(count, 16);
    }
}
