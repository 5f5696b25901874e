//! Single-byte XOR check values (BCC).

/// XOR-reduction of `buf[start..start + len]`.
///
/// Panics if the range is out of bounds; callers own the range.
pub fn checksum(buf: &[u8], start: usize, len: usize) -> u8 {
    xor(&buf[start..start + len])
}

/// XOR-reduction of every byte in `bytes`. Zero for an empty slice.
#[inline]
pub fn xor(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, &b| acc ^ b)
}

/// Header check byte for an address/control pair.
#[inline]
pub fn header_check(address: u8, control: u8) -> u8 {
    address ^ control
}
