//! Byte stuffing.
//!
//! Inside a frame the marker and escape values may never appear literally.
//! Each occurrence is replaced by `ESCAPE, byte ^ ESCAPE_MASK`:
//!
//! ```text
//! 0x7E  ->  0x7D 0x5E
//! 0x7D  ->  0x7D 0x5D
//! ```

use bytes::{BufMut, BytesMut};

/// Frame delimiter.
pub const FLAG: u8 = 0x7E;

/// Marks the following byte as transformed.
pub const ESCAPE: u8 = 0x7D;

/// XOR mask applied to an escaped byte.
pub const ESCAPE_MASK: u8 = 0x20;

/// Returns true if `byte` must be escaped inside a frame.
#[inline]
pub fn needs_escape(byte: u8) -> bool {
    byte == FLAG || byte == ESCAPE
}

/// Length of `raw` after stuffing.
pub fn stuffed_len(raw: &[u8]) -> usize {
    raw.len() + raw.iter().filter(|&&b| needs_escape(b)).count()
}

/// Append the stuffed form of `raw` to `dst`.
pub fn stuff_into(raw: &[u8], dst: &mut BytesMut) {
    dst.reserve(stuffed_len(raw));
    for &byte in raw {
        if needs_escape(byte) {
            dst.put_u8(ESCAPE);
            dst.put_u8(byte ^ ESCAPE_MASK);
        } else {
            dst.put_u8(byte);
        }
    }
}

/// Stuff `raw` into a new buffer.
pub fn stuff(raw: &[u8]) -> BytesMut {
    let mut dst = BytesMut::new();
    stuff_into(raw, &mut dst);
    dst
}

/// Append the destuffed form of `stuffed` to `dst`.
///
/// A trailing `ESCAPE` with no following byte is dropped silently.
pub fn destuff_into(stuffed: &[u8], dst: &mut BytesMut) {
    dst.reserve(stuffed.len());
    let mut bytes = stuffed.iter().copied();
    while let Some(byte) = bytes.next() {
        if byte == ESCAPE {
            if let Some(next) = bytes.next() {
                dst.put_u8(next ^ ESCAPE_MASK);
            }
        } else {
            dst.put_u8(byte);
        }
    }
}

/// Destuff `stuffed` into a new buffer.
pub fn destuff(stuffed: &[u8]) -> BytesMut {
    let mut dst = BytesMut::new();
    destuff_into(stuffed, &mut dst);
    dst
}

#[cfg(test)]
mod tests {
    use quickcheck_macros::quickcheck;

    use super::*;

    #[test]
    fn plain_bytes_pass_through() {
        let data = b"hello serial";
        assert_eq!(stuff(data).as_ref(), data);
        assert_eq!(destuff(data).as_ref(), data);
    }

    #[test]
    fn flag_is_escaped() {
        assert_eq!(stuff(&[FLAG]).as_ref(), &[0x7D, 0x5E]);
    }

    #[test]
    fn escape_is_escaped() {
        assert_eq!(stuff(&[ESCAPE]).as_ref(), &[0x7D, 0x5D]);
    }

    #[test]
    fn mixed_sequence() {
        let raw = [0x01, FLAG, 0x02, ESCAPE, 0x03];
        let expected = [0x01, 0x7D, 0x5E, 0x02, 0x7D, 0x5D, 0x03];
        assert_eq!(stuff(&raw).as_ref(), &expected);
        assert_eq!(destuff(&expected).as_ref(), &raw);
    }

    #[test]
    fn trailing_escape_is_dropped() {
        assert_eq!(destuff(&[0x01, ESCAPE]).as_ref(), &[0x01]);
        assert!(destuff(&[ESCAPE]).is_empty());
    }

    #[test]
    fn escape_applies_mask_to_any_follower() {
        // Not produced by `stuff`, but tolerated on receive.
        assert_eq!(destuff(&[ESCAPE, 0x41]).as_ref(), &[0x61]);
    }

    #[test]
    fn stuff_into_appends() {
        let mut dst = BytesMut::from(&[0xAA][..]);
        stuff_into(&[FLAG], &mut dst);
        assert_eq!(dst.as_ref(), &[0xAA, 0x7D, 0x5E]);
    }

    #[test]
    fn stuffed_len_counts_escapes() {
        assert_eq!(stuffed_len(&[]), 0);
        assert_eq!(stuffed_len(&[FLAG, ESCAPE, 0x00]), 5);
    }

    #[test]
    fn all_byte_values_roundtrip() {
        let raw: Vec<u8> = (0..=255).collect();
        let stuffed = stuff(&raw);
        assert_eq!(stuffed.len(), 258);
        assert_eq!(destuff(&stuffed).as_ref(), raw.as_slice());
    }

    #[quickcheck]
    fn destuff_inverts_stuff(raw: Vec<u8>) -> bool {
        destuff(&stuff(&raw)).as_ref() == raw.as_slice()
    }

    #[quickcheck]
    fn stuffed_output_has_no_bare_flag(raw: Vec<u8>) -> bool {
        !stuff(&raw).contains(&FLAG)
    }

    #[quickcheck]
    fn every_escape_is_a_prefix(raw: Vec<u8>) -> bool {
        let stuffed = stuff(&raw);
        let mut i = 0;
        while i < stuffed.len() {
            if stuffed[i] == ESCAPE {
                match stuffed.get(i + 1) {
                    Some(&next) if next == 0x5E || next == 0x5D => i += 2,
                    _ => return false,
                }
            } else {
                i += 1;
            }
        }
        stuffed.len() == stuffed_len(&raw)
    }
}
