//! Address and control byte values.
//!
//! The framer treats both bytes as opaque, but the link protocol it carries
//! uses a small fixed vocabulary. The two address values double as the
//! default resynchronization bytes: after a lost end marker the next byte
//! on the wire is most likely the address of the following frame.

/// Address of commands sent by the transmitter (and replies by the receiver).
pub const ADDRESS_TX: u8 = 0x03;

/// Address of commands sent by the receiver (and replies by the transmitter).
pub const ADDRESS_RX: u8 = 0x01;

/// Link setup request.
pub const SET: u8 = 0x03;

/// Unnumbered acknowledgement.
pub const UA: u8 = 0x07;

/// Disconnect.
pub const DISC: u8 = 0x0B;

/// Receiver ready, expecting sequence 0.
pub const RR0: u8 = 0x05;

/// Receiver ready, expecting sequence 1.
pub const RR1: u8 = 0x85;

/// Reject, expecting sequence 0.
pub const REJ0: u8 = 0x01;

/// Reject, expecting sequence 1.
pub const REJ1: u8 = 0x81;

/// Information frame, sequence 0.
pub const I0: u8 = 0x00;

/// Information frame, sequence 1.
pub const I1: u8 = 0x40;

/// Information frame control byte for sequence bit `seq`.
pub fn information(seq: bool) -> u8 {
    if seq {
        I1
    } else {
        I0
    }
}

/// Receiver-ready control byte expecting sequence bit `seq`.
pub fn receiver_ready(seq: bool) -> u8 {
    if seq {
        RR1
    } else {
        RR0
    }
}

/// Reject control byte expecting sequence bit `seq`.
pub fn reject(seq: bool) -> u8 {
    if seq {
        REJ1
    } else {
        REJ0
    }
}

/// Returns true for information (data-carrying) control bytes.
pub fn is_information(control: u8) -> bool {
    control == I0 || control == I1
}

/// Returns a human-readable name for a control byte.
pub fn control_name(control: u8) -> &'static str {
    match control {
        SET => "SET",
        UA => "UA",
        DISC => "DISC",
        RR0 => "RR0",
        RR1 => "RR1",
        REJ0 => "REJ0",
        REJ1 => "REJ1",
        I0 => "I0",
        I1 => "I1",
        _ => "UNKNOWN",
    }
}

/// Returns a human-readable name for an address byte.
pub fn address_name(address: u8) -> &'static str {
    match address {
        ADDRESS_TX => "TX",
        ADDRESS_RX => "RX",
        _ => "OTHER",
    }
}
