//! Link setup, acknowledged data and teardown over an in-memory loopback.
//!
//! One information frame is damaged on the line; the receiver answers it
//! with REJ and the sender retransmits.
//!
//! Run with:
//!   cargo run --example loopback

use serlink::frame::control::{control_name, information, receiver_ready, reject, DISC, SET, UA};
use serlink::frame::{Frame, FrameReader, FrameWriter, ADDRESS_RX, ADDRESS_TX, DEFAULT_MAX_PAYLOAD};
use serlink::transport::LoopbackTransport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (a, b) = LoopbackTransport::pair();
    let mut a_tx = FrameWriter::new(a.clone());
    let mut a_rx = FrameReader::new(a);
    let mut b_tx = FrameWriter::new(b.clone());
    let mut b_rx = FrameReader::new(b);

    a_tx.write_frame(&Frame::control_frame(SET, ADDRESS_TX))?;
    let set = b_rx.read_frame()?;
    eprintln!("b <- SET (address 0x{:02x})", set.address());
    b_tx.write_frame(&Frame::control_frame(UA, ADDRESS_RX))?;
    a_rx.read_frame()?;
    eprintln!("a <- UA");

    let mut seq = false;
    for (i, chunk) in ["hello", "~flag~", "}escape}"].iter().enumerate() {
        let frame = Frame::try_encode(information(seq), ADDRESS_TX, chunk.as_bytes().to_vec(), DEFAULT_MAX_PAYLOAD)?;

        if i == 1 {
            // Flip one payload bit on the way to `b`.
            let mut damaged = frame.to_wire().to_vec();
            damaged[5] ^= 0x01;
            b_rx.get_ref().inject(&damaged);
        } else {
            a_tx.write_frame(&frame)?;
        }

        let reply = loop {
            match b_rx.read_frame() {
                Ok(received) => {
                    let payload = received.into_payload();
                    eprintln!("b <- {} {:?}", control_name(frame.control()), String::from_utf8_lossy(&payload));
                    break receiver_ready(!seq);
                }
                Err(err) if err.is_check_failure() => {
                    eprintln!("b rejects damaged frame: {err}");
                    b_tx.write_frame(&Frame::control_frame(reject(seq), ADDRESS_RX))?;
                    let rej = a_rx.read_frame()?;
                    eprintln!("a <- {}, retransmitting", control_name(rej.control()));
                    a_tx.write_frame(&frame)?;
                }
                Err(err) => return Err(err.into()),
            }
        };

        b_tx.write_frame(&Frame::control_frame(reply, ADDRESS_RX))?;
        let ack = a_rx.read_frame()?;
        eprintln!("a <- {}", control_name(ack.control()));
        seq = !seq;
    }

    a_tx.write_frame(&Frame::control_frame(DISC, ADDRESS_TX))?;
    b_rx.read_frame()?;
    eprintln!("b <- DISC, stats: {:?}", b_rx.stats());
    Ok(())
}
