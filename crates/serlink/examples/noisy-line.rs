//! Reassembly over a line that drops and corrupts bytes.
//!
//! Frames are written into a loopback, then the byte stream is damaged
//! before the receiver sees it. The reader skips invalid frames and
//! reports what it recovered.
//!
//! Run with:
//!   cargo run --example noisy-line

use serlink::frame::{Frame, FrameConfig, FrameError, FrameReader, DEFAULT_MAX_PAYLOAD, FLAG};
use serlink::transport::LoopbackTransport;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let frames: Vec<Frame> = (0u8..8)
        .map(|i| {
            let payload = vec![i, FLAG, i.wrapping_mul(31)];
            Frame::encode(if i % 2 == 0 { 0x00 } else { 0x40 }, 0x03, payload, DEFAULT_MAX_PAYLOAD)
        })
        .collect();

    let mut line = Vec::new();
    for (i, frame) in frames.iter().enumerate() {
        let mut wire = frame.to_wire().to_vec();
        match i {
            // Flip a payload bit.
            2 => wire[5] ^= 0x04,
            // Lose the end marker.
            5 => {
                wire.pop();
            }
            _ => {}
        }
        line.extend(wire);
    }

    let config = FrameConfig {
        idle_timeout: Some(std::time::Duration::from_millis(50)),
        ..FrameConfig::default()
    };
    let mut reader = FrameReader::with_config(LoopbackTransport::with_input(&line), config);

    let mut received = 0;
    loop {
        match reader.read_valid_frame() {
            Ok(frame) => {
                received += 1;
                println!("frame control=0x{:02x} payload={:02x?}", frame.control(), frame.payload().as_ref());
            }
            Err(FrameError::Timeout(_)) => break,
            Err(err) => return Err(err.into()),
        }
    }

    println!("sent {} frames, received {received}", frames.len());
    println!("{:?}", reader.stats());
    Ok(())
}
