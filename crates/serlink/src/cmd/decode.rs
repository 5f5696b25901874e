use serlink_frame::{FrameError, LinkState, ReadOutcome, Reassembler, ReassemblerStats};
use tracing::warn;

use crate::cmd::{parse_hex, read_file, read_stdin, DecodeArgs};
use crate::exit::{CliResult, DATA_INVALID, SUCCESS};
use crate::output::{print_error, print_frame, print_stats, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat) -> CliResult<i32> {
    let bytes = match (&args.input, &args.file) {
        (Some(text), _) => parse_hex(text)?,
        (None, Some(path)) => read_file(path)?,
        (None, None) => read_stdin()?,
    };

    let mut reassembler = Reassembler::with_config(&args.receive.frame_config());
    let stats = feed(&mut reassembler, &bytes, format);
    print_stats(&stats, format);

    if stats.frames == 0 && invalid_count(&stats) == 0 && !bytes.is_empty() {
        warn!(len = bytes.len(), "no frame boundaries found in input");
    }
    Ok(if invalid_count(&stats) > 0 {
        DATA_INVALID
    } else {
        SUCCESS
    })
}

/// Push every byte, printing each completed frame or error.
fn feed(reassembler: &mut Reassembler, bytes: &[u8], format: OutputFormat) -> ReassemblerStats {
    for &byte in bytes {
        match reassembler.push(byte) {
            ReadOutcome::Frame(frame) => print_frame(&frame, format),
            ReadOutcome::Error(err) => {
                print_error(&err, format);
                if matches!(err, FrameError::FrameTooLarge { .. }) {
                    reassembler.reset();
                }
            }
            ReadOutcome::Incomplete | ReadOutcome::NoByte => {}
        }
    }

    if reassembler.state() == LinkState::Accumulating && !reassembler.buffered().is_empty() {
        warn!(
            buffered = reassembler.buffered().len(),
            "input ended inside a frame"
        );
    }
    reassembler.stats()
}

fn invalid_count(stats: &ReassemblerStats) -> u64 {
    stats.header_check_failures + stats.payload_check_failures + stats.truncated + stats.overflows
}
