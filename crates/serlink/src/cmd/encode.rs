use serlink_frame::Frame;
use tracing::debug;

use crate::cmd::{resolve_payload, EncodeArgs};
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_encoded, OutputFormat};

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let payload = resolve_payload(&args.frame)?;
    let frame = Frame::try_encode(
        args.frame.control,
        args.frame.address,
        payload,
        args.frame.max_payload,
    )
    .map_err(|err| frame_error("encode failed", err))?;

    let wire = frame.to_wire();
    debug!(raw = frame.raw_len(), wire = wire.len(), "encoded frame");
    print_encoded(&frame, &wire, format);
    Ok(SUCCESS)
}
