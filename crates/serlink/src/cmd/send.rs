use serlink_frame::{Frame, FrameConfig, FrameReader, FrameWriter};
use serlink_transport::{DeviceConfig, SerialDevice};
use tracing::info;

use crate::cmd::{parse_duration, resolve_payload, SendArgs};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = resolve_payload(&args.frame)?;
    let frame = Frame::try_encode(
        args.frame.control,
        args.frame.address,
        payload,
        args.frame.max_payload,
    )
    .map_err(|err| frame_error("encode failed", err))?;

    let device = DeviceConfig {
        baud_rate: args.baud,
        ..DeviceConfig::default()
    };
    let transport = SerialDevice::open_transport(&args.path, &device)
        .map_err(|err| transport_error("open failed", err))?;
    let config = FrameConfig {
        max_payload_size: args.frame.max_payload,
        idle_timeout: Some(wait_timeout),
        ..FrameConfig::default()
    };

    let mut writer = FrameWriter::with_config(transport, config.clone());
    let written = writer
        .write_frame(&frame)
        .map_err(|err| frame_error("send failed", err))?;
    info!(path = %args.path.display(), bytes = written, "frame sent");

    if args.wait {
        let mut reader = FrameReader::with_config(writer.into_inner(), config);
        let reply = reader
            .read_valid_frame()
            .map_err(|err| frame_error("receive failed", err))?;
        print_frame(&reply, format);
    }

    Ok(SUCCESS)
}
