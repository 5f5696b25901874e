use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serlink_frame::{FrameError, FrameReader, ReadOutcome};
use serlink_transport::{DeviceConfig, SerialDevice};
use tracing::info;

use crate::cmd::{parse_duration, ListenArgs};
use crate::exit::{frame_error, transport_error, CliError, CliResult, INTERNAL, SUCCESS};
use crate::output::{print_error, print_frame, print_stats, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    let idle_timeout = args
        .idle_timeout
        .as_deref()
        .map(parse_duration)
        .transpose()?;
    let poll_interval = parse_duration(&args.poll_interval)?;

    let device = DeviceConfig {
        baud_rate: args.baud,
        read_timeout: poll_interval,
    };
    let transport = SerialDevice::open_transport(&args.path, &device)
        .map_err(|err| transport_error("open failed", err))?;
    let mut config = args.receive.frame_config();
    config.poll_interval = poll_interval;
    config.idle_timeout = idle_timeout;
    let mut reader = FrameReader::with_config(transport, config);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;
    info!(path = %args.path.display(), "listening");

    let mut printed = 0usize;
    let mut last_byte = Instant::now();

    // Poll here rather than in `read_frame` so Ctrl-C is seen while idle.
    while running.load(Ordering::SeqCst) {
        let outcome = reader
            .poll()
            .map_err(|err| frame_error("receive failed", err))?;
        match outcome {
            ReadOutcome::Frame(frame) => {
                last_byte = Instant::now();
                print_frame(&frame, format);
                printed = printed.saturating_add(1);
                if args.count.is_some_and(|count| printed >= count) {
                    return Ok(SUCCESS);
                }
            }
            ReadOutcome::Error(err) => {
                last_byte = Instant::now();
                print_error(&err, format);
                if args.strict {
                    return Err(frame_error("invalid frame", err));
                }
                if matches!(err, FrameError::FrameTooLarge { .. }) {
                    reader.reset();
                }
            }
            ReadOutcome::Incomplete => last_byte = Instant::now(),
            ReadOutcome::NoByte => {
                if let Some(timeout) = idle_timeout {
                    if last_byte.elapsed() >= timeout {
                        print_stats(&reader.stats(), format);
                        return Err(frame_error("listen", FrameError::Timeout(timeout)));
                    }
                }
                std::thread::sleep(poll_interval);
            }
        }
    }

    print_stats(&reader.stats(), format);
    Ok(SUCCESS)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}
