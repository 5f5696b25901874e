use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Subcommand};
use serlink_frame::{FrameConfig, DEFAULT_BUFFER_CAPACITY, DEFAULT_MAX_PAYLOAD};
use serlink_transport::DEFAULT_BAUD_RATE;

use crate::exit::{io_error, CliError, CliResult};
use crate::output::OutputFormat;

pub mod decode;
pub mod encode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Encode one frame and print its wire bytes.
    Encode(EncodeArgs),
    /// Feed wire bytes through a reassembler and print every outcome.
    Decode(DecodeArgs),
    /// Write a single frame to a serial device.
    Send(SendArgs),
    /// Read frames from a serial device and print them.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Send(args) => send::run(args, format),
        Command::Listen(args) => listen::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// Header and payload of the frame to build.
#[derive(Args, Debug)]
pub struct FrameArgs {
    /// Control byte (e.g. 0x00 for I0, 0x03 for SET, 0x07 for UA).
    #[arg(long, short = 'c', default_value = "0x00", value_parser = parse_byte)]
    pub control: u8,
    /// Address byte.
    #[arg(long, short = 'a', default_value = "0x03", value_parser = parse_byte)]
    pub address: u8,
    /// Raw string payload.
    #[arg(long, conflicts_with_all = ["hex", "file"])]
    pub data: Option<String>,
    /// Hex-encoded payload.
    #[arg(long, conflicts_with_all = ["data", "file"])]
    pub hex: Option<String>,
    /// Read payload from file.
    #[arg(long, conflicts_with_all = ["data", "hex"])]
    pub file: Option<PathBuf>,
    /// Reject payloads longer than this.
    #[arg(long, default_value_t = DEFAULT_MAX_PAYLOAD)]
    pub max_payload: usize,
}

/// Receive-side tuning shared by `decode` and `listen`.
#[derive(Args, Debug)]
pub struct ReceiveArgs {
    /// Receive buffer capacity in stuffed bytes.
    #[arg(long, default_value_t = DEFAULT_BUFFER_CAPACITY)]
    pub buffer_capacity: usize,
    /// Resync bytes honored after a check failure (comma-separated).
    #[arg(long, value_delimiter = ',', value_parser = parse_byte)]
    pub resync: Option<Vec<u8>>,
}

impl ReceiveArgs {
    pub fn frame_config(&self) -> FrameConfig {
        let mut config = FrameConfig {
            buffer_capacity: self.buffer_capacity,
            ..FrameConfig::default()
        };
        if let Some(resync) = &self.resync {
            config.resync_bytes = resync.clone();
        }
        config
    }
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    #[command(flatten)]
    pub frame: FrameArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Wire bytes as hex (whitespace allowed). Reads stdin when omitted.
    #[arg(conflicts_with = "file")]
    pub input: Option<String>,
    /// Read raw wire bytes from file.
    #[arg(long)]
    pub file: Option<PathBuf>,
    #[command(flatten)]
    pub receive: ReceiveArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Serial device path.
    pub path: PathBuf,
    /// Line speed for tty devices.
    #[arg(long, short = 'b', default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    #[command(flatten)]
    pub frame: FrameArgs,
    /// Wait for one response frame and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait for a response when --wait is set (e.g. 5s, 500ms).
    #[arg(long, default_value = "5s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Serial device path.
    pub path: PathBuf,
    /// Line speed for tty devices.
    #[arg(long, short = 'b', default_value_t = DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// Exit after receiving N valid frames.
    #[arg(long)]
    pub count: Option<usize>,
    /// Exit with a timeout when no byte arrives for this long (e.g. 10s).
    #[arg(long)]
    pub idle_timeout: Option<String>,
    /// Sleep between polls of an idle device.
    #[arg(long, default_value = "1ms")]
    pub poll_interval: String,
    /// Exit on the first invalid frame instead of reporting and continuing.
    #[arg(long)]
    pub strict: bool,
    #[command(flatten)]
    pub receive: ReceiveArgs,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Parse a byte given as `0x7e`, `0X7E` or decimal.
pub fn parse_byte(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(digits) => u8::from_str_radix(digits, 16),
        None => input.parse::<u8>(),
    };
    parsed.map_err(|_| format!("invalid byte value: {input} (expected 0x00-0xff or 0-255)"))
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::usage("duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::usage(format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::usage("duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

/// Decode hex text, ignoring whitespace and an optional `0x` prefix.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let compact: String = input.split_whitespace().collect();
    let compact = compact.strip_prefix("0x").unwrap_or(&compact);
    hex::decode(compact).map_err(|err| CliError::usage(format!("invalid hex input: {err}")))
}

pub fn resolve_payload(args: &FrameArgs) -> CliResult<Vec<u8>> {
    if let Some(data) = &args.data {
        return Ok(data.as_bytes().to_vec());
    }
    if let Some(text) = &args.hex {
        return parse_hex(text);
    }
    if let Some(path) = &args.file {
        return read_file(path);
    }
    Ok(Vec::new())
}

pub fn read_file(path: &Path) -> CliResult<Vec<u8>> {
    fs::read(path).map_err(|err| io_error(&format!("failed reading {}", path.display()), err))
}

pub fn read_stdin() -> CliResult<Vec<u8>> {
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .map_err(|err| io_error("failed reading stdin", err))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_byte_hex_and_decimal() {
        assert_eq!(parse_byte("0x7e"), Ok(0x7E));
        assert_eq!(parse_byte("0X7D"), Ok(0x7D));
        assert_eq!(parse_byte("3"), Ok(3));
        assert_eq!(parse_byte(" 255 "), Ok(255));
    }

    #[test]
    fn parse_byte_rejects_out_of_range() {
        assert!(parse_byte("256").is_err());
        assert!(parse_byte("0x100").is_err());
        assert!(parse_byte("flag").is_err());
        assert!(parse_byte("").is_err());
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }

    #[test]
    fn parse_hex_ignores_whitespace() {
        assert_eq!(parse_hex("7e 01 03\n02 7e").unwrap(), vec![0x7E, 0x01, 0x03, 0x02, 0x7E]);
        assert_eq!(parse_hex("0x7d5e").unwrap(), vec![0x7D, 0x5E]);
        assert!(parse_hex("7").is_err());
    }

    #[test]
    fn receive_args_override_resync_bytes() {
        let args = ReceiveArgs {
            buffer_capacity: 64,
            resync: Some(vec![0x05]),
        };
        let config = args.frame_config();
        assert_eq!(config.buffer_capacity, 64);
        assert_eq!(config.resync_bytes, vec![0x05]);

        let defaults = ReceiveArgs {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            resync: None,
        };
        assert_eq!(defaults.frame_config().resync_bytes, vec![0x01, 0x03]);
    }
}
