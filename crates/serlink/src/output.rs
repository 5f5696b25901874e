use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use serlink_frame::control::{address_name, control_name};
use serlink_frame::{Frame, FrameError, ReassemblerStats};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    kind: &'a str,
    address: u8,
    address_name: &'a str,
    control: u8,
    control_name: &'a str,
    payload_size: usize,
    payload: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &'a Frame) -> Self {
        Self {
            kind: "frame",
            address: frame.address(),
            address_name: address_name(frame.address()),
            control: frame.control(),
            control_name: control_name(frame.control()),
            payload_size: frame.payload().len(),
            payload: hex::encode(frame.payload()),
            text: printable(frame.payload()),
        }
    }
}

#[derive(Serialize)]
struct ErrorOutput {
    kind: &'static str,
    check_failure: bool,
    message: String,
}

#[derive(Serialize)]
struct EncodedOutput<'a> {
    address: u8,
    control: u8,
    control_name: &'a str,
    payload_size: usize,
    wire_size: usize,
    wire: String,
}

pub fn print_frame(frame: &Frame, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&FrameOutput::new(frame)),
        OutputFormat::Table => {
            let out = FrameOutput::new(frame);
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["ADDRESS", "CONTROL", "SIZE", "PAYLOAD"])
                .add_row(vec![
                    format!("0x{:02x} ({})", out.address, out.address_name),
                    format!("0x{:02x} ({})", out.control, out.control_name),
                    out.payload_size.to_string(),
                    payload_preview(frame.payload()),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "address=0x{:02x} ({}) control=0x{:02x} ({}) size={} payload={}",
                frame.address(),
                address_name(frame.address()),
                frame.control(),
                control_name(frame.control()),
                frame.payload().len(),
                payload_preview(frame.payload())
            );
        }
        OutputFormat::Raw => print_raw(frame.payload()),
    }
}

pub fn print_error(err: &FrameError, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ErrorOutput {
            kind: "error",
            check_failure: err.is_check_failure(),
            message: err.to_string(),
        }),
        OutputFormat::Table | OutputFormat::Pretty => println!("invalid frame: {err}"),
        // Raw output carries payloads only.
        OutputFormat::Raw => {}
    }
}

pub fn print_encoded(frame: &Frame, wire: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&EncodedOutput {
            address: frame.address(),
            control: frame.control(),
            control_name: control_name(frame.control()),
            payload_size: frame.payload().len(),
            wire_size: wire.len(),
            wire: hex::encode(wire),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CONTROL", "ADDRESS", "SIZE", "WIRE"])
                .add_row(vec![
                    format!("0x{:02x} ({})", frame.control(), control_name(frame.control())),
                    format!("0x{:02x}", frame.address()),
                    wire.len().to_string(),
                    spaced_hex(wire),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", spaced_hex(wire)),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_stats(stats: &ReassemblerStats, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["COUNTER", "VALUE"]);
            for (name, value) in stats_rows(stats) {
                table.add_row(vec![name.to_string(), value.to_string()]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            let line = stats_rows(stats)
                .iter()
                .map(|(name, value)| format!("{name}={value}"))
                .collect::<Vec<_>>()
                .join(" ");
            println!("stats: {line}");
        }
        OutputFormat::Json | OutputFormat::Raw => {}
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

/// Lower-case hex, one space between bytes.
pub fn spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn stats_rows(stats: &ReassemblerStats) -> [(&'static str, u64); 7] {
    [
        ("frames", stats.frames),
        ("header_check_failures", stats.header_check_failures),
        ("payload_check_failures", stats.payload_check_failures),
        ("truncated", stats.truncated),
        ("overflows", stats.overflows),
        ("resyncs", stats.resyncs),
        ("ignored_bytes", stats.ignored_bytes),
    ]
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn printable(payload: &[u8]) -> Option<&str> {
    std::str::from_utf8(payload)
        .ok()
        .filter(|text| !text.is_empty() && !text.chars().any(char::is_control))
}

fn payload_preview(payload: &[u8]) -> String {
    match printable(payload) {
        Some(text) => text.to_string(),
        None if payload.is_empty() => "-".to_string(),
        None => spaced_hex(payload),
    }
}
