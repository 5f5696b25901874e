#![cfg(feature = "cli")]

use std::io::Write;
use std::process::{Command, Output, Stdio};

fn serlink(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_serlink"))
        .arg("--log-level")
        .arg("off")
        .args(args)
        .output()
        .expect("serlink should run")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn encode_control_frame_prints_wire_hex() {
    let output = serlink(&[
        "--format", "pretty", "encode", "--control", "0x03", "--address", "0x01",
    ]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "7e 01 03 02 7e");
}

#[test]
fn encode_stuffs_flag_in_payload_and_check() {
    let output = serlink(&["--format", "pretty", "encode", "--hex", "7e"]);

    assert!(output.status.success());
    assert_eq!(stdout(&output).trim(), "7e 03 00 03 7d 5e 7d 5e 7e");
}

#[test]
fn encode_json_reports_sizes() {
    let output = serlink(&[
        "--format", "json", "encode", "--control", "0x40", "--data", "hi",
    ]);

    assert!(output.status.success());
    let value: serde_json::Value =
        serde_json::from_str(stdout(&output).trim()).expect("encode should emit json");
    assert_eq!(value["control"], 0x40);
    assert_eq!(value["control_name"], "I1");
    assert_eq!(value["payload_size"], 2);
    assert_eq!(value["wire"], "7e0340436869017e");
}

#[test]
fn encode_oversized_payload_is_data_invalid() {
    let output = serlink(&["encode", "--data", "abcdef", "--max-payload", "4"]);

    assert_eq!(output.status.code(), Some(60));
    assert!(String::from_utf8_lossy(&output.stderr).contains("payload too large"));
}

#[test]
fn decode_prints_each_frame() {
    let output = serlink(&[
        "--format",
        "json",
        "decode",
        "7e 01 03 02 7e 7e 03 00 03 68 69 01 7e",
    ]);

    assert!(output.status.success());
    let lines: Vec<serde_json::Value> = stdout(&output)
        .lines()
        .map(|line| serde_json::from_str(line).expect("each line should be json"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["control_name"], "SET");
    assert_eq!(lines[0]["payload_size"], 0);
    assert_eq!(lines[1]["text"], "hi");
}

#[test]
fn decode_recovers_after_corrupted_end_marker() {
    // The first frame's end marker is corrupted to 0x55; the next frame's
    // start marker closes it and the following address byte resyncs.
    let output = serlink(&[
        "--format",
        "pretty",
        "decode",
        "7e 03 00 03 61 62 03 55 7e 01 07 06 7e",
    ]);

    assert_eq!(output.status.code(), Some(60));
    let text = stdout(&output);
    assert!(text.contains("invalid frame: payload check mismatch"));
    assert!(text.contains("address=0x01 (RX) control=0x07 (UA) size=0"));
    assert!(text.contains("resyncs=1"));
}

#[test]
fn decode_with_custom_resync_set_drops_following_frame() {
    let output = serlink(&[
        "--format",
        "pretty",
        "decode",
        "7e 03 00 03 61 62 03 55 7e 01 07 06 7e",
        "--resync",
        "0x05",
    ]);

    assert_eq!(output.status.code(), Some(60));
    let text = stdout(&output);
    assert!(!text.contains("control=0x07"));
    assert!(text.contains("resyncs=0"));
}

#[test]
fn decode_reads_raw_bytes_from_stdin() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_serlink"))
        .args(["--log-level", "off", "--format", "json", "decode"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .expect("decode should start");

    child
        .stdin
        .take()
        .expect("stdin should be piped")
        .write_all(&[0x7E, 0x03, 0x0B, 0x08, 0x7E])
        .expect("stdin should accept bytes");
    let output = child.wait_with_output().expect("decode should finish");

    assert!(output.status.success());
    assert!(stdout(&output).contains("\"control_name\":\"DISC\""));
}

#[test]
fn decode_rejects_malformed_hex() {
    let output = serlink(&["decode", "7e 0"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn version_prints_package_version() {
    let output = serlink(&["version"]);

    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim(),
        format!("serlink {}", env!("CARGO_PKG_VERSION"))
    );
}
