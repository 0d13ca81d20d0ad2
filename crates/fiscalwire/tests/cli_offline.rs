#![cfg(feature = "cli")]

use std::process::{Command, Output};

fn fiscalwire(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_fiscalwire"))
        .arg("--log-level")
        .arg("error")
        .args(args)
        .output()
        .expect("fiscalwire should run")
}

#[test]
fn encode_prints_wire_bytes() {
    let output = fiscalwire(&["--format", "pretty", "encode", "M33"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "01 24 20 21 05 30 30 36 3A 03");
}

#[test]
fn encode_with_params_and_id() {
    let output = fiscalwire(&["--format", "json", "encode", "M90", "1", "--id", "61"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"frame\":\"01 25 3D 5A 31 05 30 30 3F 32 03\""));
    assert!(stdout.contains("\"command\":\"M90\""));
}

#[test]
fn encode_wrong_param_count_is_usage_error() {
    let output = fiscalwire(&["encode", "M48", "1"]);

    assert_eq!(output.status.code(), Some(64));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.starts_with("error: encode failed"));
}

#[test]
fn unknown_command_is_usage_error() {
    let output = fiscalwire(&["encode", "M999"]);
    assert_eq!(output.status.code(), Some(64));
}

#[test]
fn decode_device_response_with_cyrillic_text() {
    let output = fiscalwire(&[
        "--format",
        "json",
        "decode",
        "01 38 3E 63 31 30 30 30 37 37 35 35 36 2C CF C8 C1 04 80 80 80 85 80 BA 05 30 38 37 34 03",
        "--command",
        "M99",
        "--encoding",
        "windows-1251",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"value\":\"100077556\""));
    assert!(stdout.contains("\"value\":\"ПИБ\""));
    assert!(stdout.contains("\"fiscalized\""));
}

#[test]
fn decode_bad_checksum_is_data_error() {
    let output = fiscalwire(&["decode", "01 24 20 21 05 30 30 36 3B 03", "--from", "host"]);

    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn commands_lists_table_rows() {
    let output = fiscalwire(&["--format", "json", "commands", "--number", "107"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"name\":\"M107R\""));
    assert!(stdout.contains("\"response\":\"T,B,T,B,B,T\""));
    assert!(!stdout.contains("\"name\":\"M74\""));
}

#[test]
fn version_prints_package_version() {
    let output = fiscalwire(&["version"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.trim(),
        format!("fiscalwire {}", env!("CARGO_PKG_VERSION"))
    );
}
