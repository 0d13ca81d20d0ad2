use std::io::{IsTerminal, Write};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use fiscalwire_format::{CommandDescriptor, FieldValue};
use fiscalwire_frame::{ConditionClass, DeviceStatus, Frame};
use serde::Serialize;

use crate::exit::{CliError, CliResult, USAGE};

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
pub struct ConditionOutput {
    name: &'static str,
    class: &'static str,
}

#[derive(Serialize)]
pub struct StatusOutput {
    bytes: String,
    has_error: bool,
    has_warning: bool,
    conditions: Vec<ConditionOutput>,
}

impl StatusOutput {
    pub fn new(status: &DeviceStatus) -> Self {
        Self {
            bytes: hex(status.as_bytes()),
            has_error: status.has_error(),
            has_warning: status.has_warning(),
            conditions: status
                .active_conditions()
                .into_iter()
                .map(|condition| ConditionOutput {
                    name: condition.name(),
                    class: class_name(condition.class()),
                })
                .collect(),
        }
    }

    fn summary(&self) -> String {
        if self.conditions.is_empty() {
            "ok".to_string()
        } else {
            self.conditions
                .iter()
                .map(|c| c.name)
                .collect::<Vec<_>>()
                .join(", ")
        }
    }
}

#[derive(Serialize)]
pub struct FieldOutput {
    kind: &'static str,
    value: String,
}

impl From<&FieldValue> for FieldOutput {
    fn from(value: &FieldValue) -> Self {
        Self {
            kind: value.kind().name(),
            value: value.to_string(),
        }
    }
}

/// A frame, optionally with its payload decoded.
#[derive(Serialize)]
pub struct FrameOutput {
    command: Option<&'static str>,
    message_id: u8,
    message_number: u8,
    payload: String,
    #[serde(skip)]
    payload_bytes: Vec<u8>,
    status: Option<StatusOutput>,
    fields: Vec<FieldOutput>,
}

impl FrameOutput {
    pub fn new(
        command: Option<&'static str>,
        frame: &Frame,
        fields: &[FieldValue],
    ) -> Self {
        Self {
            command,
            message_id: frame.message_id,
            message_number: frame.message_number,
            payload: hex(&frame.payload),
            payload_bytes: frame.payload.to_vec(),
            status: frame.status.as_ref().map(StatusOutput::new),
            fields: fields.iter().map(FieldOutput::from).collect(),
        }
    }
}

/// An encoded frame ready for the wire.
#[derive(Serialize)]
pub struct EncodedOutput {
    command: &'static str,
    message_id: u8,
    message_number: u8,
    size: usize,
    frame: String,
    #[serde(skip)]
    frame_bytes: Vec<u8>,
}

impl EncodedOutput {
    pub fn new(descriptor: &CommandDescriptor, message_id: u8, frame: &[u8]) -> Self {
        Self {
            command: descriptor.name,
            message_id,
            message_number: descriptor.message_number,
            size: frame.len(),
            frame: hex(frame),
            frame_bytes: frame.to_vec(),
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

pub fn print_status(status: &DeviceStatus, format: OutputFormat) {
    let out = StatusOutput::new(status);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["CONDITION", "CLASS"]);
            for condition in &out.conditions {
                table.add_row(vec![condition.name, condition.class]);
            }
            println!("status {}", out.bytes);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("status={} conditions={}", out.bytes, out.summary());
        }
        OutputFormat::Raw => print_raw(status.as_bytes()),
    }
}

pub fn print_frame(out: &FrameOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["#", "KIND", "VALUE"]);
            for (i, field) in out.fields.iter().enumerate() {
                table.add_row(vec![i.to_string(), field.kind.to_string(), field.value.clone()]);
            }
            println!(
                "{} id={} number={}",
                out.command.unwrap_or("frame"),
                out.message_id,
                out.message_number
            );
            if let Some(status) = &out.status {
                println!("status {} ({})", status.bytes, status.summary());
            }
            if out.fields.is_empty() {
                println!("payload {}", out.payload);
            } else {
                println!("{table}");
            }
        }
        OutputFormat::Pretty => {
            let fields = out
                .fields
                .iter()
                .map(|f| f.value.as_str())
                .collect::<Vec<_>>()
                .join(" | ");
            print!(
                "id={} number={} payload=[{}]",
                out.message_id, out.message_number, out.payload
            );
            if let Some(status) = &out.status {
                print!(" status={}", status.summary());
            }
            if !out.fields.is_empty() {
                print!(" fields={fields}");
            }
            println!();
        }
        OutputFormat::Raw => print_raw(&out.payload_bytes),
    }
}

pub fn print_encoded(out: &EncodedOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table | OutputFormat::Pretty => println!("{}", out.frame),
        OutputFormat::Raw => print_raw(&out.frame_bytes),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

fn class_name(class: ConditionClass) -> &'static str {
    match class {
        ConditionClass::Error => "error",
        ConditionClass::Warning => "warning",
        ConditionClass::State => "state",
    }
}

/// Uppercase hex bytes separated by spaces.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse hex bytes; whitespace, `:` and `-` separators are ignored.
pub fn parse_hex(input: &str) -> CliResult<Vec<u8>> {
    let digits: Vec<u8> = input
        .bytes()
        .filter(|b| !b.is_ascii_whitespace() && *b != b':' && *b != b'-')
        .collect();
    if digits.len() % 2 != 0 {
        return Err(CliError::new(USAGE, "hex input has an odd number of digits"));
    }
    digits
        .chunks(2)
        .map(|pair| {
            std::str::from_utf8(pair)
                .ok()
                .and_then(|text| u8::from_str_radix(text, 16).ok())
                .ok_or_else(|| {
                    CliError::new(
                        USAGE,
                        format!("invalid hex byte: {}", String::from_utf8_lossy(pair)),
                    )
                })
        })
        .collect()
}
