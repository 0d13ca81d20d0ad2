use std::time::Duration;

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime};
use clap::{Args, Subcommand, ValueEnum};
use fiscalwire_format::{
    Command as FiscalCommand, FieldCode, FieldValue, FormatConfig, FormatTemplate, LegacyCodes,
    TextEncoding,
};
use fiscalwire_frame::{Direction, FrameConfig};
use fiscalwire_session::{CommandSession, RibbonWait, SessionConfig};
use fiscalwire_transport::{ChannelConfig, SerialChannel};

use crate::exit::{format_error, transport_error, CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod call;
pub mod commands;
pub mod decode;
pub mod encode;
pub mod ports;
pub mod status;
pub mod version;
pub mod watch;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read the printer status.
    Status(StatusArgs),
    /// Send one command and print the decoded response.
    Call(CallArgs),
    /// Poll the printer status and print every change.
    Watch(WatchArgs),
    /// Encode a request frame without sending it.
    Encode(EncodeArgs),
    /// Validate and decode a captured frame.
    Decode(DecodeArgs),
    /// List the command table.
    Commands(CommandsArgs),
    /// List serial ports.
    Ports,
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Status(args) => status::run(args, format),
        Command::Call(args) => call::run(args, format),
        Command::Watch(args) => watch::run(args, format),
        Command::Encode(args) => encode::run(args, format),
        Command::Decode(args) => decode::run(args, format),
        Command::Commands(args) => commands::run(args, format),
        Command::Ports => ports::run(format),
        Command::Version(args) => version::run(args),
    }
}

/// Payload text settings.
#[derive(Args, Debug, Clone, Copy)]
pub struct TextArgs {
    /// Text encoding of T fields (latin1, windows-1251).
    #[arg(
        long,
        env = "FISCALWIRE_ENCODING",
        default_value = "latin1",
        value_parser = parse_encoding
    )]
    pub encoding: TextEncoding,
    /// Treat Y and Z in command templates as date and time fields.
    #[arg(long)]
    pub typed_legacy_codes: bool,
}

impl TextArgs {
    pub fn format_config(&self) -> FormatConfig {
        FormatConfig {
            text_encoding: self.encoding,
            legacy_codes: if self.typed_legacy_codes {
                LegacyCodes::Typed
            } else {
                LegacyCodes::Literal
            },
        }
    }
}

/// Serial line and session settings.
#[derive(Args, Debug)]
pub struct DeviceArgs {
    /// Serial port the printer is attached to (e.g. /dev/ttyUSB0, COM3).
    #[arg(long, short = 'p', env = "FISCALWIRE_PORT")]
    pub port: String,
    /// Line speed.
    #[arg(long, env = "FISCALWIRE_BAUD", default_value_t = 9600)]
    pub baud: u32,
    /// Per-byte read timeout (e.g. 2s, 500ms).
    #[arg(long, env = "FISCALWIRE_TIMEOUT", default_value = "2s")]
    pub timeout: String,
    /// First message id (32-127).
    #[arg(long, default_value_t = 32)]
    pub start_id: u8,
    /// Busy signals tolerated while waiting for a response; 0 waits forever.
    #[arg(long, env = "FISCALWIRE_MAX_BUSY", default_value_t = 1024)]
    pub max_busy: usize,
    /// Attempts per command under --ribbon-wait; 0 retries forever.
    #[arg(long, default_value_t = 16)]
    pub max_attempts: u32,
    /// Keep retrying while the ribbon is out.
    #[arg(long)]
    pub ribbon_wait: bool,
    #[command(flatten)]
    pub text: TextArgs,
}

impl DeviceArgs {
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            starting_message_id: self.start_id,
            max_attempts: (self.max_attempts > 0).then_some(self.max_attempts),
            frame: FrameConfig {
                max_busy_signals: (self.max_busy > 0).then_some(self.max_busy),
            },
            format: self.text.format_config(),
            ..SessionConfig::default()
        }
    }

    pub fn open(&self) -> CliResult<CommandSession<SerialChannel>> {
        let config = ChannelConfig {
            baud_rate: self.baud,
            timeout: parse_duration(&self.timeout)?,
        };
        let writer = SerialChannel::open_with_config(&self.port, config)
            .map_err(|err| transport_error("open failed", err))?;
        let reader = writer
            .try_clone()
            .map_err(|err| transport_error("open failed", err))?;

        let mut session = CommandSession::with_config(writer, reader, self.session_config());
        if self.ribbon_wait {
            session.set_retry_policy(RibbonWait::default());
        }
        Ok(session)
    }
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Ask for the extended status (includes the fiscalized flag).
    #[arg(long)]
    pub extended: bool,
}

#[derive(Args, Debug)]
pub struct CallArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Command code (e.g. M74, M107R). See `fiscalwire commands`.
    pub command: String,
    /// Request parameters, one per typed field of the request template.
    #[arg(allow_negative_numbers = true)]
    pub params: Vec<String>,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    #[command(flatten)]
    pub device: DeviceArgs,
    /// Poll interval (e.g. 1s, 250ms).
    #[arg(long, default_value = "1s")]
    pub interval: String,
    /// Exit after N status changes.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct EncodeArgs {
    /// Command code (e.g. M33, M48).
    pub command: String,
    /// Request parameters, one per typed field of the request template.
    #[arg(allow_negative_numbers = true)]
    pub params: Vec<String>,
    /// Message id to stamp on the frame (32-127).
    #[arg(long, default_value_t = 32)]
    pub id: u8,
    #[command(flatten)]
    pub text: TextArgs,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Side {
    /// Request written by the host.
    Host,
    /// Response written by the device (carries a status block).
    Device,
}

impl From<Side> for Direction {
    fn from(side: Side) -> Self {
        match side {
            Side::Host => Direction::HostToDevice,
            Side::Device => Direction::DeviceToHost,
        }
    }
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes in hex (e.g. "01 24 20 21 05 30 30 36 3A 03").
    pub frame: String,
    /// Which side wrote the frame.
    #[arg(long, value_enum, default_value = "device")]
    pub from: Side,
    /// Decode the payload against this command's template.
    #[arg(long, short = 'c')]
    pub command: Option<String>,
    #[command(flatten)]
    pub text: TextArgs,
}

#[derive(Args, Debug, Default)]
pub struct CommandsArgs {
    /// Only list commands with this message number.
    #[arg(long)]
    pub number: Option<u8>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_encoding(input: &str) -> Result<TextEncoding, String> {
    TextEncoding::from_name(input).ok_or_else(|| format!("unknown text encoding: {input}"))
}

pub fn parse_command(name: &str) -> CliResult<FiscalCommand> {
    name.parse::<FiscalCommand>()
        .map_err(|err| format_error("unknown command", err))
}

/// Turn command-line strings into values for the typed fields of `template`.
///
/// Arguments beyond the template's fields are passed through as text so the
/// encoder reports the count mismatch.
pub fn parse_params(template: &FormatTemplate, args: &[String]) -> CliResult<Vec<FieldValue>> {
    let mut codes = template.fields();
    args.iter()
        .map(|arg| match codes.next() {
            Some(code) => parse_param(code, arg),
            None => Ok(FieldValue::Text(arg.clone())),
        })
        .collect()
}

fn parse_param(code: FieldCode, arg: &str) -> CliResult<FieldValue> {
    let invalid =
        |what: &str| CliError::new(USAGE, format!("invalid {what} for {code} field: {arg}"));
    match code {
        FieldCode::Word => {
            let value = match arg.strip_prefix("0x") {
                Some(hex) => i64::from_str_radix(hex, 16),
                None => arg.parse(),
            };
            value.map(FieldValue::Integer).map_err(|_| invalid("word"))
        }
        FieldCode::Number | FieldCode::Text => Ok(FieldValue::Text(arg.to_string())),
        FieldCode::DateTime | FieldCode::DateTimeSeconds => {
            if arg == "now" {
                return Ok(FieldValue::DateTime(Local::now().naive_local()));
            }
            ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(arg, fmt).ok())
                .map(FieldValue::DateTime)
                .ok_or_else(|| invalid("date-time"))
        }
        FieldCode::Date => NaiveDate::parse_from_str(arg, "%Y-%m-%d")
            .map(FieldValue::Date)
            .map_err(|_| invalid("date")),
        FieldCode::Time => NaiveTime::parse_from_str(arg, "%H:%M")
            .map(FieldValue::Time)
            .map_err(|_| invalid("time")),
    }
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration: {input}")))?;
    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    Ok(if millis {
        Duration::from_millis(value)
    } else {
        Duration::from_secs(value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("5s").unwrap(), Duration::from_secs(5));
        assert_eq!(parse_duration("2").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
    }

    #[test]
    fn params_follow_template_codes() {
        let template = FormatTemplate::parse("W,T,q", LegacyCodes::Literal);
        let args = [
            "0x10".to_string(),
            "hello".to_string(),
            "2024-01-02 03:04:05".to_string(),
        ];
        let values = parse_params(&template, &args).expect("params should parse");

        assert_eq!(values[0], FieldValue::Integer(16));
        assert_eq!(values[1], FieldValue::Text("hello".into()));
        assert_eq!(
            values[2].as_datetime().map(|dt| dt.to_string()),
            Some("2024-01-02 03:04:05".to_string())
        );
    }

    #[test]
    fn bad_word_param_is_usage_error() {
        let template = FormatTemplate::parse("W", LegacyCodes::Literal);
        let err = parse_params(&template, &["x".to_string()]).unwrap_err();
        assert_eq!(err.code, USAGE);
    }

    #[test]
    fn device_args_map_zero_to_unbounded() {
        let args = DeviceArgs {
            port: "/dev/null".into(),
            baud: 9600,
            timeout: "2s".into(),
            start_id: 40,
            max_busy: 0,
            max_attempts: 0,
            ribbon_wait: false,
            text: TextArgs {
                encoding: TextEncoding::Windows1251,
                typed_legacy_codes: true,
            },
        };
        let config = args.session_config();
        assert_eq!(config.starting_message_id, 40);
        assert_eq!(config.max_attempts, None);
        assert_eq!(config.frame.max_busy_signals, None);
        assert_eq!(config.format.legacy_codes, LegacyCodes::Typed);
    }
}
