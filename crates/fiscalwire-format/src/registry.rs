//! The command table: message number and field layouts per command.
//!
//! Variants carry the device's own command codes (`M` + message number, plus
//! a suffix for each parameter variant of the same message).

use std::fmt;
use std::str::FromStr;

use crate::error::FormatError;
use crate::template::{FormatTemplate, LegacyCodes};

/// Static description of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommandDescriptor {
    pub command: Command,
    pub name: &'static str,
    pub message_number: u8,
    /// Layout of the request payload.
    pub host_format: &'static str,
    /// Layout of the response payload.
    pub device_format: &'static str,
}

impl CommandDescriptor {
    pub fn host_template(&self, legacy: LegacyCodes) -> FormatTemplate {
        FormatTemplate::parse(self.host_format, legacy)
    }

    pub fn device_template(&self, legacy: LegacyCodes) -> FormatTemplate {
        FormatTemplate::parse(self.device_format, legacy)
    }
}

macro_rules! commands {
    ($(
        $(#[$meta:meta])*
        $variant:ident = $number:literal, $host:literal => $device:literal;
    )*) => {
        /// Every command the device understands.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        #[allow(non_camel_case_types)]
        pub enum Command {
            $( $(#[$meta])* $variant, )*
        }

        static DESCRIPTORS: &[CommandDescriptor] = &[
            $(
                CommandDescriptor {
                    command: Command::$variant,
                    name: stringify!($variant),
                    message_number: $number,
                    host_format: $host,
                    device_format: $device,
                },
            )*
        ];
    };
}

commands! {
    /// Clear the customer display.
    M33 = 33, "" => "";
    /// Show text on the display's bottom row.
    M35 = 35, "T" => "";
    /// Open a non-fiscal receipt.
    M38 = 38, "" => "W,T";
    /// Close the non-fiscal receipt.
    M39 = 39, "" => "W";
    /// Print a line on the non-fiscal receipt.
    M42 = 42, "T" => "";
    /// Header/footer lines and logo flag.
    M43 = 43, "TT" => "T";
    /// Paper feed.
    M44 = 44, "" => "";
    M44L = 44, "B" => "";
    M44LO = 44, "B,B" => "";
    M45 = 45, "" => "T";
    /// Show text on the display's top row.
    M47 = 47, "T" => "";
    /// Open a fiscal receipt: cashier, password, register number.
    M48 = 48, "T;T,B" => "W,W";
    M50 = 50, "" => "";
    /// Periodic report per tax rate between two dates.
    M50SE = 50, "T,T" => "";
    M51 = 51, "B" => "B,B,B,B,B,B,B,B,B,B";
    /// Sell a programmed item, shown on the display.
    M52 = 52, "ST" => "";
    M52S = 52, "STT" => "";
    /// Sell a quantity of a programmed item, shown on the display.
    M52Q = 52, "ST*T" => "";
    M52SQ = 52, "STT*T" => "";
    /// Subtotal and payment.
    M53 = 53, "" => "TB";
    M53A = 53, "B" => "TB";
    M53P = 53, "T" => "TB";
    M53PA = 53, "TB" => "TB";
    /// Close the fiscal receipt.
    M56 = 56, "" => "W,W";
    /// Sell a programmed item.
    M58 = 58, "ST" => "";
    M58S = 58, "STT" => "";
    /// Sell a quantity of a programmed item.
    M58Q = 58, "ST*T" => "";
    M58SQ = 58, "STT*T" => "";
    /// Summer time adjustment.
    M60 = 60, "B" => "";
    /// Set date and time.
    M61 = 61, "Q" => "";
    /// Set date and time, with seconds.
    M61S = 61, "q" => "";
    /// Read date and time.
    M62 = 62, "" => "B-B-B B:B:B";
    M62T = 62, "" => "T";
    M63 = 63, "" => "";
    M64 = 64, "" => "W,B,B,B,B,B,B,B,B,B,T";
    /// Day totals per tax rate.
    M65 = 65, "" => "B,B,B,B,B,B,B,B,B,B";
    /// Day totals.
    M67 = 67, "" => "B,B,B,B,B";
    M68 = 68, "" => "W,W";
    /// Daily fiscal report.
    M69 = 69, "" => "W,B,B,B,B,B,B,B,B,B,B";
    M69O = 69, "B" => "W,B,B,B,B,B,B,B,B,B,B";
    M69ON = 69, "BN" => "W,B,B,B,B,B,B,B,B,B,B";
    M69OA = 69, "BA" => "W,B,B,B,B,B,B,B,B,B,B";
    M69ONA = 69, "BNA" => "W,B,B,B,B,B,B,B,B,B,B";
    M70 = 70, "" => "T,B,B,B";
    M70A = 70, "B" => "T,B,B,B";
    M71 = 71, "" => "";
    M72 = 72, "T" => "T";
    /// Fiscal memory report by record range.
    M73 = 73, "B,B,T" => "";
    /// Status.
    M74 = 74, "" => "TTTTTT";
    /// Extended status.
    M74O = 74, "T" => "TTTTTT";
    /// Fiscal transaction status.
    M76 = 76, "" => "T,W,B,B";
    M76O = 76, "T" => "T,W,B,B";
    /// Periodic fiscal memory report between two dates.
    M79 = 79, "T,T" => "";
    M80 = 80, "" => "";
    /// Tax rates.
    M83 = 83, "" => "B,T,B,B,B,B,B,B,B,B,B";
    /// Program tax rates.
    M83DFX = 83, "B,T,B,B,B,B,B,B,B,B,B" => "";
    M89 = 89, "T" => "T,W";
    /// Diagnostic information, including the fiscal module id.
    M90 = 90, "T" => "T,T,T,T,T,T";
    M91 = 91, "B,T" => "T,T";
    M92 = 92, "T" => "T";
    M97 = 97, "" => "B,B,B,B,B,B,B,B,B";
    M98 = 98, "T" => "T";
    /// Tax-payer number.
    M99 = 99, "" => "T,T";
    M100 = 100, "T" => "";
    /// Change a cashier's password.
    M101 = 101, "T,T,T" => "";
    /// Rename a cashier.
    M102 = 102, "T,T,T" => "";
    M103 = 103, "" => "T,B,B,B,B,B,B,B,B,B";
    M104 = 104, "T,T" => "";
    /// Cashiers report.
    M105 = 105, "" => "";
    M106 = 106, "" => "";
    /// Open the cash drawer for the given pulse length.
    M106I = 106, "B" => "";
    /// Program an item.
    M107P = 107, "PTB,B,T" => "T";
    M107DA = 107, "DA" => "T";
    /// Delete an item.
    M107D = 107, "DB" => "T";
    /// Read an item.
    M107R = 107, "RB" => "T,B,T,B,B,T";
    /// Change an item's price.
    M107C = 107, "CB,B" => "T";
    /// First programmed item.
    M107F = 107, "F" => "T,B,T,B,B,T";
    /// Next programmed item.
    M107N = 107, "N" => "T,B,T,B,B,T";
    M107f = 107, "f" => "T,B,T,B,B,T";
    M107n = 107, "n" => "T,B,T,B,B,T";
    /// First free item id.
    M107X = 107, "X" => "B";
    /// Item storage limits and usage.
    M107I = 107, "I" => "B,B,B";
    /// Additional day totals (cash, card, cheque).
    M110 = 110, "" => "B,B,B,B,B";
    /// Items report.
    M111 = 111, "B" => "T";
    M112 = 112, "T" => "B,B;B,B;B,B;B,B;B,T;T";
    M112f = 112, "T" => "B,B;B,B;B,B;B,B;B,T";
    M113 = 113, "" => "B";
    M114 = 114, "B" => "T,B,B,B,B,B,B,B,B";
    M114T = 114, "B,B" => "T,B,B,B,B,B,B,B,B";
    M114TC = 114, "B,B,B" => "T,B,B,B,B,B,B,B,B";
    /// Upload one logo line.
    M115 = 115, "B,T" => "";
    M116 = 116, "T,B" => "T";
    M117 = 117, "B" => "T";
}

impl Command {
    pub fn descriptor(self) -> &'static CommandDescriptor {
        &DESCRIPTORS[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.descriptor().name
    }

    pub fn message_number(self) -> u8 {
        self.descriptor().message_number
    }

    /// Every command, in table order.
    pub fn all() -> impl Iterator<Item = Command> {
        DESCRIPTORS.iter().map(|descriptor| descriptor.command)
    }

    /// Look up a command by its code (case-sensitive: `M107f` ≠ `M107F`).
    pub fn from_name(name: &str) -> Option<Command> {
        DESCRIPTORS
            .iter()
            .find(|descriptor| descriptor.name == name)
            .map(|descriptor| descriptor.command)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Command {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Command::from_name(s).ok_or_else(|| FormatError::UnknownCommand(s.to_owned()))
    }
}
