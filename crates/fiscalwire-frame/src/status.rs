//! The six-byte device status block.

use std::fmt;

use crate::wire::STATUS_SIZE;

/// How a status condition should be treated by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionClass {
    /// The command failed.
    Error,
    /// The command ran but the device needs attention.
    Warning,
    /// Informational device state.
    State,
}

/// Every named condition carried in the status block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCondition {
    SyntaxError,
    InvalidCommandCode,
    ClockError,
    DisplayDisconnected,
    MechanismError,
    GeneralError,
    AmountTooBig,
    CommandNotAllowed,
    MemoryCleared,
    RamError,
    CoverOpen,
    RibbonOut,
    RibbonLow,
    ControlRibbonError,
    FiscalReceiptOpen,
    ControlRibbonLow,
    NonFiscalReceiptOpen,
    FiscalMemoryWriteError,
    FiscalModuleMissing,
    FiscalMemorySpaceLow,
    FiscalMemoryFull,
    FiscalMemoryGeneralError,
    FiscalMemoryReadOnly,
    DailyReportPending,
    Fiscalized,
}

impl StatusCondition {
    /// All conditions, in status-byte order.
    pub const ALL: [StatusCondition; 25] = [
        Self::SyntaxError,
        Self::InvalidCommandCode,
        Self::ClockError,
        Self::DisplayDisconnected,
        Self::MechanismError,
        Self::GeneralError,
        Self::AmountTooBig,
        Self::CommandNotAllowed,
        Self::MemoryCleared,
        Self::RamError,
        Self::CoverOpen,
        Self::RibbonOut,
        Self::RibbonLow,
        Self::ControlRibbonError,
        Self::FiscalReceiptOpen,
        Self::ControlRibbonLow,
        Self::NonFiscalReceiptOpen,
        Self::FiscalMemoryWriteError,
        Self::FiscalModuleMissing,
        Self::FiscalMemorySpaceLow,
        Self::FiscalMemoryFull,
        Self::FiscalMemoryGeneralError,
        Self::FiscalMemoryReadOnly,
        Self::DailyReportPending,
        Self::Fiscalized,
    ];

    /// `(byte index, bit)` of this condition within the block.
    pub const fn position(self) -> (usize, u8) {
        match self {
            Self::SyntaxError => (0, 0),
            Self::InvalidCommandCode => (0, 1),
            Self::ClockError => (0, 2),
            Self::DisplayDisconnected => (0, 3),
            Self::MechanismError => (0, 4),
            Self::GeneralError => (0, 5),
            Self::AmountTooBig => (1, 0),
            Self::CommandNotAllowed => (1, 1),
            Self::MemoryCleared => (1, 2),
            Self::RamError => (1, 4),
            Self::CoverOpen => (1, 5),
            Self::RibbonOut => (2, 0),
            Self::RibbonLow => (2, 1),
            Self::ControlRibbonError => (2, 2),
            Self::FiscalReceiptOpen => (2, 3),
            Self::ControlRibbonLow => (2, 4),
            Self::NonFiscalReceiptOpen => (2, 5),
            Self::FiscalMemoryWriteError => (4, 0),
            Self::FiscalModuleMissing => (4, 2),
            Self::FiscalMemorySpaceLow => (4, 3),
            Self::FiscalMemoryFull => (4, 4),
            Self::FiscalMemoryGeneralError => (4, 5),
            Self::FiscalMemoryReadOnly => (5, 0),
            Self::DailyReportPending => (5, 2),
            Self::Fiscalized => (5, 3),
        }
    }

    pub const fn class(self) -> ConditionClass {
        match self {
            Self::DisplayDisconnected
            | Self::CoverOpen
            | Self::RibbonLow
            | Self::ControlRibbonLow
            | Self::FiscalMemorySpaceLow => ConditionClass::Warning,
            Self::FiscalReceiptOpen | Self::NonFiscalReceiptOpen | Self::Fiscalized => {
                ConditionClass::State
            }
            _ => ConditionClass::Error,
        }
    }

    /// Stable snake_case name, used in logs and CLI output.
    pub const fn name(self) -> &'static str {
        match self {
            Self::SyntaxError => "syntax_error",
            Self::InvalidCommandCode => "invalid_command_code",
            Self::ClockError => "clock_error",
            Self::DisplayDisconnected => "display_disconnected",
            Self::MechanismError => "mechanism_error",
            Self::GeneralError => "general_error",
            Self::AmountTooBig => "amount_too_big",
            Self::CommandNotAllowed => "command_not_allowed",
            Self::MemoryCleared => "memory_cleared",
            Self::RamError => "ram_error",
            Self::CoverOpen => "cover_open",
            Self::RibbonOut => "ribbon_out",
            Self::RibbonLow => "ribbon_low",
            Self::ControlRibbonError => "control_ribbon_error",
            Self::FiscalReceiptOpen => "fiscal_receipt_open",
            Self::ControlRibbonLow => "control_ribbon_low",
            Self::NonFiscalReceiptOpen => "non_fiscal_receipt_open",
            Self::FiscalMemoryWriteError => "fiscal_memory_write_error",
            Self::FiscalModuleMissing => "fiscal_module_missing",
            Self::FiscalMemorySpaceLow => "fiscal_memory_space_low",
            Self::FiscalMemoryFull => "fiscal_memory_full",
            Self::FiscalMemoryGeneralError => "fiscal_memory_general_error",
            Self::FiscalMemoryReadOnly => "fiscal_memory_read_only",
            Self::DailyReportPending => "daily_report_pending",
            Self::Fiscalized => "fiscalized",
        }
    }
}

impl fmt::Display for StatusCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Immutable snapshot of the device status block.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceStatus {
    bytes: [u8; STATUS_SIZE],
}

impl DeviceStatus {
    pub const fn new(bytes: [u8; STATUS_SIZE]) -> Self {
        Self { bytes }
    }

    /// Build from a slice; `None` unless it holds exactly six bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; STATUS_SIZE] = bytes.try_into().ok()?;
        Some(Self::new(bytes))
    }

    pub const fn as_bytes(&self) -> &[u8; STATUS_SIZE] {
        &self.bytes
    }

    /// Whether `condition`'s bit is set.
    pub fn is_set(&self, condition: StatusCondition) -> bool {
        let (index, bit) = condition.position();
        self.bytes[index] & (1 << bit) != 0
    }

    /// Conditions currently set, in status-byte order.
    pub fn active_conditions(&self) -> Vec<StatusCondition> {
        StatusCondition::ALL
            .into_iter()
            .filter(|condition| self.is_set(*condition))
            .collect()
    }

    fn any_of_class(&self, class: ConditionClass) -> bool {
        StatusCondition::ALL
            .into_iter()
            .any(|condition| condition.class() == class && self.is_set(condition))
    }

    /// Any error-class condition is set; the command did not complete.
    pub fn has_error(&self) -> bool {
        self.any_of_class(ConditionClass::Error)
    }

    /// Any warning-class condition is set.
    pub fn has_warning(&self) -> bool {
        self.any_of_class(ConditionClass::Warning)
    }

    pub fn is_syntax_error(&self) -> bool {
        self.is_set(StatusCondition::SyntaxError)
    }

    pub fn is_invalid_command_code(&self) -> bool {
        self.is_set(StatusCondition::InvalidCommandCode)
    }

    pub fn is_clock_error(&self) -> bool {
        self.is_set(StatusCondition::ClockError)
    }

    pub fn is_mechanism_error(&self) -> bool {
        self.is_set(StatusCondition::MechanismError)
    }

    pub fn is_amount_too_big(&self) -> bool {
        self.is_set(StatusCondition::AmountTooBig)
    }

    pub fn is_command_not_allowed(&self) -> bool {
        self.is_set(StatusCondition::CommandNotAllowed)
    }

    pub fn is_memory_cleared(&self) -> bool {
        self.is_set(StatusCondition::MemoryCleared)
    }

    pub fn is_ram_error(&self) -> bool {
        self.is_set(StatusCondition::RamError)
    }

    pub fn is_ribbon_out(&self) -> bool {
        self.is_set(StatusCondition::RibbonOut)
    }

    pub fn is_control_ribbon_error(&self) -> bool {
        self.is_set(StatusCondition::ControlRibbonError)
    }

    pub fn is_fiscal_memory_write_error(&self) -> bool {
        self.is_set(StatusCondition::FiscalMemoryWriteError)
    }

    pub fn is_fiscal_module_missing(&self) -> bool {
        self.is_set(StatusCondition::FiscalModuleMissing)
    }

    pub fn is_fiscal_memory_full(&self) -> bool {
        self.is_set(StatusCondition::FiscalMemoryFull)
    }

    pub fn is_fiscal_memory_read_only(&self) -> bool {
        self.is_set(StatusCondition::FiscalMemoryReadOnly)
    }

    pub fn is_daily_report_pending(&self) -> bool {
        self.is_set(StatusCondition::DailyReportPending)
    }

    pub fn is_display_disconnected(&self) -> bool {
        self.is_set(StatusCondition::DisplayDisconnected)
    }

    pub fn is_cover_open(&self) -> bool {
        self.is_set(StatusCondition::CoverOpen)
    }

    pub fn is_ribbon_low(&self) -> bool {
        self.is_set(StatusCondition::RibbonLow)
    }

    pub fn is_control_ribbon_low(&self) -> bool {
        self.is_set(StatusCondition::ControlRibbonLow)
    }

    pub fn is_fiscal_memory_space_low(&self) -> bool {
        self.is_set(StatusCondition::FiscalMemorySpaceLow)
    }

    pub fn is_fiscalized(&self) -> bool {
        self.is_set(StatusCondition::Fiscalized)
    }

    pub fn is_fiscal_receipt_open(&self) -> bool {
        self.is_set(StatusCondition::FiscalReceiptOpen)
    }

    pub fn is_non_fiscal_receipt_open(&self) -> bool {
        self.is_set(StatusCondition::NonFiscalReceiptOpen)
    }
}

impl From<[u8; STATUS_SIZE]> for DeviceStatus {
    fn from(bytes: [u8; STATUS_SIZE]) -> Self {
        Self::new(bytes)
    }
}

impl fmt::Debug for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceStatus")
            .field("bytes", &format_args!("{:02X?}", self.bytes))
            .field("active", &self.active_conditions())
            .finish()
    }
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.active_conditions();
        if active.is_empty() {
            return f.write_str("ok");
        }
        for (i, condition) in active.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{condition}")?;
        }
        Ok(())
    }
}
