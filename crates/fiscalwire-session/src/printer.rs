//! Printer operations built on [`CommandSession`].
//!
//! Quantities are rounded to three decimals and money amounts to two before
//! they are sent. Totals reported by the device in hundredths are scaled back
//! to currency units.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use fiscalwire_format::{Command, FieldValue, SlotKind};
use fiscalwire_frame::DeviceStatus;
use fiscalwire_transport::ByteChannel;

use crate::error::{Result, SessionError};
use crate::session::{CommandSession, Response};

/// Number of tax groups the device supports.
pub const TAX_GROUPS: usize = 9;

/// Drawer kick pulse length sent by [`FiscalPrinter::open_cash_drawer`].
pub const DRAWER_PULSE: i64 = 23;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyReportKind {
    /// Z report: print and clear the day's data.
    Clearing = 0,
    /// X report: print without clearing.
    Overview = 1,
    /// X report with additional detail.
    OverviewExtended = 2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemsReportKind {
    Sales = 0,
    AllItems = 1,
}

/// Detail level of a fiscal memory report by record number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiscalMemoryReportKind {
    Short = 0,
    Detailed = 1,
}

/// Name given to the placeholder item that fills slot 1 after a reset.
pub const INVALID_ITEM_NAME: &str = "Invalid item because of reset";

/// Tax group letters, indexed like [`TaxRates::rates`].
const TAX_GROUP_LETTERS: [&str; TAX_GROUPS] = ["А", "Г", "Д", "Ђ", "Е", "Ж", "И", "Ј", "К"];

#[derive(Debug, Clone, PartialEq)]
pub struct TransactionStatus {
    pub open: bool,
    pub items: i64,
    pub total: f64,
    pub paid: f64,
}

impl TransactionStatus {
    pub fn amount_due(&self) -> f64 {
        self.total - self.paid
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxGroupTotals {
    pub total: f64,
    pub groups: [f64; TAX_GROUPS],
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayTotals {
    pub total: f64,
    pub removed: f64,
    pub unpaid: f64,
    pub fiscal_receipts: i64,
    pub receipts: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayPayments {
    pub cash: f64,
    pub card: f64,
    pub cheque: f64,
}

/// Programmed tax rates; `None` marks a disabled group.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxRates {
    pub decimals: i64,
    pub rates: [Option<f64>; TAX_GROUPS],
}

/// A programmed item.
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub id: i64,
    pub tax_group: String,
    pub price: f64,
    pub quantity: f64,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemsInfo {
    pub max_name_length: i64,
    pub max_items: i64,
    pub items: i64,
}

const ITEM_SLOTS: [SlotKind; 6] = [
    SlotKind::Text,
    SlotKind::Integer,
    SlotKind::Text,
    SlotKind::Real,
    SlotKind::Real,
    SlotKind::Text,
];

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn ddmmyy(date: NaiveDate) -> String {
    format!(
        "{:02}{:02}{:02}",
        date.day(),
        date.month(),
        date.year().rem_euclid(100)
    )
}

/// Sequential reader over decoded response values.
struct Fields {
    command: Command,
    values: std::vec::IntoIter<FieldValue>,
    index: usize,
}

impl Fields {
    fn new(command: Command, values: Vec<FieldValue>) -> Self {
        Self {
            command,
            values: values.into_iter(),
            index: 0,
        }
    }

    fn invalid(&self, reason: String) -> SessionError {
        SessionError::InvalidResponse {
            command: self.command,
            reason,
        }
    }

    fn next(&mut self, expected: SlotKind) -> Result<FieldValue> {
        let index = self.index;
        self.index += 1;
        let value = self
            .values
            .next()
            .ok_or_else(|| self.invalid(format!("field {index} missing")))?;
        if value.kind() != expected {
            return Err(self.invalid(format!("field {index} is {}, not {expected}", value.kind())));
        }
        Ok(value)
    }

    fn real(&mut self) -> Result<f64> {
        let value = self.next(SlotKind::Real)?;
        Ok(value.as_f64().unwrap_or_default())
    }

    fn integer(&mut self) -> Result<i64> {
        let value = self.next(SlotKind::Integer)?;
        Ok(value.as_i64().unwrap_or_default())
    }

    fn text(&mut self) -> Result<String> {
        let value = self.next(SlotKind::Text)?;
        Ok(value.into_text().unwrap_or_default())
    }

    fn char(&mut self) -> Result<char> {
        let value = self.next(SlotKind::Char)?;
        Ok(value.as_char().unwrap_or_default())
    }
}

/// High-level operations on a fiscal printer.
#[derive(Debug)]
pub struct FiscalPrinter<W, R = W> {
    session: CommandSession<W, R>,
}

impl<W: ByteChannel, R: ByteChannel> FiscalPrinter<W, R> {
    pub fn new(session: CommandSession<W, R>) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &CommandSession<W, R> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut CommandSession<W, R> {
        &mut self.session
    }

    pub fn into_session(self) -> CommandSession<W, R> {
        self.session
    }

    fn send(&mut self, command: Command, params: &[FieldValue]) -> Result<Response> {
        self.session.exchange(command, params)
    }

    fn query(&mut self, command: Command, params: &[FieldValue], slots: &[SlotKind]) -> Result<Fields> {
        let values = self.session.call_with_slots(command, params, slots)?;
        Ok(Fields::new(command, values))
    }

    // Status

    pub fn status(&mut self) -> Result<DeviceStatus> {
        Ok(self.send(Command::M74, &[])?.status)
    }

    pub fn extended_status(&mut self) -> Result<DeviceStatus> {
        Ok(self.send(Command::M74O, &["X".into()])?.status)
    }

    pub fn is_fiscalized(&mut self) -> Result<bool> {
        Ok(self.extended_status()?.is_fiscalized())
    }

    pub fn is_fiscal_receipt_open(&mut self) -> Result<bool> {
        Ok(self.status()?.is_fiscal_receipt_open())
    }

    pub fn is_non_fiscal_receipt_open(&mut self) -> Result<bool> {
        Ok(self.status()?.is_non_fiscal_receipt_open())
    }

    /// Identification number of the fiscal module.
    pub fn fiscal_module_id(&mut self) -> Result<String> {
        let mut fields = self.query(Command::M90, &["1".into()], &[SlotKind::Text; 6])?;
        for _ in 0..4 {
            fields.text()?;
        }
        fields.text()
    }

    /// Tax-payer identification number.
    pub fn tax_number(&mut self) -> Result<String> {
        self.query(Command::M99, &[], &[SlotKind::Text; 2])?.text()
    }

    // Clock

    pub fn date_time(&mut self) -> Result<NaiveDateTime> {
        let mut fields = self.query(Command::M62, &[], &[SlotKind::Integer; 6])?;
        let mut parts = [0i64; 6];
        for part in &mut parts {
            *part = fields.integer()?;
        }
        let [day, month, year, hour, minute, second] = parts;
        let to_u32 = |value: i64| u32::try_from(value).ok();
        let year = i32::try_from(year).ok().map(|year| year + 2000);
        year.and_then(|year| NaiveDate::from_ymd_opt(year, to_u32(month)?, to_u32(day)?))
            .and_then(|date| date.and_hms_opt(to_u32(hour)?, to_u32(minute)?, to_u32(second)?))
            .ok_or_else(|| fields.invalid(format!("{parts:?} is not a valid date and time")))
    }

    pub fn set_date_time(&mut self, date_time: NaiveDateTime) -> Result<()> {
        self.send(Command::M61S, &[date_time.into()])?;
        Ok(())
    }

    /// Shift the clock for summer time: one hour forward or back.
    pub fn adjust_summer_time(&mut self, forward: bool) -> Result<()> {
        self.send(Command::M60, &[i64::from(forward).into()])?;
        Ok(())
    }

    // Fiscal receipts

    pub fn open_fiscal_receipt(&mut self, cashier: &str, password: &str, register: u32) -> Result<()> {
        self.send(
            Command::M48,
            &[cashier.into(), password.into(), register.into()],
        )?;
        Ok(())
    }

    /// Sell a programmed item. A negative quantity voids it.
    ///
    /// With a quantity of exactly one the short form is used unless
    /// `force_quantity` is set. A quantity that rounds to zero sends nothing.
    pub fn sell_item(
        &mut self,
        item_id: i64,
        quantity: f64,
        show_on_display: bool,
        force_quantity: bool,
    ) -> Result<()> {
        let quantity = round_to(quantity, 3);
        if quantity == 0.0 {
            return Ok(());
        }
        let (item_id, quantity) = if quantity < 0.0 {
            (-item_id, -quantity)
        } else {
            (item_id, quantity)
        };

        if quantity == 1.0 && !force_quantity {
            let command = if show_on_display {
                Command::M52
            } else {
                Command::M58
            };
            self.send(command, &[item_id.into()])?;
        } else {
            let command = if show_on_display {
                Command::M52Q
            } else {
                Command::M58Q
            };
            self.send(command, &[item_id.into(), quantity.into()])?;
        }
        Ok(())
    }

    /// Record a payment. An empty `payment_type` with no amount pays the
    /// full amount due in cash.
    pub fn record_payment(&mut self, payment_type: &str, amount: f64) -> Result<()> {
        let amount = round_to(amount, 2);
        if amount > 0.0 {
            self.send(Command::M53PA, &[payment_type.into(), amount.into()])?;
        } else if !payment_type.is_empty() {
            self.send(Command::M53P, &[payment_type.into()])?;
        } else {
            self.send(Command::M53, &[])?;
        }
        Ok(())
    }

    pub fn close_fiscal_receipt(&mut self) -> Result<()> {
        self.send(Command::M56, &[])?;
        Ok(())
    }

    /// State of the fiscal receipt; `current` asks about the open receipt
    /// rather than the last one.
    pub fn fiscal_transaction_status(&mut self, current: bool) -> Result<TransactionStatus> {
        let current_marker = [FieldValue::from("T")];
        let (command, params) = if current {
            (Command::M76O, &current_marker[..])
        } else {
            (Command::M76, &[][..])
        };
        let slots = [
            SlotKind::Char,
            SlotKind::Integer,
            SlotKind::Real,
            SlotKind::Real,
        ];
        let mut fields = self.query(command, params, &slots)?;
        Ok(TransactionStatus {
            open: fields.char()? != '0',
            items: fields.integer()?,
            total: fields.real()?,
            paid: fields.real()?,
        })
    }

    pub fn amount_to_pay(&mut self) -> Result<f64> {
        Ok(self.fiscal_transaction_status(true)?.amount_due())
    }

    /// Close whichever receipt is open, if the matching callback agrees.
    ///
    /// An open fiscal receipt is paid in full before it is closed.
    pub fn close_open_receipt(
        &mut self,
        close_fiscal: impl FnOnce() -> bool,
        close_non_fiscal: impl FnOnce() -> bool,
    ) -> Result<()> {
        let status = self.status()?;
        if status.is_fiscal_receipt_open() {
            if close_fiscal() {
                self.record_payment("", 0.0)?;
                self.close_fiscal_receipt()?;
            }
        } else if status.is_non_fiscal_receipt_open() && close_non_fiscal() {
            self.close_non_fiscal_receipt()?;
        }
        Ok(())
    }

    // Non-fiscal receipts

    pub fn open_non_fiscal_receipt(&mut self) -> Result<()> {
        self.send(Command::M38, &[])?;
        Ok(())
    }

    pub fn add_non_fiscal_line(&mut self, text: &str) -> Result<()> {
        self.send(Command::M42, &[text.into()])?;
        Ok(())
    }

    pub fn close_non_fiscal_receipt(&mut self) -> Result<()> {
        self.send(Command::M39, &[])?;
        Ok(())
    }

    // Display and drawer

    pub fn clear_display(&mut self) -> Result<()> {
        self.send(Command::M33, &[])?;
        Ok(())
    }

    pub fn set_display_top(&mut self, text: &str) -> Result<()> {
        self.send(Command::M47, &[text.into()])?;
        Ok(())
    }

    pub fn set_display_bottom(&mut self, text: &str) -> Result<()> {
        self.send(Command::M35, &[text.into()])?;
        Ok(())
    }

    pub fn open_cash_drawer(&mut self) -> Result<()> {
        self.send(Command::M106I, &[DRAWER_PULSE.into()])?;
        Ok(())
    }

    // Reports

    /// Daily fiscal report. `keep_cashier_data` forbids clearing per-cashier
    /// data; `clear_item_totals` clears the per-item sale totals.
    pub fn daily_fiscal_report(
        &mut self,
        kind: DailyReportKind,
        keep_cashier_data: bool,
        clear_item_totals: bool,
    ) -> Result<()> {
        let command = match (keep_cashier_data, clear_item_totals) {
            (true, true) => Command::M69ONA,
            (true, false) => Command::M69ON,
            (false, true) => Command::M69OA,
            (false, false) => Command::M69O,
        };
        self.send(command, &[(kind as i64).into()])?;
        Ok(())
    }

    pub fn cashiers_report(&mut self) -> Result<()> {
        self.send(Command::M105, &[])?;
        Ok(())
    }

    pub fn items_report(&mut self, kind: ItemsReportKind) -> Result<()> {
        self.send(Command::M111, &[(kind as i64).into()])?;
        Ok(())
    }

    /// Report per tax group over a date range.
    pub fn tax_group_report(&mut self, from: NaiveDate, to: NaiveDate) -> Result<()> {
        self.send(Command::M50SE, &[ddmmyy(from).into(), ddmmyy(to).into()])?;
        Ok(())
    }

    /// Fiscal memory report over a date range.
    pub fn fiscal_memory_report(&mut self, from: NaiveDate, to: NaiveDate) -> Result<()> {
        self.send(Command::M79, &[ddmmyy(from).into(), ddmmyy(to).into()])?;
        Ok(())
    }

    /// Fiscal memory report over a range of record numbers.
    pub fn fiscal_memory_report_by_record(
        &mut self,
        start: u32,
        end: u32,
        kind: FiscalMemoryReportKind,
    ) -> Result<()> {
        self.send(Command::M73, &[start.into(), end.into(), (kind as i64).into()])?;
        Ok(())
    }

    pub fn day_totals_by_tax_group(&mut self) -> Result<TaxGroupTotals> {
        let mut fields = self.query(Command::M65, &[], &[SlotKind::Real; 10])?;
        let total = fields.real()? / 100.0;
        let mut groups = [0.0; TAX_GROUPS];
        for group in &mut groups {
            *group = fields.real()? / 100.0;
        }
        Ok(TaxGroupTotals { total, groups })
    }

    pub fn day_totals(&mut self) -> Result<DayTotals> {
        let slots = [
            SlotKind::Real,
            SlotKind::Real,
            SlotKind::Real,
            SlotKind::Integer,
            SlotKind::Integer,
        ];
        let mut fields = self.query(Command::M67, &[], &slots)?;
        Ok(DayTotals {
            total: fields.real()? / 100.0,
            removed: fields.real()? / 100.0,
            unpaid: fields.real()? / 100.0,
            fiscal_receipts: fields.integer()?,
            receipts: fields.integer()?,
        })
    }

    pub fn day_payments(&mut self) -> Result<DayPayments> {
        let mut fields = self.query(Command::M110, &[], &[SlotKind::Real; 5])?;
        let cash = fields.real()? / 100.0;
        fields.real()?;
        let card = fields.real()? / 100.0;
        let cheque = fields.real()? / 100.0;
        Ok(DayPayments { cash, card, cheque })
    }

    // Tax rates

    pub fn tax_rates(&mut self) -> Result<TaxRates> {
        let mut slots = [SlotKind::Real; 2 + TAX_GROUPS];
        slots[0] = SlotKind::Integer;
        slots[1] = SlotKind::Text;
        let mut fields = self.query(Command::M83, &[], &slots)?;

        let decimals = fields.integer()?;
        let flags: Vec<char> = fields.text()?.chars().collect();
        let mut rates = [None; TAX_GROUPS];
        for (i, rate) in rates.iter_mut().enumerate() {
            let value = fields.real()?;
            if flags.get(i).is_some_and(|flag| *flag != '0') {
                *rate = Some(value);
            }
        }
        Ok(TaxRates { decimals, rates })
    }

    pub fn set_tax_rates(&mut self, rates: &TaxRates) -> Result<()> {
        let flags: String = rates
            .rates
            .iter()
            .map(|rate| if rate.is_some() { '1' } else { '0' })
            .collect();
        let mut params = vec![rates.decimals.into(), flags.into()];
        params.extend(rates.rates.iter().map(|rate| rate.unwrap_or(0.0).into()));
        self.send(Command::M83DFX, &params)?;
        Ok(())
    }

    // Cashiers

    pub fn change_cashier_password(
        &mut self,
        cashier: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        self.send(
            Command::M101,
            &[cashier.into(), old_password.into(), new_password.into()],
        )?;
        Ok(())
    }

    pub fn rename_cashier(&mut self, cashier: &str, password: &str, name: &str) -> Result<()> {
        self.send(Command::M102, &[cashier.into(), password.into(), name.into()])?;
        Ok(())
    }

    // Items

    /// Program an item. Adding item 2 also drops a reset placeholder left in
    /// slot 1.
    pub fn add_item(&mut self, tax_group: &str, item_id: i64, price: f64, name: &str) -> Result<()> {
        self.program_item(tax_group, item_id, price, name)?;
        if item_id == 2 && self.is_first_item_invalid()? {
            self.delete_item(1)?;
        }
        Ok(())
    }

    fn program_item(&mut self, tax_group: &str, item_id: i64, price: f64, name: &str) -> Result<()> {
        self.send(
            Command::M107P,
            &[
                tax_group.into(),
                item_id.into(),
                round_to(price, 2).into(),
                name.into(),
            ],
        )?;
        Ok(())
    }

    /// Program a placeholder item under the first enabled tax group.
    pub fn add_invalid_item(&mut self, item_id: i64) -> Result<()> {
        let rates = self.tax_rates()?;
        let Some(group) = rates.rates.iter().position(Option::is_some) else {
            return Err(SessionError::InvalidResponse {
                command: Command::M83,
                reason: "no tax group is enabled".into(),
            });
        };
        let name = if item_id == 1 {
            INVALID_ITEM_NAME.to_string()
        } else {
            format!("{INVALID_ITEM_NAME}{item_id}")
        };
        self.program_item(TAX_GROUP_LETTERS[group], item_id, 1.0, &name)
    }

    /// True when slot 1 holds the reset placeholder.
    pub fn is_first_item_invalid(&mut self) -> Result<bool> {
        Ok(self.item(1)?.is_some_and(|item| item.name == INVALID_ITEM_NAME))
    }

    /// Number of programmed items.
    pub fn item_count(&mut self) -> Result<i64> {
        Ok(self.items_info()?.items)
    }

    /// Replace item 1 with the reset placeholder. The device refuses to
    /// delete its only item, so a second placeholder is used as a stand-in.
    pub fn delete_first_item(&mut self) -> Result<()> {
        let count = self.item_count()?;
        let Some(first) = self.item(1)? else {
            return self.add_invalid_item(1);
        };
        if count == 1 {
            if first.name == INVALID_ITEM_NAME {
                return Ok(());
            }
            self.add_invalid_item(2)?;
            self.delete_item(1)?;
            self.add_invalid_item(1)?;
            self.delete_item(2)
        } else {
            self.delete_item(1)?;
            self.add_invalid_item(1)
        }
    }

    /// Read an item; `None` if the id is free or out of range.
    pub fn item(&mut self, item_id: i64) -> Result<Option<Item>> {
        self.read_item(Command::M107R, &[item_id.into()], &[b"F", b"N"])
    }

    pub fn first_item(&mut self) -> Result<Option<Item>> {
        self.read_item(Command::M107F, &[], &[b"F"])
    }

    pub fn next_item(&mut self) -> Result<Option<Item>> {
        self.read_item(Command::M107N, &[], &[b"F"])
    }

    fn read_item(
        &mut self,
        command: Command,
        params: &[FieldValue],
        absent: &[&[u8; 1]],
    ) -> Result<Option<Item>> {
        let response = self.send(command, params)?;
        if absent.iter().any(|marker| response.payload[..] == marker[..]) {
            return Ok(None);
        }
        let values = self.session.decode(command, &response, &ITEM_SLOTS)?;
        let mut fields = Fields::new(command, values);
        fields.text()?;
        Ok(Some(Item {
            id: fields.integer()?,
            tax_group: fields.text()?,
            price: fields.real()?,
            quantity: fields.real()?,
            name: fields.text()?,
        }))
    }

    pub fn delete_item(&mut self, item_id: i64) -> Result<()> {
        self.send(Command::M107D, &[item_id.into()])?;
        Ok(())
    }

    pub fn set_item_price(&mut self, item_id: i64, price: f64) -> Result<()> {
        self.send(Command::M107C, &[item_id.into(), round_to(price, 2).into()])?;
        Ok(())
    }

    pub fn first_free_item_id(&mut self) -> Result<i64> {
        self.query(Command::M107X, &[], &[SlotKind::Integer])?.integer()
    }

    pub fn items_info(&mut self) -> Result<ItemsInfo> {
        let mut fields = self.query(Command::M107I, &[], &[SlotKind::Integer; 3])?;
        Ok(ItemsInfo {
            max_name_length: fields.integer()?,
            max_items: fields.integer()?,
            items: fields.integer()?,
        })
    }

    // Header, footer and logo

    pub fn header_line(&mut self, line: u8) -> Result<String> {
        self.query(Command::M43, &["I".into(), line.into()], &[SlotKind::Text])?
            .text()
    }

    pub fn set_header_line(&mut self, line: u8, text: &str) -> Result<()> {
        self.send(Command::M43, &[line.into(), text.into()])?;
        Ok(())
    }

    pub fn logo_enabled(&mut self) -> Result<bool> {
        let flag = self
            .query(Command::M43, &["I".into(), "L".into()], &[SlotKind::Char])?
            .char()?;
        Ok(flag != '0')
    }

    pub fn set_logo_enabled(&mut self, enabled: bool) -> Result<()> {
        self.send(Command::M43, &["L".into(), i64::from(enabled).into()])?;
        Ok(())
    }

    /// Upload one line of the graphic logo, already encoded for the device.
    pub fn upload_logo_line(&mut self, line: u8, data: &str) -> Result<()> {
        self.send(Command::M115, &[line.into(), data.into()])?;
        Ok(())
    }
}
