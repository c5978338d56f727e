//! Spreadsheet serial day numbers and the test-interval arithmetic built on them.

use chrono::{Datelike, Months, NaiveDate};

/// Serial day number of 2024-01-01 in the 1900 date system. All conversions are anchored here,
/// which keeps them clear of the 1900 leap-year bug.
pub const SERIAL_2024_01_01: i64 = 45292;

/// Interval applied when a test slot has a date but no interval.
pub const DEFAULT_INTERVAL_MONTHS: u32 = 3;

fn anchor() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).expect("2024-01-01 is a valid date")
}

pub fn serial_to_date(serial: i64) -> Option<NaiveDate> {
    let offset = serial.checked_sub(SERIAL_2024_01_01)?;
    anchor().checked_add_signed(chrono::Duration::try_days(offset)?)
}

pub fn date_to_serial(date: NaiveDate) -> i64 {
    SERIAL_2024_01_01 + (date - anchor()).num_days()
}

/// Interpret a stringified date cell.
///
/// Numeric cells are serial day numbers (any fractional time-of-day part is ignored). Text
/// dates written as `YYYY/MM/DD`, `YYYY-MM-DD` or `YYYY.MM.DD` are accepted as well.
pub fn parse_date_cell(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let parts: Vec<&str> = text.split(['/', '-', '.']).collect();
    match parts.as_slice() {
        [year, month, day] if year.len() == 4 => NaiveDate::from_ymd_opt(
            year.parse().ok()?,
            month.trim().parse().ok()?,
            day.trim().parse().ok()?,
        ),
        _ => serial_to_date(leading_integer(text)?),
    }
}

/// Leading integer of `text` (optional sign, then digits), ignoring whatever follows.
fn leading_integer(text: &str) -> Option<i64> {
    let (sign, digits) = match text.strip_prefix('-') {
        Some(rest) => (-1, rest),
        None => (1, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(sign * value)
}

/// Interval cells hold a month count, sometimes with a unit suffix (`6`, `6.0`, `12个月`).
pub fn parse_months(text: &str) -> Option<u32> {
    let value = leading_integer(text.trim())?;
    u32::try_from(value).ok()
}

/// `last_test + months`, clamped to the end of the target month.
pub fn next_due_date(last_test: NaiveDate, months: u32) -> Option<NaiveDate> {
    last_test.checked_add_months(Months::new(months))
}

/// A test is overdue when its due date is on or before `today`. A due date that cannot be
/// computed counts as overdue.
pub fn is_overdue(last_test: NaiveDate, months: u32, today: NaiveDate) -> bool {
    match next_due_date(last_test, months) {
        Some(due) => due <= today,
        None => true,
    }
}

/// `YYYY/MM/DD`, the format the registers display dates in.
pub fn format_date(date: NaiveDate) -> String {
    format!("{:04}/{:02}/{:02}", date.year(), date.month(), date.day())
}
