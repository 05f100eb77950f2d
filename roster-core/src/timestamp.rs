//! Time helpers.
//!
//! The roster stores expiry as seconds since the Unix epoch (fractional
//! allowed). The spreadsheet displays `creation_time` as a day serial, so
//! conversions for that column live here too.

use chrono::{DateTime, Months, Utc};

/// Seconds since the Unix epoch.
pub type Instant = f64;

/// Seconds between the spreadsheet epoch (1899-12-30) and the Unix epoch.
pub const SHEETS_EPOCH_OFFSET_SECS: f64 = 2_209_161_600.0;

const SECS_PER_DAY: f64 = 86_400.0;

/// Current wall-clock time as an [`Instant`].
pub fn now_seconds() -> Instant {
    to_seconds(Utc::now())
}

pub fn to_seconds(at: DateTime<Utc>) -> Instant {
    at.timestamp() as f64 + f64::from(at.timestamp_subsec_millis()) / 1000.0
}

/// `None` when `seconds` is outside chrono's representable range.
pub fn from_seconds(seconds: Instant) -> Option<DateTime<Utc>> {
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

/// Day serial used by the spreadsheet for date cells.
pub fn to_sheets_serial(seconds: Instant) -> f64 {
    (seconds + SHEETS_EPOCH_OFFSET_SECS) / SECS_PER_DAY
}

pub fn from_sheets_serial(serial: f64) -> Instant {
    serial * SECS_PER_DAY - SHEETS_EPOCH_OFFSET_SECS
}

/// `start` plus `months` calendar months, clamped to the last day of a
/// shorter month (Jan 31 + 1 month = Feb 28/29).
pub fn add_months(start: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    start.checked_add_months(Months::new(months))
}
