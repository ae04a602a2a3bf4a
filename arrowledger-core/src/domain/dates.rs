//! Wire date format handling
//!
//! The ledger accepts dates only as `DD/MM/YYYY` strings. Anything else is
//! rejected at the service boundary; rejecting other formats is intentional.

use chrono::NaiveDate;

/// Parse a `DD/MM/YYYY` string into a calendar date.
///
/// The result carries no time-of-day; callers treat it as UTC midnight.
/// Returns `None` for any other shape, out-of-range components, or
/// impossible dates (e.g. 31/02/2024).
pub fn parse_date_dmy(input: &str) -> Option<NaiveDate> {
    let mut parts = input.split('/');
    let day: u32 = parts.next()?.parse().ok()?;
    let month: u32 = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    if day == 0 || month == 0 || year == 0 {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Format a calendar date back into the wire `DD/MM/YYYY` form.
pub fn format_date_dmy(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}
