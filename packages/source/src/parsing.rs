//! Date helpers for feature-service attributes.
//!
//! Date fields come back as epoch milliseconds. Two output formats exist:
//! the zero-padded `DATE '...'` literal (see
//! [`pdx_permits_query::predicate::Literal`]) and the unpadded `M/D/YYYY`
//! text shown in popups, produced here.

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};

/// Converts an epoch-millisecond attribute to an instant. Returns `None`
/// for out-of-range values.
#[must_use]
pub fn parse_epoch_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Formats an instant as `M/D/YYYY` with no padding, using the calendar
/// day of the instant's own zone.
#[must_use]
pub fn format_status_date<Tz: TimeZone>(date: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    date.format("%-m/%-d/%Y").to_string()
}
