// SPDX-FileCopyrightText: 2026 Waitline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timestamp/date/time text round-trip for the TEXT columns.
//!
//! All instants are stored as fixed-width UTC strings
//! (`%Y-%m-%dT%H:%M:%S%.3fZ`) so lexicographic comparison in SQL is also
//! chronological comparison. Parsing failures surface as rusqlite
//! conversion errors carrying the column index.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rusqlite::types::Type;

/// Format an instant into the fixed-width stored form.
pub fn format_ts(dt: DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

pub fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Parse a stored instant; `idx` is the column index for error reporting.
pub fn parse_ts(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn parse_date(idx: usize, value: &str) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub fn parse_time(idx: usize, value: &str) -> rusqlite::Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
