//! Row parsing: one raw CSV line into a validated `Row`, or a descriptive
//! failure. Malformed lines are an expected outcome, never a panic.

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

/// Fixed column header of every export CSV.
pub const CSV_HEADER: &str = "patient_id,event_time,event_type,value";

/// Event times are bare timestamps like `2024-01-01T00:00:05`.
const EVENT_TIME: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]");

/// Same, with fractional seconds.
const EVENT_TIME_SUBSEC: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]");

/// One validated record. Transient: built from one line and consumed by the
/// accumulator immediately, never retained.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub patient_id: String,
    pub event_time: PrimitiveDateTime,
    pub event_type: String,
    pub value: f64,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowParseError {
    #[error("blank line")]
    Blank,
    #[error("expected 4 fields, got {0}")]
    FieldCount(usize),
    #[error("empty patient_id")]
    EmptyPatientId,
    #[error("unparseable event_time: {0:?}")]
    BadTimestamp(String),
    #[error("empty event_type")]
    EmptyEventType,
    #[error("non-numeric value: {0:?}")]
    BadValue(String),
}

/// Parse one data line. The format is fixed plain CSV (4 columns, no quoting
/// or escaping); trailing whitespace and a missing final newline are fine.
pub fn parse_row(line: &str) -> Result<Row, RowParseError> {
    let line = line.trim_end();
    if line.is_empty() {
        return Err(RowParseError::Blank);
    }

    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() != 4 {
        return Err(RowParseError::FieldCount(parts.len()));
    }

    let patient_id = parts[0].trim();
    if patient_id.is_empty() {
        return Err(RowParseError::EmptyPatientId);
    }

    let raw_time = parts[1].trim();
    let event_time = parse_event_time(raw_time)
        .ok_or_else(|| RowParseError::BadTimestamp(raw_time.to_string()))?;

    let event_type = parts[2].trim();
    if event_type.is_empty() {
        return Err(RowParseError::EmptyEventType);
    }

    let raw_value = parts[3].trim();
    let value: f64 = raw_value
        .parse()
        .map_err(|_| RowParseError::BadValue(raw_value.to_string()))?;

    Ok(Row {
        patient_id: patient_id.to_string(),
        event_time,
        event_type: event_type.to_string(),
        value,
    })
}

fn parse_event_time(s: &str) -> Option<PrimitiveDateTime> {
    if let Ok(dt) = PrimitiveDateTime::parse(s, EVENT_TIME) {
        return Some(dt);
    }
    if let Ok(dt) = PrimitiveDateTime::parse(s, EVENT_TIME_SUBSEC) {
        return Some(dt);
    }
    // Some generators emit full RFC 3339 stamps with an offset; accept those too.
    OffsetDateTime::parse(s, &Rfc3339)
        .ok()
        .map(|dt| PrimitiveDateTime::new(dt.date(), dt.time()))
}
