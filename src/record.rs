use thiserror::Error;

use crate::models::{Period, Status, StudentEntry};

/// One line of the canonical roster file:
///
/// ```text
/// <lastName>,<firstName>,<period>,<statusCode>,.
/// ```
///
/// The trailing `.` field is an artifact of the original format and is kept
/// for byte-compatible round-trips with existing remote data. There is no
/// escaping; fields must not contain commas or newlines.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedRecord {
    #[error("expected at least 4 comma-separated fields, found {0}")]
    TooFewFields(usize),
    #[error("period field {0:?} is not a digit between 1 and 7")]
    BadPeriod(String),
    #[error("name field is empty")]
    EmptyName,
}

pub fn parse_line(raw: &str) -> Result<StudentEntry, MalformedRecord> {
    let fields: Vec<&str> = raw.split(',').map(str::trim).collect();
    if fields.len() < 4 {
        return Err(MalformedRecord::TooFewFields(fields.len()));
    }

    let last_name = fields[0];
    let first_name = fields[1];
    if last_name.is_empty() || first_name.is_empty() {
        return Err(MalformedRecord::EmptyName);
    }

    let period = fields[2]
        .parse::<u8>()
        .ok()
        .and_then(Period::new)
        .ok_or_else(|| MalformedRecord::BadPeriod(fields[2].to_string()))?;

    Ok(StudentEntry {
        last_name: last_name.to_string(),
        first_name: first_name.to_string(),
        period,
        status: Status::from_code(fields[3]),
    })
}

pub fn serialize_line(entry: &StudentEntry) -> String {
    format!(
        "{},{},{},{},.",
        entry.last_name,
        entry.first_name,
        entry.period,
        entry.status.code()
    )
}
