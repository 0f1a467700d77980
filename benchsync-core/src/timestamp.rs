//! Offset-aware timestamp parsing.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};

use crate::error::TimestampError;

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an RFC 3339 timestamp, keeping its offset.
///
/// Inputs that would parse as a naive date or datetime produce
/// [`TimestampError::MissingOffset`] so callers can report the real problem.
pub fn parse_timestamp(value: &str) -> Result<DateTime<FixedOffset>, TimestampError> {
    let trimmed = value.trim();
    match DateTime::parse_from_rfc3339(trimmed) {
        Ok(ts) => Ok(ts),
        Err(source) => {
            if is_naive(trimmed) {
                Err(TimestampError::MissingOffset {
                    value: trimmed.to_string(),
                })
            } else {
                Err(TimestampError::Invalid {
                    value: trimmed.to_string(),
                    source,
                })
            }
        }
    }
}

fn is_naive(value: &str) -> bool {
    NAIVE_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
        || NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok()
}
