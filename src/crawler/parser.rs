//! Detail report parser
//!
//! Turns one raw detail-endpoint response body into a normalized record.
//! The endpoint returns a JSON object whose "general" array carries the
//! interesting fields positionally: the analysis timestamp (seconds since
//! the epoch) at index 1, the sample identifier at index 2, and the display
//! name at index 5.

use chrono::{Local, TimeZone};
use serde_json::Value;
use thiserror::Error;

/// Indexes into the "general" array of a detail response
const GENERAL_TIMESTAMP_INDEX: usize = 1;
const GENERAL_IDENTIFIER_INDEX: usize = 2;
const GENERAL_NAME_INDEX: usize = 5;

/// A normalized detail record, ready for storage
///
/// All three fields are guaranteed non-empty; a payload that cannot fill
/// them does not produce a record at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRecord {
    /// Unique identifier of the sample (a content hash)
    pub identifier: String,

    /// Display name of the sample
    pub name: String,

    /// Analysis time as `YYYY-MM-DD HH:MM:SS` in the local time zone
    pub time: String,
}

/// Errors raised while parsing a detail response
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Malformed JSON in detail response: {0}")]
    MalformedJson(#[from] serde_json::Error),

    #[error("Missing field in detail response: {0}")]
    MissingField(String),

    #[error("Invalid timestamp in detail response: {0}")]
    InvalidTimestamp(String),
}

/// Parses a raw detail response body into a [`DetailRecord`]
///
/// Pure function: no I/O and no shared state, so it is safe to call from
/// any number of concurrent workers.
///
/// The epoch value may arrive either as a JSON number or as a numeric
/// string; both forms occur in the wild. It is rendered in the local time
/// zone of the running process, matching what the source site displays.
///
/// # Errors
///
/// * [`ParseError::MalformedJson`] - the body is not valid JSON
/// * [`ParseError::MissingField`] - the "general" array is absent, too
///   short to index the required positions, or a required cell is empty
/// * [`ParseError::InvalidTimestamp`] - the epoch cell is not a usable
///   seconds-since-epoch value
pub fn parse_detail(raw: &str) -> Result<DetailRecord, ParseError> {
    let value: Value = serde_json::from_str(raw)?;

    let general = value
        .get("general")
        .and_then(Value::as_array)
        .ok_or_else(|| ParseError::MissingField("general".to_string()))?;

    if general.len() <= GENERAL_NAME_INDEX {
        return Err(ParseError::MissingField(format!(
            "general array has {} elements, need at least {}",
            general.len(),
            GENERAL_NAME_INDEX + 1
        )));
    }

    let epoch = epoch_from_value(&general[GENERAL_TIMESTAMP_INDEX])?;
    let identifier = string_field(&general[GENERAL_IDENTIFIER_INDEX], "general[2]")?;
    let name = string_field(&general[GENERAL_NAME_INDEX], "general[5]")?;
    let time = format_epoch(epoch)?;

    Ok(DetailRecord {
        identifier,
        name,
        time,
    })
}

/// Reads the epoch cell, accepting a JSON number or a numeric string
fn epoch_from_value(value: &Value) -> Result<i64, ParseError> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .ok_or_else(|| ParseError::InvalidTimestamp(n.to_string())),
        Value::String(s) => s
            .parse::<i64>()
            .map_err(|_| ParseError::InvalidTimestamp(s.clone())),
        other => Err(ParseError::InvalidTimestamp(other.to_string())),
    }
}

/// Renders an epoch value as `YYYY-MM-DD HH:MM:SS` in local time
fn format_epoch(epoch: i64) -> Result<String, ParseError> {
    let timestamp = Local
        .timestamp_opt(epoch, 0)
        .single()
        .ok_or_else(|| ParseError::InvalidTimestamp(epoch.to_string()))?;
    Ok(timestamp.format("%Y-%m-%d %H:%M:%S").to_string())
}

fn string_field(value: &Value, what: &str) -> Result<String, ParseError> {
    let s = value
        .as_str()
        .ok_or_else(|| ParseError::MissingField(format!("{} is not a string", what)))?;

    if s.is_empty() {
        return Err(ParseError::MissingField(format!("{} is empty", what)));
    }

    Ok(s.to_string())
}
