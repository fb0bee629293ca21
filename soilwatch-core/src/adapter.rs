//! Record schema adapter: the only place loosely typed feed entries are trusted.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;
use soilwatch_schemas::{
    feed::{self, RawFeedEntry},
    reading::{Channel, Metric, SensorRecord, CHANNELS},
};
use thiserror::Error;

/// Why a feed entry could not become a `SensorRecord`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MalformedRecord {
    #[error("entry is not a JSON object")]
    NotAnObject,

    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("field '{field}' is not a number: {value}")]
    NotANumber { field: &'static str, value: String },

    #[error("field '{field}' is not a timestamp: {value}")]
    NotATimestamp { field: &'static str, value: String },
}

const NAIVE_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"];

/// Validates one raw feed entry and converts it into a canonical record.
pub fn adapt(entry: &RawFeedEntry) -> Result<SensorRecord, MalformedRecord> {
    let object = entry.as_object().ok_or(MalformedRecord::NotAnObject)?;
    let number = |field: &'static str| -> Result<f64, MalformedRecord> {
        let value = object.get(field).ok_or(MalformedRecord::MissingField(field))?;
        coerce_number(value).ok_or_else(|| MalformedRecord::NotANumber {
            field,
            value: value.to_string(),
        })
    };
    let timestamp = |field: &'static str| -> Result<DateTime<Utc>, MalformedRecord> {
        let value = object.get(field).ok_or(MalformedRecord::MissingField(field))?;
        coerce_timestamp(value).ok_or_else(|| MalformedRecord::NotATimestamp {
            field,
            value: value.to_string(),
        })
    };

    let mut soil_moisture = [0.0; CHANNELS];
    let mut gas = [0.0; CHANNELS];
    for channel in Channel::ALL {
        soil_moisture[channel.index()] = number(feed::field_name(Metric::SoilMoisture(channel)))?;
        gas[channel.index()] = number(feed::field_name(Metric::Gas(channel)))?;
    }
    let temperature = number(feed::TEMPERATURE_FIELD)?;
    let humidity = number(feed::HUMIDITY_FIELD)?;

    // Both columns are required; the feed writes the same instant into each.
    timestamp(feed::DATE_FIELD)?;
    let timestamp = timestamp(feed::TIME_FIELD)?;

    Ok(SensorRecord {
        soil_moisture,
        gas,
        temperature,
        humidity,
        timestamp,
    })
}

/// Accepts JSON numbers and numeric strings. Non-finite values are rejected.
fn coerce_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Integers are epoch milliseconds; strings are RFC 3339, a naive date-time (UTC), a bare
/// date (midnight UTC) or epoch milliseconds.
fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => {
            let millis = match n.as_i64() {
                Some(ms) => ms,
                None => {
                    let ms = n.as_f64()?;
                    if !ms.is_finite() {
                        return None;
                    }
                    ms as i64
                }
            };
            Utc.timestamp_millis_opt(millis).single()
        }
        Value::String(s) => parse_timestamp_str(s.trim()),
        _ => None,
    }
}

fn parse_timestamp_str(s: &str) -> Option<DateTime<Utc>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    s.parse::<i64>()
        .ok()
        .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
}
