//! Cell parsers for the typed record fields.
//!
//! Every parser returns `None` for text it cannot interpret; the caller
//! records that as [`FieldValue::Invalid`](super::FieldValue::Invalid).

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

/// Parses a timestamp, keeping the offset written in the value.
///
/// `2024-01-01T07:30:00+02:00` therefore has local hour 7 and UTC hour 5.
/// Values without an offset are taken as UTC. Integer values are Unix
/// epochs whose unit (s, ms, us, ns) is picked by magnitude.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Some(dt) = DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z"))
        .ok()
    {
        return Some(dt);
    }

    if let Some(dt) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
    {
        return Some(as_utc(dt));
    }

    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(as_utc);
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().and_then(epoch_to_datetime);
    }

    None
}

fn as_utc(dt: NaiveDateTime) -> DateTime<FixedOffset> {
    dt.and_utc().fixed_offset()
}

fn epoch_to_datetime(value: i64) -> Option<DateTime<FixedOffset>> {
    let units_per_second: i64 = match value {
        v if v >= 100_000_000_000_000_000 => 1_000_000_000,
        v if v >= 100_000_000_000_000 => 1_000_000,
        v if v >= 100_000_000_000 => 1_000,
        _ => 1,
    };
    let secs = value.div_euclid(units_per_second);
    let nanos = value.rem_euclid(units_per_second) * (1_000_000_000 / units_per_second);
    DateTime::<Utc>::from_timestamp(secs, u32::try_from(nanos).ok()?).map(|dt| dt.fixed_offset())
}

/// Parses a byte count.
///
/// Integral decimals such as `"512.0"` are accepted since numeric columns
/// with gaps are often exported as floats. Negative or fractional values are
/// rejected rather than truncated.
pub fn parse_byte_count(raw: &str) -> Option<u64> {
    let s = raw.trim();
    if let Ok(value) = s.parse::<u64>() {
        return Some(value);
    }
    let value: f64 = s.parse().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u64::MAX as f64 {
        Some(value as u64)
    } else {
        None
    }
}

/// Parses a finite number for descriptive statistics.
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
