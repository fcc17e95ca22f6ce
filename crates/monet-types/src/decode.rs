//! Textual value decoding.
//!
//! MonetDB result rows carry every value as text. This module decodes one
//! raw column slice into a [`Value`] according to the column's declared
//! type. The raw slice is exactly what sits between two `,\t` separators
//! of a row line: quoted and escaped for string types, bare for everything
//! else.

use std::str::FromStr;

use bytes::Bytes;
use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::column::ColumnType;
use crate::error::TypeError;
use crate::value::Value;

/// The NULL literal used for every column type.
pub const NULL_LITERAL: &str = "NULL";

/// Decode one raw column slice into a typed [`Value`].
pub fn decode_value(ty: ColumnType, raw: &str) -> Result<Value, TypeError> {
    if raw == NULL_LITERAL {
        return Ok(Value::Null);
    }

    match ty {
        ColumnType::TinyInt => parse_int(raw, "tinyint").map(Value::TinyInt),
        ColumnType::SmallInt => parse_int(raw, "smallint").map(Value::SmallInt),
        ColumnType::Int => parse_int(raw, "int").map(Value::Int),
        ColumnType::BigInt | ColumnType::Oid | ColumnType::Serial => {
            parse_int(raw, "bigint").map(Value::BigInt)
        }
        ColumnType::HugeInt => parse_int(raw, "hugeint").map(Value::HugeInt),
        ColumnType::Double | ColumnType::Float | ColumnType::Real => f64::from_str(raw)
            .map(Value::Double)
            .map_err(|_| TypeError::malformed("double", raw)),
        ColumnType::Decimal => Decimal::from_str(raw)
            .map(Value::Decimal)
            .map_err(|_| TypeError::malformed("decimal", raw)),
        ColumnType::Boolean => match raw {
            "true" => Ok(Value::Bool(true)),
            "false" => Ok(Value::Bool(false)),
            _ => Err(TypeError::malformed("boolean", raw)),
        },
        ColumnType::Char | ColumnType::Varchar | ColumnType::Clob | ColumnType::Text => {
            unescape_text(raw).map(Value::Text)
        }
        ColumnType::Json => unescape_text(raw).map(Value::Json),
        ColumnType::Uuid => Uuid::parse_str(raw)
            .map(Value::Uuid)
            .map_err(|_| TypeError::malformed("uuid", raw)),
        ColumnType::Blob => hex::decode(raw)
            .map(|bytes| Value::Blob(Bytes::from(bytes)))
            .map_err(|_| TypeError::malformed("blob", raw)),
        ColumnType::Time => parse_time(raw).map(Value::Time),
        ColumnType::Date => parse_date(raw).map(Value::Date),
        ColumnType::Timestamp => parse_timestamp(raw).map(Value::Timestamp),
        ColumnType::TimestampTz => parse_timestamptz(raw),
    }
}

fn parse_int<T: FromStr>(raw: &str, type_name: &'static str) -> Result<T, TypeError> {
    raw.parse::<T>()
        .map_err(|_| TypeError::malformed(type_name, raw))
}

/// Decode a quoted string value, resolving backslash escapes.
///
/// The input must start and end with `"`. Recognised escapes are
/// `\e \f \n \r \t \v \\ \' \"`; an unrecognised escape keeps the
/// escaped character as-is.
pub fn unescape_text(raw: &str) -> Result<String, TypeError> {
    let inner = raw
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .ok_or_else(|| TypeError::UnterminatedString(raw.to_owned()))?;

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('e') => out.push('\u{1b}'),
            Some('f') => out.push('\u{c}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('v') => out.push('\u{b}'),
            Some(other) => out.push(other),
            None => return Err(TypeError::UnterminatedString(raw.to_owned())),
        }
    }
    Ok(out)
}

/// Parse `HH:MM:SS` with an optional fractional part of 3 or 6 digits.
fn parse_time(raw: &str) -> Result<NaiveTime, TypeError> {
    let (clock, frac) = match raw.split_once('.') {
        Some((clock, frac)) => (clock, Some(frac)),
        None => (raw, None),
    };

    let mut parts = clock.splitn(3, ':');
    let hour = next_number(&mut parts, raw, "time")?;
    let minute = next_number(&mut parts, raw, "time")?;
    let second = next_number(&mut parts, raw, "time")?;

    let nanos = match frac {
        Some(digits) => parse_fraction_nanos(digits).ok_or(TypeError::malformed("time", raw))?,
        None => 0,
    };

    NaiveTime::from_hms_nano_opt(hour, minute, second, nanos).ok_or(TypeError::OutOfRange {
        type_name: "time",
        raw: raw.to_owned(),
    })
}

/// Parse `Y-MM-DD`. The server may strip leading zeros from the year, so
/// any 1-4 digit year is accepted.
fn parse_date(raw: &str) -> Result<NaiveDate, TypeError> {
    let mut parts = raw.splitn(3, '-');
    let year: i32 = next_number(&mut parts, raw, "date")?;
    let month = next_number(&mut parts, raw, "date")?;
    let day = next_number(&mut parts, raw, "date")?;

    NaiveDate::from_ymd_opt(year, month, day).ok_or(TypeError::OutOfRange {
        type_name: "date",
        raw: raw.to_owned(),
    })
}

/// Parse `<date> <time>`.
fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, TypeError> {
    let (date, time) = raw
        .split_once(' ')
        .ok_or_else(|| TypeError::malformed("timestamp", raw))?;
    Ok(NaiveDateTime::new(parse_date(date)?, parse_time(time)?))
}

/// Parse `<timestamp><zone>` where zone is `z`, `Z`, or `±HH:MM`.
///
/// The decoded value is the UTC instant plus the literal offset; no zone
/// name is attached.
fn parse_timestamptz(raw: &str) -> Result<Value, TypeError> {
    let (naive_part, offset_seconds) = if let Some(rest) = raw.strip_suffix(['z', 'Z']) {
        (rest, 0)
    } else {
        if raw.len() < 6 || !raw.is_char_boundary(raw.len() - 6) {
            return Err(TypeError::malformed("timestamptz", raw));
        }
        let (rest, zone) = raw.split_at(raw.len() - 6);
        let sign = match zone.as_bytes()[0] {
            b'+' => 1,
            b'-' => -1,
            _ => return Err(TypeError::malformed("timestamptz", raw)),
        };
        let (hours, minutes) = zone[1..]
            .split_once(':')
            .ok_or_else(|| TypeError::malformed("timestamptz", raw))?;
        let hours: i32 = hours
            .parse()
            .map_err(|_| TypeError::malformed("timestamptz", raw))?;
        let minutes: i32 = minutes
            .parse()
            .map_err(|_| TypeError::malformed("timestamptz", raw))?;
        (rest, sign * (hours * 3600 + minutes * 60))
    };

    let naive = parse_timestamp(naive_part.trim_end())?;
    let offset = FixedOffset::east_opt(offset_seconds).ok_or(TypeError::OutOfRange {
        type_name: "timestamptz",
        raw: raw.to_owned(),
    })?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(Value::TimestampTz)
        .ok_or(TypeError::OutOfRange {
            type_name: "timestamptz",
            raw: raw.to_owned(),
        })
}

fn next_number<'a, T: FromStr>(
    parts: &mut impl Iterator<Item = &'a str>,
    raw: &str,
    type_name: &'static str,
) -> Result<T, TypeError> {
    parts
        .next()
        .and_then(|p| p.parse::<T>().ok())
        .ok_or(TypeError::malformed(type_name, raw))
}

/// Scale a fractional-seconds digit string to nanoseconds.
fn parse_fraction_nanos(digits: &str) -> Option<u32> {
    if digits.is_empty() || digits.len() > 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value: u32 = digits.parse().ok()?;
    Some(value * 10u32.pow(9 - digits.len() as u32))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn test_null_for_every_type() {
        for ty in [
            ColumnType::Int,
            ColumnType::Varchar,
            ColumnType::Blob,
            ColumnType::TimestampTz,
        ] {
            assert_eq!(decode_value(ty, "NULL").unwrap(), Value::Null);
        }
    }

    #[test]
    fn test_integers() {
        assert_eq!(
            decode_value(ColumnType::TinyInt, "-12").unwrap(),
            Value::TinyInt(-12)
        );
        assert_eq!(
            decode_value(ColumnType::Int, "2147483647").unwrap(),
            Value::Int(i32::MAX)
        );
        assert_eq!(
            decode_value(ColumnType::HugeInt, "170141183460469231731687303715884105727").unwrap(),
            Value::HugeInt(i128::MAX)
        );
        assert!(decode_value(ColumnType::TinyInt, "300").is_err());
    }

    #[test]
    fn test_double_and_decimal() {
        assert_eq!(
            decode_value(ColumnType::Double, "1.5").unwrap(),
            Value::Double(1.5)
        );
        assert_eq!(
            decode_value(ColumnType::Real, "-2.25e2").unwrap(),
            Value::Double(-225.0)
        );
        assert_eq!(
            decode_value(ColumnType::Decimal, "123.450").unwrap(),
            Value::Decimal(Decimal::from_str("123.450").unwrap())
        );
    }

    #[test]
    fn test_boolean() {
        assert_eq!(
            decode_value(ColumnType::Boolean, "true").unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            decode_value(ColumnType::Boolean, "false").unwrap(),
            Value::Bool(false)
        );
        assert!(decode_value(ColumnType::Boolean, "TRUE").is_err());
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            decode_value(ColumnType::Varchar, r#""a\tb\nc""#).unwrap(),
            Value::Text("a\tb\nc".into())
        );
        assert_eq!(
            decode_value(ColumnType::Text, r#""qu\"ote\\slash""#).unwrap(),
            Value::Text("qu\"ote\\slash".into())
        );
        assert_eq!(
            decode_value(ColumnType::Clob, r#""\e\v\f""#).unwrap(),
            Value::Text("\u{1b}\u{b}\u{c}".into())
        );
        assert!(decode_value(ColumnType::Varchar, "unquoted").is_err());
    }

    #[test]
    fn test_json_keeps_body() {
        assert_eq!(
            decode_value(ColumnType::Json, r#""{\"k\": 1}""#).unwrap(),
            Value::Json(r#"{"k": 1}"#.into())
        );
    }

    #[test]
    fn test_uuid() {
        let raw = "c81d4e2e-bcf2-11e6-869b-7df92533d2db";
        assert_eq!(
            decode_value(ColumnType::Uuid, raw).unwrap(),
            Value::Uuid(Uuid::parse_str(raw).unwrap())
        );
    }

    #[test]
    fn test_blob_hex() {
        assert_eq!(
            decode_value(ColumnType::Blob, "DEADBEEF").unwrap(),
            Value::Blob(Bytes::from_static(&[0xDE, 0xAD, 0xBE, 0xEF]))
        );
        assert!(decode_value(ColumnType::Blob, "XYZ").is_err());
    }

    #[test]
    fn test_time_precisions() {
        let t = decode_value(ColumnType::Time, "13:02:45").unwrap();
        assert_eq!(t, Value::Time(NaiveTime::from_hms_opt(13, 2, 45).unwrap()));

        let Value::Time(millis) = decode_value(ColumnType::Time, "13:02:45.123").unwrap() else {
            panic!("expected time");
        };
        assert_eq!(millis.nanosecond(), 123_000_000);

        let Value::Time(micros) = decode_value(ColumnType::Time, "13:02:45.123456").unwrap() else {
            panic!("expected time");
        };
        assert_eq!(micros.nanosecond(), 123_456_000);
    }

    #[test]
    fn test_date_short_year() {
        let Value::Date(d) = decode_value(ColumnType::Date, "24-03-01").unwrap() else {
            panic!("expected date");
        };
        assert_eq!((d.year(), d.month(), d.day()), (24, 3, 1));

        assert_eq!(
            decode_value(ColumnType::Date, "2024-12-31").unwrap(),
            Value::Date(NaiveDate::from_ymd_opt(2024, 12, 31).unwrap())
        );
        assert!(decode_value(ColumnType::Date, "2024-13-01").is_err());
    }

    #[test]
    fn test_timestamp() {
        let Value::Timestamp(ts) =
            decode_value(ColumnType::Timestamp, "2024-06-15 08:30:00.500000").unwrap()
        else {
            panic!("expected timestamp");
        };
        assert_eq!(ts.date().year(), 2024);
        assert_eq!(ts.time().nanosecond(), 500_000_000);
    }

    #[test]
    fn test_timestamptz_offsets() {
        let Value::TimestampTz(utc) =
            decode_value(ColumnType::TimestampTz, "2024-06-15 08:30:00z").unwrap()
        else {
            panic!("expected timestamptz");
        };
        assert_eq!(utc.offset().local_minus_utc(), 0);

        let Value::TimestampTz(east) =
            decode_value(ColumnType::TimestampTz, "2024-06-15 08:30:00.123456+02:00").unwrap()
        else {
            panic!("expected timestamptz");
        };
        assert_eq!(east.offset().local_minus_utc(), 2 * 3600);

        let Value::TimestampTz(west) =
            decode_value(ColumnType::TimestampTz, "2024-06-15 08:30:00-05:30").unwrap()
        else {
            panic!("expected timestamptz");
        };
        assert_eq!(west.offset().local_minus_utc(), -(5 * 3600 + 30 * 60));

        // Same instant regardless of representation
        assert_eq!(
            east.with_timezone(&chrono::Utc),
            decode_value(ColumnType::TimestampTz, "2024-06-15 06:30:00.123456z")
                .ok()
                .and_then(|v| match v {
                    Value::TimestampTz(dt) => Some(dt.with_timezone(&chrono::Utc)),
                    _ => None,
                })
                .unwrap()
        );
    }
}
