//! SQL value representation.

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use uuid::Uuid;

/// A SQL value that can represent any MonetDB data type.
///
/// All parsing and encoding paths in the driver match on this enum. The
/// [`ColumnType`](crate::ColumnType) of a result column directs decoding;
/// the [`ParamType`](crate::ParamType) of a placeholder directs encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// NULL value.
    Null,
    /// Boolean value (BOOLEAN).
    Bool(bool),
    /// 8-bit signed integer (TINYINT).
    TinyInt(i8),
    /// 16-bit signed integer (SMALLINT).
    SmallInt(i16),
    /// 32-bit signed integer (INT).
    Int(i32),
    /// 64-bit signed integer (BIGINT, OID, SERIAL).
    BigInt(i64),
    /// 128-bit signed integer (HUGEINT).
    HugeInt(i128),
    /// 64-bit floating point (DOUBLE, FLOAT, REAL).
    Double(f64),
    /// Fixed-precision decimal (DECIMAL).
    Decimal(Decimal),
    /// String value (CHAR, VARCHAR, CLOB, TEXT).
    Text(String),
    /// JSON document carried as a string whose body is valid JSON.
    Json(String),
    /// Binary value (BLOB), hex-encoded on the wire.
    Blob(Bytes),
    /// UUID value.
    Uuid(Uuid),
    /// Calendar date (DATE).
    Date(NaiveDate),
    /// Time of day (TIME).
    Time(NaiveTime),
    /// Date and time without zone (TIMESTAMP).
    Timestamp(NaiveDateTime),
    /// Date and time with zone offset (TIMESTAMPTZ).
    ///
    /// Stored as a canonical UTC instant plus offset so the value
    /// round-trips without inventing a zone name.
    TimestampTz(DateTime<FixedOffset>),
}

impl Value {
    /// Check if the value is NULL.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as a bool, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an i64, widening from narrower integer types.
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::TinyInt(v) => Some(i64::from(*v)),
            Self::SmallInt(v) => Some(i64::from(*v)),
            Self::Int(v) => Some(i64::from(*v)),
            Self::BigInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an i128, widening from any integer type.
    #[must_use]
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Self::TinyInt(v) => Some(i128::from(*v)),
            Self::SmallInt(v) => Some(i128::from(*v)),
            Self::Int(v) => Some(i128::from(*v)),
            Self::BigInt(v) => Some(i128::from(*v)),
            Self::HugeInt(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as an f64, if it is a floating-point value.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the value as a string slice, if it is textual.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) | Self::Json(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as bytes, if it is a blob.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Blob(v) => Some(v),
            _ => None,
        }
    }

    /// Get the value as a UUID, if it is one.
    #[must_use]
    pub fn as_uuid(&self) -> Option<Uuid> {
        match self {
            Self::Uuid(v) => Some(*v),
            _ => None,
        }
    }

    /// Get the type name of this value as MonetDB spells it.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::TinyInt(_) => "tinyint",
            Self::SmallInt(_) => "smallint",
            Self::Int(_) => "int",
            Self::BigInt(_) => "bigint",
            Self::HugeInt(_) => "hugeint",
            Self::Double(_) => "double",
            Self::Decimal(_) => "decimal",
            Self::Text(_) => "varchar",
            Self::Json(_) => "json",
            Self::Blob(_) => "blob",
            Self::Uuid(_) => "uuid",
            Self::Date(_) => "date",
            Self::Time(_) => "time",
            Self::Timestamp(_) => "timestamp",
            Self::TimestampTz(_) => "timestamptz",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Self::TinyInt(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Self::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::BigInt(v)
    }
}

impl From<i128> for Value {
    fn from(v: i128) -> Self {
        Self::HugeInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Self::Blob(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Blob(Bytes::from(v))
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Self::Time(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Self::Timestamp(v)
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Self::TimestampTz(v)
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_null() {
        assert!(Value::Null.is_null());
        assert!(!Value::Int(0).is_null());
        assert_eq!(Value::default(), Value::Null);
    }

    #[test]
    fn test_integer_widening() {
        assert_eq!(Value::TinyInt(3).as_i64(), Some(3));
        assert_eq!(Value::SmallInt(-7).as_i64(), Some(-7));
        assert_eq!(Value::BigInt(i64::MAX).as_i64(), Some(i64::MAX));
        assert_eq!(Value::HugeInt(1).as_i64(), None);
        assert_eq!(Value::HugeInt(i128::MIN).as_i128(), Some(i128::MIN));
    }

    #[test]
    fn test_from_option() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(5i32)), Value::Int(5));
    }

    #[test]
    fn test_accessors_reject_other_variants() {
        assert_eq!(Value::Text("x".into()).as_i64(), None);
        assert_eq!(Value::Int(1).as_str(), None);
        assert_eq!(Value::Bool(true).as_f64(), None);
    }
}
