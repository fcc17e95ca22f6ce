//! Column and parameter type descriptors.

use crate::error::TypeError;

/// SQL column type as reported by MonetDB in result headers and prepare
/// replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// 8-bit signed integer.
    TinyInt,
    /// 16-bit signed integer.
    SmallInt,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    BigInt,
    /// 128-bit signed integer.
    HugeInt,
    /// Object identifier (decoded as a 64-bit integer).
    Oid,
    /// Auto-incrementing integer (decoded as a 64-bit integer).
    Serial,
    /// 64-bit floating point.
    Double,
    /// 64-bit floating point (reported as `float`).
    Float,
    /// 32-bit floating point (decoded into a 64-bit value).
    Real,
    /// Fixed-precision decimal.
    Decimal,
    /// Boolean.
    Boolean,
    /// Fixed-width character string.
    Char,
    /// Variable-width character string.
    Varchar,
    /// Character large object.
    Clob,
    /// Unbounded text.
    Text,
    /// JSON document carried as text.
    Json,
    /// UUID.
    Uuid,
    /// Binary large object, hex-encoded on the wire.
    Blob,
    /// Time of day.
    Time,
    /// Calendar date.
    Date,
    /// Date and time without zone.
    Timestamp,
    /// Date and time with zone offset.
    TimestampTz,
}

impl ColumnType {
    /// Resolve a type name from a result header or prepare reply.
    pub fn from_name(name: &str) -> Result<Self, TypeError> {
        match name {
            "tinyint" => Ok(Self::TinyInt),
            "smallint" => Ok(Self::SmallInt),
            "int" => Ok(Self::Int),
            "bigint" => Ok(Self::BigInt),
            "hugeint" => Ok(Self::HugeInt),
            "oid" => Ok(Self::Oid),
            "serial" => Ok(Self::Serial),
            "double" => Ok(Self::Double),
            "float" => Ok(Self::Float),
            "real" => Ok(Self::Real),
            "decimal" => Ok(Self::Decimal),
            "boolean" => Ok(Self::Boolean),
            "char" => Ok(Self::Char),
            "varchar" => Ok(Self::Varchar),
            "clob" => Ok(Self::Clob),
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            "uuid" => Ok(Self::Uuid),
            "blob" => Ok(Self::Blob),
            "time" => Ok(Self::Time),
            "date" => Ok(Self::Date),
            "timestamp" => Ok(Self::Timestamp),
            "timestamptz" => Ok(Self::TimestampTz),
            other => Err(TypeError::UnknownColumnType(other.to_owned())),
        }
    }

    /// The type name as MonetDB spells it.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::TinyInt => "tinyint",
            Self::SmallInt => "smallint",
            Self::Int => "int",
            Self::BigInt => "bigint",
            Self::HugeInt => "hugeint",
            Self::Oid => "oid",
            Self::Serial => "serial",
            Self::Double => "double",
            Self::Float => "float",
            Self::Real => "real",
            Self::Decimal => "decimal",
            Self::Boolean => "boolean",
            Self::Char => "char",
            Self::Varchar => "varchar",
            Self::Clob => "clob",
            Self::Text => "text",
            Self::Json => "json",
            Self::Uuid => "uuid",
            Self::Blob => "blob",
            Self::Time => "time",
            Self::Date => "date",
            Self::Timestamp => "timestamp",
            Self::TimestampTz => "timestamptz",
        }
    }

    /// Whether this is `time`, `timestamp`, or `timestamptz`.
    ///
    /// Temporal placeholders carry a sub-second precision that must be
    /// echoed back when encoding exec arguments.
    #[must_use]
    pub fn is_temporal(&self) -> bool {
        matches!(self, Self::Time | Self::Timestamp | Self::TimestampTz)
    }
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Type descriptor for a prepared-statement placeholder.
///
/// Plain types carry no extra information. Temporal types additionally
/// carry the sub-second precision (0, 3, or 6 digits) that the literal
/// written at exec time must use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParamType {
    /// The placeholder's column type.
    pub ty: ColumnType,
    /// Sub-second digits for temporal placeholders, `None` otherwise.
    pub precision: Option<u8>,
}

impl ParamType {
    /// A plain parameter type without precision.
    #[must_use]
    pub fn plain(ty: ColumnType) -> Self {
        Self {
            ty,
            precision: None,
        }
    }

    /// A temporal parameter type with sub-second precision.
    #[must_use]
    pub fn with_precision(ty: ColumnType, precision: u8) -> Self {
        Self {
            ty,
            precision: Some(precision),
        }
    }
}
