//! Type conversion error types.

use thiserror::Error;

/// Errors produced while decoding wire text into values or encoding
/// values into SQL literals.
#[derive(Debug, Clone, Error)]
pub enum TypeError {
    /// The server reported a column type this driver does not know.
    #[error("unknown column type: {0}")]
    UnknownColumnType(String),

    /// A value did not match the grammar of its column type.
    #[error("malformed {type_name} value: {raw:?}")]
    MalformedValue {
        /// Name of the column type that was being decoded.
        type_name: &'static str,
        /// The offending raw text.
        raw: String,
    },

    /// A quoted string value was not terminated.
    #[error("unterminated string value: {0:?}")]
    UnterminatedString(String),

    /// A date, time, or timestamp was outside the representable range.
    #[error("{type_name} value out of range: {raw:?}")]
    OutOfRange {
        /// Name of the temporal type.
        type_name: &'static str,
        /// The offending raw text.
        raw: String,
    },
}

impl TypeError {
    /// Shorthand for a [`TypeError::MalformedValue`].
    pub(crate) fn malformed(type_name: &'static str, raw: &str) -> Self {
        Self::MalformedValue {
            type_name,
            raw: raw.to_owned(),
        }
    }
}
