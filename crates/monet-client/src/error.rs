//! Client error types.
//!
//! Every failure the driver surfaces belongs to one of four sources:
//!
//! - `server` — the database answered with a `!code!message` payload,
//! - `network` — a TCP-level failure; the connection is no longer usable,
//! - `driver` — a server response the driver could not make sense of,
//! - `client` — caller misuse (bad parameter values, unknown statement
//!   names).
//!
//! The `Display` form is a single `<source> <message>` line; driver errors
//! append the offending payload after a blank line when it was retained.

use bytes::Bytes;
use mapi_protocol::{ProtocolError, ServerError};
use thiserror::Error;

/// A response the driver could not parse, with the offending bytes
/// retained for diagnostics.
#[derive(Debug, Clone)]
pub struct DriverError {
    /// What was wrong.
    pub message: String,
    /// The raw payload that violated the expected structure.
    pub details: Option<Bytes>,
}

impl std::fmt::Display for DriverError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)?;
        if let Some(details) = &self.details {
            write!(f, "\n\n{}", String::from_utf8_lossy(details))?;
        }
        Ok(())
    }
}

impl std::error::Error for DriverError {}

/// Errors that can occur during client operations.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The server returned an error.
    #[error("server {0}")]
    Server(#[from] ServerError),

    /// TCP-level failure: timeout, refusal, or a closed socket.
    #[error("network {0}")]
    Network(String),

    /// The driver could not parse a server response, or the response
    /// violated an assumed invariant.
    #[error("driver {0}")]
    Driver(#[from] DriverError),

    /// Caller misuse.
    #[error("client {0}")]
    Client(String),
}

impl Error {
    /// Build a driver error.
    #[must_use]
    pub fn driver(message: impl Into<String>, details: Option<Bytes>) -> Self {
        Self::Driver(DriverError {
            message: message.into(),
            details,
        })
    }

    /// Build a client error.
    #[must_use]
    pub fn client(message: impl Into<String>) -> Self {
        Self::Client(message.into())
    }

    /// The server error code, when this is a server error that carried one.
    #[must_use]
    pub fn server_code(&self) -> Option<i32> {
        match self {
            Self::Server(e) => e.code,
            _ => None,
        }
    }

    /// Whether this error came from the network layer. The connection that
    /// produced it must be considered unusable.
    #[must_use]
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::Server(server) => Self::Server(server),
            ProtocolError::MalformedReply { message, payload } => Self::Driver(DriverError {
                message,
                details: Some(payload),
            }),
            other => Self::driver(other.to_string(), None),
        }
    }
}

impl From<mapi_codec::CodecError> for Error {
    fn from(e: mapi_codec::CodecError) -> Self {
        match e {
            mapi_codec::CodecError::Io(io) => Self::Network(io.to_string()),
            mapi_codec::CodecError::ConnectionClosed => Self::Network("connection closed".into()),
            mapi_codec::CodecError::Protocol(protocol) => protocol.into(),
            other @ mapi_codec::CodecError::FrameTooLarge { .. } => {
                Self::driver(other.to_string(), None)
            }
        }
    }
}

impl From<monet_auth::AuthError> for Error {
    fn from(e: monet_auth::AuthError) -> Self {
        Self::driver(e.to_string(), None)
    }
}

impl From<monet_types::TypeError> for Error {
    fn from(e: monet_types::TypeError) -> Self {
        // Type errors reach the client layer only from argument encoding,
        // which makes them caller misuse.
        Self::Client(e.to_string())
    }
}

/// Result type for client operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_display() {
        let err = Error::Server(ServerError {
            code: Some(40000),
            message: "COMMIT: transaction is aborted".into(),
        });
        assert_eq!(
            err.to_string(),
            "server error 40000: COMMIT: transaction is aborted"
        );
        assert_eq!(err.server_code(), Some(40000));
    }

    #[test]
    fn test_driver_error_appends_details() {
        let err = Error::driver("unexpected reply", Some(Bytes::from_static(b"&9 nope")));
        assert_eq!(err.to_string(), "driver unexpected reply\n\n&9 nope");
    }

    #[test]
    fn test_network_classification() {
        assert!(Error::Network("connection closed".into()).is_network());
        assert!(!Error::client("bad argument").is_network());
    }

    #[test]
    fn test_codec_error_mapping() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        assert!(Error::from(mapi_codec::CodecError::Io(io)).is_network());
        assert!(Error::from(mapi_codec::CodecError::ConnectionClosed).is_network());
    }
}
