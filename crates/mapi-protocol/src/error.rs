//! Protocol errors and the server error form.

use bytes::Bytes;
use thiserror::Error;

/// An error reported by the server as a `!code!message` payload.
///
/// The code is numeric when it parses; otherwise the whole payload after
/// the leading `!` becomes the message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    /// Numeric error code, when the server sent one.
    pub code: Option<i32>,
    /// Human-readable message.
    pub message: String,
}

impl ServerError {
    /// Parse a server error from a payload that begins with `!`.
    ///
    /// Returns `None` when the payload does not carry the error marker.
    #[must_use]
    pub fn from_payload(payload: &str) -> Option<Self> {
        let body = payload.strip_prefix('!')?;
        Some(Self::from_body(body))
    }

    /// Parse the `<code>!<message>` body, falling back to a code-less
    /// error when the code does not parse.
    #[must_use]
    pub fn from_body(body: &str) -> Self {
        if let Some((code, message)) = body.split_once('!') {
            if let Ok(code) = code.parse::<i32>() {
                return Self {
                    code: Some(code),
                    message: message.trim_end_matches('\n').to_owned(),
                };
            }
        }
        Self {
            code: None,
            message: body.trim_end_matches('\n').to_owned(),
        }
    }

    /// Check whether this error carries the given code.
    #[must_use]
    pub fn has_code(&self, code: i32) -> bool {
        self.code == Some(code)
    }
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.code {
            Some(code) => write!(f, "error {code}: {}", self.message),
            None => write!(f, "error: {}", self.message),
        }
    }
}

impl std::error::Error for ServerError {}

/// Errors produced while parsing MAPI wire data.
#[derive(Debug, Clone, Error)]
pub enum ProtocolError {
    /// A frame header declared a payload longer than the protocol allows.
    #[error("frame payload length {0} exceeds the maximum of 8190")]
    FrameTooLarge(usize),

    /// A frame header could not be read.
    #[error("truncated frame header")]
    TruncatedHeader,

    /// The server speaks a protocol version other than 9.
    #[error("unsupported MAPI protocol version: {0}")]
    UnsupportedProtocolVersion(String),

    /// The login challenge did not match the expected grammar.
    #[error("malformed login challenge: {0:?}")]
    MalformedChallenge(String),

    /// A redirect URI could not be parsed.
    #[error("malformed redirect: {0:?}")]
    MalformedRedirect(String),

    /// The server returned an error payload.
    #[error("{0}")]
    Server(#[from] ServerError),

    /// A query reply violated the expected structure.
    ///
    /// The raw payload is retained for diagnostics.
    #[error("malformed reply: {message}")]
    MalformedReply {
        /// What was wrong.
        message: String,
        /// The offending payload.
        payload: Bytes,
    },

    /// The server sent a reply kind this driver does not support.
    #[error("unsupported reply kind: {0}")]
    UnsupportedReply(String),

    /// A reply payload was not valid UTF-8.
    #[error("reply payload is not valid UTF-8")]
    InvalidUtf8,
}

impl ProtocolError {
    /// Shorthand for a [`ProtocolError::MalformedReply`].
    pub(crate) fn malformed_reply(message: impl Into<String>, payload: &[u8]) -> Self {
        Self::MalformedReply {
            message: message.into(),
            payload: Bytes::copy_from_slice(payload),
        }
    }
}
