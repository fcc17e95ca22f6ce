//! Codec error types.

use thiserror::Error;

/// Errors that can occur while reading or writing frames.
#[derive(Debug, Error)]
pub enum CodecError {
    /// IO error on the underlying transport.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the connection mid-message.
    #[error("connection closed")]
    ConnectionClosed,

    /// The wire data violated the frame grammar.
    #[error("protocol error: {0}")]
    Protocol(#[from] mapi_protocol::ProtocolError),

    /// An outgoing frame payload exceeded the protocol maximum.
    #[error("frame payload of {size} bytes exceeds the maximum of {max}")]
    FrameTooLarge {
        /// Attempted payload size.
        size: usize,
        /// Maximum allowed payload size.
        max: usize,
    },
}
