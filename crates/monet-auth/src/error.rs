//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while answering a login challenge.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// The server offered no digest mechanism this driver supports.
    #[error("no supported authentication mechanism among {offered:?}")]
    NoSupportedMechanism {
        /// Mechanisms the server listed in its challenge.
        offered: Vec<String>,
    },

    /// The server hashes passwords with an algorithm this driver does not
    /// implement.
    #[error("unsupported password hash algorithm: {0}")]
    UnknownPasswordHash(String),
}
