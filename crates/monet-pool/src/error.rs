//! Pool error types.

use thiserror::Error;

/// Errors that can occur while acquiring a connection from the pool.
#[derive(Debug, Error)]
pub enum PoolError {
    /// The pool has been closed.
    #[error("pool is closed")]
    Closed,
}

impl From<PoolError> for monet_client::Error {
    fn from(e: PoolError) -> Self {
        monet_client::Error::client(e.to_string())
    }
}
