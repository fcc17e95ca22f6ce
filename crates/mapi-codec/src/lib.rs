//! # mapi-codec
//!
//! Async framing for the MAPI protocol: a tokio-util codec that turns a
//! byte stream into [`Frame`]s, and a [`Connection`] that assembles frames
//! into logical messages and splits outgoing messages into frames.
//!
//! The codec layer knows nothing about authentication or SQL; it moves
//! opaque message payloads. Higher layers interpret them.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod frame_codec;

pub use connection::Connection;
pub use error::CodecError;
pub use frame_codec::{Frame, MapiCodec};
