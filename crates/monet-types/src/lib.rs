//! # monet-types
//!
//! SQL value representation and textual encoding/decoding for the MonetDB
//! driver.
//!
//! MonetDB carries all result and parameter data textually on the wire, so
//! this crate is built around three pieces:
//!
//! - [`Value`], a tagged union with one variant per supported SQL type,
//! - [`ColumnType`] / [`ParamType`], the type descriptors reported by the
//!   server for result columns and prepared-statement placeholders,
//! - [`decode`] and [`encode`], the hand-rolled parsers and literal writers
//!   that translate between wire text and [`Value`].
//!
//! This crate is intentionally IO-agnostic: it knows nothing about sockets,
//! framing, or the MAPI handshake. Higher-level crates build on it.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod column;
pub mod decode;
pub mod encode;
pub mod error;
pub mod value;

pub use column::{ColumnType, ParamType};
pub use decode::decode_value;
pub use encode::encode_param;
pub use error::TypeError;
pub use value::Value;
