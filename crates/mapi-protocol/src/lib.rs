//! # mapi-protocol
//!
//! Pure implementation of the MAPI wire protocol spoken by MonetDB.
//!
//! MAPI is a line-oriented textual protocol carried over a self-describing
//! binary framing: every logical message is split into frames of at most
//! [`MAX_FRAME_PAYLOAD`] bytes, each preceded by a 16-bit little-endian
//! header whose low bit marks the final frame.
//!
//! This crate covers the protocol grammar only:
//!
//! - [`frame`] — the frame header encoding,
//! - [`challenge`] — the login challenge and post-login reply grammar
//!   (proxy and redirect indications included),
//! - [`reply`] — the `&1`..`&6` query reply grammar, decoded into typed
//!   values via [`monet_types`],
//! - [`error`] — protocol errors and the `!code!message` server error
//!   form.
//!
//! It is intentionally IO-agnostic: no sockets, no async runtime. The
//! `mapi-codec` crate layers tokio framing on top of it.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod challenge;
pub mod error;
pub mod frame;
pub mod reply;

pub use challenge::{Challenge, LoginReply, Redirect};
pub use error::{ProtocolError, ServerError};
pub use frame::{FRAME_HEADER_SIZE, FrameHeader, MAX_FRAME_PAYLOAD};
pub use reply::{PrepareReply, Reply, RowsReply};
