//! # monet-testing
//!
//! Test support for the MonetDB driver: an in-process mock MAPI server
//! that speaks the real framing and handshake, with scripted replies for
//! queries. Protocol-level integration tests run against it without a
//! database instance.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![allow(clippy::unwrap_used)]

pub mod mock_server;

pub use mock_server::{MockMapiServer, MockServerBuilder};
