//! # monet-pool
//!
//! A bounded connection pool for the MonetDB driver.
//!
//! The pool holds up to `pool_size` connections. Checkout is a blocking
//! reservation: callers wait for capacity, take an idle connection when
//! one exists, and otherwise establish a fresh one under an exponential
//! backoff schedule. Connections that observed a network error are
//! evicted on checkin and replaced on demand.
//!
//! ## Example
//!
//! ```rust,ignore
//! use monet_pool::{Pool, PoolConfig};
//!
//! let pool = Pool::start(PoolConfig::new().pool_size(4));
//! let result = pool.query("select 1").await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod backoff;
pub mod config;
pub mod error;
pub mod pool;

pub use config::PoolConfig;
pub use error::PoolError;
pub use pool::{Pool, PoolStatus, PooledConnection};
