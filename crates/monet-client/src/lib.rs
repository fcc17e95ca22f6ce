//! # monet-client
//!
//! High-level async MonetDB client.
//!
//! This is the primary public API surface of the driver. It wires the
//! protocol, codec, and authentication crates into a [`Connection`] that
//! speaks full sessions: challenge/response login with proxy and redirect
//! handling, session configuration, simple and parameterised queries,
//! server-side prepared statements, and callback-shaped transactions.
//!
//! ## Example
//!
//! ```rust,ignore
//! use monet_client::{Config, Connection, TxOutcome};
//! use monet_types::Value;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), monet_client::Error> {
//!     let config = Config::new().host("127.0.0.1").database("app");
//!     let mut conn = Connection::connect(config).await?;
//!
//!     let result = conn
//!         .query_with("select name from people where id = ?", &[Value::Int(1)])
//!         .await?;
//!     for row in result.rows() {
//!         println!("{:?}", row[0]);
//!     }
//!
//!     let inserted = conn
//!         .transaction(async |tx| {
//!             tx.query_with("insert into people values (?, ?)", &[
//!                 Value::Int(4),
//!                 Value::Text("Alia".into()),
//!             ])
//!             .await?;
//!             let count = tx.query("select count(*) from people").await?;
//!             Ok(TxOutcome::Commit(count))
//!         })
//!         .await?;
//!     println!("{:?}", inserted.scalar());
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod connection;
pub mod error;
pub mod result;
pub mod statement;
pub mod transaction;

pub use config::{Config, TimeoutConfig};
pub use connection::Connection;
pub use error::{DriverError, Error, Result};
pub use monet_types::{ColumnType, ParamType, Value};
pub use result::{QueryResult, Rows};
pub use statement::PreparedStatement;
pub use transaction::{Transaction, TxOutcome};
