//! Query results.

use std::collections::HashMap;

use bytes::Bytes;
use mapi_protocol::Reply;
use monet_types::{ColumnType, Value};

/// The result of one query.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// A select result with materialised rows.
    Rows(Rows),
    /// An insert/update/delete count.
    Upsert {
        /// Number of affected rows.
        row_count: u64,
        /// Last auto-generated id, when the server reported one.
        last_id: Option<i64>,
    },
    /// A DDL or similar result.
    Meta(String),
    /// The server toggled auto-commit.
    TxState {
        /// New auto-commit state.
        auto_commit: bool,
    },
}

/// A materialised select result.
#[derive(Debug, Clone, PartialEq)]
pub struct Rows {
    /// Raw reply header line.
    pub meta: Bytes,
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Column types in result order.
    pub types: Vec<ColumnType>,
    /// Decoded rows.
    pub rows: Vec<Vec<Value>>,
    /// Row count as stated by the server.
    pub row_count: u64,
}

impl QueryResult {
    pub(crate) fn from_reply(reply: Reply) -> Self {
        match reply {
            Reply::Rows(rows) => Self::Rows(Rows {
                meta: rows.meta,
                columns: rows.columns,
                types: rows.types,
                rows: rows.rows,
                row_count: rows.row_count,
            }),
            Reply::Upsert {
                row_count,
                last_id,
            } => Self::Upsert {
                row_count,
                last_id,
            },
            Reply::Meta(meta) => Self::Meta(meta),
            Reply::TxState {
                auto_commit,
            } => Self::TxState {
                auto_commit,
            },
            // `&5` only ever answers `prepare`, which the statement path
            // consumes before results are built.
            Reply::Prepare(prepare) => Self::Meta(format!("prepared statement {}", prepare.id)),
        }
    }

    /// Iterate over result rows as value slices.
    ///
    /// Non-row results yield nothing.
    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        let rows: &[Vec<Value>] = match self {
            Self::Rows(r) => &r.rows,
            _ => &[],
        };
        rows.iter().map(Vec::as_slice)
    }

    /// Iterate over result rows as column-name → value maps.
    ///
    /// This is the second iteration mode over the same underlying result;
    /// the shape is chosen at the call site, not baked into the value.
    pub fn maps(&self) -> impl Iterator<Item = HashMap<&str, &Value>> {
        let (columns, rows): (&[String], &[Vec<Value>]) = match self {
            Self::Rows(r) => (&r.columns, &r.rows),
            _ => (&[], &[]),
        };
        rows.iter().map(move |row| {
            columns
                .iter()
                .map(String::as_str)
                .zip(row.iter())
                .collect()
        })
    }

    /// Consume the result, returning its rows.
    #[must_use]
    pub fn into_rows(self) -> Vec<Vec<Value>> {
        match self {
            Self::Rows(r) => r.rows,
            _ => Vec::new(),
        }
    }

    /// The first value of the first row, for single-value queries.
    #[must_use]
    pub fn scalar(&self) -> Option<&Value> {
        match self {
            Self::Rows(r) => r.rows.first().and_then(|row| row.first()),
            _ => None,
        }
    }

    /// The row count: result rows for selects, affected rows for upserts.
    #[must_use]
    pub fn row_count(&self) -> u64 {
        match self {
            Self::Rows(r) => r.row_count,
            Self::Upsert {
                row_count, ..
            } => *row_count,
            _ => 0,
        }
    }
}
