//! Callback-shaped transactions.

use std::collections::HashMap;

use monet_types::Value;
use uuid::Uuid;

use crate::connection::{Connection, DEALLOCATE_GONE};
use crate::error::{Error, Result};
use crate::result::QueryResult;
use crate::statement::PreparedStatement;

/// What a transaction body asks the coordinator to do.
#[derive(Debug)]
pub enum TxOutcome<T> {
    /// Commit and surface `Ok(value)`.
    Commit(T),
    /// Roll back and surface `Err(error)`.
    Rollback(Error),
}

impl<T> TxOutcome<T> {
    /// Roll back with a caller-supplied message, surfaced as a client
    /// error.
    #[must_use]
    pub fn rollback(message: impl Into<String>) -> Self {
        Self::Rollback(Error::client(message))
    }
}

/// A handle to an open transaction.
///
/// Created by [`Connection::transaction`]; lives only for the duration of
/// the body closure. Named prepared statements registered through
/// [`prepare`](Transaction::prepare) are owned by this handle and
/// deallocated when the transaction settles, on every path.
pub struct Transaction<'c> {
    conn: &'c mut Connection,
    id: Uuid,
    statements: HashMap<String, PreparedStatement>,
}

impl<'c> Transaction<'c> {
    pub(crate) fn new(conn: &'c mut Connection) -> Self {
        Self {
            conn,
            id: Uuid::new_v4(),
            statements: HashMap::new(),
        }
    }

    pub(crate) fn into_parts(self) -> (&'c mut Connection, HashMap<String, PreparedStatement>) {
        (self.conn, self.statements)
    }

    /// Unique token identifying this transaction.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Execute a query without parameters inside the transaction.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        self.conn.query(sql).await
    }

    /// Execute a parameterised query inside the transaction.
    pub async fn query_with(&mut self, sql: &str, args: &[Value]) -> Result<QueryResult> {
        self.conn.query_with(sql, args).await
    }

    /// Prepare a named statement scoped to this transaction.
    ///
    /// Re-preparing an existing name deallocates the statement it
    /// replaces.
    pub async fn prepare(&mut self, name: &str, sql: &str) -> Result<()> {
        let statement = self.conn.prepare(sql).await?;
        if let Some(replaced) = self.statements.insert(name.to_owned(), statement) {
            match self.conn.deallocate(&replaced).await {
                Ok(()) => {}
                Err(e) if e.server_code() == Some(DEALLOCATE_GONE) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// Execute a named statement prepared earlier in this transaction.
    pub async fn exec(&mut self, name: &str, args: &[Value]) -> Result<QueryResult> {
        let statement = self
            .statements
            .get(name)
            .cloned()
            .ok_or_else(|| {
                Error::client(format!(
                    "no prepared statement named {name:?} in this transaction"
                ))
            })?;
        self.conn.exec(&statement, args).await
    }

    /// Number of named statements currently held by this transaction.
    #[must_use]
    pub fn statement_count(&self) -> usize {
        self.statements.len()
    }
}

impl std::fmt::Debug for Transaction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("statements", &self.statements.len())
            .finish_non_exhaustive()
    }
}
