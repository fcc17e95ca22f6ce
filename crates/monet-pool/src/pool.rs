//! Connection pool implementation.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use monet_client::{Connection, Error, QueryResult, Transaction, TxOutcome};
use monet_types::Value;
use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::backoff::{MAX_RECORDED_FAILURES, backoff_delay};
use crate::config::PoolConfig;
use crate::error::PoolError;

/// A connection pool for MonetDB.
///
/// The pool is cheap to clone; clones share the same connections.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

struct PoolInner {
    config: PoolConfig,
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    failures: AtomicU32,
    closed: AtomicBool,
}

impl PoolInner {
    /// Record a failed connection attempt, clamping the counter.
    fn note_failure(&self) -> u32 {
        let failures = self.failures.load(Ordering::Relaxed);
        let next = (failures + 1).min(MAX_RECORDED_FAILURES);
        self.failures.store(next, Ordering::Relaxed);
        next
    }

    fn note_success(&self) {
        self.failures.store(0, Ordering::Relaxed);
    }
}

impl Pool {
    /// Start a pool, eagerly spawning the initial connection attempts.
    ///
    /// Workers that fail to connect at startup leave their slots empty
    /// and advance the backoff counter; replacements are established on
    /// demand at checkout. Must be called from within a tokio runtime.
    #[must_use]
    pub fn start(config: PoolConfig) -> Self {
        let pool_size = config.pool_size;
        let pool = Self {
            inner: Arc::new(PoolInner {
                config,
                idle: Mutex::new(Vec::with_capacity(pool_size)),
                permits: Arc::new(Semaphore::new(pool_size)),
                failures: AtomicU32::new(0),
                closed: AtomicBool::new(false),
            }),
        };

        tracing::info!(
            pool = %pool.inner.config.name,
            size = pool_size,
            "starting connection pool"
        );

        for _ in 0..pool_size {
            let inner = Arc::clone(&pool.inner);
            tokio::spawn(async move {
                match Connection::connect(inner.config.connection.clone()).await {
                    Ok(conn) => {
                        inner.note_success();
                        inner.idle.lock().push(conn);
                    }
                    Err(e) => {
                        let failures = inner.note_failure();
                        tracing::warn!(
                            pool = %inner.config.name,
                            error = %e,
                            failures,
                            "pool worker failed to connect at startup"
                        );
                    }
                }
            });
        }

        pool
    }

    /// Reserve a connection for exclusive use.
    ///
    /// Blocks until capacity is available, then returns an idle
    /// connection or establishes a new one under the backoff schedule.
    /// The returned guard checks the connection back in on drop.
    pub async fn checkout(&self) -> Result<PooledConnection, PoolError> {
        let permit = Arc::clone(&self.inner.permits)
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        loop {
            if self.inner.closed.load(Ordering::Acquire) {
                return Err(PoolError::Closed);
            }

            // Dead connections left in a slot are discarded and replaced.
            if let Some(conn) = self.inner.idle.lock().pop() {
                if conn.is_reusable() {
                    return Ok(PooledConnection::new(conn, Arc::clone(&self.inner), permit));
                }
                tracing::debug!(pool = %self.inner.config.name, "discarding dead connection");
                continue;
            }

            match self.init_worker().await {
                Ok(conn) => {
                    return Ok(PooledConnection::new(conn, Arc::clone(&self.inner), permit));
                }
                Err(e) => {
                    tracing::warn!(
                        pool = %self.inner.config.name,
                        error = %e,
                        "worker init failed, retrying"
                    );
                }
            }
        }
    }

    /// Establish one connection, sleeping the backoff delay first.
    async fn init_worker(&self) -> Result<Connection, Error> {
        let failures = self.inner.failures.load(Ordering::Relaxed);
        let delay = backoff_delay(failures);
        if !delay.is_zero() {
            tracing::debug!(
                pool = %self.inner.config.name,
                failures,
                delay_ms = delay.as_millis() as u64,
                "backing off before reconnect"
            );
            tokio::time::sleep(delay).await;
        }

        match Connection::connect(self.inner.config.connection.clone()).await {
            Ok(conn) => {
                self.inner.note_success();
                Ok(conn)
            }
            Err(e) => {
                self.inner.note_failure();
                Err(e)
            }
        }
    }

    /// Execute a query without parameters on a pooled connection.
    pub async fn query(&self, sql: &str) -> Result<QueryResult, Error> {
        let mut conn = self.checkout().await?;
        conn.query(sql).await
    }

    /// Execute a parameterised query on a pooled connection.
    pub async fn query_with(&self, sql: &str, args: &[Value]) -> Result<QueryResult, Error> {
        let mut conn = self.checkout().await?;
        conn.query_with(sql, args).await
    }

    /// Execute a statement on a pooled connection, returning the affected
    /// row count.
    pub async fn execute(&self, sql: &str, args: &[Value]) -> Result<u64, Error> {
        let mut conn = self.checkout().await?;
        conn.execute(sql, args).await
    }

    /// Run a transaction body on a pooled connection.
    pub async fn transaction<T, F>(&self, body: F) -> Result<T, Error>
    where
        F: for<'t, 'c> AsyncFnOnce(&'t mut Transaction<'c>) -> Result<TxOutcome<T>, Error>,
    {
        let mut conn = self.checkout().await?;
        conn.transaction(body).await
    }

    /// Current pool counters.
    #[must_use]
    pub fn status(&self) -> PoolStatus {
        let size = self.inner.config.pool_size;
        let available_permits = self.inner.permits.available_permits();
        PoolStatus {
            idle: self.inner.idle.lock().len(),
            in_use: size.saturating_sub(available_permits),
            size,
        }
    }

    /// Close the pool, dropping all idle connections.
    ///
    /// Outstanding guards drain naturally; their connections are not
    /// returned to the closed pool.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.permits.close();
        self.inner.idle.lock().clear();
        tracing::info!(pool = %self.inner.config.name, "connection pool closed");
    }

    /// Check if the pool is closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// The pool configuration.
    #[must_use]
    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let status = self.status();
        f.debug_struct("Pool")
            .field("name", &self.inner.config.name)
            .field("size", &status.size)
            .field("idle", &status.idle)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// Counters describing the pool's current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStatus {
    /// Idle connections ready for checkout.
    pub idle: usize,
    /// Reservations currently held by callers.
    pub in_use: usize,
    /// Configured pool size.
    pub size: usize,
}

/// A connection reserved from the pool.
///
/// Dereferences to [`Connection`]. On drop the connection returns to the
/// pool, unless it observed a network error or was left mid-transaction,
/// in which case it is evicted and the socket closed.
pub struct PooledConnection {
    conn: Option<Connection>,
    inner: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl PooledConnection {
    fn new(conn: Connection, inner: Arc<PoolInner>, permit: OwnedSemaphorePermit) -> Self {
        Self {
            conn: Some(conn),
            inner,
            _permit: permit,
        }
    }

    /// Detach the connection from the pool.
    ///
    /// The pool capacity is released; the connection will not be returned
    /// on drop.
    #[must_use]
    pub fn detach(mut self) -> Connection {
        self.conn
            .take()
            .unwrap_or_else(|| unreachable!("connection only taken on drop"))
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.conn
            .as_ref()
            .unwrap_or_else(|| unreachable!("connection only taken on drop"))
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.conn
            .as_mut()
            .unwrap_or_else(|| unreachable!("connection only taken on drop"))
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };
        if self.inner.closed.load(Ordering::Acquire) {
            return;
        }
        if conn.is_reusable() {
            tracing::trace!(pool = %self.inner.config.name, "returning connection to pool");
            self.inner.idle.lock().push(conn);
        } else {
            tracing::debug!(pool = %self.inner.config.name, "evicting connection on checkin");
        }
    }
}

impl std::fmt::Debug for PooledConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledConnection")
            .field("connection", &self.conn)
            .finish_non_exhaustive()
    }
}
