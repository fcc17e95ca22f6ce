//! Connection management and query execution.

use std::time::Duration;

use bytes::Bytes;
use mapi_protocol::{Challenge, LoginReply, Redirect, Reply, ServerError};
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::result::QueryResult;
use crate::statement::PreparedStatement;
use crate::transaction::{Transaction, TxOutcome};

type Channel = mapi_codec::Connection<TcpStream>;

/// Upper bound on challenge rounds (proxy hops and redirects included)
/// before login is abandoned.
const MAX_LOGIN_ROUNDS: u8 = 10;

/// Deallocating a statement the server already dropped after a failed
/// exec answers with this code; callers treat it as benign.
pub(crate) const DEALLOCATE_GONE: i32 = 7003;

/// Outcome of one authentication attempt on a socket.
enum LoginOutcome {
    Ready,
    Redirect(Redirect),
}

/// A single MonetDB connection.
///
/// A connection owns one TCP socket and is strictly single-threaded: one
/// request is written and its reply fully read before the next request
/// starts. Checkout from a [`Pool`](https://docs.rs/monet-pool) enforces
/// exclusive use.
pub struct Connection {
    channel: Channel,
    config: Config,
    broken: bool,
    in_transaction: bool,
}

impl Connection {
    /// Connect and authenticate, then configure the session.
    ///
    /// Login redirects close the socket and reconnect with merged
    /// host/port/database; merovingian proxies re-run the challenge on the
    /// same socket. Both count against a shared bound of 10 rounds.
    pub async fn connect(config: Config) -> Result<Self> {
        let mut current = config;
        let mut rounds: u8 = 0;

        loop {
            tracing::info!(
                host = %current.host,
                port = current.port,
                database = %current.database,
                "connecting to MonetDB"
            );

            let mut channel = open_channel(&current).await?;
            match authenticate(&mut channel, &current, &mut rounds).await? {
                LoginOutcome::Ready => {
                    let mut connection = Self {
                        channel,
                        config: current,
                        broken: false,
                        in_transaction: false,
                    };
                    connection.configure_session().await?;
                    tracing::info!("connection ready");
                    return Ok(connection);
                }
                LoginOutcome::Redirect(redirect) => {
                    tracing::info!(
                        host = %redirect.host,
                        port = redirect.port,
                        database = ?redirect.database,
                        "following login redirect"
                    );
                    current.apply_redirect(redirect);
                }
            }
        }
    }

    /// Execute a query without parameters.
    pub async fn query(&mut self, sql: &str) -> Result<QueryResult> {
        tracing::debug!(sql, "executing query");
        self.send_query(sql).await?;
        let reply = self.recv_reply().await?;
        Ok(QueryResult::from_reply(reply))
    }

    /// Execute a parameterised query.
    ///
    /// The statement is prepared, executed, and deallocated within this
    /// call; nothing is left behind server-side. An empty argument list
    /// takes the simple query path.
    pub async fn query_with(&mut self, sql: &str, args: &[monet_types::Value]) -> Result<QueryResult> {
        if args.is_empty() {
            return self.query(sql).await;
        }

        tracing::debug!(sql, params = args.len(), "executing parameterised query");
        let statement = self.prepare(sql).await?;
        let result = self.exec(&statement, args).await;
        self.finish_statement(&statement, result).await
    }

    /// Execute a statement and return the affected row count.
    pub async fn execute(&mut self, sql: &str, args: &[monet_types::Value]) -> Result<u64> {
        Ok(self.query_with(sql, args).await?.row_count())
    }

    /// Prepare a statement server-side.
    pub async fn prepare(&mut self, sql: &str) -> Result<PreparedStatement> {
        self.send_plain(&format!("prepare {sql}")).await?;
        match self.recv_reply().await? {
            Reply::Prepare(prepare) => {
                tracing::debug!(id = %prepare.id, params = prepare.parameters.len(), "prepared statement");
                Ok(PreparedStatement::new(prepare.id, prepare.parameters))
            }
            other => Err(Error::driver(
                format!("unexpected reply to prepare: {other:?}"),
                None,
            )),
        }
    }

    /// Execute a prepared statement.
    ///
    /// The statement must have been prepared on this connection.
    pub async fn exec(
        &mut self,
        statement: &PreparedStatement,
        args: &[monet_types::Value],
    ) -> Result<QueryResult> {
        let encoded = monet_types::encode::encode_args(args, statement.parameters())?;
        self.send_plain(&format!("exec {}({})", statement.id(), encoded))
            .await?;
        let reply = self.recv_reply().await?;
        Ok(QueryResult::from_reply(reply))
    }

    /// Deallocate a prepared statement server-side.
    ///
    /// After a failed exec the server has already dropped the statement
    /// and answers with code 7003; callers treat that as benign.
    pub async fn deallocate(&mut self, statement: &PreparedStatement) -> Result<()> {
        self.send_plain(&format!("deallocate {}", statement.id()))
            .await?;
        self.recv_reply().await?;
        Ok(())
    }

    /// Run `body` inside a transaction.
    ///
    /// `Ok(TxOutcome::Commit(v))` commits and yields `Ok(v)`;
    /// `Ok(TxOutcome::Rollback(e))` and `Err(e)` both roll back and yield
    /// `Err(e)`. Named statements prepared through the transaction handle
    /// are deallocated on every path.
    pub async fn transaction<'c, T, F>(&'c mut self, body: F) -> Result<T>
    where
        F: for<'t> AsyncFnOnce(&'t mut Transaction<'c>) -> Result<TxOutcome<T>>,
    {
        self.send_plain("start transaction").await?;
        self.recv_reply().await?;
        self.in_transaction = true;

        let mut tx = Transaction::new(self);
        tracing::debug!(tx = %tx.id(), "transaction started");
        let outcome = body(&mut tx).await;
        let (conn, statements) = tx.into_parts();

        let settled = match outcome {
            Ok(TxOutcome::Commit(value)) => conn.finish_tx("commit").await.map(|()| value),
            Ok(TxOutcome::Rollback(error)) => {
                if !conn.broken {
                    if let Err(rollback_error) = conn.finish_tx("rollback").await {
                        tracing::warn!(error = %rollback_error, "rollback failed");
                    }
                }
                Err(error)
            }
            Err(error) => {
                if !conn.broken {
                    if let Err(rollback_error) = conn.finish_tx("rollback").await {
                        tracing::warn!(error = %rollback_error, "rollback failed");
                    }
                }
                Err(error)
            }
        };

        for statement in statements.into_values() {
            if conn.broken {
                break;
            }
            match conn.deallocate(&statement).await {
                Ok(()) => {}
                Err(e) if e.server_code() == Some(DEALLOCATE_GONE) => {}
                Err(e) => {
                    tracing::warn!(error = %e, id = statement.id(), "deallocate failed, closing connection");
                    conn.broken = true;
                }
            }
        }

        conn.in_transaction = false;
        settled
    }

    /// Whether the connection can be returned to a pool and reused.
    ///
    /// A connection is unusable after any network-level error, and after a
    /// transaction body unwound without settling.
    #[must_use]
    pub fn is_reusable(&self) -> bool {
        !self.broken && !self.in_transaction
    }

    /// Mark the connection unusable. The socket is closed on drop.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// The configuration this connection was established with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn configure_session(&mut self) -> Result<()> {
        let offset = self.config.time_zone_offset;
        self.send_plain(&format!("set time zone interval '{offset}' minute"))
            .await?;
        match self.recv_reply().await? {
            Reply::Meta(_) => {}
            other => {
                return Err(Error::driver(
                    format!("unexpected reply to time zone setup: {other:?}"),
                    None,
                ));
            }
        }

        // Unlimited reply size: full result sets arrive in one response.
        self.send_command("reply_size -1").await?;
        self.recv_empty().await?;

        if let Some(schema) = self.config.schema.clone() {
            self.send_plain(&format!("set schema {schema}")).await?;
            self.recv_reply().await?;
        }
        if let Some(role) = self.config.role.clone() {
            self.send_plain(&format!("set role {role}")).await?;
            self.recv_reply().await?;
        }

        Ok(())
    }

    /// Settle deallocate disposition for a one-shot statement: a clean
    /// close and the benign 7003 keep the connection; anything else closes
    /// it so statements cannot leak server-side.
    async fn finish_statement(
        &mut self,
        statement: &PreparedStatement,
        result: Result<QueryResult>,
    ) -> Result<QueryResult> {
        if self.broken {
            return result;
        }
        match self.deallocate(statement).await {
            Ok(()) => result,
            Err(e) if e.server_code() == Some(DEALLOCATE_GONE) => result,
            Err(e) => {
                tracing::warn!(error = %e, id = statement.id(), "deallocate failed, closing connection");
                self.broken = true;
                result.and(Err(e))
            }
        }
    }

    async fn finish_tx(&mut self, command: &str) -> Result<()> {
        self.send_plain(command).await?;
        self.recv_reply().await?;
        tracing::debug!(command, "transaction settled");
        Ok(())
    }

    async fn send_plain(&mut self, text: &str) -> Result<()> {
        let send = self.config.timeouts.send;
        let outcome = send_timed(&mut self.channel, send, text.as_bytes()).await;
        self.track(outcome)
    }

    async fn send_query(&mut self, sql: &str) -> Result<()> {
        let send = self.config.timeouts.send;
        let outcome = timeout(send, self.channel.send_query(sql))
            .await
            .map_err(|_| Error::Network("send timed out".into()))
            .and_then(|r| r.map_err(Error::from));
        self.track(outcome)
    }

    async fn send_command(&mut self, command: &str) -> Result<()> {
        let send = self.config.timeouts.send;
        let outcome = timeout(send, self.channel.send_command(command))
            .await
            .map_err(|_| Error::Network("send timed out".into()))
            .and_then(|r| r.map_err(Error::from));
        self.track(outcome)
    }

    async fn recv(&mut self) -> Result<Bytes> {
        let read = self.config.timeouts.read;
        let outcome = read_timed(&mut self.channel, read).await;
        match outcome {
            Ok(payload) => Ok(payload),
            Err(e) => {
                if e.is_network() {
                    self.broken = true;
                }
                Err(e)
            }
        }
    }

    /// Read a reply, peeling off `!`-prefixed server errors.
    async fn recv_reply(&mut self) -> Result<Reply> {
        let payload = self.recv().await?;
        let text = payload_text(&payload)?;
        if let Some(server_error) = ServerError::from_payload(text) {
            return Err(Error::Server(server_error));
        }
        mapi_protocol::reply::parse_reply(&payload).map_err(Error::from)
    }

    /// Read a reply that must be the empty message (control commands).
    async fn recv_empty(&mut self) -> Result<()> {
        let payload = self.recv().await?;
        if payload.is_empty() {
            return Ok(());
        }
        let text = payload_text(&payload)?;
        if let Some(server_error) = ServerError::from_payload(text) {
            return Err(Error::Server(server_error));
        }
        Err(Error::driver(
            "expected an empty reply to a control command",
            Some(payload),
        ))
    }

    fn track<T>(&mut self, outcome: Result<T>) -> Result<T> {
        if let Err(e) = &outcome {
            if e.is_network() {
                self.broken = true;
            }
        }
        outcome
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.config.address())
            .field("broken", &self.broken)
            .field("in_transaction", &self.in_transaction)
            .finish_non_exhaustive()
    }
}

async fn open_channel(config: &Config) -> Result<Channel> {
    let stream = timeout(config.timeouts.connect, TcpStream::connect(config.address()))
        .await
        .map_err(|_| Error::Network("connect timed out".into()))?
        .map_err(|e| Error::Network(e.to_string()))?;
    stream
        .set_nodelay(true)
        .map_err(|e| Error::Network(e.to_string()))?;
    Ok(Channel::new(stream))
}

/// Run the challenge/response rounds on one socket.
async fn authenticate(
    channel: &mut Channel,
    config: &Config,
    rounds: &mut u8,
) -> Result<LoginOutcome> {
    loop {
        *rounds += 1;
        if *rounds > MAX_LOGIN_ROUNDS {
            return Err(Error::driver("too many proxy iterations during login", None));
        }

        let payload = read_timed(channel, config.timeouts.read).await?;
        let text = payload_text(&payload)?;
        if let Some(server_error) = ServerError::from_payload(text) {
            return Err(Error::Server(server_error));
        }
        let challenge = Challenge::parse(text)?;

        let response = monet_auth::challenge_response(
            &challenge,
            &config.username,
            &config.password,
            &config.database,
        )?;
        send_timed(channel, config.timeouts.send, response.as_bytes()).await?;

        let reply = read_timed(channel, config.timeouts.read).await?;
        let reply_text = payload_text(&reply)?;
        if let Some(server_error) = ServerError::from_payload(reply_text) {
            return Err(Error::Server(server_error));
        }
        match LoginReply::parse(reply_text).map_err(|e| match e {
            mapi_protocol::ProtocolError::MalformedChallenge(payload) => {
                Error::driver("unexpected login reply", Some(Bytes::from(payload.into_bytes())))
            }
            other => Error::from(other),
        })? {
            LoginReply::Accepted => return Ok(LoginOutcome::Ready),
            LoginReply::Proxy => {
                tracing::debug!(round = *rounds, "merovingian proxy, rerunning challenge");
            }
            LoginReply::Redirect(redirect) => return Ok(LoginOutcome::Redirect(redirect)),
        }
    }
}

async fn read_timed(channel: &mut Channel, limit: Duration) -> Result<Bytes> {
    timeout(limit, channel.read_message())
        .await
        .map_err(|_| Error::Network("read timed out".into()))?
        .map_err(Error::from)
}

async fn send_timed(channel: &mut Channel, limit: Duration, payload: &[u8]) -> Result<()> {
    timeout(limit, channel.send_message(payload))
        .await
        .map_err(|_| Error::Network("send timed out".into()))?
        .map_err(Error::from)
}

fn payload_text(payload: &Bytes) -> Result<&str> {
    std::str::from_utf8(payload)
        .map_err(|_| Error::driver("reply payload is not valid UTF-8", Some(payload.clone())))
}
