//! Mock MAPI server for unit and integration testing.
//!
//! The mock speaks the real frame layer via `mapi-codec` and runs the
//! real challenge/response verification via `monet-auth`, so handshake
//! and query paths exercise the same code a live server would. Query
//! replies are scripted: each expected client message maps to a canned
//! reply payload.
//!
//! ## Example
//!
//! ```rust,ignore
//! use monet_testing::MockMapiServer;
//!
//! #[tokio::test]
//! async fn test_query() {
//!     let server = MockMapiServer::builder()
//!         .with_response("sselect 1;", "&1 0 1 1 1\n% .,\t # table_name\n% %1 # name\n% int # type\n% 1 # length\n[ 1\t]\n")
//!         .build()
//!         .await
//!         .unwrap();
//!     // Connect your client to server.addr()...
//! }
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use mapi_codec::Connection;
use mapi_protocol::Challenge;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;

/// Default salt sent with every challenge.
const DEFAULT_SALT: &str = "oRzY7XZr1EfNWETqU6b2";

/// Scripted behavior shared by every accepted connection.
struct Script {
    salt: String,
    server_type: String,
    mechanisms: String,
    password_hash: String,
    username: String,
    password: String,
    database: String,
    proxy_rounds: usize,
    redirect: Option<String>,
    responses: HashMap<String, String>,
}

impl Script {
    /// The challenge line this server opens with.
    fn challenge_line(&self) -> String {
        format!(
            "{}:{}:9:{}:LIT:{}:",
            self.salt, self.server_type, self.mechanisms, self.password_hash
        )
    }

    /// The exact response line a correct client would send.
    fn expected_response(&self) -> String {
        let challenge = Challenge::parse(&self.challenge_line())
            .unwrap_or_else(|e| panic!("mock challenge must parse: {e}"));
        monet_auth::challenge_response(&challenge, &self.username, &self.password, &self.database)
            .unwrap_or_else(|e| panic!("mock challenge must be answerable: {e}"))
    }

    /// The canned reply for one client message.
    fn reply_for(&self, request: &str) -> String {
        if let Some(reply) = self.responses.get(request) {
            return reply.clone();
        }
        // Control commands answer with the empty message.
        if request.starts_with('X') {
            return String::new();
        }
        if request == "start transaction" {
            return "&4 f".to_owned();
        }
        if request == "commit" || request == "rollback" {
            return "&4 t".to_owned();
        }
        if request.starts_with("set ") {
            return "&3 2 0".to_owned();
        }
        if request.starts_with("deallocate ") {
            return "&3 1 0".to_owned();
        }
        format!("!42000!syntax error: unexpected request {request:?}")
    }
}

/// Builder for [`MockMapiServer`].
pub struct MockServerBuilder {
    script: Script,
}

impl MockServerBuilder {
    fn new() -> Self {
        Self {
            script: Script {
                salt: DEFAULT_SALT.to_owned(),
                server_type: "mserver".to_owned(),
                mechanisms: "PROT10,RIPEMD160,SHA256,SHA512".to_owned(),
                password_hash: "SHA512".to_owned(),
                username: "monetdb".to_owned(),
                password: "monetdb".to_owned(),
                database: "monetdb".to_owned(),
                proxy_rounds: 0,
                redirect: None,
                responses: HashMap::new(),
            },
        }
    }

    /// Set the challenge salt.
    #[must_use]
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.script.salt = salt.into();
        self
    }

    /// Set the comma-separated mechanism list offered in the challenge.
    #[must_use]
    pub fn with_mechanisms(mut self, mechanisms: impl Into<String>) -> Self {
        self.script.mechanisms = mechanisms.into();
        self
    }

    /// Set the password hash algorithm named in the challenge.
    #[must_use]
    pub fn with_password_hash(mut self, algorithm: impl Into<String>) -> Self {
        self.script.password_hash = algorithm.into();
        self
    }

    /// Set the credentials and database the server accepts.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        self.script.username = username.into();
        self.script.password = password.into();
        self.script.database = database.into();
        self
    }

    /// Answer the first `rounds` login attempts with a merovingian proxy
    /// indication, forcing the client to redo the challenge on the same
    /// socket.
    #[must_use]
    pub fn with_proxy_rounds(mut self, rounds: usize) -> Self {
        self.script.proxy_rounds = rounds;
        self
    }

    /// Answer every login on this server with a redirect line.
    #[must_use]
    pub fn with_redirect(mut self, uri: impl Into<String>) -> Self {
        self.script.redirect = Some(uri.into());
        self
    }

    /// Map an exact client message to a canned reply payload.
    #[must_use]
    pub fn with_response(mut self, request: impl Into<String>, reply: impl Into<String>) -> Self {
        self.script.responses.insert(request.into(), reply.into());
        self
    }

    /// Bind a listener and start serving.
    pub async fn build(self) -> std::io::Result<MockMapiServer> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let script = Arc::new(self.script);
        let accepted = Arc::new(AtomicUsize::new(0));

        let accept_script = Arc::clone(&script);
        let accept_counter = Arc::clone(&accepted);
        let handle = tokio::spawn(async move {
            loop {
                let Ok((stream, peer)) = listener.accept().await else {
                    break;
                };
                accept_counter.fetch_add(1, Ordering::SeqCst);
                tracing::debug!(%peer, "mock server accepted connection");
                let script = Arc::clone(&accept_script);
                tokio::spawn(async move {
                    if let Err(e) = serve_connection(stream, script).await {
                        tracing::debug!(error = %e, "mock connection ended");
                    }
                });
            }
        });

        Ok(MockMapiServer {
            addr,
            accepted,
            handle,
        })
    }
}

/// An in-process mock MAPI server.
///
/// The listener is aborted when the value is dropped.
pub struct MockMapiServer {
    addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    handle: JoinHandle<()>,
}

impl MockMapiServer {
    /// Start building a mock server.
    #[must_use]
    pub fn builder() -> MockServerBuilder {
        MockServerBuilder::new()
    }

    /// Start a mock server with default credentials and no scripted
    /// responses.
    pub async fn start() -> std::io::Result<Self> {
        Self::builder().build().await
    }

    /// The address the server listens on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Number of TCP connections accepted so far.
    #[must_use]
    pub fn connections_accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }
}

impl Drop for MockMapiServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Drive one client connection: handshake, then scripted request/reply.
async fn serve_connection(
    stream: TcpStream,
    script: Arc<Script>,
) -> Result<(), mapi_codec::CodecError> {
    let mut channel = Connection::new(stream);
    let mut proxy_rounds_left = script.proxy_rounds;

    loop {
        channel
            .send_message(script.challenge_line().as_bytes())
            .await?;
        let response = channel.read_message().await?;
        let response = String::from_utf8_lossy(&response);

        if response != script.expected_response() {
            channel
                .send_message(
                    format!(
                        "!InvalidCredentials:access denied for user '{}'",
                        script.username
                    )
                    .as_bytes(),
                )
                .await?;
            return Ok(());
        }

        if let Some(redirect) = &script.redirect {
            channel.send_message(redirect.as_bytes()).await?;
            return Ok(());
        }

        if proxy_rounds_left > 0 {
            proxy_rounds_left -= 1;
            channel
                .send_message(b"^mapi:merovingian://proxy")
                .await?;
            continue;
        }

        channel.send_message(b"").await?;
        break;
    }

    loop {
        let request = channel.read_message().await?;
        let request = String::from_utf8_lossy(&request).into_owned();
        let reply = script.reply_for(&request);
        tracing::trace!(request = request.as_str(), "mock server replying");
        channel.send_message(reply.as_bytes()).await?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handshake_and_scripted_reply() {
        let server = MockMapiServer::builder()
            .with_response("sselect 1;", "&2 1 -1 0 0")
            .build()
            .await
            .unwrap();

        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut channel = Connection::new(stream);

        let challenge_payload = channel.read_message().await.unwrap();
        let challenge =
            Challenge::parse(std::str::from_utf8(&challenge_payload).unwrap()).unwrap();
        let response =
            monet_auth::challenge_response(&challenge, "monetdb", "monetdb", "monetdb").unwrap();
        channel.send_message(response.as_bytes()).await.unwrap();
        assert!(channel.read_message().await.unwrap().is_empty());

        channel.send_query("select 1").await.unwrap();
        let reply = channel.read_message().await.unwrap();
        assert_eq!(&reply[..], b"&2 1 -1 0 0");

        assert_eq!(server.connections_accepted(), 1);
    }

    #[tokio::test]
    async fn test_rejects_bad_password() {
        let server = MockMapiServer::start().await.unwrap();

        let stream = TcpStream::connect(server.addr()).await.unwrap();
        let mut channel = Connection::new(stream);

        let challenge_payload = channel.read_message().await.unwrap();
        let challenge =
            Challenge::parse(std::str::from_utf8(&challenge_payload).unwrap()).unwrap();
        let response =
            monet_auth::challenge_response(&challenge, "monetdb", "wrong", "monetdb").unwrap();
        channel.send_message(response.as_bytes()).await.unwrap();

        let reply = channel.read_message().await.unwrap();
        assert!(reply.starts_with(b"!"));
    }
}
