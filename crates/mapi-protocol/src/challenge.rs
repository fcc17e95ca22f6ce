//! Login challenge and post-login reply grammar.
//!
//! On connect the server sends a challenge of the form
//! `salt:server_type:9:auth_types:endian:hash_algo:`. After the client
//! answers, the server replies with an empty message (authenticated), a
//! proxy indication, a redirect URI, or an unexpected payload.

use crate::error::ProtocolError;

/// The only MAPI protocol version this driver speaks.
pub const PROTOCOL_VERSION: &str = "9";

/// Marker for a merovingian proxy reply: another challenge follows on the
/// same socket.
const PROXY_PREFIX: &str = "^mapi:merovingian:";

/// Marker for any `^mapi:` reply.
const MAPI_PREFIX: &str = "^mapi:";

/// A parsed login challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    /// Random salt mixed into the credential digest.
    pub salt: String,
    /// Server implementation name (e.g. `merovingian`, `monetdb`).
    pub server_type: String,
    /// Comma-separated authentication mechanisms offered by the server.
    pub auth_mechanisms: Vec<String>,
    /// Server byte-order tag (`LIT` or `BIG`).
    pub endianness: String,
    /// Hash algorithm the server applied to stored passwords.
    pub password_hash: String,
}

impl Challenge {
    /// Parse a challenge message.
    ///
    /// Any protocol version other than `9` is rejected.
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        let mut fields = payload.trim_end_matches('\n').split(':');

        let salt = fields
            .next()
            .ok_or_else(|| ProtocolError::MalformedChallenge(payload.to_owned()))?;
        let server_type = fields
            .next()
            .ok_or_else(|| ProtocolError::MalformedChallenge(payload.to_owned()))?;
        let version = fields
            .next()
            .ok_or_else(|| ProtocolError::MalformedChallenge(payload.to_owned()))?;
        if version != PROTOCOL_VERSION {
            return Err(ProtocolError::UnsupportedProtocolVersion(version.to_owned()));
        }
        let auth_types = fields
            .next()
            .ok_or_else(|| ProtocolError::MalformedChallenge(payload.to_owned()))?;
        let endianness = fields
            .next()
            .ok_or_else(|| ProtocolError::MalformedChallenge(payload.to_owned()))?;
        let password_hash = fields
            .next()
            .ok_or_else(|| ProtocolError::MalformedChallenge(payload.to_owned()))?;

        Ok(Self {
            salt: salt.to_owned(),
            server_type: server_type.to_owned(),
            auth_mechanisms: auth_types.split(',').map(str::to_owned).collect(),
            endianness: endianness.to_owned(),
            password_hash: password_hash.to_owned(),
        })
    }
}

/// A redirect target parsed from a `^mapi:monetdb://host:port/db` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    /// Host to reconnect to.
    pub host: String,
    /// Port to reconnect to.
    pub port: u16,
    /// Database to request, when the URI carries a path.
    pub database: Option<String>,
}

impl Redirect {
    fn parse(uri: &str) -> Result<Self, ProtocolError> {
        let malformed = || ProtocolError::MalformedRedirect(uri.to_owned());

        let rest = uri.strip_prefix("monetdb://").ok_or_else(malformed)?;
        let (authority, path) = match rest.split_once('/') {
            Some((authority, path)) => (authority, Some(path)),
            None => (rest, None),
        };
        let (host, port) = authority.rsplit_once(':').ok_or_else(malformed)?;
        let port = port.parse::<u16>().map_err(|_| malformed())?;
        let database = path
            .map(|p| p.trim_end_matches('\n'))
            .filter(|p| !p.is_empty())
            .map(str::to_owned);

        Ok(Self {
            host: host.to_owned(),
            port,
            database,
        })
    }
}

/// Disposition of the server reply to an authentication response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginReply {
    /// Empty reply: the session is authenticated.
    Accepted,
    /// Merovingian proxy: read a fresh challenge on the same socket.
    Proxy,
    /// Reconnect elsewhere with merged options.
    Redirect(Redirect),
}

impl LoginReply {
    /// Classify the reply payload following an authentication response.
    pub fn parse(payload: &str) -> Result<Self, ProtocolError> {
        if payload.is_empty() {
            return Ok(Self::Accepted);
        }
        if payload.starts_with(PROXY_PREFIX) {
            return Ok(Self::Proxy);
        }
        if let Some(uri) = payload.strip_prefix(MAPI_PREFIX) {
            let uri = uri.lines().next().unwrap_or_default();
            return Redirect::parse(uri).map(Self::Redirect);
        }
        Err(ProtocolError::MalformedChallenge(payload.to_owned()))
    }
}
