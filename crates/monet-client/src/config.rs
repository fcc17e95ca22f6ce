//! Connection configuration.

use std::time::Duration;

use mapi_protocol::Redirect;

/// Default server port.
pub const DEFAULT_PORT: u16 = 50000;

/// Timeout configuration for the three socket operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Time to establish the TCP connection (default: 10s).
    pub connect: Duration,
    /// Time allowed for each read (default: 10s).
    pub read: Duration,
    /// Time allowed for each send (default: 10s).
    pub send: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect: Duration::from_millis(10_000),
            read: Duration::from_millis(10_000),
            send: Duration::from_millis(10_000),
        }
    }
}

impl TimeoutConfig {
    /// Create a new timeout configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the TCP connection timeout.
    #[must_use]
    pub fn connect(mut self, timeout: Duration) -> Self {
        self.connect = timeout;
        self
    }

    /// Set the per-read timeout.
    #[must_use]
    pub fn read(mut self, timeout: Duration) -> Self {
        self.read = timeout;
        self
    }

    /// Set the per-send timeout.
    #[must_use]
    pub fn send(mut self, timeout: Duration) -> Self {
        self.send = timeout;
        self
    }
}

/// Configuration for a single MonetDB connection.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// TCP host (default: `127.0.0.1`).
    pub host: String,
    /// TCP port (default: 50000).
    pub port: u16,
    /// Database name (default: `monetdb`).
    pub database: String,
    /// Username (default: `monetdb`).
    pub username: String,
    /// Password (default: `monetdb`).
    pub password: String,
    /// Schema to set after connecting, if any.
    pub schema: Option<String>,
    /// Role to set after connecting, if any.
    pub role: Option<String>,
    /// Session time zone, in minutes relative to UTC (default: 0).
    pub time_zone_offset: i32,
    /// Socket operation timeouts.
    pub timeouts: TimeoutConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: DEFAULT_PORT,
            database: "monetdb".to_owned(),
            username: "monetdb".to_owned(),
            password: "monetdb".to_owned(),
            schema: None,
            role: None,
            time_zone_offset: 0,
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the server host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Set the server port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the database name.
    #[must_use]
    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    /// Set the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Set the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Set the schema to activate after connecting.
    #[must_use]
    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Set the role to assume after connecting.
    #[must_use]
    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Set the session time zone offset in minutes relative to UTC.
    #[must_use]
    pub fn time_zone_offset(mut self, minutes: i32) -> Self {
        self.time_zone_offset = minutes;
        self
    }

    /// Set the socket operation timeouts.
    #[must_use]
    pub fn timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Merge a login redirect into this configuration: host and port are
    /// overridden, the database only when the redirect names one.
    pub(crate) fn apply_redirect(&mut self, redirect: Redirect) {
        self.host = redirect.host;
        self.port = redirect.port;
        if let Some(database) = redirect.database {
            self.database = database;
        }
    }

    /// The `host:port` address to dial.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("schema", &self.schema)
            .field("role", &self.role)
            .field("time_zone_offset", &self.time_zone_offset)
            .field("timeouts", &self.timeouts)
            .finish()
    }
}
