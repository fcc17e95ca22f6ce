//! Pool configuration.

use monet_client::Config;

/// Default number of pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 10;

/// Configuration for a connection pool.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Connection settings shared by every pooled connection.
    pub connection: Config,
    /// Number of connections the pool maintains (default: 10).
    pub pool_size: usize,
    /// Pool identity, used in log output.
    pub name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            connection: Config::default(),
            pool_size: DEFAULT_POOL_SIZE,
            name: "monetdb".to_owned(),
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection settings.
    #[must_use]
    pub fn connection(mut self, connection: Config) -> Self {
        self.connection = connection;
        self
    }

    /// Set the number of pooled connections.
    #[must_use]
    pub fn pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Set the pool identity.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PoolConfig::default();
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.name, "monetdb");
        assert_eq!(config.connection.port, 50000);
    }

    #[test]
    fn test_pool_size_floor() {
        assert_eq!(PoolConfig::new().pool_size(0).pool_size, 1);
    }
}
