//! Pool configuration.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use cpp_dbc_types::IsolationLevel;
use thiserror::Error;

/// A configuration value failed the constraints checked by
/// [`PoolConfig::validate`].
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid pool configuration: {0}")]
pub struct ConfigError(String);

/// Configuration for a [`ConnectionPool`](crate::ConnectionPool).
///
/// Defaults match this workspace's documented pool-config defaults:
/// `initial_size` 5, `max_size` 20, `min_idle` 3, `connection_timeout`
/// 30 s, `idle_timeout` 5 min, `validation_interval` 5 s, `max_lifetime`
/// 30 min, `test_on_borrow` true, `test_on_return` false, validation query
/// `"SELECT 1"`, isolation `read-committed`.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct PoolConfig {
    /// An identifying name for this pool, used only in logs.
    pub name: String,
    /// The `cpp_dbc:<scheme>://...` URL passed to the driver registry.
    pub url: String,
    /// The username passed to `Driver::connect`.
    pub username: String,
    /// The password passed to `Driver::connect`.
    pub password: String,
    /// Driver-specific options passed to `Driver::connect`.
    pub options: HashMap<String, String>,
    /// Connections created at pool construction time.
    pub initial_size: u32,
    /// The hard cap on `|all_connections|`.
    pub max_size: u32,
    /// The floor maintenance restores `|all_connections|` to.
    pub min_idle: u32,
    /// How long a borrow may wait for idle capacity before failing with
    /// `BorrowTimeout`.
    pub connection_timeout: Duration,
    /// How long an idle connection may sit before maintenance evicts it.
    pub idle_timeout: Duration,
    /// The maintenance task's wake interval; also the validation cadence.
    pub validation_interval: Duration,
    /// How long a connection may live, idle or not, before maintenance
    /// evicts it.
    pub max_lifetime: Duration,
    /// Whether to run the validation query against an idle connection
    /// before handing it out.
    pub test_on_borrow: bool,
    /// Whether to run the validation query against a connection before
    /// re-admitting it to the idle queue.
    pub test_on_return: bool,
    /// The query used to validate a connection.
    pub validation_query: Arc<str>,
    /// The isolation level applied to every connection the pool creates.
    pub transaction_isolation: IsolationLevel,
}

/// The maintenance wake interval default, reused as the validation
/// cadence (`validation_interval` is both, per this workspace's resolved
/// Open Question: the fixed separate maintenance cadence is dropped in
/// favor of one configurable interval).
pub const DEFAULT_VALIDATION_INTERVAL: Duration = Duration::from_secs(5);

/// Default validation query.
pub const DEFAULT_VALIDATION_QUERY: &str = "SELECT 1";

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "cpp_dbc-pool".to_owned(),
            url: String::new(),
            username: String::new(),
            password: String::new(),
            options: HashMap::new(),
            initial_size: 5,
            max_size: 20,
            min_idle: 3,
            connection_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(300),
            validation_interval: DEFAULT_VALIDATION_INTERVAL,
            max_lifetime: Duration::from_secs(1_800),
            test_on_borrow: true,
            test_on_return: false,
            validation_query: Arc::from(DEFAULT_VALIDATION_QUERY),
            transaction_isolation: IsolationLevel::ReadCommitted,
        }
    }
}

impl PoolConfig {
    /// Starts a new config with every field at its default.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pool name.
    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the connection URL.
    #[must_use]
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the username.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = username.into();
        self
    }

    /// Sets the password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = password.into();
        self
    }

    /// Sets a single driver option, in addition to any already set.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Sets `initial_size`.
    #[must_use]
    pub fn initial_size(mut self, initial_size: u32) -> Self {
        self.initial_size = initial_size;
        self
    }

    /// Sets `max_size`.
    #[must_use]
    pub fn max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets `min_idle`.
    #[must_use]
    pub fn min_idle(mut self, min_idle: u32) -> Self {
        self.min_idle = min_idle;
        self
    }

    /// Sets `connection_timeout`.
    #[must_use]
    pub fn connection_timeout(mut self, timeout: Duration) -> Self {
        self.connection_timeout = timeout;
        self
    }

    /// Sets `idle_timeout`.
    #[must_use]
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Sets `validation_interval`.
    #[must_use]
    pub fn validation_interval(mut self, interval: Duration) -> Self {
        self.validation_interval = interval;
        self
    }

    /// Sets `max_lifetime`.
    #[must_use]
    pub fn max_lifetime(mut self, lifetime: Duration) -> Self {
        self.max_lifetime = lifetime;
        self
    }

    /// Sets `test_on_borrow`.
    #[must_use]
    pub fn test_on_borrow(mut self, enabled: bool) -> Self {
        self.test_on_borrow = enabled;
        self
    }

    /// Sets `test_on_return`.
    #[must_use]
    pub fn test_on_return(mut self, enabled: bool) -> Self {
        self.test_on_return = enabled;
        self
    }

    /// Sets the validation query.
    #[must_use]
    pub fn validation_query(mut self, query: impl Into<Arc<str>>) -> Self {
        self.validation_query = query.into();
        self
    }

    /// Sets the isolation level applied to every connection this pool
    /// creates.
    #[must_use]
    pub fn transaction_isolation(mut self, level: IsolationLevel) -> Self {
        self.transaction_isolation = level;
        self
    }

    /// Checks `0 ≤ min_idle ≤ initial_size ≤ max_size` and `max_size ≥ 1`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_size == 0 {
            return Err(ConfigError("max_size must be at least 1".to_owned()));
        }
        if self.min_idle > self.initial_size {
            return Err(ConfigError(format!(
                "min_idle ({}) must not exceed initial_size ({})",
                self.min_idle, self.initial_size
            )));
        }
        if self.initial_size > self.max_size {
            return Err(ConfigError(format!(
                "initial_size ({}) must not exceed max_size ({})",
                self.initial_size, self.max_size
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = PoolConfig::default();
        assert_eq!(config.initial_size, 5);
        assert_eq!(config.max_size, 20);
        assert_eq!(config.min_idle, 3);
        assert_eq!(config.connection_timeout, Duration::from_secs(30));
        assert_eq!(config.idle_timeout, Duration::from_secs(300));
        assert_eq!(config.validation_interval, Duration::from_secs(5));
        assert_eq!(config.max_lifetime, Duration::from_secs(1_800));
        assert!(config.test_on_borrow);
        assert!(!config.test_on_return);
        assert_eq!(&*config.validation_query, "SELECT 1");
        assert_eq!(config.transaction_isolation, IsolationLevel::ReadCommitted);
    }

    #[test]
    fn validate_rejects_zero_max_size() {
        let config = PoolConfig::new().max_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_min_idle_above_initial_size() {
        let config = PoolConfig::new().initial_size(2).min_idle(3);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_initial_size_above_max_size() {
        let config = PoolConfig::new().initial_size(10).max_size(5);
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(PoolConfig::default().validate().is_ok());
    }

    #[test]
    fn builder_methods_compose() {
        let config = PoolConfig::new()
            .url("cpp_dbc:postgresql://localhost:5432/app")
            .username("app")
            .password("secret")
            .option("sslmode", "require")
            .max_size(10)
            .min_idle(2)
            .initial_size(2);

        assert_eq!(config.url, "cpp_dbc:postgresql://localhost:5432/app");
        assert_eq!(config.options.get("sslmode").map(String::as_str), Some("require"));
        assert!(config.validate().is_ok());
    }
}
