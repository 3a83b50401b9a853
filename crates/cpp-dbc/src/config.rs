//! `DatabaseConfig` and `DatabaseConfigManager`: named database targets and
//! named pool configurations, mirroring `database_config.hpp`'s
//! `DatabaseConfig`/`DBConnectionPoolConfig`/`DatabaseConfigManager` trio.
//!
//! Neither type parses a configuration file (out of scope, spec.md §1); both
//! are plain structs meant to be populated by whatever YAML/TOML/env loader
//! an application wires in, then handed to [`DriverRegistry`] or
//! [`ConnectionPool`] here.

use std::collections::HashMap;

use cpp_dbc_driver::{ConnectionOptions, DynConnection};
use cpp_dbc_error::DbError;
use cpp_dbc_pool::{ConnectionPool, PoolConfig};
use cpp_dbc_registry::DriverRegistry;

/// A single named database connection target: scheme, host/port or embedded
/// path, database name, credentials, and driver-specific options.
///
/// `connection_string()` derives the `cpp_dbc:<scheme>://...` URL the
/// registry and pool both consume (spec.md §6): host-less or port-0 configs
/// (embedded backends such as SQLite) omit the authority entirely.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseConfig {
    name: String,
    db_type: String,
    host: String,
    port: u16,
    database: String,
    username: String,
    password: String,
    options: HashMap<String, String>,
}

impl DatabaseConfig {
    /// Builds a named config for `db_type` (e.g. `"mysql"`, `"postgresql"`,
    /// `"sqlite"`), with an empty option bag.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        db_type: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            db_type: db_type.into(),
            host: host.into(),
            port,
            database: database.into(),
            username: username.into(),
            password: password.into(),
            options: HashMap::new(),
        }
    }

    /// This configuration's name, used as a lookup key in
    /// [`DatabaseConfigManager`].
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scheme this configuration connects through (`mysql`,
    /// `postgresql`, `sqlite`, ...).
    #[must_use]
    pub fn db_type(&self) -> &str {
        &self.db_type
    }

    /// The configured host, empty for embedded backends.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The configured port, `0` for embedded backends.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.port
    }

    /// The database/schema/file name.
    #[must_use]
    pub fn database(&self) -> &str {
        &self.database
    }

    /// The configured username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The configured password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Sets a single driver-specific option, in addition to any already set.
    #[must_use]
    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_option(key, value);
        self
    }

    /// Sets a single driver-specific option in place.
    pub fn set_option(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.options.insert(key.into(), value.into());
    }

    /// The value for `key`, or `default` if absent.
    #[must_use]
    pub fn get_option<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.options.get(key).map_or(default, String::as_str)
    }

    /// `true` if `key` has been set.
    #[must_use]
    pub fn has_option(&self, key: &str) -> bool {
        self.options.contains_key(key)
    }

    /// All driver-specific options.
    #[must_use]
    pub fn options(&self) -> &HashMap<String, String> {
        &self.options
    }

    /// Derives the `cpp_dbc:<scheme>://...` URL the registry and the pool
    /// both consume.
    ///
    /// An empty host or a `0` port (embedded backends, e.g. sqlite's
    /// `:memory:` or a file path held in `database`) yields
    /// `cpp_dbc:{type}://{database}`; otherwise
    /// `cpp_dbc:{type}://{host}:{port}/{database}`.
    #[must_use]
    pub fn connection_string(&self) -> String {
        if self.host.is_empty() || self.port == 0 {
            format!("cpp_dbc:{}://{}", self.db_type, self.database)
        } else {
            format!(
                "cpp_dbc:{}://{}:{}/{}",
                self.db_type, self.host, self.port, self.database
            )
        }
    }

    /// Opens a single physical connection against this configuration,
    /// through the driver registry.
    pub async fn connect(&self) -> Result<Box<dyn DynConnection>, DbError> {
        let options = self
            .options
            .iter()
            .fold(ConnectionOptions::new(), |opts, (k, v)| {
                opts.with_option(k.clone(), v.clone())
            });
        DriverRegistry::connect(
            &self.connection_string(),
            &self.username,
            &self.password,
            &options,
        )
        .await
    }

    /// Applies this configuration's URL, credentials and options onto
    /// `pool_config`, overwriting whatever it previously held for those
    /// fields (mirrors `DBConnectionPoolConfig::withDatabaseConfig`).
    #[must_use]
    pub fn apply_to(&self, pool_config: PoolConfig) -> PoolConfig {
        let options = self
            .options
            .iter()
            .fold(pool_config, |cfg, (k, v)| cfg.option(k.clone(), v.clone()));
        options
            .url(self.connection_string())
            .username(self.username.clone())
            .password(self.password.clone())
    }
}

/// Central registry of named [`DatabaseConfig`]s and named [`PoolConfig`]s
/// (mirrors `DatabaseConfigManager`): lets an application look up "the
/// `orders-db` database, `default` pool" without threading raw structs
/// through its call graph.
#[derive(Debug, Clone, Default)]
pub struct DatabaseConfigManager {
    databases: Vec<DatabaseConfig>,
    pool_configs: HashMap<String, PoolConfig>,
}

/// The pool configuration name [`DatabaseConfigManager::create_pool`] and
/// [`DatabaseConfigManager::pool_config`] use when the caller doesn't name
/// one explicitly.
pub const DEFAULT_POOL_CONFIG_NAME: &str = "default";

impl DatabaseConfigManager {
    /// An empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `config`, replacing any prior entry with the same name.
    pub fn add_database_config(&mut self, config: DatabaseConfig) {
        self.databases.retain(|existing| existing.name() != config.name());
        self.databases.push(config);
    }

    /// Every registered database configuration.
    #[must_use]
    pub fn databases(&self) -> &[DatabaseConfig] {
        &self.databases
    }

    /// Registered database configurations whose `db_type` is `db_type`.
    #[must_use]
    pub fn databases_by_type(&self, db_type: &str) -> Vec<&DatabaseConfig> {
        self.databases
            .iter()
            .filter(|db| db.db_type() == db_type)
            .collect()
    }

    /// The database configuration registered under `name`, if any.
    #[must_use]
    pub fn database_by_name(&self, name: &str) -> Option<&DatabaseConfig> {
        self.databases.iter().find(|db| db.name() == name)
    }

    /// Registers `config`, keyed by its `name` field, replacing any prior
    /// entry under the same name.
    pub fn add_pool_config(&mut self, config: PoolConfig) {
        self.pool_configs.insert(config.name.clone(), config);
    }

    /// The pool configuration registered under `name`
    /// ([`DEFAULT_POOL_CONFIG_NAME`] if `name` is empty), if any.
    #[must_use]
    pub fn pool_config(&self, name: &str) -> Option<&PoolConfig> {
        let key = if name.is_empty() {
            DEFAULT_POOL_CONFIG_NAME
        } else {
            name
        };
        self.pool_configs.get(key)
    }

    /// Opens a single physical connection through the database config
    /// registered under `db_name`.
    pub async fn connect(&self, db_name: &str) -> Result<Box<dyn DynConnection>, DbError> {
        let db = self
            .database_by_name(db_name)
            .ok_or_else(|| DbError::InvalidParameter(format!("unknown database config `{db_name}`")))?;
        db.connect().await
    }

    /// Builds and starts a [`ConnectionPool`] from the database config
    /// registered under `db_name` and the pool config registered under
    /// `pool_config_name` ([`DEFAULT_POOL_CONFIG_NAME`] if empty).
    pub async fn create_pool(
        &self,
        db_name: &str,
        pool_config_name: &str,
    ) -> Result<ConnectionPool, DbError> {
        let db = self
            .database_by_name(db_name)
            .ok_or_else(|| DbError::InvalidParameter(format!("unknown database config `{db_name}`")))?;
        let pool_config = self.pool_config(pool_config_name).ok_or_else(|| {
            DbError::InvalidParameter(format!(
                "unknown pool config `{pool_config_name}`"
            ))
        })?;
        ConnectionPool::create(db.apply_to(pool_config.clone())).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn connection_string_omits_authority_for_embedded_backends() {
        let sqlite = DatabaseConfig::new("local", "sqlite", "", 0, "/tmp/app.db", "", "");
        assert_eq!(sqlite.connection_string(), "cpp_dbc:sqlite:///tmp/app.db");
    }

    #[test]
    fn connection_string_includes_host_and_port_for_networked_backends() {
        let mysql = DatabaseConfig::new("orders", "mysql", "localhost", 3306, "orders", "app", "pw");
        assert_eq!(
            mysql.connection_string(),
            "cpp_dbc:mysql://localhost:3306/orders"
        );
    }

    #[test]
    fn options_round_trip() {
        let db = DatabaseConfig::new("db", "mysql", "h", 1, "d", "u", "p")
            .option("charset", "utf8mb4")
            .option("timeout", "30");
        assert_eq!(db.get_option("charset", ""), "utf8mb4");
        assert!(db.has_option("timeout"));
        assert!(!db.has_option("ssl"));
        assert_eq!(db.get_option("ssl", "off"), "off");
    }

    #[test]
    fn apply_to_overwrites_url_credentials_and_options() {
        let db = DatabaseConfig::new("orders", "mysql", "localhost", 3306, "orders", "app", "secret")
            .option("charset", "utf8mb4");
        let pool_config = db.apply_to(PoolConfig::new().name("orders-pool"));
        assert_eq!(pool_config.url, "cpp_dbc:mysql://localhost:3306/orders");
        assert_eq!(pool_config.username, "app");
        assert_eq!(pool_config.password, "secret");
        assert_eq!(
            pool_config.options.get("charset").map(String::as_str),
            Some("utf8mb4")
        );
        // Fields not covered by `apply_to` are left untouched.
        assert_eq!(pool_config.name, "orders-pool");
    }

    #[test]
    fn manager_replaces_database_config_with_same_name() {
        let mut mgr = DatabaseConfigManager::new();
        mgr.add_database_config(DatabaseConfig::new("db", "mysql", "h", 1, "d1", "u", "p"));
        mgr.add_database_config(DatabaseConfig::new("db", "mysql", "h", 1, "d2", "u", "p"));
        assert_eq!(mgr.databases().len(), 1);
        assert_eq!(mgr.database_by_name("db").unwrap().database(), "d2");
    }

    #[test]
    fn manager_filters_databases_by_type() {
        let mut mgr = DatabaseConfigManager::new();
        mgr.add_database_config(DatabaseConfig::new("a", "mysql", "h", 1, "d", "u", "p"));
        mgr.add_database_config(DatabaseConfig::new("b", "postgresql", "h", 1, "d", "u", "p"));
        let mysql = mgr.databases_by_type("mysql");
        assert_eq!(mysql.len(), 1);
        assert_eq!(mysql[0].name(), "a");
    }

    #[test]
    fn pool_config_lookup_defaults_to_default_name() {
        let mut mgr = DatabaseConfigManager::new();
        mgr.add_pool_config(PoolConfig::new().name(DEFAULT_POOL_CONFIG_NAME));
        assert!(mgr.pool_config("").is_some());
        assert!(mgr.pool_config(DEFAULT_POOL_CONFIG_NAME).is_some());
        assert!(mgr.pool_config("other").is_none());
    }

    #[tokio::test]
    async fn create_pool_fails_for_unknown_database_config() {
        let mgr = DatabaseConfigManager::new();
        let err = mgr.create_pool("nope", "default").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidParameter(_)));
    }

    #[tokio::test]
    async fn create_pool_fails_for_unknown_pool_config() {
        let mut mgr = DatabaseConfigManager::new();
        mgr.add_database_config(DatabaseConfig::new("db", "mysql", "h", 1, "d", "u", "p"));
        let err = mgr.create_pool("db", "nope").await.unwrap_err();
        assert!(matches!(err, DbError::InvalidParameter(_)));
    }
}
