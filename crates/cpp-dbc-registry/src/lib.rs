//! The process-wide driver registry.
//!
//! Drivers register themselves once, at process startup, under a scheme
//! name; [`DriverRegistry::connect`] resolves a `cpp_dbc:<scheme>://...`
//! URL to the registered driver and delegates to it.

#![warn(missing_docs)]
#![deny(unsafe_code)]

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use cpp_dbc_driver::{ConnectionOptions, DynConnection, DynDriver};
use cpp_dbc_error::DbError;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

const URL_PREFIX: &str = "cpp_dbc:";

type DriverMap = HashMap<&'static str, Arc<dyn DynDriver>>;

fn drivers() -> &'static RwLock<DriverMap> {
    static DRIVERS: OnceLock<RwLock<DriverMap>> = OnceLock::new();
    DRIVERS.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The process-wide registry of drivers, keyed by URL scheme.
///
/// This is a zero-sized handle onto process-global state (analogous to a
/// static class in other languages): there is exactly one registry per
/// process, reached through these associated functions rather than through
/// an instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriverRegistry;

impl DriverRegistry {
    /// Registers `driver` under its own [`Driver::scheme`](cpp_dbc_driver::Driver::scheme).
    /// If a driver is already registered under that scheme, `driver` is
    /// ignored: first registration wins.
    pub fn register(driver: Arc<dyn DynDriver>) {
        let scheme = driver.scheme();
        let mut guard = drivers().write();
        if guard.contains_key(scheme) {
            debug!(scheme, "driver already registered, ignoring");
            return;
        }
        trace!(scheme, "registering driver");
        guard.insert(scheme, driver);
    }

    /// Looks up the driver registered under `scheme`, if any.
    #[must_use]
    pub fn lookup(scheme: &str) -> Option<Arc<dyn DynDriver>> {
        drivers().read().get(scheme).cloned()
    }

    /// Removes the driver registered under `scheme`, returning it if one
    /// was present.
    pub fn unregister(scheme: &str) -> Option<Arc<dyn DynDriver>> {
        let removed = drivers().write().remove(scheme);
        if removed.is_some() {
            trace!(scheme, "unregistered driver");
        }
        removed
    }

    /// Removes every registered driver.
    pub fn clear() {
        drivers().write().clear();
    }

    /// The scheme names currently registered.
    #[must_use]
    pub fn registered_schemes() -> Vec<&'static str> {
        drivers().read().keys().copied().collect()
    }

    /// Parses `url`, resolves its scheme against the registry, and
    /// delegates to the resolved driver's `connect`.
    ///
    /// `url` must have the form `cpp_dbc:<scheme>://<authority>[/<path>]`.
    pub async fn connect(
        url: &str,
        user: &str,
        password: &str,
        options: &ConnectionOptions,
    ) -> Result<Box<dyn DynConnection>, DbError> {
        let driver = Self::resolve(url)?;
        trace!("delegating connect to driver");
        driver.connect(url, user, password, options).await
    }

    /// Parses `url` and resolves its scheme against the registry, without
    /// connecting.
    ///
    /// Callers that open many connections against the same URL (the
    /// connection pool, in particular) use this to resolve the driver once
    /// at construction time — both to check its
    /// [`family`](cpp_dbc_driver::DynDriver::family) up front and to avoid a
    /// registry lookup on every subsequent `connect`.
    pub fn resolve(url: &str) -> Result<Arc<dyn DynDriver>, DbError> {
        let scheme = parse_scheme(url)?;
        Self::lookup(scheme).ok_or_else(|| {
            warn!(scheme, "no driver registered for scheme");
            DbError::NoDriver(scheme.to_string())
        })
    }
}

/// Extracts the `<scheme>` component of a `cpp_dbc:<scheme>://<authority>`
/// URL, failing with `DbError::InvalidUrl` if the prefix or the `://`
/// separator is missing.
fn parse_scheme(url: &str) -> Result<&str, DbError> {
    let rest = url.strip_prefix(URL_PREFIX).ok_or_else(|| {
        DbError::InvalidUrl(format!(
            "expected `{URL_PREFIX}<scheme>://...`, got: {url}"
        ))
    })?;
    let sep = rest.find("://").ok_or_else(|| {
        DbError::InvalidUrl(format!(
            "expected `{URL_PREFIX}<scheme>://...`, got: {url}"
        ))
    })?;
    Ok(&rest[..sep])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use cpp_dbc_driver::Connection;
    use cpp_dbc_types::DriverFamily;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubConnection {
        url: String,
    }

    impl Connection for StubConnection {
        async fn execute_update(&self, _sql: &str) -> Result<u64, DbError> {
            Ok(0)
        }

        async fn execute_query(
            &self,
            _sql: &str,
        ) -> Result<Box<dyn cpp_dbc_driver::DynResultSet>, DbError> {
            Err(DbError::DriverError {
                code: None,
                message: "not implemented in stub".into(),
            })
        }

        async fn prepare_statement(
            &self,
            _sql: &str,
        ) -> Result<Box<dyn cpp_dbc_driver::DynPreparedStatement>, DbError> {
            Err(DbError::DriverError {
                code: None,
                message: "not implemented in stub".into(),
            })
        }

        fn set_auto_commit(&self, _flag: bool) -> Result<(), DbError> {
            Ok(())
        }

        fn auto_commit(&self) -> Result<bool, DbError> {
            Ok(true)
        }

        async fn begin_transaction(&self) -> Result<bool, DbError> {
            Ok(true)
        }

        async fn commit(&self) -> Result<(), DbError> {
            Ok(())
        }

        async fn rollback(&self) -> Result<(), DbError> {
            Ok(())
        }

        fn transaction_active(&self) -> Result<bool, DbError> {
            Ok(false)
        }

        async fn set_transaction_isolation(
            &self,
            _level: cpp_dbc_types::IsolationLevel,
        ) -> Result<(), DbError> {
            Ok(())
        }

        fn transaction_isolation(&self) -> Result<cpp_dbc_types::IsolationLevel, DbError> {
            Ok(cpp_dbc_types::IsolationLevel::ReadCommitted)
        }

        async fn close(&self) -> Result<(), DbError> {
            Ok(())
        }

        fn is_closed(&self) -> bool {
            false
        }

        fn url(&self) -> &str {
            &self.url
        }
    }

    struct StubDriver {
        scheme: &'static str,
        connects: AtomicUsize,
    }

    impl cpp_dbc_driver::Driver for StubDriver {
        fn scheme(&self) -> &'static str {
            self.scheme
        }

        fn family(&self) -> DriverFamily {
            DriverFamily::Relational
        }

        async fn connect(
            &self,
            url: &str,
            _user: &str,
            _password: &str,
            _options: &ConnectionOptions,
        ) -> Result<Box<dyn DynConnection>, DbError> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(StubConnection {
                url: url.to_owned(),
            }))
        }
    }

    fn unique_scheme(tag: &str) -> &'static str {
        Box::leak(format!("teststub-{tag}").into_boxed_str())
    }

    #[test]
    fn parse_scheme_rejects_missing_prefix() {
        let err = parse_scheme("postgresql://localhost/db").unwrap_err();
        assert!(matches!(err, DbError::InvalidUrl(_)));
    }

    #[test]
    fn parse_scheme_rejects_missing_separator() {
        let err = parse_scheme("cpp_dbc:postgresql-localhost/db").unwrap_err();
        assert!(matches!(err, DbError::InvalidUrl(_)));
    }

    #[test]
    fn parse_scheme_extracts_driver_name() {
        let scheme = parse_scheme("cpp_dbc:mysql://localhost:3306/app").unwrap();
        assert_eq!(scheme, "mysql");
    }

    #[test]
    fn first_registration_wins() {
        let scheme = unique_scheme("first-wins");
        let first = Arc::new(StubDriver {
            scheme,
            connects: AtomicUsize::new(0),
        });
        let second = Arc::new(StubDriver {
            scheme,
            connects: AtomicUsize::new(0),
        });

        DriverRegistry::register(first.clone());
        DriverRegistry::register(second);

        let resolved = DriverRegistry::lookup(scheme).unwrap();
        assert!(Arc::ptr_eq(&resolved, &first));

        DriverRegistry::unregister(scheme);
    }

    #[tokio::test]
    async fn connect_delegates_to_resolved_driver() {
        let scheme = unique_scheme("connect-delegates");
        let driver = Arc::new(StubDriver {
            scheme,
            connects: AtomicUsize::new(0),
        });
        DriverRegistry::register(driver.clone());

        let url = format!("cpp_dbc:{scheme}://localhost/app");
        let conn = DriverRegistry::connect(&url, "user", "pw", &ConnectionOptions::new())
            .await
            .unwrap();
        assert_eq!(conn.url(), url);
        assert_eq!(driver.connects.load(Ordering::SeqCst), 1);

        DriverRegistry::unregister(scheme);
    }

    #[tokio::test]
    async fn connect_fails_with_no_driver_for_unknown_scheme() {
        let scheme = unique_scheme("unknown");
        let url = format!("cpp_dbc:{scheme}://localhost/app");
        let err = DriverRegistry::connect(&url, "u", "p", &ConnectionOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NoDriver(_)));
    }
}
