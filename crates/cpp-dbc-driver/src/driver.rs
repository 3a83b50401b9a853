//! The Driver contract: a registered capability that turns a URL into a
//! live [`DynConnection`].

use async_trait::async_trait;
use cpp_dbc_error::DbError;
use cpp_dbc_types::{DriverFamily, IsolationLevel};

use crate::connection::DynConnection;
use crate::options::ConnectionOptions;

/// Every isolation level this workspace's data model recognizes, in
/// ascending strictness order. The default [`Driver::accepted_isolation_levels`]
/// returns this whole set.
pub const ALL_ISOLATION_LEVELS: [IsolationLevel; 4] = [
    IsolationLevel::ReadUncommitted,
    IsolationLevel::ReadCommitted,
    IsolationLevel::RepeatableRead,
    IsolationLevel::Serializable,
];

/// A capability registered under a scheme name, able to open connections
/// against one kind of backend.
///
/// A `Driver` is created once, registered once with the
/// [registry](https://docs.rs/cpp-dbc-registry), and lives for the process
/// lifetime.
pub trait Driver: Send + Sync {
    /// The URL scheme this driver handles (e.g. `"postgresql"`, `"mysql"`,
    /// `"scylladb"`), without the `cpp_dbc:` prefix.
    fn scheme(&self) -> &'static str;

    /// Whether this driver belongs to the relational or columnar family.
    /// The connection pool only operates on relational drivers.
    fn family(&self) -> DriverFamily;

    /// Opens a new physical connection against `url`.
    #[allow(async_fn_in_trait)]
    async fn connect(
        &self,
        url: &str,
        user: &str,
        password: &str,
        options: &ConnectionOptions,
    ) -> Result<Box<dyn DynConnection>, DbError>;

    /// The isolation levels this backend actually supports, most permissive
    /// first. The pool consults this before applying its configured
    /// isolation level to a freshly created connection, and rejects a
    /// `set_transaction_isolation` request for an unsupported level with
    /// `DbError::UnsupportedIsolation` rather than sending it to the
    /// backend. Backends that support the full ANSI set (the common case)
    /// do not need to override this; a backend with a restricted set
    /// (e.g. an embedded engine that only ever runs serializable) does.
    fn accepted_isolation_levels(&self) -> &[IsolationLevel] {
        &ALL_ISOLATION_LEVELS
    }
}

/// Object-safe mirror of [`Driver`] for storage behind `Box<dyn DynDriver>`
/// in the registry.
#[async_trait]
pub trait DynDriver: Send + Sync {
    /// See [`Driver::scheme`].
    fn scheme(&self) -> &'static str;
    /// See [`Driver::family`].
    fn family(&self) -> DriverFamily;
    /// See [`Driver::connect`].
    async fn connect(
        &self,
        url: &str,
        user: &str,
        password: &str,
        options: &ConnectionOptions,
    ) -> Result<Box<dyn DynConnection>, DbError>;

    /// See [`Driver::accepted_isolation_levels`].
    fn accepted_isolation_levels(&self) -> &[IsolationLevel];
}

#[async_trait]
impl<T> DynDriver for T
where
    T: Driver + 'static,
{
    fn scheme(&self) -> &'static str {
        Driver::scheme(self)
    }

    fn family(&self) -> DriverFamily {
        Driver::family(self)
    }

    async fn connect(
        &self,
        url: &str,
        user: &str,
        password: &str,
        options: &ConnectionOptions,
    ) -> Result<Box<dyn DynConnection>, DbError> {
        Driver::connect(self, url, user, password, options).await
    }

    fn accepted_isolation_levels(&self) -> &[IsolationLevel] {
        Driver::accepted_isolation_levels(self)
    }
}
