//! Drivers registered under the `memory:` and `memcolumnar:` schemes, so
//! tests can go through the same `DriverRegistry::connect` path real code
//! uses instead of constructing a [`MemoryConnection`] directly.

use cpp_dbc_driver::{ConnectionOptions, Driver, DynConnection};
use cpp_dbc_error::DbError;
use cpp_dbc_types::DriverFamily;

use crate::connection::MemoryConnection;
use crate::engine::backend_for;

/// Relational in-memory driver, registered under `memory:`.
#[derive(Debug, Default)]
pub struct MemoryDriver;

impl Driver for MemoryDriver {
    fn scheme(&self) -> &'static str {
        "memory"
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
        Ok(Box::new(MemoryConnection::new(url, backend_for(url))))
    }
}

/// Columnar sibling of [`MemoryDriver`], registered under `memcolumnar:`.
/// The pool's family check (it only manages
/// [`DriverFamily::Relational`](cpp_dbc_types::DriverFamily::Relational)
/// drivers) rejects this one, which is the point of having it: tests for
/// that rejection path need a real registered non-relational driver rather
/// than a hand-rolled stub.
#[derive(Debug, Default)]
pub struct MemoryColumnarDriver;

impl Driver for MemoryColumnarDriver {
    fn scheme(&self) -> &'static str {
        "memcolumnar"
    }

    fn family(&self) -> DriverFamily {
        DriverFamily::Columnar
    }

    async fn connect(
        &self,
        url: &str,
        _user: &str,
        _password: &str,
        _options: &ConnectionOptions,
    ) -> Result<Box<dyn DynConnection>, DbError> {
        Ok(Box::new(MemoryConnection::new(url, backend_for(url))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_driver_connects_and_pings() {
        use cpp_dbc_driver::Connection;

        let driver = MemoryDriver;
        let conn = driver
            .connect(
                "cpp_dbc:memory://driver-test",
                "",
                "",
                &ConnectionOptions::default(),
            )
            .await
            .unwrap();
        assert!(conn.execute_query("SELECT 1").await.is_ok());
        assert_eq!(conn.url(), "cpp_dbc:memory://driver-test");
    }

    #[test]
    fn columnar_driver_reports_non_relational_family() {
        assert_eq!(MemoryColumnarDriver.family(), DriverFamily::Columnar);
    }

    #[tokio::test]
    async fn columnar_round_trip_covers_every_type_including_uuid_and_blob() {
        use cpp_dbc_types::Value;
        use uuid::Uuid;

        let driver = MemoryColumnarDriver;
        let conn = driver
            .connect(
                "cpp_dbc:memcolumnar://columnar-round-trip",
                "",
                "",
                &ConnectionOptions::default(),
            )
            .await
            .unwrap();

        conn.execute_update("CREATE TABLE wide (n, amount, label, flag, ts, id, blob)")
            .await
            .unwrap();
        let mut stmt = conn
            .prepare_statement(
                "INSERT INTO wide (n, amount, label, flag, ts, id, blob) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .await
            .unwrap();

        let ts = chrono::NaiveDate::from_ymd_opt(2026, 7, 30)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap();
        let id = Uuid::new_v4();
        let blob = vec![9, 8, 7, 6];

        stmt.bind(1, Value::Integer(7)).unwrap();
        stmt.bind(2, Value::Double(2.5)).unwrap();
        stmt.bind(3, Value::String("columnar".into())).unwrap();
        stmt.bind(4, Value::Boolean(true)).unwrap();
        stmt.bind(5, Value::Timestamp(ts)).unwrap();
        stmt.bind(6, Value::Uuid(id)).unwrap();
        stmt.bind(7, Value::Bytes(blob.clone())).unwrap();
        assert_eq!(stmt.execute_update().await.unwrap(), 1);

        let mut rs = conn.execute_query("SELECT * FROM wide").await.unwrap();
        assert!(rs.next().await.unwrap());
        assert_eq!(rs.get(1).unwrap(), Value::Integer(7));
        assert_eq!(rs.get(2).unwrap(), Value::Double(2.5));
        assert_eq!(rs.get(3).unwrap(), Value::String("columnar".into()));
        assert_eq!(rs.get(4).unwrap(), Value::Boolean(true));
        assert_eq!(rs.get(5).unwrap(), Value::Timestamp(ts));
        assert_eq!(rs.get(6).unwrap(), Value::Uuid(id));
        assert_eq!(rs.get(6).unwrap().to_string(), id.to_string());
        assert_eq!(rs.get(7).unwrap(), Value::Bytes(blob));
    }
}
