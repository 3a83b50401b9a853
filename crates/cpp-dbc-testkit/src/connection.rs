//! The in-memory reference `Connection`: a toy relational backend good
//! enough to exercise the pool's borrow/return/validate cycle and the
//! transaction manager's commit/rollback visibility rules without a real
//! database.
//!
//! Every connection opened against the same URL shares one
//! [`Backend`](crate::engine::Backend) (committed state). A connection
//! with an open transaction keeps its writes in a private overlay and
//! only merges them into the backend on commit, so other connections
//! never observe uncommitted rows — and a rollback simply discards the
//! overlay.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpp_dbc_driver::{Connection, DynPreparedStatement, DynResultSet};
use cpp_dbc_error::DbError;
use cpp_dbc_types::{IsolationLevel, Value};
use parking_lot::Mutex;

use crate::engine::{Backend, Table, Tables};
use crate::result_set::MemoryResultSet;
use crate::sql::{self, Command, SelectColumns};
use crate::statement::MemoryStatement;

/// Shared, interior-mutable state for one connection, split out from
/// [`MemoryConnection`] so [`MemoryStatement`] can hold a reference to it
/// without borrowing the connection itself (statements outlive the
/// `prepare_statement` call that created them).
pub(crate) struct ConnectionState {
    backend: Arc<Backend>,
    pending: Mutex<Option<Tables>>,
    autocommit: AtomicBool,
    isolation: Mutex<IsolationLevel>,
    closed: AtomicBool,
}

impl ConnectionState {
    pub(crate) fn new(backend: Arc<Backend>) -> Self {
        Self {
            backend,
            pending: Mutex::new(None),
            autocommit: AtomicBool::new(true),
            isolation: Mutex::new(IsolationLevel::ReadCommitted),
            closed: AtomicBool::new(false),
        }
    }

    pub(crate) fn check_open(&self) -> Result<(), DbError> {
        if self.closed.load(Ordering::Acquire) {
            Err(DbError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn with_tables<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut pending = self.pending.lock();
        if let Some(tables) = pending.as_mut() {
            f(tables)
        } else {
            let mut tables = self.backend.tables.lock();
            f(&mut tables)
        }
    }

    pub(crate) fn create_table(&self, table: &str, columns: Vec<String>) {
        self.with_tables(|tables| {
            tables.entry(table.to_owned()).or_insert_with(|| Table {
                columns,
                rows: Vec::new(),
            });
        });
    }

    pub(crate) fn insert(
        &self,
        table: &str,
        columns: &[String],
        values: Vec<Value>,
    ) -> Result<(), DbError> {
        if columns.len() != values.len() {
            return Err(DbError::InvalidParameter(format!(
                "insert into {table}: {} columns but {} values",
                columns.len(),
                values.len()
            )));
        }
        self.with_tables(|tables| {
            let entry = tables.entry(table.to_owned()).or_insert_with(|| Table {
                columns: columns.to_vec(),
                rows: Vec::new(),
            });
            let mut row = vec![Value::Null; entry.columns.len()];
            for (col, value) in columns.iter().zip(values) {
                match entry.column_index(col) {
                    Some(idx) => row[idx] = value,
                    None => {
                        entry.columns.push(col.clone());
                        row.push(value);
                    }
                }
            }
            entry.rows.push(row);
        });
        Ok(())
    }

    pub(crate) fn delete(&self, table: &str) -> Result<u64, DbError> {
        Ok(self.with_tables(|tables| match tables.get_mut(table) {
            Some(t) => {
                let n = t.rows.len() as u64;
                t.rows.clear();
                n
            }
            None => 0,
        }))
    }

    pub(crate) fn select(
        &self,
        table: &str,
        columns: &SelectColumns,
    ) -> Result<(Vec<String>, Vec<Vec<Value>>), DbError> {
        self.with_tables(|tables| {
            let Some(t) = tables.get(table) else {
                return Ok((Vec::new(), Vec::new()));
            };
            match columns {
                SelectColumns::Star => Ok((t.columns.clone(), t.rows.clone())),
                SelectColumns::Named(names) => {
                    let indices: Vec<usize> = names
                        .iter()
                        .map(|n| {
                            t.column_index(n).ok_or_else(|| {
                                DbError::InvalidParameter(format!(
                                    "unknown column `{n}` on table `{table}`"
                                ))
                            })
                        })
                        .collect::<Result<_, _>>()?;
                    let rows = t
                        .rows
                        .iter()
                        .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
                        .collect();
                    Ok((names.clone(), rows))
                }
            }
        })
    }

    fn begin_transaction(&self) -> bool {
        let mut pending = self.pending.lock();
        if pending.is_some() {
            return false;
        }
        *pending = Some(self.backend.tables.lock().clone());
        self.autocommit.store(false, Ordering::Release);
        true
    }

    fn commit(&self) {
        if let Some(tables) = self.pending.lock().take() {
            *self.backend.tables.lock() = tables;
        }
        self.autocommit.store(true, Ordering::Release);
    }

    fn rollback(&self) {
        *self.pending.lock() = None;
        self.autocommit.store(true, Ordering::Release);
    }
}

/// An in-memory connection. See the module docs for what it actually
/// simulates.
pub struct MemoryConnection {
    state: Arc<ConnectionState>,
    url: String,
}

impl MemoryConnection {
    pub(crate) fn new(url: impl Into<String>, backend: Arc<Backend>) -> Self {
        Self {
            state: Arc::new(ConnectionState::new(backend)),
            url: url.into(),
        }
    }

    fn dispatch_update(&self, command: Command) -> Result<u64, DbError> {
        match command {
            Command::CreateTable { table, columns } => {
                self.state.create_table(&table, columns);
                Ok(0)
            }
            Command::Insert {
                table,
                columns,
                values,
            } => {
                let values = match values {
                    sql::InsertValues::Literal(v) => v,
                    sql::InsertValues::Placeholders(_) => {
                        return Err(DbError::InvalidParameter(
                            "unbound placeholders; use prepare_statement".to_owned(),
                        ));
                    }
                };
                self.state.insert(&table, &columns, values)?;
                Ok(1)
            }
            Command::Delete { table } => self.state.delete(&table),
            other => Err(DbError::InvalidParameter(format!(
                "not an update statement: {other:?}"
            ))),
        }
    }
}

impl Connection for MemoryConnection {
    async fn execute_update(&self, sql: &str) -> Result<u64, DbError> {
        self.state.check_open()?;
        let command = sql::parse(sql)?;
        self.dispatch_update(command)
    }

    async fn execute_query(&self, sql: &str) -> Result<Box<dyn DynResultSet>, DbError> {
        self.state.check_open()?;
        match sql::parse(sql)? {
            Command::Ping => Ok(Box::new(MemoryResultSet::new(
                vec!["?column?".to_owned()],
                vec![vec![Value::Integer(1)]],
            ))),
            Command::Select { table, columns } => {
                let (names, rows) = self.state.select(&table, &columns)?;
                Ok(Box::new(MemoryResultSet::new(names, rows)))
            }
            other => Err(DbError::InvalidParameter(format!(
                "not a query statement: {other:?}"
            ))),
        }
    }

    async fn prepare_statement(&self, sql: &str) -> Result<Box<dyn DynPreparedStatement>, DbError> {
        self.state.check_open()?;
        let command = sql::parse(sql)?;
        Ok(Box::new(MemoryStatement::new(self.state.clone(), command)))
    }

    fn set_auto_commit(&self, flag: bool) -> Result<(), DbError> {
        self.state.check_open()?;
        self.state.autocommit.store(flag, Ordering::Release);
        Ok(())
    }

    fn auto_commit(&self) -> Result<bool, DbError> {
        self.state.check_open()?;
        Ok(self.state.autocommit.load(Ordering::Acquire))
    }

    async fn begin_transaction(&self) -> Result<bool, DbError> {
        self.state.check_open()?;
        Ok(self.state.begin_transaction())
    }

    async fn commit(&self) -> Result<(), DbError> {
        self.state.check_open()?;
        self.state.commit();
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DbError> {
        self.state.check_open()?;
        self.state.rollback();
        Ok(())
    }

    fn transaction_active(&self) -> Result<bool, DbError> {
        self.state.check_open()?;
        Ok(self.state.pending.lock().is_some())
    }

    async fn set_transaction_isolation(&self, level: IsolationLevel) -> Result<(), DbError> {
        self.state.check_open()?;
        *self.state.isolation.lock() = level;
        Ok(())
    }

    fn transaction_isolation(&self) -> Result<IsolationLevel, DbError> {
        self.state.check_open()?;
        Ok(*self.state.isolation.lock())
    }

    async fn close(&self) -> Result<(), DbError> {
        self.state.closed.store(true, Ordering::Release);
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backend_for;

    fn conn(url: &str) -> MemoryConnection {
        MemoryConnection::new(url, backend_for(url))
    }

    #[tokio::test]
    async fn validation_query_succeeds_until_closed() {
        let c = conn("cpp_dbc:memory://validation");
        let mut rs = c.execute_query("SELECT 1").await.unwrap();
        assert!(rs.next().await.unwrap());
        assert_eq!(rs.get(1).unwrap(), Value::Integer(1));

        c.close().await.unwrap();
        assert!(c.execute_query("SELECT 1").await.is_err());
    }

    #[tokio::test]
    async fn insert_then_select_round_trips() {
        let c = conn("cpp_dbc:memory://round-trip");
        let mut stmt = c
            .prepare_statement("INSERT INTO accounts (id, name) VALUES (?, ?)")
            .await
            .unwrap();
        stmt.bind(1, Value::Integer(1)).unwrap();
        stmt.bind(2, Value::String("ada".into())).unwrap();
        assert_eq!(stmt.execute_update().await.unwrap(), 1);

        let mut rs = c.execute_query("SELECT id, name FROM accounts").await.unwrap();
        assert!(rs.next().await.unwrap());
        assert_eq!(rs.get_named("name").unwrap(), Value::String("ada".into()));
    }

    #[tokio::test]
    async fn round_trips_every_scalar_type() {
        use chrono::{NaiveDate, NaiveTime};

        let c = conn("cpp_dbc:memory://scalar-round-trip");
        c.execute_update("CREATE TABLE scalars (flag, n, big, amount, label, bin, d, t, ts)")
            .await
            .unwrap();
        let mut stmt = c
            .prepare_statement(
                "INSERT INTO scalars (flag, n, big, amount, label, bin, d, t, ts) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .await
            .unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 7, 30).unwrap();
        let time = NaiveTime::from_hms_opt(12, 30, 0).unwrap();
        let ts = date.and_time(time);

        stmt.bind(1, Value::Boolean(true)).unwrap();
        stmt.bind(2, Value::Integer(42)).unwrap();
        stmt.bind(3, Value::Long(9_000_000_000)).unwrap();
        stmt.bind(4, Value::Double(3.5)).unwrap();
        stmt.bind(5, Value::String("ada".into())).unwrap();
        stmt.bind(6, Value::Bytes(vec![1, 2, 3])).unwrap();
        stmt.bind(7, Value::Date(date)).unwrap();
        stmt.bind(8, Value::Time(time)).unwrap();
        stmt.bind(9, Value::Timestamp(ts)).unwrap();
        assert_eq!(stmt.execute_update().await.unwrap(), 1);

        let mut rs = c.execute_query("SELECT * FROM scalars").await.unwrap();
        assert!(rs.next().await.unwrap());
        assert_eq!(rs.get(1).unwrap(), Value::Boolean(true));
        assert_eq!(rs.get(2).unwrap(), Value::Integer(42));
        assert_eq!(rs.get(3).unwrap(), Value::Long(9_000_000_000));
        assert_eq!(rs.get(4).unwrap(), Value::Double(3.5));
        assert_eq!(rs.get(5).unwrap(), Value::String("ada".into()));
        assert_eq!(rs.get(6).unwrap(), Value::Bytes(vec![1, 2, 3]));
        assert_eq!(rs.get(7).unwrap(), Value::Date(date));
        assert_eq!(rs.get(8).unwrap(), Value::Time(time));
        assert_eq!(rs.get(9).unwrap(), Value::Timestamp(ts));
    }

    #[tokio::test]
    async fn null_column_reads_as_null_with_zero_value_getters() {
        let c = conn("cpp_dbc:memory://null-round-trip");
        c.execute_update("CREATE TABLE accounts (id, name)")
            .await
            .unwrap();
        let mut stmt = c
            .prepare_statement("INSERT INTO accounts (id, name) VALUES (?, ?)")
            .await
            .unwrap();
        stmt.bind(1, Value::Integer(1)).unwrap();
        // `name` is left unbound, so it defaults to `Value::Null`.
        assert_eq!(stmt.execute_update().await.unwrap(), 1);

        let mut rs = c
            .execute_query("SELECT id, name FROM accounts")
            .await
            .unwrap();
        assert!(rs.next().await.unwrap());
        assert!(rs.is_null(2).unwrap());
        let name = rs.get_named("name").unwrap();
        assert_eq!(name.as_str(), "");
        assert_eq!(name.as_i32(), 0);
    }

    #[tokio::test]
    async fn rollback_discards_writes_commit_keeps_them() {
        let url = "cpp_dbc:memory://txn-visibility";
        let backend = backend_for(url);
        let c1 = MemoryConnection::new(url, backend.clone());

        assert!(c1.begin_transaction().await.unwrap());
        c1.execute_update("INSERT INTO t (a) VALUES (1)")
            .await
            .unwrap();
        c1.rollback().await.unwrap();

        let c2 = MemoryConnection::new(url, backend.clone());
        let mut rs = c2.execute_query("SELECT * FROM t").await.unwrap();
        assert!(!rs.next().await.unwrap());

        assert!(c1.begin_transaction().await.unwrap());
        c1.execute_update("INSERT INTO t (a) VALUES (1)")
            .await
            .unwrap();
        c1.commit().await.unwrap();

        let mut rs = c2.execute_query("SELECT * FROM t").await.unwrap();
        assert!(rs.next().await.unwrap());
    }

    #[tokio::test]
    async fn writes_inside_a_transaction_are_invisible_to_other_connections() {
        let url = "cpp_dbc:memory://txn-isolation";
        let backend = backend_for(url);
        let c1 = MemoryConnection::new(url, backend.clone());
        let c2 = MemoryConnection::new(url, backend.clone());

        c1.begin_transaction().await.unwrap();
        c1.execute_update("INSERT INTO t (a) VALUES (1)")
            .await
            .unwrap();

        let mut rs = c2.execute_query("SELECT * FROM t").await.unwrap();
        assert!(!rs.next().await.unwrap());
    }
}
