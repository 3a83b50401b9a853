//! The in-memory `PreparedStatement`: parses its SQL once at `prepare`
//! time and replays it against the owning connection's visible table set
//! on each `execute*` call.

use std::collections::HashMap;
use std::sync::Arc;

use cpp_dbc_driver::{DynResultSet, PreparedStatement, ResultSet};
use cpp_dbc_error::DbError;
use cpp_dbc_types::Value;

use crate::connection::ConnectionState;
use crate::result_set::MemoryResultSet;
use crate::sql::{Command, InsertValues, SelectColumns};

pub struct MemoryStatement {
    state: Arc<ConnectionState>,
    command: Command,
    bound: HashMap<usize, Value>,
}

impl MemoryStatement {
    pub(crate) fn new(state: Arc<ConnectionState>, command: Command) -> Self {
        Self {
            state,
            command,
            bound: HashMap::new(),
        }
    }

    fn column_count(&self) -> Result<usize, DbError> {
        match &self.command {
            Command::Insert { columns, .. } => Ok(columns.len()),
            other => Err(DbError::InvalidParameter(format!(
                "statement does not accept bound parameters: {other:?}"
            ))),
        }
    }
}

impl PreparedStatement for MemoryStatement {
    fn bind(&mut self, index: usize, value: Value) -> Result<(), DbError> {
        self.state.check_open()?;
        let count = self.column_count()?;
        if index == 0 || index > count {
            return Err(DbError::InvalidParameter(format!(
                "placeholder index {index} out of range (1..={count})"
            )));
        }
        self.bound.insert(index, value);
        Ok(())
    }

    async fn execute_query(&mut self) -> Result<Box<dyn DynResultSet>, DbError> {
        self.state.check_open()?;
        match &self.command {
            Command::Select { table, columns } => {
                let (names, rows) = self.state.select(table, columns)?;
                Ok(Box::new(MemoryResultSet::new(names, rows)))
            }
            other => Err(DbError::InvalidParameter(format!(
                "statement does not produce a result set: {other:?}"
            ))),
        }
    }

    async fn execute_update(&mut self) -> Result<u64, DbError> {
        self.state.check_open()?;
        match &self.command {
            Command::Insert {
                table,
                columns,
                values,
            } => {
                let row = match values {
                    InsertValues::Placeholders(count) => (1..=*count)
                        .map(|i| self.bound.get(&i).cloned().unwrap_or(Value::Null))
                        .collect(),
                    InsertValues::Literal(values) => values.clone(),
                };
                self.state.insert(table, columns, row)?;
                Ok(1)
            }
            Command::Delete { table } => self.state.delete(table),
            Command::CreateTable { table, columns } => {
                self.state.create_table(table, columns.clone());
                Ok(0)
            }
            other => Err(DbError::InvalidParameter(format!(
                "statement does not affect rows: {other:?}"
            ))),
        }
    }

    async fn execute(&mut self) -> Result<bool, DbError> {
        match &self.command {
            Command::Select { .. } => {
                PreparedStatement::execute_query(self).await?;
                Ok(true)
            }
            _ => {
                PreparedStatement::execute_update(self).await?;
                Ok(false)
            }
        }
    }
}
