//! The in-memory `ResultSet` implementation: rows are materialized eagerly
//! (the backend is a `Vec<Vec<Value>>` already), so `next` never performs
//! I/O — a simplification real drivers, which fetch lazily, do not share.

use cpp_dbc_error::DbError;
use cpp_dbc_types::Value;

use cpp_dbc_driver::ResultSet;

pub struct MemoryResultSet {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
    cursor: isize,
    closed: bool,
}

impl MemoryResultSet {
    pub(crate) fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns,
            rows,
            cursor: -1,
            closed: false,
        }
    }

    fn current_row(&self) -> Result<&Vec<Value>, DbError> {
        if self.closed {
            return Err(DbError::ConnectionClosed);
        }
        if self.cursor < 0 || self.cursor as usize >= self.rows.len() {
            return Err(DbError::InvalidParameter(
                "no current row: call next() first".to_owned(),
            ));
        }
        Ok(&self.rows[self.cursor as usize])
    }
}

impl ResultSet for MemoryResultSet {
    async fn next(&mut self) -> Result<bool, DbError> {
        if self.closed {
            return Err(DbError::ConnectionClosed);
        }
        if (self.cursor as usize) < self.rows.len() || self.cursor < 0 {
            self.cursor += 1;
        }
        Ok((self.cursor as usize) < self.rows.len())
    }

    fn is_before_first(&self) -> bool {
        self.cursor < 0
    }

    fn is_after_last(&self) -> bool {
        self.cursor >= 0 && self.cursor as usize >= self.rows.len()
    }

    fn row_number(&self) -> u64 {
        if self.cursor < 0 {
            0
        } else {
            self.cursor as u64 + 1
        }
    }

    fn get(&self, index: usize) -> Result<Value, DbError> {
        let row = self.current_row()?;
        row.get(index.wrapping_sub(1))
            .cloned()
            .ok_or_else(|| DbError::InvalidParameter(format!("column index {index} out of range")))
    }

    fn get_named(&self, name: &str) -> Result<Value, DbError> {
        let index = self.column_index(name)?;
        self.get(index)
    }

    fn is_null(&self, index: usize) -> Result<bool, DbError> {
        Ok(self.get(index)?.is_null())
    }

    fn column_names(&self) -> &[String] {
        &self.columns
    }

    fn column_count(&self) -> usize {
        self.columns.len()
    }

    async fn close(&mut self) -> Result<(), DbError> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cursor_starts_before_first_and_advances() {
        let mut rs = MemoryResultSet::new(
            vec!["id".into()],
            vec![vec![Value::Integer(1)], vec![Value::Integer(2)]],
        );
        assert!(rs.is_before_first());
        assert!(rs.next().await.unwrap());
        assert_eq!(rs.get(1).unwrap(), Value::Integer(1));
        assert_eq!(rs.row_number(), 1);
        assert!(rs.next().await.unwrap());
        assert_eq!(rs.get(1).unwrap(), Value::Integer(2));
        assert!(!rs.next().await.unwrap());
        assert!(rs.is_after_last());
        assert!(!rs.next().await.unwrap());
    }

    #[tokio::test]
    async fn get_named_resolves_by_column_name() {
        let mut rs = MemoryResultSet::new(
            vec!["id".into(), "name".into()],
            vec![vec![Value::Integer(1), Value::String("ada".into())]],
        );
        rs.next().await.unwrap();
        assert_eq!(rs.get_named("name").unwrap(), Value::String("ada".into()));
    }
}
