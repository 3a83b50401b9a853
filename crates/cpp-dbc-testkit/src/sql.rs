//! A minimal statement parser covering exactly the handful of forms the
//! in-memory backend needs to stand in for a real relational driver:
//! connectivity probes, table creation, inserts (literal or placeholder),
//! selects, and deletes. This is not a SQL parser — no joins, no `WHERE`,
//! no expressions — just enough structure for this workspace's own tests
//! to drive a pool and a transaction manager against something real.

use cpp_dbc_error::DbError;
use cpp_dbc_types::Value;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SelectColumns {
    Star,
    Named(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum InsertValues {
    /// `?`-placeholders, bound later through `PreparedStatement::bind`.
    Placeholders(usize),
    /// Literal values parsed straight out of the statement text.
    Literal(Vec<Value>),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Command {
    /// `SELECT 1` / `PING` — a connectivity probe.
    Ping,
    CreateTable {
        table: String,
        columns: Vec<String>,
    },
    Insert {
        table: String,
        columns: Vec<String>,
        values: InsertValues,
    },
    Select {
        table: String,
        columns: SelectColumns,
    },
    Delete {
        table: String,
    },
}

pub(crate) fn parse(sql: &str) -> Result<Command, DbError> {
    let trimmed = sql.trim().trim_end_matches(';').trim();
    let upper = trimmed.to_ascii_uppercase();
    if upper == "SELECT 1" || upper == "PING" {
        return Ok(Command::Ping);
    }
    if let Some(rest) = strip_keyword(trimmed, "CREATE TABLE") {
        return parse_create_table(rest);
    }
    if let Some(rest) = strip_keyword(trimmed, "INSERT INTO") {
        return parse_insert(rest);
    }
    if let Some(rest) = strip_keyword(trimmed, "DELETE FROM") {
        return Ok(Command::Delete {
            table: rest.trim().to_owned(),
        });
    }
    if let Some(rest) = strip_keyword(trimmed, "SELECT") {
        return parse_select(rest);
    }
    Err(DbError::DriverError {
        code: None,
        message: format!("unsupported statement: {sql}"),
    })
}

fn strip_keyword<'a>(sql: &'a str, keyword: &str) -> Option<&'a str> {
    let sql = sql.trim_start();
    if sql.len() >= keyword.len() && sql[..keyword.len()].eq_ignore_ascii_case(keyword) {
        Some(&sql[keyword.len()..])
    } else {
        None
    }
}

fn split_ident_and_parens(rest: &str) -> Result<(String, String), DbError> {
    let open = rest
        .find('(')
        .ok_or_else(|| malformed("expected `(` after table name"))?;
    let close = rest
        .rfind(')')
        .ok_or_else(|| malformed("expected closing `)`"))?;
    let ident = rest[..open].trim().to_owned();
    let inner = rest[open + 1..close].to_owned();
    Ok((ident, inner))
}

fn malformed(message: &str) -> DbError {
    DbError::DriverError {
        code: None,
        message: message.to_owned(),
    }
}

fn split_columns(inner: &str) -> Vec<String> {
    inner
        .split(',')
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(|c| {
            // `CREATE TABLE` lists carry a type after the column name
            // (`id INTEGER`); we only track the name.
            c.split_whitespace().next().unwrap_or(c).to_owned()
        })
        .collect()
}

fn parse_create_table(rest: &str) -> Result<Command, DbError> {
    let (table, inner) = split_ident_and_parens(rest)?;
    Ok(Command::CreateTable {
        table,
        columns: split_columns(&inner),
    })
}

fn parse_insert(rest: &str) -> Result<Command, DbError> {
    let (table, columns_part) = split_ident_and_parens(rest)?;
    let columns: Vec<String> = columns_part
        .split(',')
        .map(|c| c.trim().to_owned())
        .filter(|c| !c.is_empty())
        .collect();

    let values_rest = strip_keyword(&rest[rest.find(')').map(|i| i + 1).unwrap_or(0)..], "VALUES")
        .ok_or_else(|| malformed("expected VALUES after column list"))?;
    let open = values_rest
        .find('(')
        .ok_or_else(|| malformed("expected `(` after VALUES"))?;
    let close = values_rest
        .rfind(')')
        .ok_or_else(|| malformed("expected closing `)` after VALUES"))?;
    let values_inner = &values_rest[open + 1..close];

    let tokens: Vec<&str> = values_inner
        .split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect();

    let values = if tokens.iter().all(|t| *t == "?") {
        InsertValues::Placeholders(tokens.len())
    } else {
        InsertValues::Literal(tokens.iter().map(|t| parse_literal(t)).collect())
    };

    Ok(Command::Insert {
        table,
        columns,
        values,
    })
}

fn parse_literal(token: &str) -> Value {
    let token = token.trim();
    if token.eq_ignore_ascii_case("null") {
        return Value::Null;
    }
    if token.eq_ignore_ascii_case("true") {
        return Value::Boolean(true);
    }
    if token.eq_ignore_ascii_case("false") {
        return Value::Boolean(false);
    }
    if let Some(quoted) = token
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
    {
        return Value::String(quoted.to_owned());
    }
    if let Ok(i) = token.parse::<i32>() {
        return Value::Integer(i);
    }
    if let Ok(l) = token.parse::<i64>() {
        return Value::Long(l);
    }
    if let Ok(d) = token.parse::<f64>() {
        return Value::Double(d);
    }
    Value::String(token.to_owned())
}

fn parse_select(rest: &str) -> Result<Command, DbError> {
    let upper = rest.to_ascii_uppercase();
    let from_at = upper
        .find("FROM")
        .ok_or_else(|| malformed("expected FROM in SELECT"))?;
    let columns_part = rest[..from_at].trim();
    let table = rest[from_at + "FROM".len()..].trim().to_owned();

    let columns = if columns_part == "*" {
        SelectColumns::Star
    } else {
        SelectColumns::Named(
            columns_part
                .split(',')
                .map(|c| c.trim().to_owned())
                .filter(|c| !c.is_empty())
                .collect(),
        )
    };

    Ok(Command::Select { table, columns })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_validation_probes() {
        assert_eq!(parse("SELECT 1").unwrap(), Command::Ping);
        assert_eq!(parse("ping").unwrap(), Command::Ping);
    }

    #[test]
    fn parses_create_table() {
        let cmd = parse("CREATE TABLE accounts (id INTEGER, name TEXT)").unwrap();
        assert_eq!(
            cmd,
            Command::CreateTable {
                table: "accounts".into(),
                columns: vec!["id".into(), "name".into()],
            }
        );
    }

    #[test]
    fn parses_insert_with_placeholders() {
        let cmd = parse("INSERT INTO accounts (id, name) VALUES (?, ?)").unwrap();
        assert_eq!(
            cmd,
            Command::Insert {
                table: "accounts".into(),
                columns: vec!["id".into(), "name".into()],
                values: InsertValues::Placeholders(2),
            }
        );
    }

    #[test]
    fn parses_insert_with_literals() {
        let cmd = parse("INSERT INTO accounts (id, name) VALUES (1, 'ada')").unwrap();
        assert_eq!(
            cmd,
            Command::Insert {
                table: "accounts".into(),
                columns: vec!["id".into(), "name".into()],
                values: InsertValues::Literal(vec![
                    Value::Integer(1),
                    Value::String("ada".into())
                ]),
            }
        );
    }

    #[test]
    fn parses_select_star_and_named() {
        assert_eq!(
            parse("SELECT * FROM accounts").unwrap(),
            Command::Select {
                table: "accounts".into(),
                columns: SelectColumns::Star,
            }
        );
        assert_eq!(
            parse("SELECT id, name FROM accounts").unwrap(),
            Command::Select {
                table: "accounts".into(),
                columns: SelectColumns::Named(vec!["id".into(), "name".into()]),
            }
        );
    }

    #[test]
    fn parses_delete() {
        assert_eq!(
            parse("DELETE FROM accounts").unwrap(),
            Command::Delete {
                table: "accounts".into()
            }
        );
    }

    #[test]
    fn rejects_unsupported_statement() {
        assert!(parse("ALTER TABLE accounts ADD COLUMN x").is_err());
    }
}
