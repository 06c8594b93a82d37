//! SQLite access: an async connection handle plus the fluent table wrapper.
//!
//! Rows come back as column-name → JSON maps and are converted to typed
//! models through serde.

mod error;
mod table;

use rusqlite::{params_from_iter, types::ValueRef};
use serde::de::DeserializeOwned;
use serde_json::{Map, Number, Value};
use tokio_rusqlite::Connection;

use infinity_core::query::{SqlValue, Statement};
use infinity_core::storage::{RepositoryError, Result};

pub(crate) use error::wrap_err;
use error::map_tokio_rusqlite_error;
pub use table::Table;

/// A fetched row keyed by column name.
pub type Row = Map<String, Value>;

const RAW_QUERY: &str = "query";

/// Shared handle to the SQLite database. Cloning is cheap; all clones talk
/// to the same background connection thread.
#[derive(Clone)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens (or creates) a file-based database.
    pub async fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;
        Self::configure(conn).await
    }

    /// Opens a private in-memory database. Used by tests.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| RepositoryError::ConnectionFailed(e.to_string()))?;
        Self::configure(conn).await
    }

    async fn configure(conn: Connection) -> Result<Self> {
        conn.call(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")
                .map_err(wrap_err)
        })
        .await
        .map_err(|e| map_tokio_rusqlite_error(e, RAW_QUERY))?;
        Ok(Self { conn })
    }

    /// Starts a fluent query against `name`.
    pub fn table(&self, name: &'static str) -> Table {
        Table::new(self.clone(), name)
    }

    /// Runs a raw `SELECT` with positional bindings.
    pub async fn query(&self, sql: impl Into<String>, bindings: Vec<SqlValue>) -> Result<Vec<Row>> {
        self.fetch(Statement::new(sql, bindings), RAW_QUERY).await
    }

    /// Runs a raw statement and returns the number of affected rows.
    pub async fn execute(&self, sql: impl Into<String>, bindings: Vec<SqlValue>) -> Result<usize> {
        self.run(Statement::new(sql, bindings), RAW_QUERY).await
    }

    /// Runs a script of `;`-separated statements without bindings.
    pub async fn execute_batch(&self, sql: impl Into<String>) -> Result<()> {
        let sql = sql.into();
        self.conn
            .call(move |conn| conn.execute_batch(&sql).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, RAW_QUERY))
    }

    /// Runs `f` inside `BEGIN`/`COMMIT`. Any error rolls the transaction back.
    pub async fn transaction<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&rusqlite::Transaction<'_>) -> rusqlite::Result<R> + Send + 'static,
        R: Send + 'static,
    {
        self.conn
            .call(move |conn| {
                let tx = conn.transaction().map_err(wrap_err)?;
                let value = f(&tx).map_err(wrap_err)?;
                tx.commit().map_err(wrap_err)?;
                Ok(value)
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, "transaction"))
    }

    pub async fn table_exists(&self, name: &str) -> Result<bool> {
        let rows = self
            .query(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
                vec![SqlValue::from(name)],
            )
            .await?;
        Ok(!rows.is_empty())
    }

    pub(crate) async fn fetch(&self, statement: Statement, table: &'static str) -> Result<Vec<Row>> {
        tracing::trace!(sql = %statement.sql, bindings = statement.bindings.len(), "query");
        self.conn
            .call(move |conn| fetch_rows(conn, &statement).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, table))
    }

    pub(crate) async fn run(&self, statement: Statement, table: &'static str) -> Result<usize> {
        tracing::trace!(sql = %statement.sql, bindings = statement.bindings.len(), "execute");
        self.conn
            .call(move |conn| execute_statement(conn, &statement).map_err(wrap_err))
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, table))
    }

    /// Runs an `INSERT` and returns the new row id.
    pub(crate) async fn run_insert(&self, statement: Statement, table: &'static str) -> Result<i64> {
        tracing::trace!(sql = %statement.sql, bindings = statement.bindings.len(), "insert");
        self.conn
            .call(move |conn| {
                execute_statement(conn, &statement).map_err(wrap_err)?;
                Ok(conn.last_insert_rowid())
            })
            .await
            .map_err(|e| map_tokio_rusqlite_error(e, table))
    }
}

fn to_sqlite(value: &SqlValue) -> rusqlite::types::Value {
    match value {
        SqlValue::Null => rusqlite::types::Value::Null,
        SqlValue::Integer(i) => rusqlite::types::Value::Integer(*i),
        SqlValue::Real(f) => rusqlite::types::Value::Real(*f),
        SqlValue::Text(s) => rusqlite::types::Value::Text(s.clone()),
    }
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

/// Executes a statement on a borrowed connection. Usable inside
/// [`Database::transaction`].
pub fn execute_statement(
    conn: &rusqlite::Connection,
    statement: &Statement,
) -> rusqlite::Result<usize> {
    let params: Vec<_> = statement.bindings.iter().map(to_sqlite).collect();
    conn.execute(&statement.sql, params_from_iter(params.iter()))
}

/// Fetches all rows of a statement on a borrowed connection.
pub fn fetch_rows(conn: &rusqlite::Connection, statement: &Statement) -> rusqlite::Result<Vec<Row>> {
    let params: Vec<_> = statement.bindings.iter().map(to_sqlite).collect();
    let mut stmt = conn.prepare(&statement.sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query(params_from_iter(params.iter()))?;
    let mut fetched = Vec::new();
    while let Some(row) = rows.next()? {
        let mut map = Row::new();
        for (index, name) in columns.iter().enumerate() {
            map.insert(name.clone(), to_json(row.get_ref(index)?));
        }
        fetched.push(map);
    }
    Ok(fetched)
}

/// Converts a fetched row into a typed model.
pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| RepositoryError::Serialization(e.to_string()))
}
