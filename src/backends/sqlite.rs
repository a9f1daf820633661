//! SQLite driver
//!
//! Wraps a single rusqlite connection. rusqlite is synchronous, so every
//! statement runs on tokio's blocking pool.

use crate::core::{
    driver::Driver,
    error::{Result, ToolkitError},
    value::{DatabaseRow, DatabaseValue, QueryResult},
};
use async_trait::async_trait;
use rusqlite::{params_from_iter, Connection, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Default timeout for database operations (30 seconds)
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// SQLite driver over one connection
pub struct SqliteDriver {
    connection: Arc<Mutex<Option<Connection>>>,
}

impl SqliteDriver {
    /// Open a database file, or `:memory:` for a private in-memory database
    pub async fn open(path: &str) -> Result<Self> {
        let path = path.to_string();

        let mut task = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = Connection::open(&path)?;
            conn.execute("PRAGMA foreign_keys = ON", [])?;
            Ok(conn)
        });

        let conn = tokio::select! {
            result = &mut task => {
                result.map_err(|e| ToolkitError::other(format!("Task join error: {}", e)))??
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                return Err(ToolkitError::connection(format!(
                    "opening database timed out after {} ms",
                    DEFAULT_OPERATION_TIMEOUT.as_millis()
                )));
            }
        };

        Ok(Self {
            connection: Arc::new(Mutex::new(Some(conn))),
        })
    }

    pub async fn open_in_memory() -> Result<Self> {
        Self::open(":memory:").await
    }

    /// Whether `close` has not been called yet
    pub fn is_open(&self) -> bool {
        self.connection
            .try_lock()
            .map(|conn| conn.is_some())
            .unwrap_or(true)
    }

    /// Convert a rusqlite Row to a DatabaseRow
    fn row_to_database_row(row: &Row) -> rusqlite::Result<DatabaseRow> {
        let mut db_row = DatabaseRow::new();
        let column_count = row.as_ref().column_count();

        for i in 0..column_count {
            let column_name = row.as_ref().column_name(i)?.to_string();
            let value = match row.get_ref(i)? {
                rusqlite::types::ValueRef::Null => DatabaseValue::Null,
                rusqlite::types::ValueRef::Integer(v) => DatabaseValue::Long(v),
                rusqlite::types::ValueRef::Real(v) => DatabaseValue::Double(v),
                rusqlite::types::ValueRef::Text(v) => {
                    DatabaseValue::String(String::from_utf8_lossy(v).to_string())
                }
                rusqlite::types::ValueRef::Blob(v) => DatabaseValue::Bytes(v.to_vec()),
            };
            db_row.insert(column_name, value);
        }

        Ok(db_row)
    }

    /// Convert DatabaseValue to rusqlite parameter
    fn value_to_param(value: &DatabaseValue) -> Box<dyn rusqlite::ToSql> {
        match value {
            DatabaseValue::Null => Box::new(None::<i64>),
            DatabaseValue::Bool(v) => Box::new(*v),
            DatabaseValue::Int(v) => Box::new(*v),
            DatabaseValue::Long(v) | DatabaseValue::Timestamp(v) => Box::new(*v),
            DatabaseValue::Double(v) => Box::new(*v),
            DatabaseValue::String(v) => Box::new(v.clone()),
            DatabaseValue::Bytes(v) => Box::new(v.clone()),
        }
    }

    fn run_statement(conn: &Connection, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult> {
        let rusqlite_params: Vec<Box<dyn rusqlite::ToSql>> =
            params.iter().map(Self::value_to_param).collect();

        let mut stmt = conn.prepare(sql)?;

        // SELECT and anything with RETURNING produce columns
        if stmt.column_count() > 0 {
            let rows = stmt.query_map(
                params_from_iter(rusqlite_params.iter()),
                Self::row_to_database_row,
            )?;

            let mut results = Vec::new();
            for row_result in rows {
                results.push(row_result?);
            }
            return Ok(QueryResult::with_rows(results));
        }

        let affected = stmt.execute(params_from_iter(rusqlite_params.iter()))?;
        let is_insert = sql
            .trim_start()
            .get(..6)
            .is_some_and(|head| head.eq_ignore_ascii_case("insert"));
        let insert_id = if is_insert && affected > 0 {
            Some(conn.last_insert_rowid())
        } else {
            None
        };
        Ok(QueryResult::with_affected(affected as u64, insert_id))
    }
}

#[async_trait]
impl Driver for SqliteDriver {
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult> {
        let sql = sql.to_string();
        let params = params.to_vec();
        let connection_arc = Arc::clone(&self.connection);

        // Offload blocking database operations to blocking thread pool with timeout
        let mut task = tokio::task::spawn_blocking(move || -> Result<QueryResult> {
            let connection = connection_arc.blocking_lock();
            let conn = connection
                .as_ref()
                .ok_or_else(|| ToolkitError::connection("Not connected to database"))?;

            Self::run_statement(conn, &sql, &params)
        });

        // Use select! to abort task on timeout, preventing resource leaks
        tokio::select! {
            result = &mut task => {
                result.map_err(|e| ToolkitError::other(format!("Task join error: {}", e)))?
            }
            _ = tokio::time::sleep(DEFAULT_OPERATION_TIMEOUT) => {
                task.abort();
                Err(ToolkitError::driver(format!(
                    "query timed out after {} ms",
                    DEFAULT_OPERATION_TIMEOUT.as_millis()
                )))
            }
        }
    }

    async fn close(&self) -> Result<()> {
        let mut connection = self.connection.lock().await;
        if connection.take().is_some() {
            debug!("sqlite connection closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_sqlite_open_and_close() {
        let driver = SqliteDriver::open_in_memory().await.unwrap();
        assert!(driver.is_open());
        assert!(driver.close().await.is_ok());
        assert!(!driver.is_open());
        assert!(driver.close().await.is_ok());

        let err = driver.query("SELECT 1", &[]).await.unwrap_err();
        assert!(matches!(err, ToolkitError::Connection(_)));
    }

    #[tokio::test]
    async fn test_sqlite_modification_reports_counts() -> Result<()> {
        let driver = SqliteDriver::open_in_memory().await?;

        driver
            .query("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT)", &[])
            .await?;

        let result = driver
            .query("INSERT INTO test (name) VALUES (?)", &["Alice".into()])
            .await?;
        assert_eq!(result.affected_rows, Some(1));
        assert_eq!(result.insert_id, Some(1));
        assert!(result.rows.is_empty());

        let result = driver
            .query("INSERT INTO test (name) VALUES (?)", &["Bob".into()])
            .await?;
        assert_eq!(result.insert_id, Some(2));
        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_select_and_returning() -> Result<()> {
        let driver = SqliteDriver::open_in_memory().await?;
        driver
            .query("CREATE TABLE test (id INTEGER PRIMARY KEY, name TEXT, at INTEGER)", &[])
            .await?;
        driver
            .query(
                "INSERT INTO test (name, at) VALUES (?, ?)",
                &["Alice".into(), DatabaseValue::Timestamp(42)],
            )
            .await?;

        let result = driver
            .query("SELECT name, at FROM test WHERE id = ?", &[1.into()])
            .await?;
        assert_eq!(result.rows.len(), 1);
        assert_eq!(result.rows[0]["name"], DatabaseValue::String("Alice".into()));
        assert_eq!(result.rows[0]["at"], DatabaseValue::Long(42));

        let result = driver
            .query(
                "UPDATE test SET name = ? WHERE id = ? RETURNING name",
                &["Carol".into(), 1.into()],
            )
            .await?;
        assert_eq!(result.rows[0]["name"].as_str(), Some("Carol"));
        Ok(())
    }

    #[tokio::test]
    async fn test_sqlite_error_is_driver_error() {
        let driver = SqliteDriver::open_in_memory().await.unwrap();
        let err = driver.query("SELECT * FROM missing", &[]).await.unwrap_err();
        assert!(err.is_driver_error());
    }
}
