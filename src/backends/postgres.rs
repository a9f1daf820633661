//! PostgreSQL driver
//!
//! Built on tokio-postgres. Statements are prepared first so the driver can
//! tell row-producing statements from ones that only report a count.

use crate::core::{
    driver::Driver,
    error::{Result, ToolkitError},
    value::{DatabaseRow, DatabaseValue, QueryResult},
};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio_postgres::types::{ToSql, Type};
use tokio_postgres::{Client, NoTls, Row};
use tracing::{debug, error};

/// Default timeout for database operations (30 seconds)
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(30);

/// PostgreSQL driver over one client connection
pub struct PostgresDriver {
    client: Arc<Mutex<Option<Client>>>,
}

impl PostgresDriver {
    /// Connect using a libpq-style connection string
    pub async fn connect(connection_string: &str) -> Result<Self> {
        let connect_future = tokio_postgres::connect(connection_string, NoTls);

        let (client, connection) = tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, connect_future)
            .await
            .map_err(|_| {
                ToolkitError::connection(format!(
                    "connecting timed out after {} ms",
                    DEFAULT_OPERATION_TIMEOUT.as_millis()
                ))
            })?
            .map_err(|e| ToolkitError::connection(e.to_string()))?;

        // Spawn the connection handler in the background
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("PostgreSQL connection error: {}", e);
            }
        });

        Ok(Self {
            client: Arc::new(Mutex::new(Some(client))),
        })
    }

    /// Read one cell, mapping SQL NULL and type mismatches to `Null`
    fn cell<'r, T>(row: &'r Row, idx: usize) -> Option<T>
    where
        T: tokio_postgres::types::FromSql<'r>,
    {
        row.try_get::<_, Option<T>>(idx).ok().flatten()
    }

    /// Convert a tokio_postgres Row to a DatabaseRow
    fn row_to_database_row(row: &Row) -> DatabaseRow {
        let mut db_row = DatabaseRow::new();

        for (idx, column) in row.columns().iter().enumerate() {
            let column_name = column.name().to_string();
            let value = match column.type_().name() {
                "bool" => Self::cell::<bool>(row, idx).map(DatabaseValue::Bool),
                "int2" => Self::cell::<i16>(row, idx).map(|v| DatabaseValue::Int(i32::from(v))),
                "int4" => Self::cell::<i32>(row, idx).map(DatabaseValue::Int),
                "int8" => Self::cell::<i64>(row, idx).map(DatabaseValue::Long),
                "float4" => Self::cell::<f32>(row, idx).map(|v| DatabaseValue::Double(f64::from(v))),
                "float8" => Self::cell::<f64>(row, idx).map(DatabaseValue::Double),
                "bytea" => Self::cell::<Vec<u8>>(row, idx).map(DatabaseValue::Bytes),
                "timestamptz" => Self::cell::<DateTime<Utc>>(row, idx).map(DatabaseValue::from),
                "timestamp" => Self::cell::<NaiveDateTime>(row, idx)
                    .map(|v| DatabaseValue::Timestamp(v.and_utc().timestamp_micros())),
                "json" | "jsonb" => Self::cell::<serde_json::Value>(row, idx)
                    .map(|v| DatabaseValue::String(v.to_string())),
                // text, varchar and anything else with a text representation
                _ => Self::cell::<String>(row, idx).map(DatabaseValue::String),
            };
            db_row.insert(column_name, value.unwrap_or(DatabaseValue::Null));
        }

        db_row
    }

    /// Convert DatabaseValue to postgres parameter without a target type
    fn value_to_param(value: &DatabaseValue) -> Box<dyn ToSql + Sync + Send> {
        match value {
            DatabaseValue::Null => Box::new(None::<i64>),
            DatabaseValue::Bool(v) => Box::new(*v),
            DatabaseValue::Int(v) => Box::new(*v),
            DatabaseValue::Long(v) => Box::new(*v),
            DatabaseValue::Double(v) => Box::new(*v),
            DatabaseValue::String(v) => Box::new(v.clone()),
            DatabaseValue::Bytes(v) => Box::new(v.clone()),
            DatabaseValue::Timestamp(v) => Box::new(Utc.timestamp_micros(*v).single()),
        }
    }

    /// Convert a value to the Rust type tokio-postgres expects for `ty`.
    ///
    /// tokio-postgres refuses e.g. an `i64` for an `INT4` parameter, so values
    /// are narrowed to the type the server inferred when preparing. Values that
    /// do not convert are passed through unchanged and fail with a type error.
    fn bind(value: &DatabaseValue, ty: &Type) -> Box<dyn ToSql + Sync + Send> {
        fn typed<T>(value: &DatabaseValue, converted: Option<T>) -> Box<dyn ToSql + Sync + Send>
        where
            T: ToSql + Sync + Send + 'static,
        {
            match converted {
                Some(v) => Box::new(v),
                None if value.is_null() => Box::new(None::<T>),
                None => PostgresDriver::value_to_param(value),
            }
        }

        match ty.name() {
            "bool" => typed(value, value.as_bool()),
            "int2" => typed(value, value.as_long().and_then(|v| i16::try_from(v).ok())),
            "int4" => typed(value, value.as_long().and_then(|v| i32::try_from(v).ok())),
            "int8" => typed(value, value.as_long()),
            "float4" => typed(value, value.as_double().map(|v| v as f32)),
            "float8" => typed(value, value.as_double()),
            "timestamptz" => typed(value, value.as_timestamp()),
            "timestamp" => typed(value, value.as_timestamp().map(|t| t.naive_utc())),
            "json" | "jsonb" => typed(
                value,
                value
                    .as_str()
                    .and_then(|s| serde_json::from_str::<serde_json::Value>(s).ok()),
            ),
            "text" | "varchar" | "bpchar" | "name" => typed(
                value,
                match value {
                    DatabaseValue::Null | DatabaseValue::Bytes(_) => None,
                    other => Some(other.as_string()),
                },
            ),
            _ => Self::value_to_param(value),
        }
    }

    async fn run_statement(
        client: &Client,
        sql: &str,
        params: &[DatabaseValue],
    ) -> Result<QueryResult> {
        let statement = client.prepare(sql).await?;
        if statement.params().len() != params.len() {
            return Err(ToolkitError::invalid_query(format!(
                "statement expects {} parameters, got {}",
                statement.params().len(),
                params.len()
            )));
        }

        // Convert DatabaseValue to postgres parameters and extract references
        let postgres_params: Vec<Box<dyn ToSql + Sync + Send>> = params
            .iter()
            .zip(statement.params())
            .map(|(value, ty)| Self::bind(value, ty))
            .collect();
        let param_refs: Vec<&(dyn ToSql + Sync)> = postgres_params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect();

        if statement.columns().is_empty() {
            let affected = client.execute(&statement, &param_refs).await?;
            Ok(QueryResult::with_affected(affected, None))
        } else {
            let rows = client.query(&statement, &param_refs).await?;
            Ok(QueryResult::with_rows(
                rows.iter().map(Self::row_to_database_row).collect(),
            ))
        }
    }
}

#[async_trait]
impl Driver for PostgresDriver {
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult> {
        let client = self.client.lock().await;
        let client = client
            .as_ref()
            .ok_or_else(|| ToolkitError::connection("Not connected to database"))?;

        let run = Self::run_statement(client, sql, params);

        tokio::time::timeout(DEFAULT_OPERATION_TIMEOUT, run)
            .await
            .map_err(|_| {
                ToolkitError::driver(format!(
                    "query timed out after {} ms",
                    DEFAULT_OPERATION_TIMEOUT.as_millis()
                ))
            })?
    }

    async fn close(&self) -> Result<()> {
        let mut client = self.client.lock().await;
        if client.take().is_some() {
            debug!("postgres client dropped");
        }
        Ok(())
    }
}
