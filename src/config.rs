//! Toolkit configuration
//!
//! A JSON file names the dialect, the connection string, and a few runner
//! options:
//!
//! ```json
//! {
//!   "dialect": "sqlite",
//!   "database": "app.db",
//!   "migrations_table": "_migrations",
//!   "log_level": "info",
//!   "log_format": "text"
//! }
//! ```

use crate::core::database_types::DialectKind;
use crate::core::dialect::validate_identifier;
use crate::core::error::{Result, ToolkitError};
use crate::core::migration::DEFAULT_TABLE_NAME;
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Default configuration file name looked up by the CLI
pub const DEFAULT_CONFIG_FILE: &str = "worksonmydb.json";

fn default_log_level() -> String {
    "info".to_string()
}

/// Settings shared by every command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolkitConfig {
    /// SQL dialect to render for
    pub dialect: DialectKind,

    /// Connection string handed to the driver
    pub database: String,

    /// History table name; `_migrations` when absent
    #[serde(default, alias = "migrationsTable")]
    pub migrations_table: Option<String>,

    #[serde(default = "default_log_level", alias = "logLevel")]
    pub log_level: String,

    #[serde(default, alias = "logFormat")]
    pub log_format: LogFormat,
}

impl ToolkitConfig {
    pub fn new(dialect: DialectKind, database: impl Into<String>) -> Self {
        Self {
            dialect,
            database: database.into(),
            migrations_table: None,
            log_level: default_log_level(),
            log_format: LogFormat::default(),
        }
    }

    /// Read and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            ToolkitError::config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json(&text)
    }

    /// Parse and validate configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| ToolkitError::config(format!("invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.trim().is_empty() {
            return Err(ToolkitError::config("database connection string is empty"));
        }
        if let Some(table) = &self.migrations_table {
            validate_identifier(table)
                .map_err(|e| ToolkitError::config(format!("migrations_table: {}", e)))?;
        }
        Ok(())
    }

    /// History table name with the default applied
    pub fn migrations_table(&self) -> &str {
        self.migrations_table.as_deref().unwrap_or(DEFAULT_TABLE_NAME)
    }
}

/// Builder for connection strings
///
/// Provides a fluent interface for building connection strings for the
/// supported dialects.
#[derive(Debug, Clone)]
pub struct ConnectionBuilder {
    kind: DialectKind,
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    username: Option<String>,
    password: Option<String>,
    options: BTreeMap<String, String>,
}

impl ConnectionBuilder {
    pub fn new(kind: DialectKind) -> Self {
        Self {
            kind,
            host: None,
            port: None,
            database: None,
            username: None,
            password: None,
            options: BTreeMap::new(),
        }
    }

    pub fn host<S: Into<String>>(mut self, host: S) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Database name, or the file path for SQLite
    pub fn database<S: Into<String>>(mut self, database: S) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn username<S: Into<String>>(mut self, username: S) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn password<S: Into<String>>(mut self, password: S) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Add a driver-specific option
    pub fn option<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Build the connection string
    pub fn build_connection_string(&self) -> String {
        match self.kind {
            DialectKind::Sqlite => self
                .database
                .clone()
                .unwrap_or_else(|| ":memory:".to_string()),
            DialectKind::Postgres => {
                let mut parts = Vec::new();
                if let Some(host) = &self.host {
                    parts.push(format!("host={}", host));
                }
                if let Some(port) = self.port {
                    parts.push(format!("port={}", port));
                }
                if let Some(database) = &self.database {
                    parts.push(format!("dbname={}", database));
                }
                if let Some(username) = &self.username {
                    parts.push(format!("user={}", username));
                }
                if let Some(password) = &self.password {
                    parts.push(format!("password={}", password));
                }
                for (key, value) in &self.options {
                    parts.push(format!("{}={}", key, value));
                }
                parts.join(" ")
            }
            DialectKind::Mysql => {
                let host = self.host.as_deref().unwrap_or("localhost");
                let port = self.port.unwrap_or(3306);
                let database = self.database.as_deref().unwrap_or("");
                let username = self.username.as_deref().unwrap_or("root");
                let password = self.password.as_deref().unwrap_or("");
                let mut url = format!(
                    "mysql://{}:{}@{}:{}/{}",
                    username, password, host, port, database
                );
                if !self.options.is_empty() {
                    let query: Vec<String> = self
                        .options
                        .iter()
                        .map(|(key, value)| format!("{}={}", key, value))
                        .collect();
                    url.push('?');
                    url.push_str(&query.join("&"));
                }
                url
            }
        }
    }

    /// Wrap the connection string in a configuration with defaults
    pub fn into_config(self) -> ToolkitConfig {
        ToolkitConfig::new(self.kind, self.build_connection_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_json_defaults() {
        let config = ToolkitConfig::from_json(r#"{"dialect": "sqlite", "database": "app.db"}"#)
            .unwrap();
        assert_eq!(config.dialect, DialectKind::Sqlite);
        assert_eq!(config.migrations_table(), "_migrations");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::Text);
    }

    #[test]
    fn test_config_camel_case_aliases() {
        let config = ToolkitConfig::from_json(
            r#"{"dialect": "postgres", "database": "host=db", "migrationsTable": "history", "logFormat": "json"}"#,
        )
        .unwrap();
        assert_eq!(config.migrations_table(), "history");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_config_validation() {
        let err = ToolkitConfig::from_json(r#"{"dialect": "mysql", "database": " "}"#).unwrap_err();
        assert!(matches!(err, ToolkitError::Config(_)));

        let err = ToolkitConfig::from_json(r#"{"dialect": "oracle", "database": "x"}"#).unwrap_err();
        assert!(matches!(err, ToolkitError::Config(_)));

        let mut config = ToolkitConfig::new(DialectKind::Mysql, "mysql://localhost/db");
        config.migrations_table = Some("bad\0name".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = ToolkitConfig::load("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, ToolkitError::Config(_)));
    }

    #[test]
    fn test_connection_builder_sqlite() {
        let builder = ConnectionBuilder::new(DialectKind::Sqlite).database("test.db");
        assert_eq!(builder.build_connection_string(), "test.db");

        let builder = ConnectionBuilder::new(DialectKind::Sqlite);
        assert_eq!(builder.build_connection_string(), ":memory:");
    }

    #[test]
    fn test_connection_builder_postgres() {
        let conn_str = ConnectionBuilder::new(DialectKind::Postgres)
            .host("localhost")
            .port(5432)
            .database("mydb")
            .username("user")
            .password("pass")
            .build_connection_string();

        assert_eq!(
            conn_str,
            "host=localhost port=5432 dbname=mydb user=user password=pass"
        );
    }

    #[test]
    fn test_connection_builder_mysql() {
        let config = ConnectionBuilder::new(DialectKind::Mysql)
            .host("db")
            .database("app")
            .username("user")
            .password("pass")
            .option("ssl-mode", "disabled")
            .into_config();

        assert_eq!(config.database, "mysql://user:pass@db:3306/app?ssl-mode=disabled");
        assert_eq!(config.dialect, DialectKind::Mysql);
    }
}
