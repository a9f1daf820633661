//! Error types for the toolkit
//!
//! This module defines all error types that can occur while compiling queries,
//! talking to a driver, or running migrations and seeds.

/// Result type alias for toolkit operations
pub type Result<T> = std::result::Result<T, ToolkitError>;

/// Error types for toolkit operations
#[derive(Debug, thiserror::Error)]
pub enum ToolkitError {
    /// The dialect cannot render the requested node or feature
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// The query node is structurally malformed
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// A discovered unit is missing its required shape
    #[error("Malformed unit: {0}")]
    MalformedUnit(String),

    /// Two units share the same name
    #[error("Duplicate unit name: {0}")]
    DuplicateUnit(String),

    /// History names a migration that is not among the discovered units.
    ///
    /// `Migrator::rollback` reports this case as
    /// `RollbackOutcome::HistoryMismatch` without failing. The variant is for
    /// callers that want a mismatch to be fatal, see
    /// `RollbackOutcome::into_result`.
    #[error("Migration record {0} found but no matching unit present")]
    HistoryMismatch(String),

    /// Failure reported by the driver while executing a statement
    #[error("Driver error: {0}")]
    Driver(String),

    /// Connection could not be established or was lost
    #[error("Connection error: {0}")]
    Connection(String),

    /// Configuration error (invalid file, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error
    #[cfg(feature = "sqlite")]
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// PostgreSQL error
    #[cfg(feature = "postgres")]
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// MySQL error
    #[cfg(feature = "mysql")]
    #[error("MySQL error: {0}")]
    Mysql(#[from] mysql_async::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl ToolkitError {
    /// Create a new unsupported operation error
    pub fn unsupported<S: Into<String>>(msg: S) -> Self {
        ToolkitError::UnsupportedOperation(msg.into())
    }

    /// Create a new invalid query error
    pub fn invalid_query<S: Into<String>>(msg: S) -> Self {
        ToolkitError::InvalidQuery(msg.into())
    }

    /// Create a new malformed unit error
    pub fn malformed_unit<S: Into<String>>(msg: S) -> Self {
        ToolkitError::MalformedUnit(msg.into())
    }

    /// Create a new duplicate unit error
    pub fn duplicate_unit<S: Into<String>>(name: S) -> Self {
        ToolkitError::DuplicateUnit(name.into())
    }

    /// Create a new driver error
    pub fn driver<S: Into<String>>(msg: S) -> Self {
        ToolkitError::Driver(msg.into())
    }

    /// Create a new connection error
    pub fn connection<S: Into<String>>(msg: S) -> Self {
        ToolkitError::Connection(msg.into())
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        ToolkitError::Config(msg.into())
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        ToolkitError::Other(msg.into())
    }

    /// Whether the error originated in the driver layer
    pub fn is_driver_error(&self) -> bool {
        match self {
            ToolkitError::Driver(_) | ToolkitError::Connection(_) => true,
            #[cfg(feature = "sqlite")]
            ToolkitError::Sqlite(_) => true,
            #[cfg(feature = "postgres")]
            ToolkitError::Postgres(_) => true,
            #[cfg(feature = "mysql")]
            ToolkitError::Mysql(_) => true,
            _ => false,
        }
    }
}
