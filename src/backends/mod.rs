//! Driver implementations
//!
//! Each backend sits behind its cargo feature. [`connect`] opens whichever
//! one a [`DialectKind`] names.

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "mysql")]
pub mod mysql;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteDriver;

#[cfg(feature = "postgres")]
pub use postgres::PostgresDriver;

#[cfg(feature = "mysql")]
pub use mysql::MysqlDriver;

use crate::core::database_types::DialectKind;
use crate::core::driver::Driver;
use crate::core::error::{Result, ToolkitError};

/// Open a driver for `kind` using its connection string
#[allow(unused_variables)]
pub async fn connect(kind: DialectKind, connection_string: &str) -> Result<Box<dyn Driver>> {
    match kind {
        #[cfg(feature = "sqlite")]
        DialectKind::Sqlite => Ok(Box::new(SqliteDriver::open(connection_string).await?)),
        #[cfg(feature = "postgres")]
        DialectKind::Postgres => Ok(Box::new(PostgresDriver::connect(connection_string).await?)),
        #[cfg(feature = "mysql")]
        DialectKind::Mysql => Ok(Box::new(MysqlDriver::connect(connection_string)?)),
        #[allow(unreachable_patterns)]
        other => Err(ToolkitError::config(format!(
            "no driver for dialect '{}'; enable the \"{}\" feature",
            other, other
        ))),
    }
}
