//! Concrete SQL dialects
//!
//! Each dialect is a zero-sized, immutable singleton. Pick one directly or
//! resolve it from a [`DialectKind`](crate::core::DialectKind).

pub mod mysql;
pub mod postgres;
pub mod sqlite;

pub use mysql::{MysqlDialect, MYSQL};
pub use postgres::{PostgresDialect, POSTGRES};
pub use sqlite::{SqliteDialect, SQLITE};
