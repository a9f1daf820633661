//! Dialect kinds
//!
//! Names the SQL flavours the toolkit can target, for configuration files and
//! the command line.

use super::dialect::Dialect;
use crate::dialects::{MYSQL, POSTGRES, SQLITE};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported SQL dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum DialectKind {
    /// MySQL/MariaDB
    #[default]
    Mysql,
    /// PostgreSQL
    Postgres,
    /// SQLite
    Sqlite,
}

impl DialectKind {
    /// Convert the kind to its string representation
    pub fn to_str(&self) -> &'static str {
        match self {
            DialectKind::Mysql => "mysql",
            DialectKind::Postgres => "postgres",
            DialectKind::Sqlite => "sqlite",
        }
    }

    /// The singleton dialect for this kind
    pub fn dialect(&self) -> &'static dyn Dialect {
        match self {
            DialectKind::Mysql => &MYSQL,
            DialectKind::Postgres => &POSTGRES,
            DialectKind::Sqlite => &SQLITE,
        }
    }

    /// Whether a driver for this kind was compiled in
    pub fn has_backend(&self) -> bool {
        match self {
            DialectKind::Mysql => cfg!(feature = "mysql"),
            DialectKind::Postgres => cfg!(feature = "postgres"),
            DialectKind::Sqlite => cfg!(feature = "sqlite"),
        }
    }
}

impl std::fmt::Display for DialectKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

impl FromStr for DialectKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(DialectKind::Mysql),
            "postgres" | "postgresql" | "pg" => Ok(DialectKind::Postgres),
            "sqlite" | "sqlite3" => Ok(DialectKind::Sqlite),
            _ => Err(format!("Invalid dialect: '{}'", s)),
        }
    }
}
