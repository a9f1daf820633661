//! Core toolkit types and traits
//!
//! This module provides the query model and its compiler, the driver seam, and
//! the migration and seed runners built on top of them.

pub mod context;
pub mod database;
pub mod database_types;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod migration;
pub mod query;
pub mod schema;
pub mod seed;
pub mod value;

// Re-export commonly used types
pub use context::ExecutionContext;
pub use database::Database;
pub use database_types::DialectKind;
pub use dialect::{Dialect, PlaceholderStyle};
pub use driver::Driver;
pub use error::{Result, ToolkitError};
pub use migration::{
    FnMigration, MigrateReport, Migration, MigrationSet, MigrationStatus, Migrator,
    RollbackOutcome, SqlMigration,
};
pub use query::{CompiledQuery, Condition, Operator, OrderDirection, QueryNode};
pub use schema::{ColumnDefinition, Schema, TableDefinition};
pub use seed::{FnSeed, Seed, SeedReport, SeedSet, Seeder};
pub use value::{DatabaseRow, DatabaseValue, QueryResult};
