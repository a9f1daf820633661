//! # WorksOnMyDB
//!
//! A small database toolkit: a dialect-aware compiler that turns data-only
//! query descriptions into parameterized SQL, plus an ordered,
//! history-tracked migration runner and a seed runner that execute against a
//! pluggable driver.
//!
//! ## Features
//!
//! - **Query compilation**: SELECT/INSERT/UPDATE/DELETE nodes render to SQL
//!   text with a positional parameter list. Identifiers are always quoted by
//!   the dialect; values never appear in SQL text.
//! - **Dialects**: MySQL (backticks, `?`), PostgreSQL (double quotes, `$n`,
//!   `RETURNING`) and SQLite (double quotes, `?`, `RETURNING`).
//! - **Migrations**: named `up`/`down` units applied in name order and recorded
//!   in a history table (`_migrations` by default). Rollback reverts exactly one
//!   unit, the most recently applied.
//! - **Seeds**: named data-population units, run in name order on every
//!   invocation.
//! - **Schema model**: describe tables once, render `CREATE TABLE` for any
//!   dialect.
//!
//! ## Supported Databases
//!
//! | Database | Feature | Driver |
//! |----------|---------|--------|
//! | SQLite | `sqlite` (default) | rusqlite, bundled |
//! | PostgreSQL | `postgres` | tokio-postgres |
//! | MySQL | `mysql` | mysql_async pool |
//!
//! ## Quick Start
//!
//! ```rust
//! use worksonmydb::prelude::*;
//!
//! let node = QueryNode::select("users")
//!     .columns(&["id", "email"])
//!     .filter(Condition::in_list("role", vec!["admin", "owner"]))
//!     .order_by_desc("created_at")
//!     .limit(10)
//!     .build();
//!
//! let compiled = MYSQL.compile(&node)?;
//! assert_eq!(
//!     compiled.sql,
//!     "SELECT `id`, `email` FROM `users` WHERE `role` IN (?, ?) ORDER BY `created_at` DESC LIMIT 10"
//! );
//! assert_eq!(compiled.params.len(), 2);
//! # Ok::<(), ToolkitError>(())
//! ```
//!
//! ### Running migrations
//!
//! ```rust,no_run
//! use worksonmydb::prelude::*;
//! use worksonmydb::core::migration;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let driver = SqliteDriver::open("app.db").await?;
//!     let set = MigrationSet::new(vec![Box::new(SqlMigration::new(
//!         "001_users",
//!         "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT NOT NULL)",
//!         "DROP TABLE users",
//!     ))])?;
//!
//!     let report = migration::migrate(&driver, &SQLITE, &set).await?;
//!     for name in report.applied {
//!         println!("applied {}", name);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Project Structure
//!
//! ```text
//! src/
//! ├── core/               # Query model, compiler, runners
//! │   ├── query.rs        # Query nodes and builders
//! │   ├── dialect.rs      # Dialect trait and shared compiler
//! │   ├── schema.rs       # Schema model and DDL rendering
//! │   ├── migration.rs    # Migration units, history, migrate/rollback
//! │   └── seed.rs         # Seed units and runner
//! ├── dialects/           # MYSQL, POSTGRES, SQLITE
//! ├── backends/           # Drivers behind cargo features
//! ├── config.rs           # JSON configuration
//! ├── logging.rs          # tracing-subscriber setup
//! ├── cli.rs              # clap command surface
//! └── lib.rs
//! ```

/// Core toolkit types and traits
pub mod core;

/// Concrete SQL dialects
pub mod dialects;

/// Driver implementations
pub mod backends;

/// Command-line front end
pub mod cli;

/// Configuration loading
pub mod config;

/// Logging setup
pub mod logging;

/// Prelude for convenient imports
///
/// ```rust
/// use worksonmydb::prelude::*;
///
/// let compiled = POSTGRES.compile(&QueryNode::delete("users").where_eq("id", 1).build())?;
/// assert_eq!(compiled.sql, "DELETE FROM \"users\" WHERE \"id\" = $1");
/// # Ok::<(), ToolkitError>(())
/// ```
pub mod prelude {
    pub use crate::core::{
        CompiledQuery, Condition, Database, DatabaseRow, DatabaseValue, Dialect, DialectKind,
        Driver, ExecutionContext, FnMigration, FnSeed, MigrateReport, Migration, MigrationSet,
        Migrator, Operator, OrderDirection, QueryNode, QueryResult, Result, RollbackOutcome,
        Seed, SeedSet, SqlMigration, ToolkitError,
    };
    pub use crate::dialects::{MYSQL, POSTGRES, SQLITE};

    #[cfg(feature = "sqlite")]
    pub use crate::backends::SqliteDriver;
}

// Re-export at root level for convenience
pub use core::{
    CompiledQuery, Database, DatabaseValue, Dialect, DialectKind, Driver, QueryNode, QueryResult,
    Result, ToolkitError,
};

#[cfg(feature = "sqlite")]
pub use backends::SqliteDriver;
