//! Database migration system
//!
//! Migrations are named, reversible units. Their names order them: `up` runs
//! in ascending lexicographic order, and history (a table, `_migrations` by
//! default) records which units have been applied and when.
//!
//! # Example
//!
//! ```rust,no_run
//! use worksonmydb::core::migration::{self, MigrationSet, SqlMigration};
//! use worksonmydb::prelude::*;
//!
//! # async fn example(driver: Box<dyn Driver>) -> Result<()> {
//! let set = MigrationSet::new(vec![
//!     Box::new(SqlMigration::new(
//!         "001_create_users",
//!         "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
//!         "DROP TABLE users",
//!     )),
//!     Box::new(SqlMigration::new(
//!         "002_add_email",
//!         "ALTER TABLE users ADD COLUMN email TEXT",
//!         "ALTER TABLE users DROP COLUMN email",
//!     )),
//! ])?;
//!
//! // Applies whatever is pending, then closes the driver.
//! let report = migration::migrate(driver.as_ref(), &SQLITE, &set).await?;
//! println!("applied {:?}", report.applied);
//! # Ok(())
//! # }
//! ```

use super::context::{order_units, ExecutionContext, ProgressFn, UnitFuture};
use super::dialect::{validate_identifier, Dialect};
use super::driver::Driver;
use super::error::{Result, ToolkitError};
use super::query::{CompiledQuery, QueryNode};
use super::value::{DatabaseValue, QueryResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

/// Default name for the history table
pub const DEFAULT_TABLE_NAME: &str = "_migrations";

/// A reversible schema change
#[async_trait]
pub trait Migration: Send + Sync {
    /// Unique name; also the sort key
    fn name(&self) -> &str;

    /// Apply the change
    async fn up(&self, ctx: ExecutionContext<'_>) -> Result<()>;

    /// Revert the change
    async fn down(&self, ctx: ExecutionContext<'_>) -> Result<()>;
}

/// A migration written as plain SQL text.
///
/// Each side runs as a single statement with no parameters.
#[derive(Debug, Clone)]
pub struct SqlMigration {
    name: String,
    up_sql: String,
    down_sql: String,
}

impl SqlMigration {
    pub fn new(
        name: impl Into<String>,
        up_sql: impl Into<String>,
        down_sql: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            up_sql: up_sql.into(),
            down_sql: down_sql.into(),
        }
    }

    pub fn up_sql(&self) -> &str {
        &self.up_sql
    }

    pub fn down_sql(&self) -> &str {
        &self.down_sql
    }
}

#[async_trait]
impl Migration for SqlMigration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn up(&self, ctx: ExecutionContext<'_>) -> Result<()> {
        ctx.run(&self.up_sql, &[]).await.map(|_| ())
    }

    async fn down(&self, ctx: ExecutionContext<'_>) -> Result<()> {
        ctx.run(&self.down_sql, &[]).await.map(|_| ())
    }
}

type UnitFn = Box<dyn for<'a> Fn(ExecutionContext<'a>) -> UnitFuture<'a> + Send + Sync>;

/// A migration whose bodies are closures.
///
/// ```rust
/// use worksonmydb::core::context::boxed;
/// use worksonmydb::core::migration::FnMigration;
///
/// let unit = FnMigration::new(
///     "001_init",
///     |ctx| boxed(async move {
///         ctx.run("CREATE TABLE t (id INT)", &[]).await?;
///         Ok(())
///     }),
///     |ctx| boxed(async move {
///         ctx.run("DROP TABLE t", &[]).await?;
///         Ok(())
///     }),
/// );
/// ```
pub struct FnMigration {
    name: String,
    up: UnitFn,
    down: UnitFn,
}

impl FnMigration {
    pub fn new<U, D>(name: impl Into<String>, up: U, down: D) -> Self
    where
        U: for<'a> Fn(ExecutionContext<'a>) -> UnitFuture<'a> + Send + Sync + 'static,
        D: for<'a> Fn(ExecutionContext<'a>) -> UnitFuture<'a> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            up: Box::new(up),
            down: Box::new(down),
        }
    }
}

#[async_trait]
impl Migration for FnMigration {
    fn name(&self) -> &str {
        &self.name
    }

    async fn up(&self, ctx: ExecutionContext<'_>) -> Result<()> {
        (self.up)(ctx).await
    }

    async fn down(&self, ctx: ExecutionContext<'_>) -> Result<()> {
        (self.down)(ctx).await
    }
}

impl std::fmt::Debug for FnMigration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnMigration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Migrations handed over by whatever discovered them, ordered by name
#[derive(Default)]
pub struct MigrationSet {
    units: Vec<Box<dyn Migration>>,
}

impl MigrationSet {
    /// Build a set, sorting by name.
    ///
    /// Fails with `MalformedUnit` on an empty name and `DuplicateUnit` when two
    /// units share one.
    pub fn new(mut units: Vec<Box<dyn Migration>>) -> Result<Self> {
        order_units(&mut units, |m| m.name())?;
        Ok(Self { units })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Migration> {
        self.units.iter().map(|m| m.as_ref())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Migration> {
        self.iter().find(|m| m.name() == name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.iter().map(|m| m.name()).collect()
    }
}

impl std::fmt::Debug for MigrationSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

/// Migration status for a single unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationStatus {
    /// Migration has been applied
    Applied,
    /// Migration is pending
    Pending,
}

/// One history row
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub name: String,
    pub applied_at: Option<DateTime<Utc>>,
}

/// Status line for one discovered unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitStatus {
    pub name: String,
    pub status: MigrationStatus,
    pub applied_at: Option<DateTime<Utc>>,
}

/// What a migrate invocation did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrateReport {
    /// Names applied during this run, in application order
    pub applied: Vec<String>,
}

/// What a rollback invocation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackOutcome {
    /// The named unit's `down` ran and its history row is gone
    RolledBack(String),
    /// History was empty
    NothingToRollBack,
    /// History's latest entry has no matching unit; nothing was touched
    HistoryMismatch(String),
}

impl RollbackOutcome {
    /// Treat a history mismatch as [`ToolkitError::HistoryMismatch`]
    pub fn into_result(self) -> Result<Self> {
        match self {
            RollbackOutcome::HistoryMismatch(name) => Err(ToolkitError::HistoryMismatch(name)),
            other => Ok(other),
        }
    }
}

static LAST_APPLIED_AT: Mutex<i64> = parking_lot::const_mutex(0);

/// Current time in microseconds, strictly greater than any stamp issued before
fn next_applied_at() -> i64 {
    let now = Utc::now().timestamp_micros();
    let mut last = LAST_APPLIED_AT.lock();
    let stamp = if now > *last { now } else { *last + 1 };
    *last = stamp;
    stamp
}

/// Reads and writes migration history and runs units against it
pub struct Migrator<'a> {
    ctx: ExecutionContext<'a>,
    table_name: String,
    progress: Option<ProgressFn<'a>>,
}

impl<'a> Migrator<'a> {
    pub fn new(driver: &'a dyn Driver, dialect: &'a dyn Dialect) -> Self {
        Self {
            ctx: ExecutionContext::new(driver, dialect),
            table_name: DEFAULT_TABLE_NAME.to_string(),
            progress: None,
        }
    }

    /// Use a history table other than `_migrations`
    #[must_use]
    pub fn with_table_name(mut self, table_name: impl Into<String>) -> Self {
        self.table_name = table_name.into();
        self
    }

    /// Receive a line as each unit starts, e.g. `Applying migration 001_init...`
    #[must_use]
    pub fn with_progress(mut self, progress: impl Fn(&str) + Send + Sync + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    fn announce(&self, line: &str) {
        info!("{}", line);
        if let Some(progress) = &self.progress {
            progress(line);
        }
    }

    pub fn context(&self) -> ExecutionContext<'a> {
        self.ctx
    }

    async fn run_compiled(&self, compiled: CompiledQuery) -> Result<QueryResult> {
        self.ctx.run(&compiled.sql, &compiled.params).await
    }

    /// Create the history table if it does not exist.
    ///
    /// Every history read or write calls this first, so `apply` never runs
    /// `up` against a database it cannot record the result in.
    pub async fn ensure_history_table(&self) -> Result<()> {
        validate_identifier(&self.table_name)?;
        let dialect = self.ctx.dialect();

        let sql = format!(
            "CREATE TABLE IF NOT EXISTS {} ({} VARCHAR(255) PRIMARY KEY, {} {} NOT NULL)",
            dialect.escape_identifier(&self.table_name),
            dialect.escape_identifier("name"),
            dialect.escape_identifier("applied_at"),
            dialect.timestamp_type()
        );
        self.ctx.run(&sql, &[]).await?;
        Ok(())
    }

    /// History rows, oldest first
    pub async fn history(&self) -> Result<Vec<HistoryRecord>> {
        self.ensure_history_table().await?;
        let node = QueryNode::select(self.table_name.as_str())
            .columns(&["name", "applied_at"])
            .order_by_asc("applied_at")
            .order_by_asc("name")
            .build();
        let compiled = self.ctx.dialect().compile(&node)?;
        let result = self.run_compiled(compiled).await?;

        let mut records = Vec::with_capacity(result.rows.len());
        for row in &result.rows {
            let name = match row.get("name") {
                Some(DatabaseValue::String(name)) => name.clone(),
                Some(other) if !other.is_null() => other.as_string(),
                _ => {
                    return Err(ToolkitError::driver(format!(
                        "history table {} returned a row without a name",
                        self.table_name
                    )))
                }
            };
            let applied_at = row.get("applied_at").and_then(DatabaseValue::as_timestamp);
            records.push(HistoryRecord { name, applied_at });
        }

        Ok(records)
    }

    /// Names of applied units, oldest first
    pub async fn applied_names(&self) -> Result<Vec<String>> {
        Ok(self
            .history()
            .await?
            .into_iter()
            .map(|record| record.name)
            .collect())
    }

    /// Run `up` and record the unit as applied
    pub async fn apply(&self, migration: &dyn Migration) -> Result<()> {
        self.ensure_history_table().await?;
        migration.up(self.ctx).await?;

        let node = QueryNode::insert(self.table_name.as_str())
            .value("name", migration.name())
            .value("applied_at", DatabaseValue::Timestamp(next_applied_at()))
            .build();
        let compiled = self.ctx.dialect().compile(&node)?;
        self.run_compiled(compiled).await?;
        debug!(migration = migration.name(), "recorded in history");
        Ok(())
    }

    /// Run `down` and remove the unit's history row
    pub async fn revert(&self, migration: &dyn Migration) -> Result<()> {
        self.ensure_history_table().await?;
        migration.down(self.ctx).await?;

        let node = QueryNode::delete(self.table_name.as_str())
            .where_eq("name", migration.name())
            .build();
        let compiled = self.ctx.dialect().compile(&node)?;
        self.run_compiled(compiled).await?;
        debug!(migration = migration.name(), "removed from history");
        Ok(())
    }

    /// Apply every unit not yet in history, in name order.
    ///
    /// Stops at the first failure; units applied before it stay applied and
    /// the failing unit gets no history row.
    pub async fn migrate(&self, set: &MigrationSet) -> Result<MigrateReport> {
        let applied = self.applied_names().await?;

        let mut report = MigrateReport::default();
        for migration in set.iter() {
            if applied.iter().any(|name| name == migration.name()) {
                continue;
            }

            self.announce(&format!("Applying migration {}...", migration.name()));
            self.apply(migration).await?;
            report.applied.push(migration.name().to_string());
        }

        if report.applied.is_empty() {
            self.announce("No pending migrations.");
        }

        Ok(report)
    }

    /// Revert the most recently applied unit, and only that one
    pub async fn rollback(&self, set: &MigrationSet) -> Result<RollbackOutcome> {
        let applied = self.applied_names().await?;

        let Some(last) = applied.last() else {
            self.announce("No migrations to roll back.");
            return Ok(RollbackOutcome::NothingToRollBack);
        };

        let Some(migration) = set.get(last) else {
            let line = format!("Migration record {} found but no matching file present.", last);
            warn!("{}", line);
            if let Some(progress) = &self.progress {
                progress(&line);
            }
            return Ok(RollbackOutcome::HistoryMismatch(last.clone()));
        };

        self.announce(&format!("Rolling back {}...", last));
        self.revert(migration).await?;
        Ok(RollbackOutcome::RolledBack(last.clone()))
    }

    /// Applied/pending state of every discovered unit
    pub async fn status(&self, set: &MigrationSet) -> Result<Vec<UnitStatus>> {
        let history = self.history().await?;

        Ok(set
            .iter()
            .map(|migration| {
                let record = history.iter().find(|r| r.name == migration.name());
                UnitStatus {
                    name: migration.name().to_string(),
                    status: if record.is_some() {
                        MigrationStatus::Applied
                    } else {
                        MigrationStatus::Pending
                    },
                    applied_at: record.and_then(|r| r.applied_at),
                }
            })
            .collect())
    }

    /// Names of units not yet applied, in the order migrate would run them
    pub async fn pending(&self, set: &MigrationSet) -> Result<Vec<String>> {
        Ok(self
            .status(set)
            .await?
            .into_iter()
            .filter(|unit| unit.status == MigrationStatus::Pending)
            .map(|unit| unit.name)
            .collect())
    }
}

/// Close the driver after an invocation, keeping the first error
pub(crate) async fn release<T>(driver: &dyn Driver, outcome: Result<T>) -> Result<T> {
    let closed = driver.close().await;
    match (outcome, closed) {
        (Err(e), Err(close_err)) => {
            warn!("failed to close driver after error: {}", close_err);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Ok(_), Err(close_err)) => Err(close_err),
        (Ok(value), Ok(())) => Ok(value),
    }
}

/// Apply pending migrations with the default history table, then close the driver
pub async fn migrate(
    driver: &dyn Driver,
    dialect: &dyn Dialect,
    set: &MigrationSet,
) -> Result<MigrateReport> {
    migrate_with(Migrator::new(driver, dialect), set).await
}

/// Apply pending migrations through a configured migrator, then close its driver
pub async fn migrate_with(migrator: Migrator<'_>, set: &MigrationSet) -> Result<MigrateReport> {
    let outcome = if set.is_empty() {
        info!("No migrations found.");
        Ok(MigrateReport::default())
    } else {
        migrator.migrate(set).await
    };
    release(migrator.ctx.driver(), outcome).await
}

/// Roll back the latest migration with the default history table, then close the driver
pub async fn rollback(
    driver: &dyn Driver,
    dialect: &dyn Dialect,
    set: &MigrationSet,
) -> Result<RollbackOutcome> {
    rollback_with(Migrator::new(driver, dialect), set).await
}

/// Roll back the latest migration through a configured migrator, then close its driver
pub async fn rollback_with(
    migrator: Migrator<'_>,
    set: &MigrationSet,
) -> Result<RollbackOutcome> {
    let outcome = if set.is_empty() {
        info!("No migration files found.");
        Ok(RollbackOutcome::NothingToRollBack)
    } else {
        migrator.rollback(set).await
    };
    release(migrator.ctx.driver(), outcome).await
}
