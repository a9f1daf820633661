//! Database facade
//!
//! Pairs a [`Driver`] with a [`Dialect`] so callers can hand in query nodes
//! instead of SQL text.
//!
//! ```rust,no_run
//! use worksonmydb::prelude::*;
//!
//! # async fn demo(driver: Box<dyn Driver>) -> Result<()> {
//! let db = Database::new(driver, &MYSQL);
//! let node = QueryNode::select("users").where_eq("id", 1).build();
//! let result = db.execute(&node).await?;
//! println!("{} rows", result.rows.len());
//! db.close().await?;
//! # Ok(())
//! # }
//! ```

use super::context::ExecutionContext;
use super::dialect::Dialect;
use super::driver::Driver;
use super::error::Result;
use super::query::{CompiledQuery, QueryNode};
use super::value::{DatabaseValue, QueryResult};
use tracing::debug;

/// A driver bound to the dialect its SQL is rendered in
pub struct Database {
    driver: Box<dyn Driver>,
    dialect: &'static dyn Dialect,
}

impl Database {
    pub fn new(driver: Box<dyn Driver>, dialect: &'static dyn Dialect) -> Self {
        Self { driver, dialect }
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn dialect(&self) -> &'static dyn Dialect {
        self.dialect
    }

    /// Borrow the pair as an execution context for unit bodies
    pub fn context(&self) -> ExecutionContext<'_> {
        ExecutionContext::new(self.driver.as_ref(), self.dialect)
    }

    /// Render a node without running it
    pub fn compile(&self, node: &QueryNode) -> Result<CompiledQuery> {
        self.dialect.compile(node)
    }

    /// Compile a node with the bound dialect and run it through the driver
    pub async fn execute(&self, node: &QueryNode) -> Result<QueryResult> {
        let compiled = self.compile(node)?;
        debug!(kind = node.kind(), "{}", compiled.sql);
        self.driver.query(&compiled.sql, &compiled.params).await
    }

    /// Run SQL text as-is, bypassing the compiler.
    ///
    /// # Security Warning
    ///
    /// The text is not escaped. Pass user input through `params`, never by
    /// formatting it into `sql`.
    pub async fn raw(&self, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult> {
        debug!(kind = "raw", "{}", sql);
        self.driver.query(sql, params).await
    }

    pub async fn close(&self) -> Result<()> {
        self.driver.close().await
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("dialect", &self.dialect.name())
            .finish_non_exhaustive()
    }
}
