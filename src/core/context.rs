//! Execution context handed to migration and seed bodies

use super::dialect::Dialect;
use super::driver::Driver;
use super::error::{Result, ToolkitError};
use super::query::QueryNode;
use super::value::{DatabaseValue, QueryResult};
use std::future::Future;
use std::pin::Pin;
use tracing::debug;

/// The live driver/dialect pair a unit body runs against.
///
/// Cheap to copy; it only borrows the driver and dialect for the length of
/// one invocation.
#[derive(Clone, Copy)]
pub struct ExecutionContext<'a> {
    driver: &'a dyn Driver,
    dialect: &'a dyn Dialect,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(driver: &'a dyn Driver, dialect: &'a dyn Dialect) -> Self {
        Self { driver, dialect }
    }

    pub fn driver(&self) -> &'a dyn Driver {
        self.driver
    }

    pub fn dialect(&self) -> &'a dyn Dialect {
        self.dialect
    }

    /// Send raw SQL to the driver unchanged
    pub async fn run(&self, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult> {
        debug!(dialect = self.dialect.name(), params = params.len(), "{}", sql);
        self.driver.query(sql, params).await
    }

    /// Compile a query node with the context's dialect and run it
    pub async fn execute(&self, node: &QueryNode) -> Result<QueryResult> {
        let compiled = self.dialect.compile(node)?;
        self.run(&compiled.sql, &compiled.params).await
    }
}

impl std::fmt::Debug for ExecutionContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("dialect", &self.dialect.name())
            .finish_non_exhaustive()
    }
}

/// Callback that receives one line as each runner step starts
pub type ProgressFn<'a> = Box<dyn Fn(&str) + Send + Sync + 'a>;

/// Boxed future returned by closure-based unit bodies
pub type UnitFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// Box an async block as a [`UnitFuture`].
///
/// ```rust
/// use worksonmydb::core::context::{boxed, ExecutionContext, UnitFuture};
///
/// fn body(ctx: ExecutionContext<'_>) -> UnitFuture<'_> {
///     boxed(async move {
///         ctx.run("DELETE FROM sessions", &[]).await?;
///         Ok(())
///     })
/// }
/// ```
pub fn boxed<'a, F>(future: F) -> UnitFuture<'a>
where
    F: Future<Output = Result<()>> + Send + 'a,
{
    Box::pin(future)
}

/// Order units by name and reject empty or repeated names
pub(crate) fn order_units<T: ?Sized>(
    units: &mut [Box<T>],
    name: impl Fn(&T) -> &str,
) -> Result<()> {
    if units.iter().any(|u| name(&**u).trim().is_empty()) {
        return Err(ToolkitError::malformed_unit("unit name must not be empty"));
    }

    units.sort_by(|a, b| name(&**a).cmp(name(&**b)));

    if let Some(pair) = units.windows(2).find(|w| name(&*w[0]) == name(&*w[1])) {
        return Err(ToolkitError::duplicate_unit(name(&*pair[0])));
    }

    Ok(())
}
