//! Driver trait
//!
//! A driver is the only component that talks to a live database. It receives
//! SQL that has already been rendered for its dialect plus the positional
//! parameters, and hands back rows or modification counts.

use super::error::Result;
use super::value::{DatabaseValue, QueryResult};
use async_trait::async_trait;

/// Executes rendered SQL against a live connection
#[async_trait]
pub trait Driver: Send + Sync {
    /// Run one statement.
    ///
    /// Row-producing statements fill [`QueryResult::rows`]; data-modifying
    /// statements report `affected_rows` and, where the backend has one, the
    /// generated `insert_id`.
    ///
    /// # Thread Safety
    /// Safe to call concurrently; backends serialise access internally.
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult>;

    /// Release the underlying connection or pool.
    ///
    /// Closing twice is not an error. Queries issued after `close` fail.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for Box<D> {
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult> {
        (**self).query(sql, params).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}

#[async_trait]
impl<D: Driver + ?Sized> Driver for std::sync::Arc<D> {
    async fn query(&self, sql: &str, params: &[DatabaseValue]) -> Result<QueryResult> {
        (**self).query(sql, params).await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
