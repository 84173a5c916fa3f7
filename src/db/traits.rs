//! Core traits for the relational storage abstraction.
//!
//! This module defines the trait hierarchy that backends must implement:
//!
//! - [`SqlExecutor`] - Run statements (auto-commit or inside a transaction)
//! - [`Transaction`] - Transaction lifecycle management
//! - [`DbClient`] - Connection handling and transaction creation

use async_trait::async_trait;

use crate::db::dialect::Dialect;
use crate::db::row::{Params, RowStream};
use crate::error::AppError;

/// Executes SQL statements against the database.
///
/// Statements use `?` placeholders; backends render them for their driver
/// via [`Dialect::render`].
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// The SQL flavour this executor speaks.
    fn dialect(&self) -> Dialect;

    /// Executes a statement and returns a stream of result rows.
    ///
    /// Use this for SELECT and for writes with a RETURNING clause.
    async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError>;

    /// Executes a statement and returns the number of affected rows.
    async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError>;

    /// Executes one or more statements without parameters.
    ///
    /// Use this for DDL and session commands.
    async fn batch_sql(&self, sql: &str) -> Result<(), AppError>;
}

/// Transaction lifecycle management.
///
/// A transaction that is dropped before [`commit`](Transaction::commit) or
/// [`rollback`](Transaction::rollback) succeeds is rolled back by the backend.
#[async_trait]
pub trait Transaction: SqlExecutor {
    /// Commits the transaction, making all changes permanent.
    async fn commit(&mut self) -> Result<(), AppError>;

    /// Rolls back the transaction, discarding all changes.
    async fn rollback(&mut self) -> Result<(), AppError>;
}

/// A database client that can begin transactions.
///
/// The executor methods on the client itself run in auto-commit mode.
#[async_trait]
pub trait DbClient: SqlExecutor {
    /// Begins a new transaction.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let mut txn = client.begin().await?;
    /// txn.execute_sql("DELETE FROM tags WHERE id = ?", vec![4.into()]).await?;
    /// txn.commit().await?;
    /// ```
    async fn begin(&self) -> Result<Box<dyn Transaction + '_>, AppError>;
}
