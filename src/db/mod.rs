//! Storage abstraction for backend-agnostic relational access.
//!
//! The same repository code runs against SQLite (embedded, the default) and
//! PostgreSQL (pooled). Statements are written with `?` placeholders and
//! portable SQL; the [`Dialect`] of the executor renders the differences.
//!
//! # Architecture
//!
//! - [`SqlExecutor`] - Run statements
//! - [`Transaction`] - Transaction lifecycle (commit/rollback)
//! - [`DbClient`] - Connection management and transaction creation
//! - [`Database`] - Cheap-to-clone handle shared through the context
//!
//! # Usage
//!
//! ```ignore
//! use pkm_store::db::{Database, QueryExt};
//!
//! let db = Database::connect(&config.database).await?;
//!
//! let rows = db.query("SELECT * FROM tags WHERE parent_tag IS NULL")
//!     .fetch_all()
//!     .await?;
//!
//! let mut txn = db.begin().await?;
//! txn.query("DELETE FROM tags WHERE id = ?").bind(4i64).run().await?;
//! txn.commit().await?;
//! ```

mod dialect;
mod query;
mod row;
mod traits;
mod value;

pub mod backends;

pub use dialect::Dialect;
pub use query::{Query, QueryExt};
pub use row::{Params, Row, RowStream};
pub use traits::{DbClient, SqlExecutor, Transaction};
pub use value::SqlValue;

use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::{Backend, DatabaseConfig};
use crate::error::AppError;
use backends::postgres::PostgresClient;
use backends::sqlite::SqliteClient;

/// Shared database handle.
///
/// Wraps any [`DbClient`] behind an `Arc`; cloning is cheap and every clone
/// talks to the same connection or pool.
#[derive(Clone)]
pub struct Database {
    client: Arc<dyn DbClient>,
}

impl Database {
    pub fn new<C: DbClient + 'static>(client: C) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Opens the backend selected by `config`.
    ///
    /// Does not run migrations; see [`crate::migrations::run_migrations`].
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, AppError> {
        match config.backend {
            Backend::Sqlite => {
                let client = match config.path.as_deref() {
                    Some(path) => SqliteClient::open(path)?,
                    None => SqliteClient::open_in_memory()?,
                };
                tracing::info!(path = ?config.path, "Opened SQLite store");
                Ok(Self::new(client))
            }
            Backend::Postgres => {
                let uri = config.uri.as_deref().ok_or_else(|| {
                    AppError::Database("postgres backend requires database.uri".into())
                })?;
                let client = PostgresClient::connect(uri, config.pool_size).await?;
                tracing::info!(pool_size = config.pool_size, "Connected to PostgreSQL store");
                Ok(Self::new(client))
            }
        }
    }

    /// Opens a private in-memory SQLite store.
    pub fn in_memory() -> Result<Self, AppError> {
        Ok(Self::new(SqliteClient::open_in_memory()?))
    }

    pub fn client(&self) -> &dyn DbClient {
        self.client.as_ref()
    }

    /// Begins a transaction unless `cancel` has already fired.
    pub async fn begin(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Box<dyn Transaction + '_>, AppError> {
        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }
        guarded(cancel, self.client.begin()).await
    }
}

#[async_trait::async_trait]
impl SqlExecutor for Database {
    fn dialect(&self) -> Dialect {
        self.client.dialect()
    }

    async fn query_sql(&self, sql: &str, params: Params) -> Result<RowStream<'_>, AppError> {
        self.client.query_sql(sql, params).await
    }

    async fn execute_sql(&self, sql: &str, params: Params) -> Result<u64, AppError> {
        self.client.execute_sql(sql, params).await
    }

    async fn batch_sql(&self, sql: &str) -> Result<(), AppError> {
        self.client.batch_sql(sql).await
    }
}

/// Races `work` against `cancel`.
///
/// Cancellation wins ties; the abandoned future is dropped, which rolls back
/// any transaction it owned.
pub async fn guarded<F, R>(cancel: &CancellationToken, work: F) -> Result<R, AppError>
where
    F: Future<Output = Result<R, AppError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AppError::Cancelled),
        result = work => result,
    }
}

/// Commits `txn` when `outcome` is `Ok`, rolls it back otherwise.
pub async fn finish<R>(
    mut txn: Box<dyn Transaction + '_>,
    outcome: Result<R, AppError>,
) -> Result<R, AppError> {
    match outcome {
        Ok(value) => {
            txn.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = txn.rollback().await {
                tracing::error!(error = %rollback_err, "Rollback failed after: {}", err);
            }
            Err(err)
        }
    }
}
